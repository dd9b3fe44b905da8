//! Repository functions, one per REST call.
//!
//! Every function takes a `&ApiClient` and returns a `Result<T, RemoteError>`.
//! No business logic and no domain types; documents stay raw JSON.

pub mod workflows;
