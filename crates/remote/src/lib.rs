//! `remote` crate — access to workflows stored on the automation platform.
//!
//! Provides the REST client, the repository functions behind it, and the
//! [`WorkflowStore`] trait the engine is written against. No graph logic
//! lives here; documents are passed through as JSON.

pub mod client;
pub mod error;
pub mod mock;
pub mod models;
pub mod repository;
pub mod store;

pub use client::{create_client, ApiClient, ClientConfig};
pub use error::RemoteError;
pub use mock::MockStore;
pub use models::{ListFilter, WorkflowSummary};
pub use store::WorkflowStore;
