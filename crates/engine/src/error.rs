//! Engine-level error types.

use thiserror::Error;

/// Errors that abort a whole tool call.
///
/// Per-operation failures are not errors at this level: they are reported
/// in the batch result (see [`crate::diff::FailedOperation`]).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fetching or writing back the document failed.
    #[error("remote store error: {0}")]
    Remote(#[from] remote::RemoteError),

    /// The fetched document is not a workflow graph.
    #[error("workflow '{id}' could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The mutated graph could not be serialized for write-back.
    #[error("workflow '{id}' could not be encoded: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}
