//! Error taxonomy shared by every port and engine operation.
//!
//! No variant is retried by the core. Each one is a terminal outcome for
//! the call that produced it and is reported to the immediate caller.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type RecallResult<T> = Result<T, RecallError>;

#[derive(Error, Debug)]
pub enum RecallError {
    /// Missing credential or invalid dimension configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Persistent storage could not be created or opened.
    #[error("Storage init error: {0}")]
    StorageInit(String),

    /// The embedding provider failed (network, auth, quota, malformed reply).
    #[error("Provider error: {0}")]
    Provider(String),

    /// A vector store write failed.
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// A vector store query failed.
    #[error("Store query error: {0}")]
    StoreQuery(String),

    /// The caller supplied an argument the engine refuses to act on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One or more inserts of a batch failed. Earlier or concurrent inserts
    /// of the same batch may already be durable.
    #[error("Batch write failed for {failed} of {total} items: {first}")]
    BatchWrite {
        failed: usize,
        total: usize,
        first: Box<RecallError>,
    },
}

impl From<serde_json::Error> for RecallError {
    fn from(e: serde_json::Error) -> Self {
        RecallError::InvalidInput(format!("metadata serialization: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_write_message_names_counts() {
        let err = RecallError::BatchWrite {
            failed: 2,
            total: 5,
            first: Box::new(RecallError::StoreWrite("duplicate id".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 5"));
        assert!(msg.contains("duplicate id"));
    }
}
