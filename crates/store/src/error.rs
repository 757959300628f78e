//! Error type shared by every store operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be converted to or from its stored form.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
