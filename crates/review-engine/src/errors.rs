//! Error types for the review engine

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ReviewError {
    /// Request to the model provider failed
    #[error("LLM request failed: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("LLM provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider response did not have the expected shape
    #[error("LLM response invalid: {0}")]
    Decode(String),

    /// Reviewer could not be configured
    #[error("Invalid reviewer configuration: {0}")]
    Config(String),
}
