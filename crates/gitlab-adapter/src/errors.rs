//! Error types for GitLab calls

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum GitLabError {
    /// Request could not be sent or the connection failed
    #[error("GitLab request failed: {0}")]
    Http(String),

    /// GitLab answered with a non-success status
    #[error("GitLab returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Project lookup succeeded but carried no id
    #[error("Project ID not found")]
    MissingProjectId,

    /// Response body did not have the expected shape
    #[error("Unexpected GitLab response: {0}")]
    Decode(String),

    /// Client could not be configured
    #[error("Invalid GitLab configuration: {0}")]
    Config(String),
}

impl GitLabError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GitLabError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
