//! Error types for element waits

use host_dom::DomError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// The page was torn down before a match appeared
    #[error("Document closed before the element appeared")]
    DocumentClosed,

    /// A candidate selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Host document error while watching
    #[error("Document error: {0}")]
    Dom(DomError),
}

impl From<DomError> for WatchError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::DocumentClosed => WatchError::DocumentClosed,
            DomError::UnsupportedSelector(selector) => WatchError::InvalidSelector(selector),
            other => WatchError::Dom(other),
        }
    }
}
