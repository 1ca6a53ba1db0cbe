//! Error types for the action control

use element_watcher::WatchError;
use host_dom::DomError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ControlError {
    /// Request could not be sent or the connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("Review endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not valid JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Host document rejected an update
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    /// Mount point wait ended without a match
    #[error("Mount point unavailable: {0}")]
    Watch(#[from] WatchError),

    /// Activation without a control in the document
    #[error("Review control is not mounted")]
    NotMounted,

    /// The user-facing notification could not be shown
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Transport could not be configured
    #[error("Invalid transport configuration: {0}")]
    Config(String),
}

impl ControlError {
    /// Failures of the review call itself, as opposed to local faults.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            ControlError::Transport(_) | ControlError::Status { .. } | ControlError::Decode(_)
        )
    }

    /// Text shown to the user after the failure prefix.
    pub fn user_message(&self) -> String {
        let message = match self {
            ControlError::Transport(message) | ControlError::Decode(message) => message.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failures_are_distinguished_from_local_faults() {
        assert!(ControlError::Transport("refused".into()).is_request_failure());
        assert!(ControlError::Status {
            status: 500,
            body: String::new()
        }
        .is_request_failure());
        assert!(!ControlError::NotMounted.is_request_failure());
    }

    #[test]
    fn empty_messages_fall_back_to_unknown_error() {
        assert_eq!(ControlError::Transport(String::new()).user_message(), "Unknown error");
        assert_eq!(
            ControlError::Status {
                status: 400,
                body: "{\"detail\":\"Error: boom\"}".into()
            }
            .user_message(),
            "Review endpoint returned 400: {\"detail\":\"Error: boom\"}"
        );
    }
}
