use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one loaded host document (one page load).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a single pass through the control's state machine.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActivationId(pub String);

impl ActivationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the review call: which merge request to analyse.
///
/// Serialized with the backend's field names (`project_path`,
/// `merge_request_iid`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    #[serde(rename = "project_path")]
    pub subject_path: String,
    #[serde(rename = "merge_request_iid")]
    pub subject_id: Option<String>,
}

impl ReviewRequest {
    pub fn new(subject_path: impl Into<String>, subject_id: Option<String>) -> Self {
        Self {
            subject_path: subject_path.into(),
            subject_id,
        }
    }
}

impl fmt::Display for ReviewRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject_id {
            Some(id) => write!(f, "{}!{}", self.subject_path, id),
            None => write!(f, "{}!?", self.subject_path),
        }
    }
}

/// Whatever the review endpoint answered; interpreted only as success/failure.
pub type ReviewResult = serde_json::Value;
