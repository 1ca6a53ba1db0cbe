//! Error handling for the review backend
//!
//! Every pipeline failure is reported to the caller as
//! `{"detail": "Error: <message>"}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gitlab_adapter::GitLabError;
use review_engine::ReviewError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenieError {
    #[error("Failed to fetch project ID")]
    ProjectLookup(#[source] GitLabError),

    #[error("Project ID not found")]
    ProjectIdMissing,

    #[error("merge_request_iid is required")]
    MissingMergeRequest,

    /// Request body that is not JSON or not a review request.
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error(transparent)]
    GitLab(#[from] GitLabError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

pub type GenieResult<T> = Result<T, GenieError>;

impl GenieError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            GenieError::MissingMergeRequest => StatusCode::UNPROCESSABLE_ENTITY,
            GenieError::InvalidBody { status, .. } => *status,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for GenieError {
    fn from(rejection: JsonRejection) -> Self {
        GenieError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for GenieError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(json!({ "detail": format!("Error: {}", self) }));
        (status, body).into_response()
    }
}
