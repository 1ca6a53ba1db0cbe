//! REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::errors::GitLabError;
use crate::types::{
    ChangesResponse, DiffRefs, DiscussionRequest, InlineComment, MergeRequestChanges,
    TextPosition,
};

pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Clone)]
pub struct GitLabConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GITLAB_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Merge request operations used by the review pipeline.
#[async_trait]
pub trait MergeRequestApi: Send + Sync {
    /// Numeric id of the project at `project_path` (e.g. `group/sub/proj`).
    async fn project_id(&self, project_path: &str) -> Result<u64, GitLabError>;

    async fn merge_request_changes(
        &self,
        project_id: u64,
        merge_request_iid: &str,
    ) -> Result<MergeRequestChanges, GitLabError>;

    /// Opens an inline discussion on `comment.path` at `comment.new_line`.
    async fn create_discussion(
        &self,
        project_id: u64,
        merge_request_iid: &str,
        diff_refs: &DiffRefs,
        comment: &InlineComment,
    ) -> Result<(), GitLabError>;
}

pub struct GitLabClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GitLabClient {
    pub fn new(config: GitLabConfig) -> Result<Self, GitLabError> {
        if config.token.as_deref().map_or(true, str::is_empty) {
            warn!("No GitLab token configured; only public projects are reachable");
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GitLabError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            api_base: format!("{}/api/v4", config.base_url.trim_end_matches('/')),
            token: config.token.filter(|token| !token.is_empty()),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GitLabError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| GitLabError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(GitLabError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// `group/sub/proj` becomes `group%2Fsub%2Fproj`.
pub fn encode_project_path(project_path: &str) -> String {
    project_path.trim_matches('/').replace('/', "%2F")
}

#[async_trait]
impl MergeRequestApi for GitLabClient {
    async fn project_id(&self, project_path: &str) -> Result<u64, GitLabError> {
        let url = format!("{}/projects/{}", self.api_base, encode_project_path(project_path));
        debug!(%url, "Resolving project id");
        let project: JsonValue = self
            .send(self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|err| GitLabError::Decode(err.to_string()))?;
        project
            .get("id")
            .and_then(JsonValue::as_u64)
            .filter(|id| *id != 0)
            .ok_or(GitLabError::MissingProjectId)
    }

    async fn merge_request_changes(
        &self,
        project_id: u64,
        merge_request_iid: &str,
    ) -> Result<MergeRequestChanges, GitLabError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/changes",
            self.api_base, project_id, merge_request_iid
        );
        debug!(%url, "Fetching merge request changes");
        let response: ChangesResponse = self
            .send(self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|err| GitLabError::Decode(err.to_string()))?;
        Ok(MergeRequestChanges {
            changes: response.changes,
            diff_refs: response.diff_refs,
        })
    }

    async fn create_discussion(
        &self,
        project_id: u64,
        merge_request_iid: &str,
        diff_refs: &DiffRefs,
        comment: &InlineComment,
    ) -> Result<(), GitLabError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/discussions",
            self.api_base, project_id, merge_request_iid
        );
        let body = DiscussionRequest {
            body: &comment.body,
            position: TextPosition {
                position_type: "text",
                new_path: &comment.path,
                old_path: &comment.path,
                new_line: comment.new_line,
                base_sha: &diff_refs.base_sha,
                head_sha: &diff_refs.head_sha,
                start_sha: &diff_refs.start_sha,
            },
        };
        debug!(path = %comment.path, line = comment.new_line, "Creating inline discussion");
        self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }
}
