//! Outbound review call

use std::time::Duration;

use async_trait::async_trait;
use genie_core_types::{ReviewRequest, ReviewResult};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::errors::ControlError;

pub const DEFAULT_REVIEW_ENDPOINT: &str = "http://127.0.0.1:8000/review";

/// Sends one review request. Any error folds into the `Failed` state.
#[async_trait]
pub trait ReviewTransport: Send + Sync {
    async fn submit(&self, request: &ReviewRequest) -> Result<ReviewResult, ControlError>;
}

/// JSON POST to the review backend.
#[derive(Debug, Clone)]
pub struct HttpReviewTransport {
    client: Client,
    endpoint: Url,
}

impl HttpReviewTransport {
    /// `timeout` of `None` waits for the backend indefinitely.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ControlError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| ControlError::Config(format!("endpoint '{endpoint}': {err}")))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ControlError::Config(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReviewTransport for HttpReviewTransport {
    async fn submit(&self, request: &ReviewRequest) -> Result<ReviewResult, ControlError> {
        debug!(endpoint = %self.endpoint, subject = %request, "Posting review request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| ControlError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Review endpoint returned an error status");
            return Err(ControlError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ReviewResult>()
            .await
            .map_err(|err| ControlError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ReviewRequest {
        ReviewRequest::new("group/proj", Some("42".into()))
    }

    async fn transport_for(server: &MockServer) -> HttpReviewTransport {
        HttpReviewTransport::new(&format!("{}/review", server.uri()), None).unwrap()
    }

    #[tokio::test]
    async fn posts_json_body_and_returns_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/review"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"project_path": "group/proj", "merge_request_iid": "42"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Review completed"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = transport_for(&server).await.submit(&request()).await.unwrap();
        assert_eq!(result["message"], "Review completed");
    }

    #[tokio::test]
    async fn error_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "Error: no project"})),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server).await.submit(&request()).await.unwrap_err();
        match err {
            ControlError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("no project"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = transport_for(&server).await.submit(&request()).await.unwrap_err();
        assert!(matches!(err, ControlError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_failure() {
        let server = MockServer::start().await;
        let endpoint = format!("{}/review", server.uri());
        drop(server);

        let transport = HttpReviewTransport::new(&endpoint, Some(Duration::from_secs(5))).unwrap();
        let err = transport.submit(&request()).await.unwrap_err();
        assert!(matches!(err, ControlError::Transport(_)));
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(matches!(
            HttpReviewTransport::new("not a url", None),
            Err(ControlError::Config(_))
        ));
    }
}
