use std::time::Duration;

use review_engine::{
    extract_line_numbers, CodeReviewer, OpenAiConfig, OpenAiReviewer, ReviewError,
    NO_CHANGES_REPLY,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const DIFF: &str = "@@ -1,2 +1,3 @@\n fn main() {\n+    let v = std::env::var(\"HOME\").unwrap();\n }\n";

fn reviewer_for(server: &MockServer) -> OpenAiReviewer {
    OpenAiReviewer::new(OpenAiConfig {
        api_key: Some("sk-test".into()),
        api_base: format!("{}/v1", server.uri()),
        timeout: Duration::from_secs(5),
        ..OpenAiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn sends_review_request_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Issue 1: [Line 2] unwrap\nFix: handle the error."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mapping = extract_line_numbers(DIFF);
    let text = reviewer_for(&server)
        .review(DIFF, Some("src/main.rs"), &mapping)
        .await
        .unwrap();
    assert!(text.contains("[Line 2]"));

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4.1-nano");
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["max_tokens"], 1500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("deep expertise in rs"));
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("src/main.rs"));
}

#[tokio::test]
async fn blank_diff_skips_the_model() {
    let server = MockServer::start().await;
    let text = reviewer_for(&server)
        .review("  \n", Some("a.rs"), &Default::default())
        .await
        .unwrap();
    assert_eq!(text, NO_CHANGES_REPLY);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn null_content_is_an_empty_review() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let text = reviewer_for(&server)
        .review(DIFF, None, &Default::default())
        .await
        .unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn provider_errors_surface_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "slow down"}})))
        .mount(&server)
        .await;

    let err = reviewer_for(&server)
        .review(DIFF, None, &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::Status { status: 429, .. }));
}

#[test]
fn requires_api_key() {
    assert!(matches!(
        OpenAiReviewer::new(OpenAiConfig::default()),
        Err(ReviewError::Config(_))
    ));
}
