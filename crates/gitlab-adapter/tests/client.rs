use std::time::Duration;

use gitlab_adapter::{
    DiffRefs, GitLabClient, GitLabConfig, GitLabError, InlineComment, MergeRequestApi,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GitLabClient {
    GitLabClient::new(GitLabConfig {
        base_url: server.uri(),
        token: Some("glpat-test".into()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn resolves_project_id_with_encoded_path_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/group%2Fsub%2Fproj"))
        .and(header("PRIVATE-TOKEN", "glpat-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4242, "name": "proj"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server).project_id("group/sub/proj").await.unwrap();
    assert_eq!(id, 4242);
}

#[tokio::test]
async fn project_without_id_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "proj"})))
        .mount(&server)
        .await;

    let err = client_for(&server).project_id("group/proj").await.unwrap_err();
    assert!(matches!(err, GitLabError::MissingProjectId));
}

#[tokio::test]
async fn unknown_project_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "404 Project Not Found"})))
        .mount(&server)
        .await;

    let err = client_for(&server).project_id("group/missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn fetches_changes_and_diff_refs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/7/merge_requests/3/changes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "iid": 3,
            "changes": [
                {"old_path": "src/lib.rs", "new_path": "src/lib.rs", "diff": "@@ -1,1 +1,2 @@\n a\n+b\n"},
                {"old_path": "old.txt", "new_path": "", "diff": "", "deleted_file": true}
            ],
            "diff_refs": {"base_sha": "b", "start_sha": "s", "head_sha": "h"}
        })))
        .mount(&server)
        .await;

    let mr = client_for(&server).merge_request_changes(7, "3").await.unwrap();
    assert_eq!(mr.changes.len(), 2);
    assert_eq!(mr.changes[0].display_path(), "src/lib.rs");
    assert_eq!(mr.changes[1].display_path(), "old.txt");
    assert_eq!(
        mr.diff_refs,
        DiffRefs {
            base_sha: "b".into(),
            start_sha: "s".into(),
            head_sha: "h".into()
        }
    );
}

#[tokio::test]
async fn posts_text_positioned_discussion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/7/merge_requests/3/discussions"))
        .and(body_json(json!({
            "body": "Handle the error instead of unwrapping.",
            "position": {
                "position_type": "text",
                "new_path": "src/lib.rs",
                "old_path": "src/lib.rs",
                "new_line": 12,
                "base_sha": "b",
                "head_sha": "h",
                "start_sha": "s"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let refs = DiffRefs {
        base_sha: "b".into(),
        start_sha: "s".into(),
        head_sha: "h".into(),
    };
    let comment = InlineComment {
        path: "src/lib.rs".into(),
        new_line: 12,
        body: "Handle the error instead of unwrapping.".into(),
    };
    client_for(&server)
        .create_discussion(7, "3", &refs, &comment)
        .await
        .unwrap();
}
