//! Redmine incident filing against a wiremock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dirsync_notify::{Incident, IncidentSink, NotifyError, RedmineConfig, RedmineIncidentSink, Severity};

fn sink(server: &MockServer) -> RedmineIncidentSink {
    let mut config = RedmineConfig::new("redmine-key");
    config.base_url = server.uri();
    config.project = "ops".into();
    RedmineIncidentSink::new(config).unwrap()
}

#[tokio::test]
async fn test_file_posts_issue() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues.json"))
        .and(header("X-Redmine-API-Key", "redmine-key"))
        .and(body_partial_json(json!({
            "issue": {
                "project_id": "ops",
                "subject": "InsufficientAccess",
                "priority_id": 5
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"issue": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    sink(&server)
        .file(&Incident::new(
            "InsufficientAccess",
            "add cn=x failed",
            Severity::Critical,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_file_reports_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Subject cannot be blank"))
        .expect(1)
        .mount(&server)
        .await;

    let err = sink(&server)
        .file(&Incident::new("", "", Severity::Normal))
        .await
        .unwrap_err();
    match err {
        NotifyError::Http { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("blank"));
        }
        other => panic!("unexpected {other:?}"),
    }
}
