//! HTTP-level tests for the Insightly client against a wiremock server.

use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dirsync_crm::models::{Link, NewProject, ProjectStatus};
use dirsync_crm::{CrmClient, CrmError, InsightlyClient, InsightlyConfig};

fn client(server: &MockServer) -> InsightlyClient {
    let mut config = InsightlyConfig::new("test-api-key").with_base_url(server.uri());
    config.retry_backoff_ms = 1;
    InsightlyClient::new(&config).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_projects_uses_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Projects"))
        .and(basic_auth("test-api-key", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"PROJECT_ID": 1, "PROJECT_NAME": "Alpha", "CATEGORY_ID": 10, "STAGE_ID": 4, "LINKS": []},
            {"PROJECT_ID": 2, "PROJECT_NAME": "Beta", "CATEGORY_ID": 11, "STAGE_ID": 5, "LINKS": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client(&server).projects().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].project_name, "Alpha");
    assert_eq!(projects[1].stage_id, Some(5));
}

#[tokio::test]
async fn test_reference_collections() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ProjectCategories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"CATEGORY_ID": 10, "CATEGORY_NAME": "SDA", "ACTIVE": true}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"PIPELINE_ID": 1, "PIPELINE_NAME": "Project execution"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/PipelineStages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"STAGE_ID": 14, "PIPELINE_ID": 1, "STAGE_NAME": "Provision", "STAGE_ORDER": 4}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"CONTACT_ID": 42, "FIRST_NAME": "Jean", "LAST_NAME": "Dupont", "CONTACTINFOS": []}
        ])))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.categories().await.unwrap()[0].category_name, "SDA");
    assert_eq!(
        client.pipelines().await.unwrap()[0].pipeline_name,
        "Project execution"
    );
    assert_eq!(client.pipeline_stages().await.unwrap()[0].stage_order, 4);
    assert_eq!(
        client.contacts().await.unwrap()[0].first_name.as_deref(),
        Some("Jean")
    );
}

#[tokio::test]
async fn test_read_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Projects/7"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Projects/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"PROJECT_ID": 7, "PROJECT_NAME": "p"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let project = client(&server).project(7).await.unwrap();
    assert_eq!(project.project_id, 7);
}

#[tokio::test]
async fn test_bounded_read_gives_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = InsightlyConfig::new("k")
        .with_base_url(server.uri())
        .with_max_read_attempts(2);
    config.retry_backoff_ms = 1;
    let err = InsightlyClient::new(&config)
        .unwrap()
        .contacts()
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::MaxAttemptsExceeded { attempts: 2, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).pipelines().await.unwrap_err();
    assert!(matches!(err, CrmError::Decode { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_update_project_puts_full_record() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/Projects"))
        .and(body_partial_json(json!({
            "PROJECT_ID": 3,
            "STATUS": "Completed",
            "RESPONSIBLE_USER_ID": 8
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "PROJECT_ID": 3, "PROJECT_NAME": "p", "STATUS": "Completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut project: dirsync_crm::models::Project = serde_json::from_value(json!({
        "PROJECT_ID": 3, "PROJECT_NAME": "p", "STATUS": "In Progress", "RESPONSIBLE_USER_ID": 8
    }))
    .unwrap();
    project.status = Some(ProjectStatus::Completed.to_string());

    let updated = client(&server).update_project(&project).await.unwrap();
    assert!(updated.has_status(ProjectStatus::Completed));
}

#[tokio::test]
async fn test_create_project_posts_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Projects"))
        .and(body_partial_json(json!({
            "PROJECT_NAME": "Acme",
            "STATUS": "Deferred",
            "CATEGORY_ID": 12,
            "LINKS": [{"CONTACT_ID": 42}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "PROJECT_ID": 99, "PROJECT_NAME": "Acme", "STATUS": "Deferred", "CATEGORY_ID": 12
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_project(&NewProject {
            project_name: "Acme".into(),
            status: ProjectStatus::Deferred.to_string(),
            category_id: 12,
            customfields: vec![],
            links: vec![Link::contact(42)],
        })
        .await
        .unwrap();
    assert_eq!(created.project_id, 99);
}

#[tokio::test]
async fn test_write_failure_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/Projects"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad record"))
        .expect(1)
        .mount(&server)
        .await;

    let project: dirsync_crm::models::Project =
        serde_json::from_value(json!({"PROJECT_ID": 3, "PROJECT_NAME": "p"})).unwrap();
    let err = client(&server).update_project(&project).await.unwrap_err();
    match err {
        CrmError::Http { status, body, .. } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad record");
        }
        other => panic!("unexpected {other:?}"),
    }
}
