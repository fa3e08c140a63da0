use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;
use solguard_core::Access;
use solguard_core::ClientConfig;
use solguard_core::ErrorKind;
use solguard_core::ResourceStatus;
use solguard_core::config::CredentialStoreKind;
use solguard_core::models::AuditLogQuery;
use solguard_core::models::NewProject;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::matchers::query_param_is_missing;

use super::support::TOKEN;
use super::support::client_with;
use super::support::client_with_timeout;
use super::support::logged_in_client;
use super::support::logged_out_client;
use super::support::project_json;

#[tokio::test]
async fn attaches_bearer_credential_when_logged_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let projects = test.client.projects().list().await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn omits_credential_when_logged_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/patterns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let test = logged_out_client(&server);
    test.client.ai().patterns("p-1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn unauthorized_tears_down_session_and_fails_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let err = test.client.projects().list().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.status, Some(401));
    assert!(!test.session.is_authenticated());

    let state = test.client.projects().state().snapshot();
    assert_eq!(state.status, ResourceStatus::Failed);
    assert_eq!(state.error.map(|e| e.kind), Some(ErrorKind::Unauthorized));

    let gate = test.client.gate();
    assert!(!gate.can_render(Some("view_audit_logs")));
    assert_eq!(gate.guard(Some("view_audit_logs")), Access::RedirectToLogin);
}

#[tokio::test]
async fn forbidden_leaves_session_alone() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let err = test.client.projects().delete("p-1").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(
        err.message,
        "You do not have permission to perform this action."
    );
    assert!(test.session.is_authenticated());
}

#[tokio::test]
async fn classifies_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "name is required"})),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let projects = test.client.projects();

    let err = projects.get("missing").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = projects.get("broken").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerError);
    assert_eq!(err.status, Some(503));

    let err = projects
        .create(&NewProject {
            name: String::new(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "name is required");
}

#[tokio::test]
async fn undecodable_success_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "not a list"})))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let err = test.client.projects().list().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerError);
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let test = client_with_timeout(&server, Duration::from_millis(50));
    let err = test.client.projects().list().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.status, None);
    assert!(test.session.is_authenticated());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let home = TempDir::new().unwrap();
    let mut config = ClientConfig::with_home(home.path().to_path_buf());
    config.set_api_base_url("http://127.0.0.1:1/api").unwrap();
    config.credential_store = CredentialStoreKind::Memory;
    let test = client_with(config, home);
    test.session.login(TOKEN);

    let err = test.client.projects().list().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.message, "Network error. Please check your connection.");
}

#[tokio::test]
async fn logout_during_flight_wins_over_late_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [project_json("p-1", "vault")]}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let projects = test.client.projects();
    let (result, ()) = tokio::join!(projects.list(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        test.session.logout();
    });

    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(projects.state().items().is_empty());
    assert_eq!(projects.state().status(), ResourceStatus::Failed);
    assert!(!test.session.is_authenticated());
}

#[tokio::test]
async fn stale_unauthorized_does_not_end_a_newer_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let test = logged_out_client(&server);
    test.session.login("old-token");
    let (result, ()) = tokio::join!(test.client.auth().me(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        test.session.login("new-token");
    });

    assert_eq!(result.unwrap_err().kind, ErrorKind::Unauthorized);
    assert_eq!(test.session.current_token(), Some("new-token".to_string()));
}

#[tokio::test]
async fn audit_query_omits_absent_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audit-logs"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "25"))
        .and(query_param("user_id", "7"))
        .and(query_param_is_missing("entity_type"))
        .and(query_param_is_missing("entity_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [{
                "id": 1,
                "user_id": 7,
                "action": "project.create",
                "entity_type": "project",
                "entity_id": 3,
                "details": {"name": "vault"},
                "ip_address": "10.0.0.1",
                "user_agent": null,
                "created_at": "2024-05-01T10:00:00Z"
            }],
            "total": 26
        })))
        .expect(1)
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let page = test
        .client
        .audit()
        .list(&AuditLogQuery {
            page: 2,
            limit: 25,
            user_id: Some(7),
            ..AuditLogQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 26);
    assert_eq!(page.logs[0].action, "project.create");
    assert_eq!(
        test.client.audit().page().snapshot().value.map(|p| p.total),
        Some(26)
    );
}

#[tokio::test]
async fn raw_request_returns_json_or_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let gateway = solguard_core::HttpGateway::new(test.client.config(), test.session.clone())
        .unwrap();

    let body = json!({"ping": 1});
    let value = gateway
        .request(Method::POST, "/echo", Some(&body))
        .await
        .unwrap();
    assert_eq!(value, json!({"ok": true}));

    let value = gateway.request(Method::POST, "/empty", None).await.unwrap();
    assert_eq!(value, serde_json::Value::Null);
}
