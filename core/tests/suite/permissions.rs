use pretty_assertions::assert_eq;
use serde_json::json;
use solguard_core::Access;
use solguard_core::ErrorKind;
use solguard_core::RefreshOutcome;
use solguard_core::audit::VIEW_AUDIT_LOGS;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::support::logged_in_client;
use super::support::role_json;

async fn mount_roles(server: &MockServer, roles: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/users/me/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(roles))
        .mount(server)
        .await;
}

async fn mount_permissions(server: &MockServer, role_id: i64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/roles/{role_id}/permissions")))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn admin_resolves_its_permissions() {
    let server = MockServer::start().await;
    mount_roles(&server, json!([role_json(1, "Admin")])).await;
    mount_permissions(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "view_audit_logs", "description": null, "created_at": "2024-01-01T00:00:00Z"},
            {"id": 11, "name": "manage_roles", "description": "assign roles", "created_at": "2024-01-01T00:00:00Z"}
        ])),
    )
    .await;

    let test = logged_in_client(&server);
    let resolver = test.client.permissions();
    assert!(!resolver.has_permission("manage_roles"));

    assert_eq!(resolver.refresh().await.unwrap(), RefreshOutcome::Complete);
    assert!(resolver.has_permission("manage_roles"));
    assert!(!resolver.has_permission("delete_billing"));
    assert!(resolver.has_role("Admin"));
    assert!(test.client.gate().can_render(Some(VIEW_AUDIT_LOGS)));
}

#[tokio::test]
async fn broken_role_degrades_to_partial_set() {
    let server = MockServer::start().await;
    mount_roles(
        &server,
        json!({"data": [role_json(1, "Viewer"), role_json(2, "Billing")]}),
    )
    .await;
    mount_permissions(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!(["view_audit_logs"])),
    )
    .await;
    mount_permissions(&server, 2, ResponseTemplate::new(500)).await;

    let test = logged_in_client(&server);
    let resolver = test.client.permissions();
    let outcome = resolver.refresh().await.unwrap();

    let RefreshOutcome::Partial { failures } = outcome else {
        panic!("expected a partial refresh, got {outcome:?}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].role_name, "Billing");
    assert_eq!(failures[0].error.kind, ErrorKind::ServerError);

    let capabilities: Vec<String> = resolver.capabilities().into_iter().collect();
    assert_eq!(capabilities, vec!["view_audit_logs".to_string()]);

    let gate = test.client.gate();
    assert!(gate.guard(Some(VIEW_AUDIT_LOGS)).is_granted());
    assert_eq!(
        gate.guard(Some("manage_billing")),
        Access::Denied {
            permission: "manage_billing".to_string()
        }
    );
}

#[tokio::test]
async fn expired_session_during_refresh_denies_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let err = test.client.permissions().refresh().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(!test.session.is_authenticated());
    assert_eq!(
        test.client.gate().guard(Some(VIEW_AUDIT_LOGS)),
        Access::RedirectToLogin
    );
}

#[tokio::test]
async fn reloading_my_roles_rederives_the_capability_set() {
    let server = MockServer::start().await;
    mount_roles(&server, json!([role_json(1, "Admin")])).await;
    mount_permissions(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!(["manage_roles"])),
    )
    .await;

    let test = logged_in_client(&server);
    let resolver = test.client.permissions();
    resolver.refresh().await.unwrap();
    assert!(resolver.has_role("Admin"));

    server.reset().await;
    mount_roles(&server, json!([role_json(2, "Viewer")])).await;
    mount_permissions(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!(["view_projects"])),
    )
    .await;

    let mine = test.client.roles().mine().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(!resolver.has_role("Admin"));
    assert!(!resolver.has_permission("manage_roles"));
    assert!(!test.client.gate().can_render(Some("manage_roles")));
    assert!(resolver.has_role("Viewer"));
    assert!(resolver.has_permission("view_projects"));
}

#[tokio::test]
async fn refresh_updates_the_assigned_role_list() {
    let server = MockServer::start().await;
    mount_roles(&server, json!([role_json(1, "Admin")])).await;
    mount_permissions(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!(["manage_roles"])),
    )
    .await;

    let test = logged_in_client(&server);
    test.client.permissions().refresh().await.unwrap();

    let assigned = test.client.roles().assigned().items();
    assert_eq!(assigned, test.client.permissions().roles());
}
