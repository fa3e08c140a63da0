use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use solguard_core::ResourceStatus;
use solguard_core::models::AuditLogQuery;
use solguard_core::models::NewProject;
use solguard_core::models::ProjectUpdate;
use solguard_core::models::Severity;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

use super::support::analysis_json;
use super::support::logged_in_client;
use super::support::project_json;
use super::support::role_json;

#[tokio::test]
async fn created_project_appears_once_in_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects"))
        .and(body_json(json!({"name": "vault", "description": "escrow"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"data": project_json("p-9", "vault")})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [project_json("p-9", "vault")]})),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let projects = test.client.projects();
    let created = projects
        .create(&NewProject {
            name: "vault".to_string(),
            description: "escrow".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(projects.state().items(), vec![created.clone()]);

    let listed = projects.list().await.unwrap();
    assert_eq!(listed, vec![created]);
    assert_eq!(projects.state().items().len(), 1);
}

#[tokio::test]
async fn update_and_delete_keep_selection_consistent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [project_json("p-1", "vault"), project_json("p-2", "swap")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": project_json("p-2", "swap")})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/projects/p-2"))
        .and(body_json(json!({"name": "swap-v2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": project_json("p-2", "swap-v2")})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let projects = test.client.projects();
    projects.list().await.unwrap();
    projects.get("p-2").await.unwrap();

    projects
        .update(
            "p-2",
            &ProjectUpdate {
                name: Some("swap-v2".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    let state = projects.state().snapshot();
    assert_eq!(state.items[1].name, "swap-v2");
    assert_eq!(state.selected.map(|p| p.name), Some("swap-v2".to_string()));

    projects.delete("p-2").await.unwrap();
    let state = projects.state().snapshot();
    let ids: Vec<String> = state.items.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["p-1".to_string()]);
    assert_eq!(state.selected, None);
}

#[tokio::test]
async fn slot_keeps_the_last_completed_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audit-logs"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"logs": [], "total": 1}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audit-logs"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"logs": [], "total": 2}))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let audit = test.client.audit();
    let first = AuditLogQuery::default();
    let second = AuditLogQuery {
        page: 2,
        ..AuditLogQuery::default()
    };
    let (a, b) = tokio::join!(audit.list(&first), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        audit.list(&second).await
    });

    assert_eq!(a.unwrap().total, 1);
    assert_eq!(b.unwrap().total, 2);
    let entry = audit.page().snapshot();
    assert_eq!(entry.status, ResourceStatus::Succeeded);
    assert_eq!(entry.value.map(|p| p.total), Some(1));
}

#[tokio::test]
async fn history_fetches_apply_in_completion_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analysis/project/p-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [analysis_json("a-1", "p-1")]}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/project/p-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [analysis_json("a-2", "p-2")]}))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let analysis = test.client.analysis();
    let _ = tokio::join!(analysis.history("p-1"), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        analysis.history("p-2").await
    });

    let ids: Vec<String> = analysis
        .state()
        .items()
        .iter()
        .map(|a| a.id.clone())
        .collect();
    assert_eq!(ids, vec!["a-1".to_string()]);
}

#[tokio::test]
async fn run_prepends_to_history_and_selects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analysis/project/p-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [analysis_json("a-1", "p-1")]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analysis/analyze"))
        .and(body_json(json!({
            "project_id": "p-1",
            "file_path": "programs/vault/src/lib.rs"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": analysis_json("a-2", "p-1")})),
        )
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let analysis = test.client.analysis();
    analysis.history("p-1").await.unwrap();
    let run = analysis
        .run("p-1", "programs/vault/src/lib.rs")
        .await
        .unwrap();
    assert_eq!(run.report.count_by_severity(Severity::High), 1);

    let state = analysis.state().snapshot();
    let ids: Vec<&str> = state.items.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a-2", "a-1"]);
    assert_eq!(state.selected.map(|a| a.id), Some("a-2".to_string()));
}

#[tokio::test]
async fn ai_operations_use_bare_camel_case_bodies() {
    let server = MockServer::start().await;
    let analysis = json!({
        "suggestions": [{
            "explanation": "verify the signer",
            "confidence": 0.8,
            "impact": "high",
            "originalCode": "fn withdraw() {}",
            "suggestedCode": "fn withdraw(authority: Signer) {}"
        }],
        "riskAssessment": {"overallRisk": 0.6, "riskFactors": {}, "mitigationSuggestions": []},
        "bestPractices": [],
        "securityPatterns": []
    });
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .and(body_json(json!({"code": "fn withdraw() {}", "project_id": "p-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/suggest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ai/model-configs"))
        .and(query_param("project_id", "p-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"gpt": {"temperature": 0.2}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let ai = test.client.ai();
    let first = ai.analyze("fn withdraw() {}", "p-1").await.unwrap();
    ai.suggest("fn withdraw() {}", "p-1").await.unwrap();
    assert_eq!(first.risk_assessment.overall_risk, 0.6);
    assert_eq!(ai.state().history().len(), 2);
    assert_eq!(
        ai.state().current.snapshot().value.map(|a| a.suggestions.len()),
        Some(1)
    );

    let configs = ai.model_configs("p-1").await.unwrap();
    assert_eq!(configs["gpt"]["temperature"], json!(0.2));

    let _ = ai.generate("escrow program", "p-1").await;
    assert_eq!(ai.state().generated.status(), ResourceStatus::Failed);
    assert_eq!(ai.state().history().len(), 2);
}

#[tokio::test]
async fn role_assignments_reload_the_signed_in_roles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([role_json(1, "Viewer")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roles/1/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["view_projects"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/5/roles"))
        .and(body_json(json!({"role_id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(role_json(2, "Admin")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/5/roles/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [role_json(1, "Viewer"), role_json(2, "Admin")],
            "total": 2
        })))
        .mount(&server)
        .await;

    let test = logged_in_client(&server);
    let roles = test.client.roles();
    roles.mine().await.unwrap();

    // Assigning to another user must not grant anything to the signed-in one.
    let assigned = roles.assign(5, 2).await.unwrap();
    assert_eq!(assigned.name, "Admin");
    let names: Vec<String> = roles
        .assigned()
        .items()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Viewer".to_string()]);
    assert!(!test.client.permissions().has_role("Admin"));
    assert!(test.client.permissions().has_permission("view_projects"));

    roles.remove(5, 2).await.unwrap();
    assert_eq!(roles.assigned().items().len(), 1);

    assert_eq!(roles.list_all().await.unwrap().len(), 2);
}
