//! End-to-end flows through the router

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn happy_path_ingest_and_run_report() {
    let app = TestApp::new().await;
    let owner = app.user_with_project("Ursula", false).await;
    let agent = app.token(&owner, 2, None).await;

    let experiment_id = app.experiment(&agent, owner.project_id).await;
    let run_id = app.run(&agent, experiment_id).await;
    let emission_id = app.emission(&agent, run_id).await;

    let (status, emission) = app.get(&format!("/emissions/{}", emission_id), &owner.user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emission["timestamp"], "2024-05-01T08:00:00Z");

    let (status, report) = app
        .get(&format!("/runs/{}/emissions/sums", run_id), &owner.user)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert!(approx(&report["emissions_sum"], 0.5));
    assert!(approx(&report["energy_consumed"], 1.2));
    assert_eq!(report["emissions_count"], 1);
    assert_eq!(report["run_id"], json!(run_id));
}

#[tokio::test]
async fn deleting_a_project_removes_every_descendant() {
    let app = TestApp::new().await;
    let owner = app.user_with_project("Ursula", false).await;
    let agent = app.token(&owner, 3, None).await;
    app.token(&owner, 1, None).await;

    let mut experiments = Vec::new();
    let mut runs = Vec::new();
    let mut emissions = Vec::new();
    for _ in 0..2 {
        let experiment_id = app.experiment(&agent, owner.project_id).await;
        let run_id = app.run(&agent, experiment_id).await;
        for _ in 0..3 {
            emissions.push(app.emission(&agent, run_id).await);
        }
        experiments.push(experiment_id);
        runs.push(run_id);
    }

    let (status, _) = app.delete(&format!("/projects/{}", owner.project_id), &owner.user).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/projects/{}", owner.project_id), &owner.user).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    for id in &experiments {
        let (status, _) = app.get(&format!("/experiments/{}", id), &owner.user).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    for id in &runs {
        let (status, _) = app.get(&format!("/runs/{}", id), &owner.user).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    for id in &emissions {
        let (status, _) = app.get(&format!("/emissions/{}", id), &owner.user).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    assert!(app.repo.list_project_tokens(owner.project_id).await.unwrap().is_empty());

    let (status, organization) = app
        .get(&format!("/organizations/{}", owner.organization_id), &owner.user)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organization["id"], json!(owner.organization_id));
}

#[tokio::test]
async fn read_only_token_cannot_ingest() {
    let app = TestApp::new().await;
    let owner = app.user_with_project("Ursula", false).await;
    let writer = app.token(&owner, 2, None).await;
    let reader = app.token(&owner, 1, None).await;

    let experiment_id = app.experiment(&writer, owner.project_id).await;
    let run_id = app.run(&writer, experiment_id).await;

    let (status, body) = app.post("/emissions", &reader, emission_body(run_id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Reading is within its access level
    let (status, _) = app.get(&format!("/runs/{}", run_id), &reader).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let app = TestApp::new().await;
    let owner = app.user_with_project("Ursula", false).await;
    let writer = app.token(&owner, 2, None).await;
    let yesterday = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
    let expired = app.token(&owner, 3, Some(&yesterday)).await;

    let experiment_id = app.experiment(&writer, owner.project_id).await;
    let run_id = app.run(&writer, experiment_id).await;

    let (status, body) = app.post("/emissions", &expired, emission_body(run_id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn public_project_reports_are_open_to_anonymous_callers() {
    let app = TestApp::new().await;
    let owner = app.user_with_project("Ursula", true).await;
    let agent = app.token(&owner, 2, None).await;

    let experiment_id = app.experiment(&agent, owner.project_id).await;
    let run_id = app.run(&agent, experiment_id).await;
    app.emission(&agent, run_id).await;
    app.emission(&agent, run_id).await;

    let uri = format!(
        "/projects/{}/sums?start=2024-01-01T00:00:00Z&end=2024-12-31T00:00:00Z",
        owner.project_id
    );
    let (status, report) = app.get(&uri, &Auth::Anonymous).await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["emissions_count"], 2);
    assert!(approx(&report["emissions_sum"], 1.0));

    // Writes still need credentials
    let (status, _) = app.post("/emissions", &Auth::Anonymous, emission_body(run_id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let private = app.user_with_project("Petra", false).await;
    let (status, _) = app
        .get(&format!("/projects/{}/sums", private.project_id), &Auth::Anonymous)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_login_provisions_user_and_default_workspace() {
    let app = TestApp::new().await;
    let subject = Uuid::new_v4();
    let user = user_jwt(subject, "Sam");

    let (status, me) = app.get("/users/me", &user).await;
    assert_eq!(status, StatusCode::OK, "{}", me);
    assert_eq!(me["id"], json!(subject));

    let (status, fetched) = app.get(&format!("/users/{}", subject), &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["email"], "sam@example.org");

    let (status, organizations) = app.get("/organizations", &user).await;
    assert_eq!(status, StatusCode::OK);
    let organizations = organizations.as_array().unwrap();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0]["name"], "Sam");
    assert_eq!(organizations[0]["description"], "Default organization");

    let organization_id = id_of(&organizations[0]);
    let (_, projects) = app
        .get(&format!("/organizations/{}/projects", organization_id), &user)
        .await;
    assert_eq!(projects.as_array().unwrap().len(), 1);

    let (_, members) = app
        .get(&format!("/organizations/{}/members", organization_id), &user)
        .await;
    assert_eq!(members[0]["user_id"], json!(subject));
    assert_eq!(members[0]["is_admin"], true);

    // A second login reuses the same rows
    app.get("/users/me", &user).await;
    let (_, organizations) = app.get("/organizations", &user).await;
    assert_eq!(organizations.as_array().unwrap().len(), 1);
}
