//! Integration tests for workflow submission, job polling, control
//! operations, log streaming, and artifact retrieval.

mod common;

use axum::http::StatusCode;
use common::{
    body_bytes, body_json, get, get_as, poll_until_state, post, submit, NOOP_RUNNER,
};

/// A runner that writes an artifact into its working directory and reports
/// it in the result object.
const ARTIFACT_RUNNER: &str = r#"cat >/dev/null
echo hello artifact > f.txt
printf '{"out":{"path":"%s/f.txt","basename":"f.txt"}}' "$PWD""#;

/// A runner that stays alive long enough for control operations.
const SLOW_RUNNER: &str = "cat >/dev/null; sleep 5; echo '{}'";

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_redirects_to_the_job_resource() {
    let app = common::build_test_app(NOOP_RUNNER);

    let job_uri = submit(app.clone(), r#"{"x":1}"#, None).await;
    assert!(job_uri.starts_with("/jobs/"), "got {job_uri}");

    let response = get(app, &job_uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = body_json(response).await;
    assert_eq!(status["input"], serde_json::json!({"x": 1}));
    assert_eq!(status["run"], "wf.cwl");
    // No Host header in the request, so URLs fall back to the configured base.
    let id = status["id"].as_str().unwrap();
    assert!(id.starts_with("http://localhost:3000/jobs/"), "got {id}");
    assert_eq!(status["log"], format!("{id}/log"));
    // The snapshot carries a parseable submission timestamp.
    let submitted = status["submitted_at"].as_str().unwrap();
    assert!(
        chrono::DateTime::parse_from_rfc3339(submitted).is_ok(),
        "got {submitted}"
    );
}

#[tokio::test]
async fn submit_without_workflow_reference_is_rejected() {
    let app = common::build_test_app(NOOP_RUNNER);
    let response = post(app, "/run", "{}").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn self_urls_follow_the_request_host() {
    let app = common::build_test_app(NOOP_RUNNER);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/run?wf=wf.cwl")
        .header("host", "wes.example.com")
        .body(axum::body::Body::from("{}"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let job_uri = response.headers()["location"].to_str().unwrap().to_string();
    let status = body_json(get(app, &job_uri).await).await;
    let id = status["id"].as_str().unwrap();
    assert!(id.starts_with("http://wes.example.com/jobs/"), "got {id}");
}

#[tokio::test]
async fn unspawnable_runner_fails_the_submission() {
    // A runner binary that cannot exist.
    let config = wes_api::config::ServerConfig {
        runner: wes_core::job::RunnerCommand {
            program: "/nonexistent/workflow-runner".to_string(),
            args: Vec::new(),
        },
        ..common::test_config(NOOP_RUNNER)
    };
    let state = wes_api::state::AppState {
        registry: std::sync::Arc::new(wes_core::registry::JobRegistry::new()),
        config: std::sync::Arc::new(config.clone()),
    };
    let app = wes_api::router::build_app_router(state, &config);

    let response = post(app, "/run?wf=wf.cwl", "{}").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SUBMISSION_FAILED");
}

// ---------------------------------------------------------------------------
// Completion & artifact retrieval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_job_rewrites_locations_and_serves_artifacts() {
    let app = common::build_test_app(ARTIFACT_RUNNER);

    let job_uri = submit(app.clone(), r#"{"x":1}"#, None).await;
    let status = poll_until_state(&app, &job_uri, None, "Complete").await;

    let location = status["output"]["out"]["location"].as_str().unwrap();
    assert_eq!(
        location,
        format!("http://localhost:3000{job_uri}/output/out")
    );

    // The rewritten location resolves back to the artifact.
    let response = get(app.clone(), &format!("{job_uri}/output/out")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("f.txt"));
    let body = body_bytes(response).await;
    assert_eq!(body, b"hello artifact\n");

    // Paths that address nothing are uniformly 404.
    for bad in ["/output/out/extra", "/output/nope", "/output/0"] {
        let response = get(app.clone(), &format!("{job_uri}{bad}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {bad}");
    }
}

#[tokio::test]
async fn output_of_a_running_job_is_not_found() {
    let app = common::build_test_app(SLOW_RUNNER);
    let job_uri = submit(app.clone(), "{}", None).await;

    let response = get(app, &format!("{job_uri}/output/out")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Control operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_action_flips_the_state_in_the_returned_snapshot() {
    let app = common::build_test_app(SLOW_RUNNER);
    let job_uri = submit(app.clone(), "{}", None).await;

    let response = post(app.clone(), &format!("{job_uri}?action=cancel"), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["state"], "Canceled");
    assert!(status["output"].is_null());
}

#[tokio::test]
async fn unknown_action_is_accepted_and_changes_nothing() {
    let app = common::build_test_app(SLOW_RUNNER);
    let job_uri = submit(app.clone(), "{}", None).await;

    let response = post(app.clone(), &format!("{job_uri}?action=defenestrate"), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["state"], "Running");
}

#[tokio::test]
async fn pause_and_resume_round_trip_through_the_api() {
    let app = common::build_test_app(SLOW_RUNNER);
    let job_uri = submit(app.clone(), "{}", None).await;

    let status = body_json(post(app.clone(), &format!("{job_uri}?action=pause"), "").await).await;
    assert_eq!(status["state"], "Paused");

    // Cancel does not apply to a paused job.
    let status = body_json(post(app.clone(), &format!("{job_uri}?action=cancel"), "").await).await;
    assert_eq!(status["state"], "Paused");

    let status = body_json(post(app.clone(), &format!("{job_uri}?action=resume"), "").await).await;
    assert_eq!(status["state"], "Running");
}

// ---------------------------------------------------------------------------
// Log streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn log_endpoint_returns_the_captured_stderr() {
    let app = common::build_test_app("cat >/dev/null; echo workflow progress >&2; echo '{}'");
    let job_uri = submit(app.clone(), "{}", None).await;
    poll_until_state(&app, &job_uri, None, "Complete").await;

    let response = get(app.clone(), &format!("{job_uri}/log")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let body = body_bytes(response).await;
    assert!(String::from_utf8_lossy(&body).contains("workflow progress"));

    // A second request replays the log from the start.
    let replay = body_bytes(get(app, &format!("{job_uri}/log")).await).await;
    assert_eq!(replay, body);
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_and_unknown_jobs_are_equally_not_found() {
    let app = common::build_test_app(NOOP_RUNNER);
    let job_uri = submit(app.clone(), "{}", Some("alice")).await;

    // The owner sees the job.
    let response = get_as(app.clone(), &job_uri, "alice").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Another identity and an anonymous caller both get 404.
    let foreign = get_as(app.clone(), &job_uri, "bob").await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let foreign_body = body_json(foreign).await;

    let anonymous = get(app.clone(), &job_uri).await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    // An id that never existed produces an identical response body.
    let unknown = get_as(
        app.clone(),
        &format!("/jobs/{}", uuid::Uuid::new_v4()),
        "bob",
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(unknown).await, foreign_body);

    // A garbage id is also just a 404.
    let garbage = get_as(app, "/jobs/not-a-uuid", "bob").await;
    assert_eq!(garbage.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_listing_is_scoped_to_the_caller() {
    let app = common::build_test_app(NOOP_RUNNER);

    let first = submit(app.clone(), "{}", Some("alice")).await;
    let second = submit(app.clone(), "{}", Some("alice")).await;
    submit(app.clone(), "{}", Some("bob")).await;

    let json = body_json(get_as(app.clone(), "/jobs", "alice").await).await;
    let jobs = json["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    // Submission order is preserved.
    assert!(jobs[0]["id"].as_str().unwrap().ends_with(&first));
    assert!(jobs[1]["id"].as_str().unwrap().ends_with(&second));

    let json = body_json(get_as(app.clone(), "/jobs", "carol").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    // Listing requires an identity.
    let response = get(app, "/jobs").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
