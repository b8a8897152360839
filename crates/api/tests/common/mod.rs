#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use wes_api::config::ServerConfig;
use wes_api::extract::USER_HEADER;
use wes_api::router::build_app_router;
use wes_api::state::AppState;
use wes_core::job::RunnerCommand;
use wes_core::registry::JobRegistry;

/// Build a test `ServerConfig` whose "workflow engine" is `sh -c <script>`.
///
/// The engine contract only requires: read stdin, write a result object to
/// stdout on exit 0, write diagnostics to stderr. A shell script satisfies
/// it exactly, so tests pick the behavior per scenario.
pub fn test_config(runner_script: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        public_base_url: "http://localhost:3000".to_string(),
        runner: RunnerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), runner_script.to_string()],
        },
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, tracing, panic
/// recovery) that production uses.
pub fn build_test_app(runner_script: &str) -> Router {
    let config = test_config(runner_script);
    let state = AppState {
        registry: Arc::new(JobRegistry::new()),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// A runner that consumes stdin and completes immediately with `{}`.
pub const NOOP_RUNNER: &str = "cat >/dev/null; echo '{}'";

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_as(app: Router, uri: &str, user: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(USER_HEADER, user)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_as(app: Router, uri: &str, body: &str, user: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(USER_HEADER, user)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body is valid JSON")
}

/// Submit a workflow and return the new job's resource path (`/jobs/<id>`).
pub async fn submit(app: Router, input: &str, user: Option<&str>) -> String {
    let response = match user {
        Some(user) => post_as(app, "/run?wf=wf.cwl", input, user).await,
        None => post(app, "/run?wf=wf.cwl", input).await,
    };
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get("location")
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Poll a job resource until it reaches `state`, returning the final
/// status JSON. Panics after ten seconds.
pub async fn poll_until_state(
    app: &Router,
    job_uri: &str,
    user: Option<&str>,
    state: &str,
) -> serde_json::Value {
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            let response = match user {
                Some(user) => get_as(app.clone(), job_uri, user).await,
                None => get(app.clone(), job_uri).await,
            };
            assert_eq!(response.status(), StatusCode::OK);
            let status = body_json(response).await;
            if status["state"] == state {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("job at {job_uri} did not reach state {state}"))
}
