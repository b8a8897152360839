//! Handlers for workflow submission and the `/jobs` resource.
//!
//! Ownership is enforced on every job route: a caller who does not own a
//! job gets the same 404 as for an id that never existed.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;
use wes_core::job::Job;
use wes_core::spooler::LogSpooler;
use wes_core::{access, CoreError};

use crate::error::{AppError, AppResult};
use crate::extract::{BaseUrl, CurrentUser};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by id and verify the caller may see it.
///
/// An unparseable id, an unknown id, and an ownership mismatch all collapse
/// into the same `NotFound`.
async fn find_and_authorize(
    state: &AppState,
    job_id: &str,
    user: &CurrentUser,
) -> AppResult<Arc<Job>> {
    let id = Uuid::parse_str(job_id).map_err(|_| CoreError::NotFound)?;
    let job = state.registry.lookup(id).await.ok_or(CoreError::NotFound)?;

    if !access::visible_to(&job, user.0.as_deref()) {
        return Err(AppError::Core(CoreError::NotFound));
    }

    Ok(job)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// Workflow reference handed to the engine.
    pub wf: String,
}

/// POST /run?wf=<workflow>
///
/// The request body is the raw input payload for the engine's stdin.
/// Spawns the process immediately and unconditionally (no queueing), then
/// redirects to the new job resource with 303 See Other. A spawn failure
/// is the one submission error surfaced synchronously; nothing is
/// registered in that case.
pub async fn run_workflow(
    user: CurrentUser,
    base: BaseUrl,
    State(state): State<AppState>,
    Query(params): Query<RunQuery>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let job = Job::spawn(
        &state.config.runner,
        &params.wf,
        body.to_vec(),
        user.0.clone(),
        &base.0,
    )?;
    state.registry.register(Arc::clone(&job)).await;

    tracing::info!(
        job_id = %job.id(),
        workflow = %params.wf,
        owner = user.0.as_deref().unwrap_or("<anonymous>"),
        "Workflow submitted",
    );

    Ok(Redirect::to(&format!("/jobs/{}", job.id())))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /jobs
///
/// List the caller's jobs in submission order. Requires an identity;
/// anonymous callers get 401 (an anonymous "owner" is not enumerable).
pub async fn list_jobs(
    user: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let owner = user
        .0
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Listing jobs requires an identity".into()))?;

    let jobs = state.registry.list_by_owner(owner).await;
    let mut statuses = Vec::with_capacity(jobs.len());
    for job in &jobs {
        statuses.push(job.status().await);
    }

    Ok(Json(DataResponse { data: statuses }))
}

// ---------------------------------------------------------------------------
// Status & control
// ---------------------------------------------------------------------------

/// GET /jobs/{id}
///
/// The job's externally visible status snapshot.
pub async fn job_status(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, &job_id, &user).await?;
    Ok(Json(job.status().await))
}

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

/// POST /jobs/{id}?action=cancel|pause|resume
///
/// Apply a control operation, then return the (post-operation) snapshot.
/// Operations that do not apply to the current state are accepted no-ops,
/// and so is an absent or unrecognized action.
pub async fn job_control(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<ActionQuery>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, &job_id, &user).await?;

    match params.action.as_deref() {
        Some("cancel") => job.cancel().await,
        Some("pause") => job.pause().await,
        Some("resume") => job.resume().await,
        Some(other) => {
            tracing::debug!(job_id = %job.id(), action = other, "Ignoring unknown job action");
        }
        None => {}
    }

    Ok(Json(job.status().await))
}

// ---------------------------------------------------------------------------
// Log stream
// ---------------------------------------------------------------------------

/// GET /jobs/{id}/log
///
/// Chunked tail of the job's log. Streams everything written so far and
/// keeps following while the job runs; each request restarts from the
/// beginning of the file.
pub async fn get_log(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, &job_id, &user).await?;
    let spooler = LogSpooler::new(job).await.map_err(CoreError::from)?;

    Ok((
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(spooler.into_stream()),
    ))
}

// ---------------------------------------------------------------------------
// Output retrieval
// ---------------------------------------------------------------------------

/// GET /jobs/{id}/output/{*path}
///
/// Walk the completed job's output tree by slash-delimited path and stream
/// the addressed artifact back. Anything that is not a servable file leaf
/// is a 404: wrong index, missing key, non-file node, or a job that has
/// not completed.
pub async fn get_output(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((job_id, output_path)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, &job_id, &user).await?;

    let (file_path, basename) = job
        .lookup_output(&output_path)
        .await
        .ok_or(CoreError::NotFound)?;

    let file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| CoreError::NotFound)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{basename}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    ))
}
