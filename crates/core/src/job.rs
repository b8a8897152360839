//! Job state machine and external-process supervision.
//!
//! A [`Job`] owns exactly one invocation of the external workflow engine.
//! Spawning redirects the engine's stderr into a log file and hands the
//! input payload to its stdin; a supervising task then waits for the
//! process and drives the `Running -> Complete | Error` transition.
//! Control operations translate to OS signals and are advisory: a signal
//! aimed at a process that already exited is benign.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CoreError;
use crate::output::{self, OutputNode};

/// Maximum stdout size captured from the runner (10 MiB).
///
/// The result object of a well-behaved engine is small; the cap prevents
/// memory exhaustion from a misbehaving one.
const MAX_STDOUT_BYTES: usize = 10 * 1024 * 1024;

/// How to invoke the external workflow engine.
///
/// The engine contract is: `<program> <args..> <workflow> -`, input payload
/// on stdin, result object on stdout on exit 0, diagnostics on stderr.
#[derive(Debug, Clone)]
pub struct RunnerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RunnerCommand {
    fn default() -> Self {
        Self {
            program: "cwl-runner".to_string(),
            args: vec!["--leave-outputs".to_string()],
        }
    }
}

/// Lifecycle states of a job.
///
/// `Paused -> Running` is the only reversal; `Canceled` is terminal and is
/// never overwritten by a later completion or error observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Running,
    Paused,
    Complete,
    Error,
    Canceled,
}

/// Immutable status snapshot, the job's externally visible representation.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    /// Self-referential URL of the job resource.
    pub id: String,
    /// URL of the job's log stream.
    pub log: String,
    /// The workflow reference being executed.
    pub run: String,
    pub state: JobState,
    /// Input payload parsed as JSON for display; `None` if unparseable.
    pub input: Option<Value>,
    /// Result tree with rewritten locations; `Some` iff `state` is `Complete`.
    pub output: Option<Value>,
    pub submitted_at: DateTime<Utc>,
}

/// State guarded by the per-job lock. Every transition and every status
/// read goes through this; the output is set in the same critical section
/// that flips the state to `Complete`.
#[derive(Debug)]
struct StatusInner {
    state: JobState,
    output: Option<OutputNode>,
}

/// One accepted workflow execution, backed by exactly one external process.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    workflow: String,
    input: Vec<u8>,
    input_json: Option<Value>,
    owner: Option<String>,
    /// `<base>/jobs/<id>`, captured from the submitting request.
    url: String,
    /// `<base>/jobs/<id>/output`, the rewrite target for file locations.
    output_base: String,
    log_path: PathBuf,
    /// OS pid of the engine process, recorded at spawn for signal delivery.
    pid: u32,
    submitted_at: DateTime<Utc>,
    inner: Mutex<StatusInner>,
}

impl Job {
    /// Create the job workspace, fork the engine process, and start the
    /// supervising task.
    ///
    /// The scratch layout is `<tmp>/<job-id>/out` as the process working
    /// directory with the log file beside it. A spawn failure is fatal to
    /// the submission: no `Job` exists afterwards and nothing is registered.
    pub fn spawn(
        runner: &RunnerCommand,
        workflow: &str,
        input: Vec<u8>,
        owner: Option<String>,
        base_url: &str,
    ) -> Result<Arc<Job>, CoreError> {
        let id = Uuid::new_v4();

        let scratch = std::env::temp_dir().join(id.to_string());
        let work_dir = scratch.join("out");
        std::fs::create_dir_all(&work_dir).map_err(|source| CoreError::Workspace {
            path: work_dir.clone(),
            source,
        })?;

        let log_path = scratch.join("job.log");
        let log_file = std::fs::File::create(&log_path).map_err(|source| CoreError::Workspace {
            path: log_path.clone(),
            source,
        })?;

        let child = Command::new(&runner.program)
            .args(&runner.args)
            .arg(workflow)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log_file))
            .current_dir(&work_dir)
            .spawn()
            .map_err(|source| CoreError::Spawn {
                program: runner.program.clone(),
                source,
            })?;

        let pid = child.id().unwrap_or(0);
        let base = base_url.trim_end_matches('/');
        let url = format!("{base}/jobs/{id}");
        let output_base = format!("{url}/output");

        let input_json = serde_json::from_slice(&input).ok();

        let job = Arc::new(Job {
            id,
            workflow: workflow.to_string(),
            input,
            input_json,
            owner,
            url,
            output_base,
            log_path,
            pid,
            submitted_at: Utc::now(),
            inner: Mutex::new(StatusInner {
                state: JobState::Running,
                output: None,
            }),
        });

        tracing::info!(job_id = %id, workflow, pid, "Workflow process spawned");
        tokio::spawn(Arc::clone(&job).supervise(child));

        Ok(job)
    }

    /// Supervising task: feed stdin, capture stdout, wait for exit, and
    /// drive the terminal transition.
    async fn supervise(self: Arc<Self>, mut child: Child) {
        if let Some(mut stdin) = child.stdin.take() {
            // Best-effort write; an engine that closes stdin early is its
            // own business.
            let _ = stdin.write_all(&self.input).await;
            drop(stdin);
        }

        // Read stdout in a separate task so `child.wait()` can run
        // concurrently without the pipe filling up.
        let stdout_handle = child.stdout.take();
        let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });

        let exit = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "Failed to wait on workflow process");
                self.finish(JobState::Error, None).await;
                return;
            }
        };

        let stdout_bytes = stdout_task.await.unwrap_or_default();

        if exit.success() {
            let stdout = String::from_utf8_lossy(&stdout_bytes);
            match serde_json::from_str::<Value>(stdout.trim()) {
                Ok(value) => {
                    self.finish(JobState::Complete, Some(OutputNode::from_value(value)))
                        .await;
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %self.id,
                        error = %e,
                        "Workflow process exited 0 but produced an unparseable result object",
                    );
                    self.finish(JobState::Error, None).await;
                }
            }
        } else {
            tracing::info!(job_id = %self.id, code = ?exit.code(), "Workflow process failed");
            self.finish(JobState::Error, None).await;
        }
    }

    /// Apply the terminal transition observed from process exit.
    ///
    /// `Canceled` is terminal: if a cancel won the race against process
    /// exit, the completion or error result is discarded. On completion the
    /// location rewrite runs in the same critical section that flips the
    /// state, so no reader ever observes `Complete` with partial output.
    async fn finish(&self, state: JobState, output: Option<OutputNode>) {
        let mut inner = self.inner.lock().await;
        if inner.state == JobState::Canceled {
            tracing::debug!(job_id = %self.id, "Process exit observed after cancel; keeping Canceled");
            return;
        }
        match (state, output) {
            (JobState::Complete, Some(mut node)) => {
                output::rewrite_locations(&mut node, &self.output_base);
                inner.state = JobState::Complete;
                inner.output = Some(node);
            }
            _ => {
                inner.state = JobState::Error;
            }
        }
        tracing::info!(job_id = %self.id, state = ?inner.state, "Job finished");
    }

    /// Snapshot of the externally visible status. Internally consistent:
    /// taken under the job lock in one read.
    pub async fn status(&self) -> JobStatus {
        let inner = self.inner.lock().await;
        JobStatus {
            id: self.url.clone(),
            log: format!("{}/log", self.url),
            run: self.workflow.clone(),
            state: inner.state,
            input: self.input_json.clone(),
            output: inner.output.as_ref().map(OutputNode::to_value),
            submitted_at: self.submitted_at,
        }
    }

    /// Current state only; used by the log spooler's poll loop.
    pub async fn state(&self) -> JobState {
        self.inner.lock().await.state
    }

    /// Request cancellation of a running job. No-op in any other state.
    pub async fn cancel(&self) {
        self.signal_transition(JobState::Running, libc::SIGQUIT, JobState::Canceled)
            .await;
    }

    /// Suspend a running job at the OS level. No-op in any other state.
    pub async fn pause(&self) {
        self.signal_transition(JobState::Running, libc::SIGTSTP, JobState::Paused)
            .await;
    }

    /// Resume a paused job. No-op in any other state.
    pub async fn resume(&self) {
        self.signal_transition(JobState::Paused, libc::SIGCONT, JobState::Running)
            .await;
    }

    /// Check-then-act control: read the state, deliver the signal outside
    /// the lock, then update the state under the lock only if it is still
    /// the one the pre-check saw.
    ///
    /// The window between check and signal is tolerated: the signal may hit
    /// a process that already exited (ignored, `ESRCH`), and if the
    /// supervisor transitioned first the re-check drops our update.
    async fn signal_transition(&self, expected: JobState, signal: i32, next: JobState) {
        if self.inner.lock().await.state != expected {
            return;
        }

        self.send_signal(signal);

        let mut inner = self.inner.lock().await;
        if inner.state == expected {
            inner.state = next;
            tracing::info!(job_id = %self.id, state = ?next, "Job control signal applied");
        }
    }

    fn send_signal(&self, signal: i32) {
        if self.pid == 0 {
            return;
        }
        // Advisory delivery; a dead pid returns ESRCH which we ignore.
        let rc = unsafe { libc::kill(self.pid as i32, signal) };
        if rc != 0 {
            tracing::debug!(job_id = %self.id, signal, "Signal not delivered (process gone)");
        }
    }

    /// Resolve a slash-delimited output path to a servable file.
    ///
    /// `None` until the job completes, and for any path that does not name
    /// a file leaf carrying both `path` and `basename`.
    pub async fn lookup_output(&self, path: &str) -> Option<(PathBuf, String)> {
        let inner = self.inner.lock().await;
        output::lookup_file(inner.output.as_ref()?, path)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_STDOUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_STDOUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
