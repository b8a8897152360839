//! Domain error type shared across the supervisor.
//!
//! Only failures that must reach the submitter synchronously live here.
//! A process that starts and then exits non-zero is *not* an error value:
//! it is captured as the job's `Error` state and observed through status
//! polls.

use std::path::PathBuf;

/// Errors surfaced by the core supervisor.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The workflow-engine process could not be started at all (binary
    /// missing, scratch directory or log file uncreatable). Fatal to the
    /// submission attempt; no job is registered.
    #[error("failed to spawn workflow runner '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The scratch working directory or log file could not be created.
    #[error("failed to prepare job workspace at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A requested job (or output path within a job) does not exist, or the
    /// caller is not allowed to see it. The two cases are deliberately
    /// indistinguishable.
    #[error("not found")]
    NotFound,

    /// An I/O error outside process spawning (log file access).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
