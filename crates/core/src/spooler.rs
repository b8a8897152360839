//! Tailing reader over a job's growing log file.
//!
//! Equivalent to `tail -f` until the owning job stops running: a spooler
//! reads fixed-size chunks from offset 0 and, on reaching end-of-file,
//! either sleeps and retries (job still `Running`) or finishes (any other
//! state). The only jointly observed facts are file length and job state;
//! no IPC with the process itself.
//!
//! Every new spooler restarts from the beginning of the file. That is the
//! contract clients poll against, not an accident.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::job::{Job, JobState};

/// Bytes read per chunk.
const CHUNK_SIZE: usize = 4096;

/// Wait between polls once the reader has caught up with the writer.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct LogSpooler {
    job: Arc<Job>,
    file: File,
}

impl LogSpooler {
    /// Open the job's log file at offset 0.
    pub async fn new(job: Arc<Job>) -> io::Result<LogSpooler> {
        let file = File::open(job.log_path()).await?;
        Ok(LogSpooler { job, file })
    }

    /// Next chunk of log data, or `None` once the log is finished.
    ///
    /// Blocks (asynchronously) while the job is still running and no new
    /// bytes have appeared. The job state is read through its normal
    /// accessor on each poll; no lock is held across the sleep.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = self.file.read(&mut buf).await?;
            if n > 0 {
                return Ok(Some(Bytes::copy_from_slice(&buf[..n])));
            }
            if self.job.state().await != JobState::Running {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Adapt the spooler into a byte-chunk stream for a chunked HTTP body.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> {
        futures::stream::try_unfold(self, |mut spooler| async move {
            Ok(spooler.next_chunk().await?.map(|chunk| (chunk, spooler)))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
