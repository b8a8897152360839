//! Concurrency-safe mapping from job id to [`Job`], plus an owner index.
//!
//! The registry is the only process-wide mutable state. Both maps live
//! behind one lock so a registration is either fully visible to a
//! concurrent `list_by_owner` or not visible at all. Constructed once at
//! startup and injected into request handlers; there is no ambient
//! singleton.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::job::Job;

#[derive(Default)]
struct Maps {
    by_id: HashMap<Uuid, Arc<Job>>,
    /// Owner identity -> job ids in submission order. Append-only.
    owner_index: HashMap<String, Vec<Uuid>>,
}

/// Registry of all jobs accepted during this process's lifetime.
///
/// Ids are never reused and entries are never removed; teardown is process
/// exit.
#[derive(Default)]
pub struct JobRegistry {
    maps: Mutex<Maps>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job, indexing it under its owner when one is present.
    pub async fn register(&self, job: Arc<Job>) {
        let mut maps = self.maps.lock().await;
        if let Some(owner) = job.owner() {
            maps.owner_index
                .entry(owner.to_string())
                .or_default()
                .push(job.id());
        }
        maps.by_id.insert(job.id(), job);
    }

    pub async fn lookup(&self, id: Uuid) -> Option<Arc<Job>> {
        self.maps.lock().await.by_id.get(&id).cloned()
    }

    /// Jobs submitted by `owner`, in submission order. Empty for unknown
    /// owners, never an error.
    pub async fn list_by_owner(&self, owner: &str) -> Vec<Arc<Job>> {
        let maps = self.maps.lock().await;
        maps.owner_index
            .get(owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| maps.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
