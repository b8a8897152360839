//! Job visibility decisions.
//!
//! Consumed by the HTTP layer after a registry lookup. A caller who fails
//! the check must receive the same "not found" as for a nonexistent id, so
//! job existence never leaks to unauthorized callers.

use crate::job::Job;

/// Whether a job is visible to the claimed identity.
///
/// Strict owner equality: anonymous submissions (`None`) are visible only
/// to anonymous callers. The identity is an opaque comparison key; what it
/// means is the authentication layer's business.
pub fn visible_to(job: &Job, claimed: Option<&str>) -> bool {
    job.owner() == claimed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
