//! Shared response envelope types for API handlers.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope for list endpoints.
///
/// Individual job snapshots are served bare: the `{id, log, run, state,
/// input, output}` object *is* the job's external representation and
/// clients poll it as such.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
