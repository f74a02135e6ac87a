//! A single successful liveness probe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only row written by every probe that passes validation.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct LivenessEvent {
    pub check_id: i64,
    pub datetime: DateTime<Utc>,
}
