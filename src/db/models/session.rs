//! Rows of the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::ExerciseKind;
use crate::session::StopReason;

/// One persisted session, without per-limb detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: String,
    pub exercise_id: String,
    pub kind: ExerciseKind,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
    pub total_reps: u32,
    pub total_errors: u32,
    pub mismatch_count: u32,
    /// Reps per limb in configured order.
    pub limb_reps: Vec<(String, u32)>,
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn reps_for(&self, limb: &str) -> u32 {
        self.limb_reps
            .iter()
            .find(|(id, _)| id == limb)
            .map_or(0, |(_, reps)| *reps)
    }
}
