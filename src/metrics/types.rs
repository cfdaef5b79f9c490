use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionPhase;

/// Timing of one processed frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameTiming {
    pub recorded_at: DateTime<Utc>,
    pub frame_timestamp_ms: u64,
    pub phase: SessionPhase,
    pub processing_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub recent_frames: Vec<FrameTiming>,
    pub processed_count: u64,
    /// Frames discarded because the frame channel was full.
    pub dropped_count: u64,
    /// Frames the session refused (no session, stopped, timed out).
    pub rejected_count: u64,
    pub average_processing_us: Option<u64>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            recent_frames: Vec::new(),
            processed_count: 0,
            dropped_count: 0,
            rejected_count: 0,
            average_processing_us: None,
        }
    }
}
