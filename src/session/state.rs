use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::{ExerciseKind, LimbId};
use crate::pose::{ConflictingMovement, JointAngle};
use crate::reps::{Feedback, LimbRepState};

use super::calibration::CalibrationReport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Inactive,
    Calibrating,
    Countdown,
    Active,
    Stopped,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Inactive
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    UserRequested,
    CalibrationTimeout,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::UserRequested => "UserRequested",
            StopReason::CalibrationTimeout => "CalibrationTimeout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub exercise_id: String,
    pub kind: ExerciseKind,
    pub started_at: DateTime<Utc>,
    pub phase: SessionPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibratingSnapshot {
    pub session_id: String,
    /// 0-100.
    pub progress: u8,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSnapshot {
    pub session_id: String,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSnapshot {
    pub session_id: String,
    /// Frame time since the session went active.
    pub elapsed_ms: u64,
    pub limbs: Vec<LimbRepState>,
    /// Highest-severity signal across all limbs and the exercise verifier.
    pub overall: Option<Feedback>,
    pub mismatch: Option<ConflictingMovement>,
}

/// What the presentation layer renders for the current phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum SessionSnapshot {
    Inactive,
    Calibrating(CalibratingSnapshot),
    Countdown(CountdownSnapshot),
    Active(ActiveSnapshot),
    Stopped(SessionSummary),
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionSnapshot::Inactive
    }
}

impl SessionSnapshot {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionSnapshot::Inactive => SessionPhase::Inactive,
            SessionSnapshot::Calibrating(_) => SessionPhase::Calibrating,
            SessionSnapshot::Countdown(_) => SessionPhase::Countdown,
            SessionSnapshot::Active(_) => SessionPhase::Active,
            SessionSnapshot::Stopped(_) => SessionPhase::Stopped,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionSnapshot::Inactive => None,
            SessionSnapshot::Calibrating(s) => Some(&s.session_id),
            SessionSnapshot::Countdown(s) => Some(&s.session_id),
            SessionSnapshot::Active(s) => Some(&s.session_id),
            SessionSnapshot::Stopped(s) => Some(&s.session_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LimbSample {
    pub limb: LimbId,
    pub angle: Option<JointAngle>,
    pub reps: u32,
}

/// One active frame as kept in the session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
    pub elapsed_ms: u64,
    pub limbs: Vec<LimbSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimbSummary {
    pub limb: LimbId,
    pub total_reps: u32,
    /// Fastest rep above the minimum duration, if any.
    pub min_rep_ms: Option<u64>,
    pub error_count: u32,
}

impl LimbSummary {
    pub fn from_state(state: &LimbRepState) -> Self {
        Self {
            limb: state.limb.clone(),
            total_reps: state.rep_count,
            min_rep_ms: state.best_rep_ms,
            error_count: state.error_count,
        }
    }
}

/// Final report of a session. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub exercise_id: String,
    pub kind: ExerciseKind,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Frame time spent active; 0 if the session never left calibration or countdown.
    pub duration_ms: u64,
    pub stop_reason: StopReason,
    pub limbs: Vec<LimbSummary>,
    /// Number of distinct wrong-exercise episodes.
    pub mismatch_count: u32,
    pub calibration: Option<CalibrationReport>,
}

impl SessionSummary {
    pub fn total_reps(&self) -> u32 {
        self.limbs.iter().map(|limb| limb.total_reps).sum()
    }

    pub fn total_errors(&self) -> u32 {
        self.limbs.iter().map(|limb| limb.error_count).sum()
    }

    pub fn min_rep_ms(&self) -> Option<u64> {
        self.limbs.iter().filter_map(|limb| limb.min_rep_ms).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SessionSummary {
        SessionSummary {
            session_id: "s-1".to_string(),
            exercise_id: "curl".to_string(),
            kind: ExerciseKind::BicepCurl,
            started_at: Utc::now(),
            stopped_at: Utc::now(),
            duration_ms: 12_000,
            stop_reason: StopReason::UserRequested,
            limbs: vec![
                LimbSummary {
                    limb: LimbId::left(),
                    total_reps: 4,
                    min_rep_ms: Some(900),
                    error_count: 1,
                },
                LimbSummary {
                    limb: LimbId::right(),
                    total_reps: 3,
                    min_rep_ms: Some(700),
                    error_count: 0,
                },
            ],
            mismatch_count: 0,
            calibration: None,
        }
    }

    #[test]
    fn summary_totals() {
        let summary = summary();
        assert_eq!(summary.total_reps(), 7);
        assert_eq!(summary.total_errors(), 1);
        assert_eq!(summary.min_rep_ms(), Some(700));
    }

    #[test]
    fn snapshot_is_tagged_by_phase() {
        let snapshot = SessionSnapshot::Countdown(CountdownSnapshot {
            session_id: "s-1".to_string(),
            remaining_ms: 1_500,
        });
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "countdown");
        assert_eq!(json["remainingMs"], 1_500);

        let inactive = serde_json::to_value(SessionSnapshot::Inactive).unwrap();
        assert_eq!(inactive["phase"], "inactive");

        let stopped = serde_json::to_value(SessionSnapshot::Stopped(summary())).unwrap();
        assert_eq!(stopped["phase"], "stopped");
        assert_eq!(stopped["stopReason"], "userRequested");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = SessionSnapshot::Stopped(summary());
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.phase(), SessionPhase::Stopped);
        assert_eq!(back.session_id(), Some("s-1"));
    }
}
