use serde::{Deserialize, Serialize};

use crate::exercise::LimbId;
use crate::pose::{ConflictingMovement, JointAngle};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LimbStage {
    /// Extended / rest position.
    Down,
    TransitionUp,
    /// Contracted / peak position.
    Up,
    TransitionDown,
    /// Landmarks unreliable while the session is active.
    Lost,
}

impl Default for LimbStage {
    fn default() -> Self {
        LimbStage::Down
    }
}

impl LimbStage {
    /// True while a rep cycle is in progress.
    pub fn is_mid_cycle(&self) -> bool {
        matches!(
            self,
            LimbStage::TransitionUp | LimbStage::Up | LimbStage::TransitionDown
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackKind {
    MaintainForm,
    Compliment,
    OverExtended,
    OverCurled,
    PoseLost,
    WrongExercise,
}

impl FeedbackKind {
    pub fn severity(&self) -> Severity {
        match self {
            FeedbackKind::MaintainForm | FeedbackKind::Compliment => Severity::Info,
            FeedbackKind::PoseLost | FeedbackKind::WrongExercise => Severity::Warning,
            FeedbackKind::OverExtended | FeedbackKind::OverCurled => Severity::Critical,
        }
    }

    pub fn is_form_error(&self) -> bool {
        matches!(self, FeedbackKind::OverExtended | FeedbackKind::OverCurled)
    }
}

/// Coaching signal shown for a limb or for the whole frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
    pub severity: Severity,
}

impl Feedback {
    fn of(kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: kind.severity(),
        }
    }

    pub fn maintain_form() -> Self {
        Self::of(FeedbackKind::MaintainForm, "Maintain Form")
    }

    pub fn compliment(message: &str) -> Self {
        Self::of(FeedbackKind::Compliment, message)
    }

    pub fn over_extended() -> Self {
        Self::of(FeedbackKind::OverExtended, "OVER-EXTENDED")
    }

    pub fn over_curled() -> Self {
        Self::of(FeedbackKind::OverCurled, "OVER-CURLED")
    }

    pub fn pose_lost() -> Self {
        Self::of(FeedbackKind::PoseLost, "POSE LOST")
    }

    pub fn wrong_exercise(movement: ConflictingMovement) -> Self {
        Self::of(FeedbackKind::WrongExercise, movement.message())
    }
}

/// Per-limb metrics, mutated once per frame by the rep counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LimbRepState {
    pub limb: LimbId,
    pub stage: LimbStage,
    pub rep_count: u32,
    /// Frame time at which the current cycle left `Down`.
    pub rep_started_ms: Option<u64>,
    /// Time spent in the cycle so far, while one is in progress.
    pub current_rep_ms: Option<u64>,
    pub last_rep_ms: Option<u64>,
    pub best_rep_ms: Option<u64>,
    pub error_count: u32,
    pub current_angle: Option<JointAngle>,
    pub feedback: Option<Feedback>,
}

impl LimbRepState {
    pub fn new(limb: LimbId) -> Self {
        Self {
            limb,
            stage: LimbStage::Down,
            rep_count: 0,
            rep_started_ms: None,
            current_rep_ms: None,
            last_rep_ms: None,
            best_rep_ms: None,
            error_count: 0,
            current_angle: None,
            feedback: None,
        }
    }
}
