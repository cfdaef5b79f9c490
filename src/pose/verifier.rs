//! Detects movements that conflict with the exercise being tracked.
//!
//! A bicep curl should not reach overhead, a squat should not lift one leg,
//! and so on. The checks are coarse geometric features of the whole body.

use serde::{Deserialize, Serialize};

use crate::exercise::ExerciseKind;

use super::angles::{measure_joint, JointTriple};
use super::landmarks::{
    LandmarkFrame, LandmarkIndex, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_WRIST, NOSE, RIGHT_ANKLE,
    RIGHT_HIP, RIGHT_KNEE, RIGHT_WRIST,
};

/// Knee angle below which both legs count as squatting.
const SQUAT_KNEE_ANGLE: f32 = 130.0;
/// Vertical ankle separation (fraction of frame height) that counts as a leg lift.
const KNEE_LIFT_ANKLE_GAP: f32 = 0.15;

const LEFT_LEG: JointTriple = JointTriple::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE);
const RIGHT_LEG: JointTriple = JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictingMovement {
    Overhead,
    Squat,
    LegLift,
}

impl ConflictingMovement {
    pub fn message(&self) -> &'static str {
        match self {
            ConflictingMovement::Overhead => "Overhead Movement Detected",
            ConflictingMovement::Squat => "Squat Detected",
            ConflictingMovement::LegLift => "Leg Lift Detected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyFeatures {
    pub overhead: bool,
    pub squatting: bool,
    pub leg_lift: bool,
}

pub fn extract_features(frame: &LandmarkFrame, min_visibility: f32) -> BodyFeatures {
    let y_of = |index: LandmarkIndex| {
        frame
            .get(index)
            .filter(|lm| lm.visibility >= min_visibility && lm.is_finite())
            .map(|lm| lm.y)
    };

    // Image y grows downwards: a wrist above the nose has a smaller y.
    let overhead = match y_of(NOSE) {
        Some(nose) => [LEFT_WRIST, RIGHT_WRIST]
            .into_iter()
            .filter_map(y_of)
            .any(|wrist| wrist < nose),
        None => false,
    };

    let bent = |leg: &JointTriple| {
        measure_joint(frame, leg, min_visibility)
            .map(|angle| angle.degrees() < SQUAT_KNEE_ANGLE)
            .unwrap_or(false)
    };
    let squatting = bent(&LEFT_LEG) && bent(&RIGHT_LEG);

    let leg_lift = match (y_of(LEFT_ANKLE), y_of(RIGHT_ANKLE)) {
        (Some(left), Some(right)) => (left - right).abs() > KNEE_LIFT_ANKLE_GAP,
        _ => false,
    };

    BodyFeatures {
        overhead,
        squatting,
        leg_lift,
    }
}

/// Movements that are never part of `exercise`, in the order they are checked.
fn excluded_movements(exercise: ExerciseKind) -> &'static [ConflictingMovement] {
    use ConflictingMovement::*;
    match exercise {
        ExerciseKind::BicepCurl | ExerciseKind::StandingRow => &[Overhead, Squat, LegLift],
        ExerciseKind::ShoulderPress => &[Squat, LegLift],
        ExerciseKind::Squat => &[Overhead, LegLift],
        ExerciseKind::KneeLift => &[Squat, Overhead],
        ExerciseKind::Custom => &[],
    }
}

/// First movement in `frame` that conflicts with `exercise`, if any.
pub fn check_mismatch(
    frame: &LandmarkFrame,
    exercise: ExerciseKind,
    min_visibility: f32,
) -> Option<ConflictingMovement> {
    let excluded = excluded_movements(exercise);
    if excluded.is_empty() || frame.is_empty() {
        return None;
    }

    let features = extract_features(frame, min_visibility);
    excluded.iter().copied().find(|movement| match movement {
        ConflictingMovement::Overhead => features.overhead,
        ConflictingMovement::Squat => features.squatting,
        ConflictingMovement::LegLift => features.leg_lift,
    })
}
