//! Built-in exercise definitions.

use crate::pose::landmarks::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ANKLE,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};
use crate::pose::JointTriple;

use super::config::{AngleThresholds, ExerciseConfig, ExerciseKind, LimbConfig, LimbId};

fn both_sides(left: JointTriple, right: JointTriple) -> Vec<LimbConfig> {
    vec![
        LimbConfig {
            id: LimbId::left(),
            joint: left,
        },
        LimbConfig {
            id: LimbId::right(),
            joint: right,
        },
    ]
}

fn elbows() -> Vec<LimbConfig> {
    both_sides(
        JointTriple::new(LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
        JointTriple::new(RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
    )
}

fn knees() -> Vec<LimbConfig> {
    both_sides(
        JointTriple::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
        JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
    )
}

fn hips() -> Vec<LimbConfig> {
    both_sides(
        JointTriple::new(LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE),
        JointTriple::new(RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE),
    )
}

fn thresholds(lower: f32, upper: f32, extension: f32, contraction: f32) -> AngleThresholds {
    AngleThresholds {
        lower,
        upper,
        over_extension_margin: extension,
        over_contraction_margin: contraction,
    }
}

pub fn bicep_curl() -> ExerciseConfig {
    ExerciseConfig::new(
        "bicep_curl",
        ExerciseKind::BicepCurl,
        elbows(),
        thresholds(160.0, 45.0, 15.0, 15.0),
    )
}

pub fn shoulder_press() -> ExerciseConfig {
    ExerciseConfig::new(
        "shoulder_press",
        ExerciseKind::ShoulderPress,
        elbows(),
        thresholds(155.0, 80.0, 20.0, 20.0),
    )
}

pub fn squat() -> ExerciseConfig {
    let mut config = ExerciseConfig::new(
        "squat",
        ExerciseKind::Squat,
        knees(),
        thresholds(160.0, 100.0, 15.0, 30.0),
    );
    config.min_rep_duration_ms = 800;
    config
}

pub fn knee_lift() -> ExerciseConfig {
    ExerciseConfig::new(
        "knee_lift",
        ExerciseKind::KneeLift,
        hips(),
        thresholds(160.0, 110.0, 15.0, 30.0),
    )
}

pub fn standing_row() -> ExerciseConfig {
    ExerciseConfig::new(
        "standing_row",
        ExerciseKind::StandingRow,
        elbows(),
        thresholds(150.0, 70.0, 20.0, 20.0),
    )
}

/// Preset for `kind`. `Custom` has no preset.
pub fn preset(kind: ExerciseKind) -> Option<ExerciseConfig> {
    match kind {
        ExerciseKind::BicepCurl => Some(bicep_curl()),
        ExerciseKind::ShoulderPress => Some(shoulder_press()),
        ExerciseKind::Squat => Some(squat()),
        ExerciseKind::KneeLift => Some(knee_lift()),
        ExerciseKind::StandingRow => Some(standing_row()),
        ExerciseKind::Custom => None,
    }
}

/// Preset by display name, e.g. "Bicep Curl".
pub fn preset_by_name(name: &str) -> Option<ExerciseConfig> {
    ExerciseKind::from_name(name).and_then(preset)
}
