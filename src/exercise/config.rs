use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::pose::JointTriple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseKind {
    BicepCurl,
    ShoulderPress,
    Squat,
    KneeLift,
    StandingRow,
    /// Caller-defined joints and thresholds; no exercise verification.
    Custom,
}

impl ExerciseKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "Bicep Curl",
            ExerciseKind::ShoulderPress => "Shoulder Press",
            ExerciseKind::Squat => "Squat",
            ExerciseKind::KneeLift => "Knee Lift",
            ExerciseKind::StandingRow => "Standing Row",
            ExerciseKind::Custom => "Custom",
        }
    }

    /// Stable identifier, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "bicepCurl",
            ExerciseKind::ShoulderPress => "shoulderPress",
            ExerciseKind::Squat => "squat",
            ExerciseKind::KneeLift => "kneeLift",
            ExerciseKind::StandingRow => "standingRow",
            ExerciseKind::Custom => "custom",
        }
    }

    /// Lenient lookup by display name or id ("Bicep Curl", "bicep_curl", "bicepCurl").
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "bicepcurl" | "bicep" | "curl" => Some(ExerciseKind::BicepCurl),
            "shoulderpress" | "press" => Some(ExerciseKind::ShoulderPress),
            "squat" => Some(ExerciseKind::Squat),
            "kneelift" => Some(ExerciseKind::KneeLift),
            "standingrow" | "row" => Some(ExerciseKind::StandingRow),
            "custom" => Some(ExerciseKind::Custom),
            _ => None,
        }
    }
}

/// Identifier of a tracked limb, e.g. `left` or `right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimbId(String);

impl LimbId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn left() -> Self {
        Self::new("left")
    }

    pub fn right() -> Self {
        Self::new("right")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LimbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimbConfig {
    pub id: LimbId,
    pub joint: JointTriple,
}

/// Angle thresholds driving the rep state machine.
///
/// `lower` is the extended (rest) boundary and `upper` the contracted (peak)
/// boundary, so `lower > upper`. The band between them is the hysteresis band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleThresholds {
    pub lower: f32,
    pub upper: f32,
    /// Beyond `lower + over_extension_margin` the joint is over-extended.
    pub over_extension_margin: f32,
    /// Below `upper - over_contraction_margin` the joint is over-curled.
    pub over_contraction_margin: f32,
}

impl AngleThresholds {
    pub fn over_extension_limit(&self) -> f32 {
        self.lower + self.over_extension_margin
    }

    pub fn over_contraction_limit(&self) -> f32 {
        self.upper - self.over_contraction_margin
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        let in_range = |v: f32| v.is_finite() && (0.0..=180.0).contains(&v);
        if !in_range(self.lower) || !in_range(self.upper) {
            return Err(TrackingError::invalid_config(format!(
                "thresholds must lie within 0-180 degrees (lower {}, upper {})",
                self.lower, self.upper
            )));
        }
        if self.lower <= self.upper {
            return Err(TrackingError::invalid_config(format!(
                "lower threshold {} must be greater than upper threshold {}",
                self.lower, self.upper
            )));
        }
        for (name, margin) in [
            ("over-extension", self.over_extension_margin),
            ("over-contraction", self.over_contraction_margin),
        ] {
            if !margin.is_finite() || margin < 0.0 {
                return Err(TrackingError::invalid_config(format!(
                    "{name} margin must be a non-negative number, got {margin}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum CalibrationStrategy {
    /// Wait for `frames` consecutive frames where every limb is measurable
    /// and moved less than `tolerance_deg` since the previous frame.
    #[serde(rename_all = "camelCase")]
    Stability { frames: u32, tolerance_deg: f32 },
    /// Hold the extended pose, then the contracted pose, for `hold_ms` each
    /// and derive the thresholds from the observed range of motion.
    #[serde(rename_all = "camelCase")]
    RangeOfMotion { hold_ms: u64, safety_margin_deg: f32 },
}

impl Default for CalibrationStrategy {
    fn default() -> Self {
        CalibrationStrategy::Stability {
            frames: 10,
            tolerance_deg: 8.0,
        }
    }
}

fn default_min_visibility() -> f32 {
    0.6
}

fn default_smoothing_window() -> usize {
    1
}

fn default_countdown_ms() -> u64 {
    3_000
}

fn default_calibration_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_compliment_ms() -> u64 {
    2_000
}

fn default_max_history_samples() -> usize {
    // Ten minutes at the nominal 10 Hz metric rate.
    6_000
}

fn default_verify_exercise() -> bool {
    true
}

/// Everything needed to start a tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    pub exercise_id: String,
    pub kind: ExerciseKind,
    pub limbs: Vec<LimbConfig>,
    pub thresholds: AngleThresholds,
    /// Reps at or below this duration are counted but excluded from best time.
    pub min_rep_duration_ms: u64,
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default)]
    pub calibration: CalibrationStrategy,
    #[serde(default = "default_calibration_timeout_ms")]
    pub calibration_timeout_ms: Option<u64>,
    #[serde(default = "default_countdown_ms")]
    pub countdown_ms: u64,
    #[serde(default = "default_compliment_ms")]
    pub compliment_ms: u64,
    #[serde(default = "default_max_history_samples")]
    pub max_history_samples: usize,
    #[serde(default = "default_verify_exercise")]
    pub verify_exercise: bool,
}

impl ExerciseConfig {
    /// Config with the crate defaults for everything but the exercise geometry.
    pub fn new(
        exercise_id: impl Into<String>,
        kind: ExerciseKind,
        limbs: Vec<LimbConfig>,
        thresholds: AngleThresholds,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            kind,
            limbs,
            thresholds,
            min_rep_duration_ms: 500,
            min_visibility: default_min_visibility(),
            smoothing_window: default_smoothing_window(),
            calibration: CalibrationStrategy::default(),
            calibration_timeout_ms: default_calibration_timeout_ms(),
            countdown_ms: default_countdown_ms(),
            compliment_ms: default_compliment_ms(),
            max_history_samples: default_max_history_samples(),
            verify_exercise: default_verify_exercise(),
        }
    }

    /// Fail fast before any frame is processed.
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.limbs.is_empty() {
            return Err(TrackingError::invalid_config("at least one limb must be tracked"));
        }

        let mut seen = HashSet::new();
        for limb in &self.limbs {
            if limb.id.as_str().is_empty() {
                return Err(TrackingError::invalid_config("limb ids must not be empty"));
            }
            if !seen.insert(&limb.id) {
                return Err(TrackingError::invalid_config(format!(
                    "limb '{}' is configured twice",
                    limb.id
                )));
            }
            let [a, b, c] = limb.joint.indices();
            if a == b || b == c || a == c {
                return Err(TrackingError::invalid_config(format!(
                    "limb '{}' joint must use three distinct landmarks",
                    limb.id
                )));
            }
        }

        self.thresholds.validate()?;

        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(TrackingError::invalid_config(format!(
                "min visibility must be within 0-1, got {}",
                self.min_visibility
            )));
        }
        if self.smoothing_window == 0 {
            return Err(TrackingError::invalid_config("smoothing window must be at least 1"));
        }
        if self.max_history_samples == 0 {
            return Err(TrackingError::invalid_config("history must keep at least one sample"));
        }

        match self.calibration {
            CalibrationStrategy::Stability {
                frames,
                tolerance_deg,
            } => {
                if frames == 0 {
                    return Err(TrackingError::invalid_config(
                        "stability calibration needs at least one frame",
                    ));
                }
                if !tolerance_deg.is_finite() || tolerance_deg <= 0.0 {
                    return Err(TrackingError::invalid_config(
                        "stability tolerance must be a positive number of degrees",
                    ));
                }
            }
            CalibrationStrategy::RangeOfMotion {
                hold_ms,
                safety_margin_deg,
            } => {
                if hold_ms == 0 {
                    return Err(TrackingError::invalid_config(
                        "range-of-motion calibration needs a non-zero hold time",
                    ));
                }
                if !safety_margin_deg.is_finite() || safety_margin_deg < 0.0 {
                    return Err(TrackingError::invalid_config(
                        "safety margin must be a non-negative number of degrees",
                    ));
                }
            }
        }

        Ok(())
    }
}
