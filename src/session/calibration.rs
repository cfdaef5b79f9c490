//! Calibration run before the countdown.
//!
//! Stability waits for the user to hold still in frame. Range of motion asks
//! for a held full extension, then a held full contraction, and derives the
//! rep thresholds from what it observed.

use serde::{Deserialize, Serialize};

use crate::exercise::{AngleThresholds, CalibrationStrategy};
use crate::pose::JointAngle;

/// A hold counts while the angle stays this close to the observed extreme.
const HOLD_TOLERANCE_DEG: f32 = 5.0;
/// Distance of the derived rep thresholds from the observed extremes.
const THRESHOLD_INSET_DEG: f32 = 15.0;
const MIN_SAFE_ANGLE: f32 = 20.0;
const MAX_SAFE_ANGLE: f32 = 175.0;
/// Ranges narrower than this are reported as limited mobility.
const LIMITED_RANGE_DEG: f32 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub strategy: CalibrationStrategy,
    /// Thresholds in force once calibration finished.
    pub thresholds: AngleThresholds,
    pub observed_min: Option<f32>,
    pub observed_max: Option<f32>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationStatus {
    InProgress { progress: u8, message: String },
    Complete(CalibrationReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeStep {
    Extend,
    Contract,
}

#[derive(Debug, Clone)]
enum Progress {
    Stability {
        stable_frames: u32,
        previous: Option<Vec<f32>>,
    },
    RangeOfMotion {
        step: RangeStep,
        /// Start time and angles of the current hold.
        hold: Option<(u64, Vec<f32>)>,
        /// Per-limb extremes seen so far.
        max_seen: Vec<Option<f32>>,
        min_seen: Vec<Option<f32>>,
    },
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    strategy: CalibrationStrategy,
    configured: AngleThresholds,
    progress: Progress,
    percent: u8,
    message: String,
}

impl Calibrator {
    pub fn new(strategy: CalibrationStrategy, configured: AngleThresholds, limb_count: usize) -> Self {
        let (progress, message) = match strategy {
            CalibrationStrategy::Stability { .. } => (
                Progress::Stability {
                    stable_frames: 0,
                    previous: None,
                },
                "Step into the frame and hold still",
            ),
            CalibrationStrategy::RangeOfMotion { .. } => (
                Progress::RangeOfMotion {
                    step: RangeStep::Extend,
                    hold: None,
                    max_seen: vec![None; limb_count],
                    min_seen: vec![None; limb_count],
                },
                "Extend fully and hold",
            ),
        };

        Self {
            strategy,
            configured,
            progress,
            percent: 0,
            message: message.to_string(),
        }
    }

    pub fn progress(&self) -> u8 {
        self.percent
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Feed one frame's angles, one entry per tracked limb in configured order.
    pub fn update(&mut self, angles: &[Option<JointAngle>], now_ms: u64) -> CalibrationStatus {
        let degrees: Option<Vec<f32>> = angles.iter().map(|a| a.map(JointAngle::degrees)).collect();

        match (self.strategy, &mut self.progress) {
            (
                CalibrationStrategy::Stability {
                    frames,
                    tolerance_deg,
                },
                Progress::Stability {
                    stable_frames,
                    previous,
                },
            ) => {
                match degrees {
                    Some(current) => {
                        let steady = previous.as_ref().map_or(true, |prev| {
                            prev.iter()
                                .zip(&current)
                                .all(|(p, c)| (p - c).abs() < tolerance_deg)
                        });
                        *stable_frames = if steady { *stable_frames + 1 } else { 1 };
                        *previous = Some(current);
                        self.message = "Hold still".to_string();
                    }
                    None => {
                        *stable_frames = 0;
                        *previous = None;
                        self.message = "Step into the frame and hold still".to_string();
                    }
                }

                self.percent = percent_of(*stable_frames as u64, frames as u64);
                if *stable_frames >= frames {
                    return CalibrationStatus::Complete(CalibrationReport {
                        strategy: self.strategy,
                        thresholds: self.configured,
                        observed_min: None,
                        observed_max: None,
                        warning: None,
                    });
                }
            }
            (
                CalibrationStrategy::RangeOfMotion {
                    hold_ms,
                    safety_margin_deg,
                },
                Progress::RangeOfMotion {
                    step,
                    hold,
                    max_seen,
                    min_seen,
                },
            ) => {
                let Some(current) = degrees else {
                    *hold = None;
                    self.message = "Step into the frame".to_string();
                    return self.in_progress();
                };

                let holding = match step {
                    RangeStep::Extend => track_extreme(max_seen, &current, f32::max),
                    RangeStep::Contract => track_extreme(min_seen, &current, f32::min),
                };

                // Still moving towards the extreme restarts the hold.
                let held_ms = match hold {
                    Some((started, anchor)) if holding && within_tolerance(anchor, &current) => {
                        now_ms.saturating_sub(*started)
                    }
                    _ if holding => {
                        *hold = Some((now_ms, current));
                        0
                    }
                    _ => {
                        *hold = None;
                        0
                    }
                };

                let step_percent = percent_of(held_ms, hold_ms) / 2;
                match step {
                    RangeStep::Extend => {
                        self.percent = step_percent;
                        self.message = "Extend fully and hold".to_string();
                        if held_ms >= hold_ms {
                            *step = RangeStep::Contract;
                            *hold = None;
                            self.percent = 50;
                            self.message = "Now contract fully and hold".to_string();
                        }
                    }
                    RangeStep::Contract => {
                        self.percent = 50 + step_percent;
                        self.message = "Now contract fully and hold".to_string();
                        if held_ms >= hold_ms {
                            self.percent = 100;
                            let report = derive_report(
                                self.strategy,
                                self.configured,
                                max_seen.as_slice(),
                                min_seen.as_slice(),
                                safety_margin_deg,
                            );
                            return CalibrationStatus::Complete(report);
                        }
                    }
                }
            }
            _ => {}
        }

        self.in_progress()
    }

    fn in_progress(&self) -> CalibrationStatus {
        CalibrationStatus::InProgress {
            progress: self.percent,
            message: self.message.clone(),
        }
    }
}

fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

/// Fold `current` into the per-limb extremes; true when every limb sits
/// within the hold tolerance of its extreme.
fn track_extreme(seen: &mut [Option<f32>], current: &[f32], pick: fn(f32, f32) -> f32) -> bool {
    seen.iter_mut().zip(current).all(|(extreme, &angle)| {
        let value = extreme.map_or(angle, |e| pick(e, angle));
        *extreme = Some(value);
        (value - angle).abs() <= HOLD_TOLERANCE_DEG
    })
}

fn within_tolerance(anchor: &[f32], current: &[f32]) -> bool {
    anchor
        .iter()
        .zip(current)
        .all(|(a, c)| (a - c).abs() <= HOLD_TOLERANCE_DEG)
}

fn mean(values: &[Option<f32>]) -> Option<f32> {
    let present: Vec<f32> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f32>() / present.len() as f32)
    }
}

fn derive_report(
    strategy: CalibrationStrategy,
    configured: AngleThresholds,
    max_seen: &[Option<f32>],
    min_seen: &[Option<f32>],
    safety_margin_deg: f32,
) -> CalibrationReport {
    let observed_max = mean(max_seen);
    let observed_min = mean(min_seen);

    let (Some(extended), Some(contracted)) = (observed_max, observed_min) else {
        return CalibrationReport {
            strategy,
            thresholds: configured,
            observed_min,
            observed_max,
            warning: Some("Range of motion could not be measured, using default thresholds".to_string()),
        };
    };

    let lower = extended - THRESHOLD_INSET_DEG;
    let upper = contracted + THRESHOLD_INSET_DEG;
    let over_contraction_limit = MIN_SAFE_ANGLE.max(contracted - safety_margin_deg);
    let over_extension_limit = MAX_SAFE_ANGLE.min(extended + safety_margin_deg);

    let derived = AngleThresholds {
        lower,
        upper,
        over_extension_margin: (over_extension_limit - lower).max(0.0),
        over_contraction_margin: (upper - over_contraction_limit).max(0.0),
    };

    let limited =
        (extended - contracted < LIMITED_RANGE_DEG).then_some("Limited range of motion detected");
    let (thresholds, warning) = if derived.validate().is_ok() {
        (derived, limited.map(str::to_string))
    } else {
        let reason = limited.unwrap_or("Calibrated thresholds are unusable");
        (configured, Some(format!("{reason}, using default thresholds")))
    };

    CalibrationReport {
        strategy,
        thresholds,
        observed_min,
        observed_max,
        warning,
    }
}
