//! Accuracy scoring of a live pose against a reference ("ghost") pose.
//!
//! Independent of rep counting and of the session phase.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pose::{landmark_name, Landmark, LandmarkFrame, LandmarkIndex};
use crate::reps::LimbStage;

/// Template landmark set representing ideal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePose {
    pub name: String,
    /// Logical phase of the exercise this template depicts, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<LimbStage>,
    pub landmarks: HashMap<LandmarkIndex, Landmark>,
}

impl ReferencePose {
    pub fn from_frame(name: impl Into<String>, frame: &LandmarkFrame) -> Self {
        Self {
            name: name.into(),
            stage: None,
            landmarks: frame.landmarks.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Accuracy points lost per unit of average normalized distance.
    pub scale_factor: f32,
    /// Accuracy strictly above this is good form.
    pub good_threshold: f32,
    /// Accuracy strictly above this (and not good) needs adjusting.
    pub adjust_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        // 1-2% of frame size of tracking noise lands in the 80-100 band.
        Self {
            scale_factor: 1000.0,
            good_threshold: 85.0,
            adjust_threshold: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccuracyTier {
    Good,
    Adjust,
    FixPosture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseScore {
    /// 0-100.
    pub accuracy: f32,
    pub tier: AccuracyTier,
    pub instruction: String,
    pub matched_landmarks: usize,
    /// Landmark with the largest deviation from the reference.
    pub worst_landmark: Option<LandmarkIndex>,
}

impl PoseScore {
    /// False when the two landmark sets had nothing in common.
    pub fn has_match(&self) -> bool {
        self.matched_landmarks > 0
    }
}

pub fn score_pose(frame: &LandmarkFrame, reference: &ReferencePose, config: &ScoringConfig) -> PoseScore {
    // Sorted so the sum and the worst pick do not depend on map iteration order.
    let mut indices: Vec<LandmarkIndex> = frame
        .landmarks
        .keys()
        .filter(|index| reference.landmarks.contains_key(index))
        .copied()
        .collect();
    indices.sort_unstable();

    let mut total = 0.0_f32;
    let mut matched = 0_usize;
    let mut worst: Option<(LandmarkIndex, f32)> = None;

    for index in indices {
        let (Some(live), Some(target)) = (frame.get(index), reference.landmarks.get(&index)) else {
            continue;
        };
        if !live.is_finite() || !target.is_finite() {
            continue;
        }

        let distance = ((live.x - target.x).powi(2) + (live.y - target.y).powi(2)).sqrt();
        total += distance;
        matched += 1;
        if worst.map_or(true, |(_, d)| distance > d) {
            worst = Some((index, distance));
        }
    }

    if matched == 0 {
        return PoseScore {
            accuracy: 0.0,
            tier: AccuracyTier::FixPosture,
            instruction: "Step into the frame so your pose can be compared".to_string(),
            matched_landmarks: 0,
            worst_landmark: None,
        };
    }

    let average = total / matched as f32;
    let accuracy = (100.0 - average * config.scale_factor).clamp(0.0, 100.0);
    let accuracy = if accuracy.is_finite() { accuracy } else { 0.0 };

    let tier = if accuracy > config.good_threshold {
        AccuracyTier::Good
    } else if accuracy > config.adjust_threshold {
        AccuracyTier::Adjust
    } else {
        AccuracyTier::FixPosture
    };

    let worst_landmark = worst.map(|(index, _)| index);
    let joint = worst_landmark.map(landmark_name).unwrap_or("joint");
    let instruction = match tier {
        AccuracyTier::Good => "Good form, keep going".to_string(),
        AccuracyTier::Adjust => format!("Adjust your {joint}"),
        AccuracyTier::FixPosture => format!("Fix your posture: check your {joint}"),
    };

    PoseScore {
        accuracy,
        tier,
        instruction,
        matched_landmarks: matched,
        worst_landmark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::landmarks::{LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST};

    fn reference() -> ReferencePose {
        let frame = LandmarkFrame::new(0)
            .with_landmark(LEFT_SHOULDER, Landmark::new(0.5, 0.3, 1.0))
            .with_landmark(LEFT_ELBOW, Landmark::new(0.5, 0.45, 1.0))
            .with_landmark(LEFT_WRIST, Landmark::new(0.5, 0.6, 1.0));
        ReferencePose::from_frame("curl-bottom", &frame)
    }

    fn shifted(dx: f32) -> LandmarkFrame {
        let mut frame = LandmarkFrame::new(0);
        for (index, lm) in &reference().landmarks {
            frame.insert(*index, Landmark::new(lm.x + dx, lm.y, 1.0));
        }
        frame
    }

    #[test]
    fn identical_pose_scores_full_marks() {
        let score = score_pose(&shifted(0.0), &reference(), &ScoringConfig::default());
        assert_eq!(score.accuracy, 100.0);
        assert_eq!(score.tier, AccuracyTier::Good);
        assert_eq!(score.matched_landmarks, 3);
    }

    #[test]
    fn small_noise_stays_in_good_band() {
        let score = score_pose(&shifted(0.01), &reference(), &ScoringConfig::default());
        assert!(score.accuracy > 85.0 && score.accuracy <= 90.5, "{}", score.accuracy);
        assert_eq!(score.tier, AccuracyTier::Good);
    }

    #[test]
    fn tiers_follow_thresholds() {
        let config = ScoringConfig::default();
        let adjust = score_pose(&shifted(0.03), &reference(), &config);
        assert_eq!(adjust.tier, AccuracyTier::Adjust);
        assert!(adjust.instruction.starts_with("Adjust your"));

        let fix = score_pose(&shifted(0.2), &reference(), &config);
        assert_eq!(fix.tier, AccuracyTier::FixPosture);
        assert_eq!(fix.accuracy, 0.0);
    }

    #[test]
    fn worst_landmark_is_named() {
        let mut frame = shifted(0.0);
        frame.insert(LEFT_WRIST, Landmark::new(0.55, 0.6, 1.0));
        let score = score_pose(&frame, &reference(), &ScoringConfig::default());
        assert_eq!(score.worst_landmark, Some(LEFT_WRIST));
        assert!(score.instruction.contains("left wrist"));
    }

    #[test]
    fn empty_input_scores_zero_with_flag() {
        let score = score_pose(&LandmarkFrame::new(0), &reference(), &ScoringConfig::default());
        assert_eq!(score.accuracy, 0.0);
        assert!(!score.has_match());

        let empty_ref = ReferencePose::from_frame("empty", &LandmarkFrame::new(0));
        let score = score_pose(&shifted(0.0), &empty_ref, &ScoringConfig::default());
        assert_eq!(score.accuracy, 0.0);
        assert!(!score.has_match());
    }

    #[test]
    fn scoring_is_idempotent_and_bounded() {
        let config = ScoringConfig::default();
        for dx in [0.0, 0.005, 0.05, 0.5, 5.0] {
            let frame = shifted(dx);
            let first = score_pose(&frame, &reference(), &config);
            let second = score_pose(&frame, &reference(), &config);
            assert_eq!(first, second);
            assert!((0.0..=100.0).contains(&first.accuracy));
        }
    }
}
