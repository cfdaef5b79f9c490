use std::collections::VecDeque;

use crate::exercise::{AngleThresholds, ExerciseConfig, ExerciseKind};
use crate::pose::{
    check_mismatch, measure_joint, ConflictingMovement, JointAngle, JointTriple, LandmarkFrame,
};
use crate::reps::{Feedback, RepCounter, RepCounterSettings, Severity};

use super::state::{ActiveSnapshot, HistorySample, LimbSample, LimbSummary};

#[derive(Debug, Clone)]
struct TrackedLimb {
    joint: JointTriple,
    counter: RepCounter,
}

/// Fans each frame out to one rep counter per limb and merges the result.
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    session_id: String,
    kind: ExerciseKind,
    verify_exercise: bool,
    min_visibility: f32,
    limbs: Vec<TrackedLimb>,
    history: VecDeque<HistorySample>,
    max_history_samples: usize,
    mismatch: Option<ConflictingMovement>,
    mismatch_count: u32,
}

impl SessionAggregator {
    pub fn new(session_id: impl Into<String>, config: &ExerciseConfig) -> Self {
        let settings = RepCounterSettings {
            thresholds: config.thresholds,
            min_rep_duration_ms: config.min_rep_duration_ms,
            compliment_ms: config.compliment_ms,
            smoothing_window: config.smoothing_window,
        };

        let limbs = config
            .limbs
            .iter()
            .map(|limb| TrackedLimb {
                joint: limb.joint,
                counter: RepCounter::new(limb.id.clone(), settings),
            })
            .collect();

        Self {
            session_id: session_id.into(),
            kind: config.kind,
            verify_exercise: config.verify_exercise,
            min_visibility: config.min_visibility,
            limbs,
            history: VecDeque::new(),
            max_history_samples: config.max_history_samples,
            mismatch: None,
            mismatch_count: 0,
        }
    }

    /// Joint angle of every limb in configured order.
    pub fn measure(&self, frame: &LandmarkFrame) -> Vec<Option<JointAngle>> {
        self.limbs
            .iter()
            .map(|limb| measure_joint(frame, &limb.joint, self.min_visibility))
            .collect()
    }

    pub fn set_thresholds(&mut self, thresholds: AngleThresholds) {
        for limb in &mut self.limbs {
            limb.counter.set_thresholds(thresholds);
        }
    }

    /// Advance every limb by one frame. `now_ms` is the session clock used for
    /// rep timing, `elapsed_ms` the time since the session went active.
    pub fn process(
        &mut self,
        frame: &LandmarkFrame,
        now_ms: u64,
        elapsed_ms: u64,
    ) -> ActiveSnapshot {
        let angles = self.measure(frame);
        for (limb, angle) in self.limbs.iter_mut().zip(angles) {
            limb.counter.update(angle, now_ms);
        }

        let mismatch = if self.verify_exercise {
            check_mismatch(frame, self.kind, self.min_visibility)
        } else {
            None
        };
        if mismatch.is_some() && self.mismatch.is_none() {
            self.mismatch_count += 1;
        }
        self.mismatch = mismatch;

        self.record(elapsed_ms);
        self.snapshot(elapsed_ms)
    }

    pub fn snapshot(&self, elapsed_ms: u64) -> ActiveSnapshot {
        ActiveSnapshot {
            session_id: self.session_id.clone(),
            elapsed_ms,
            limbs: self.limbs.iter().map(|limb| limb.counter.state().clone()).collect(),
            overall: self.overall_feedback(),
            mismatch: self.mismatch,
        }
    }

    /// Highest-severity limb feedback, first limb on ties. A wrong-exercise
    /// warning replaces it unless a limb reports something critical.
    fn overall_feedback(&self) -> Option<Feedback> {
        let mut worst: Option<&Feedback> = None;
        let feedbacks = self
            .limbs
            .iter()
            .filter_map(|limb| limb.counter.state().feedback.as_ref());
        for feedback in feedbacks {
            if worst.map_or(true, |w| feedback.severity > w.severity) {
                worst = Some(feedback);
            }
        }

        match self.mismatch {
            Some(movement) if worst.map_or(true, |w| w.severity < Severity::Critical) => {
                Some(Feedback::wrong_exercise(movement))
            }
            _ => worst.cloned(),
        }
    }

    fn record(&mut self, elapsed_ms: u64) {
        let sample = HistorySample {
            elapsed_ms,
            limbs: self
                .limbs
                .iter()
                .map(|limb| {
                    let state = limb.counter.state();
                    LimbSample {
                        limb: state.limb.clone(),
                        angle: state.current_angle,
                        reps: state.rep_count,
                    }
                })
                .collect(),
        };

        while self.history.len() >= self.max_history_samples {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }

    pub fn history(&self) -> &VecDeque<HistorySample> {
        &self.history
    }

    pub fn limb_summaries(&self) -> Vec<LimbSummary> {
        self.limbs
            .iter()
            .map(|limb| LimbSummary::from_state(limb.counter.state()))
            .collect()
    }

    pub fn mismatch_count(&self) -> u32 {
        self.mismatch_count
    }
}
