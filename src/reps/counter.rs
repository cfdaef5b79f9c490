//! Per-limb rep state machine.
//!
//! One step per frame: a single noisy frame can move a limb into a
//! transitional stage but never completes a rep on its own.
//!
//! ```text
//!   Down --(< lower)--> TransitionUp --(<= upper)--> Up
//!    ^                      |                         |
//!    |               (>= lower, aborted)          (> upper)
//!    |                      v                         v
//!    +-------------------- Down        TransitionDown <--(<= upper: back to Up)
//!    +---------------(>= lower, rep +1)------+
//! ```

use rand::seq::SliceRandom;

use crate::exercise::{AngleThresholds, LimbId};
use crate::pose::{AngleSmoother, JointAngle};

use super::state::{Feedback, FeedbackKind, LimbRepState, LimbStage};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

const COMPLIMENTS: [&str; 4] = ["Great Rep!", "Excellent!", "Perfect Form!", "Good Job!"];

/// What a single update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub rep_completed: bool,
    pub error_counted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RepCounterSettings {
    pub thresholds: AngleThresholds,
    pub min_rep_duration_ms: u64,
    pub compliment_ms: u64,
    pub smoothing_window: usize,
}

#[derive(Debug, Clone)]
pub struct RepCounter {
    settings: RepCounterSettings,
    state: LimbRepState,
    /// Stage held when the limb was lost. Read only while the stage is
    /// `Lost`, and never `Lost` itself.
    resume_stage: LimbStage,
    /// A form error has already been charged to the current cycle.
    error_flagged: bool,
    /// Form error seen before the cycle reached `Up`; dropped if the cycle aborts.
    error_pending: bool,
    last_rep_at_ms: Option<u64>,
    compliment: &'static str,
    smoother: AngleSmoother,
}

impl RepCounter {
    pub fn new(limb: LimbId, settings: RepCounterSettings) -> Self {
        Self {
            smoother: AngleSmoother::new(settings.smoothing_window),
            settings,
            state: LimbRepState::new(limb),
            resume_stage: LimbStage::Down,
            error_flagged: false,
            error_pending: false,
            last_rep_at_ms: None,
            compliment: COMPLIMENTS[0],
        }
    }

    pub fn state(&self) -> &LimbRepState {
        &self.state
    }

    pub fn limb(&self) -> &LimbId {
        &self.state.limb
    }

    pub fn thresholds(&self) -> &AngleThresholds {
        &self.settings.thresholds
    }

    /// Replace thresholds, e.g. after range-of-motion calibration.
    pub fn set_thresholds(&mut self, thresholds: AngleThresholds) {
        self.settings.thresholds = thresholds;
    }

    /// Feed one frame's measurement. `None` means the joint was not reliably visible.
    pub fn update(&mut self, angle: Option<JointAngle>, now_ms: u64) -> StepOutcome {
        match angle {
            Some(angle) => self.track(angle, now_ms),
            None => {
                self.mark_lost();
                StepOutcome::default()
            }
        }
    }

    fn mark_lost(&mut self) {
        if self.state.stage != LimbStage::Lost {
            self.resume_stage = self.state.stage;
            self.state.stage = LimbStage::Lost;
        }
        self.smoother.reset();
        self.state.current_angle = None;
        self.state.current_rep_ms = None;
        self.state.feedback = Some(Feedback::pose_lost());
    }

    fn track(&mut self, raw: JointAngle, now_ms: u64) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let angle = self.smoother.push(raw);
        let degrees = angle.degrees();
        self.state.current_angle = Some(angle);

        let entry = match self.state.stage {
            LimbStage::Lost => self.resume_stage,
            stage => stage,
        };

        let form_error = self.classify_form(degrees);
        if form_error.is_some() && entry.is_mid_cycle() && !self.error_flagged {
            self.error_pending = true;
        }

        let AngleThresholds { lower, upper, .. } = self.settings.thresholds;
        let next = match entry {
            LimbStage::Down | LimbStage::Lost => {
                if degrees < lower {
                    self.state.rep_started_ms = Some(now_ms);
                    self.error_flagged = false;
                    self.error_pending = false;
                    LimbStage::TransitionUp
                } else {
                    LimbStage::Down
                }
            }
            LimbStage::TransitionUp => {
                if degrees <= upper {
                    LimbStage::Up
                } else if degrees >= lower {
                    self.state.rep_started_ms = None;
                    self.error_pending = false;
                    LimbStage::Down
                } else {
                    LimbStage::TransitionUp
                }
            }
            LimbStage::Up => {
                if degrees > upper {
                    LimbStage::TransitionDown
                } else {
                    LimbStage::Up
                }
            }
            LimbStage::TransitionDown => {
                if degrees <= upper {
                    LimbStage::Up
                } else if degrees >= lower {
                    self.complete_rep(now_ms);
                    outcome.rep_completed = true;
                    LimbStage::Down
                } else {
                    LimbStage::TransitionDown
                }
            }
        };

        // Only cycles that reach Up are charged.
        let committed = matches!(next, LimbStage::Up | LimbStage::TransitionDown);
        if self.error_pending && (committed || outcome.rep_completed) {
            self.error_pending = false;
            self.error_flagged = true;
            self.state.error_count += 1;
            outcome.error_counted = true;
        }

        self.state.stage = next;
        self.state.current_rep_ms = match (next.is_mid_cycle(), self.state.rep_started_ms) {
            (true, Some(started)) => Some(now_ms.saturating_sub(started)),
            _ => None,
        };
        self.state.feedback = Some(self.feedback_for(form_error, now_ms));

        outcome
    }

    fn complete_rep(&mut self, now_ms: u64) {
        let started = self.state.rep_started_ms.take().unwrap_or(now_ms);
        let duration = now_ms.saturating_sub(started);

        self.state.rep_count += 1;
        self.state.last_rep_ms = Some(duration);
        if duration > self.settings.min_rep_duration_ms {
            self.state.best_rep_ms = Some(match self.state.best_rep_ms {
                Some(best) => best.min(duration),
                None => duration,
            });
        }

        self.last_rep_at_ms = Some(now_ms);
        self.compliment = COMPLIMENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(COMPLIMENTS[0]);

        log_debug!(
            "limb {} completed rep {} in {}ms",
            self.state.limb,
            self.state.rep_count,
            duration
        );
    }

    fn classify_form(&self, degrees: f32) -> Option<FeedbackKind> {
        let thresholds = &self.settings.thresholds;
        if degrees > thresholds.over_extension_limit() {
            Some(FeedbackKind::OverExtended)
        } else if degrees < thresholds.over_contraction_limit() {
            Some(FeedbackKind::OverCurled)
        } else {
            None
        }
    }

    fn feedback_for(&self, form_error: Option<FeedbackKind>, now_ms: u64) -> Feedback {
        match form_error {
            Some(FeedbackKind::OverExtended) => Feedback::over_extended(),
            Some(_) => Feedback::over_curled(),
            None => match self.last_rep_at_ms {
                Some(at) if now_ms.saturating_sub(at) < self.settings.compliment_ms => {
                    Feedback::compliment(self.compliment)
                }
                _ => Feedback::maintain_form(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u64 = 100;

    fn counter() -> RepCounter {
        RepCounter::new(
            LimbId::left(),
            RepCounterSettings {
                thresholds: AngleThresholds {
                    lower: 160.0,
                    upper: 45.0,
                    over_extension_margin: 15.0,
                    over_contraction_margin: 15.0,
                },
                min_rep_duration_ms: 200,
                compliment_ms: 2_000,
                smoothing_window: 1,
            },
        )
    }

    fn angle(deg: f32) -> Option<JointAngle> {
        JointAngle::from_degrees(deg)
    }

    fn feed(counter: &mut RepCounter, trace: &[f32], start_ms: u64) -> u64 {
        let mut t = start_ms;
        for &deg in trace {
            counter.update(angle(deg), t);
            t += FRAME_MS;
        }
        t
    }

    #[test]
    fn full_cycle_counts_one_rep_with_timing() {
        let mut c = counter();
        feed(&mut c, &[170.0, 170.0, 160.0, 100.0, 50.0, 40.0, 50.0, 100.0, 160.0, 170.0], 0);

        let state = c.state();
        assert_eq!(state.rep_count, 1);
        assert_eq!(state.stage, LimbStage::Down);
        // Left Down at index 3, re-entered Down at index 8.
        assert_eq!(state.last_rep_ms, Some(500));
        assert_eq!(state.best_rep_ms, Some(500));
        assert_eq!(state.error_count, 0);
    }

    #[test]
    fn shallow_cycle_never_counts() {
        let mut c = counter();
        feed(&mut c, &[170.0, 170.0, 160.0, 100.0, 80.0, 80.0, 80.0, 100.0, 160.0, 170.0], 0);

        assert_eq!(c.state().rep_count, 0);
        assert_eq!(c.state().stage, LimbStage::Down);
        assert_eq!(c.state().last_rep_ms, None);
    }

    #[test]
    fn jitter_inside_band_never_counts() {
        let mut c = counter();
        let trace: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 170.0 } else { 170.5 }).collect();
        feed(&mut c, &trace, 0);
        assert_eq!(c.state().rep_count, 0);
        assert_eq!(c.state().stage, LimbStage::Down);
    }

    #[test]
    fn jitter_around_upper_threshold_counts_once() {
        let mut c = counter();
        feed(
            &mut c,
            &[170.0, 100.0, 44.0, 46.0, 44.0, 46.0, 44.0, 100.0, 165.0, 170.0],
            0,
        );
        assert_eq!(c.state().rep_count, 1);
    }

    #[test]
    fn single_noisy_frame_does_not_complete_rep() {
        let mut c = counter();
        // In Up, one wild frame at 170 only reaches TransitionDown.
        feed(&mut c, &[170.0, 100.0, 40.0, 40.0, 170.0, 40.0], 0);
        assert_eq!(c.state().rep_count, 0);
        assert_eq!(c.state().stage, LimbStage::Up);
    }

    #[test]
    fn rep_count_is_monotonic_over_many_cycles() {
        let mut c = counter();
        let cycle = [170.0, 120.0, 60.0, 40.0, 60.0, 120.0, 170.0];
        let mut t = 0;
        let mut previous = 0;
        for _ in 0..5 {
            for &deg in &cycle {
                c.update(angle(deg), t);
                t += FRAME_MS;
                let count = c.state().rep_count;
                assert!(count == previous || count == previous + 1);
                previous = count;
            }
        }
        assert_eq!(c.state().rep_count, 5);
    }

    #[test]
    fn short_reps_count_but_do_not_set_best_time() {
        let mut c = counter();
        // Whole cycle inside 200ms.
        c.update(angle(170.0), 0);
        c.update(angle(100.0), 10);
        c.update(angle(40.0), 20);
        c.update(angle(100.0), 30);
        c.update(angle(170.0), 40);
        assert_eq!(c.state().rep_count, 1);
        assert_eq!(c.state().last_rep_ms, Some(30));
        assert_eq!(c.state().best_rep_ms, None);
    }

    #[test]
    fn form_error_counted_once_per_cycle() {
        let mut c = counter();
        feed(&mut c, &[170.0, 100.0, 40.0, 20.0, 10.0, 20.0, 100.0, 170.0], 0);

        assert_eq!(c.state().rep_count, 1);
        assert_eq!(c.state().error_count, 1);

        // Second cycle with another over-curl is charged again.
        feed(&mut c, &[100.0, 40.0, 10.0, 100.0, 170.0], 10_000);
        assert_eq!(c.state().rep_count, 2);
        assert_eq!(c.state().error_count, 2);
    }

    #[test]
    fn over_curl_sets_critical_feedback() {
        let mut c = counter();
        feed(&mut c, &[170.0, 100.0, 40.0, 20.0], 0);
        let feedback = c.state().feedback.clone().unwrap();
        assert_eq!(feedback.kind, FeedbackKind::OverCurled);
        assert_eq!(feedback.message, "OVER-CURLED");
    }

    #[test]
    fn over_extension_at_rest_is_shown_but_not_counted() {
        let mut c = counter();
        feed(&mut c, &[179.0, 179.0], 0);
        assert_eq!(c.state().error_count, 0);
        assert_eq!(c.state().feedback.as_ref().unwrap().kind, FeedbackKind::OverExtended);
    }

    #[test]
    fn noise_at_hyperextended_rest_charges_nothing() {
        let mut c = counter();
        let trace: Vec<f32> = [177.0, 158.0, 177.0].repeat(5);
        feed(&mut c, &trace, 0);

        assert_eq!(c.state().rep_count, 0);
        assert_eq!(c.state().error_count, 0);
        assert_eq!(c.state().stage, LimbStage::Down);
    }

    #[test]
    fn over_extension_finishing_a_rep_is_charged() {
        let mut c = counter();
        let mut outcome = StepOutcome::default();
        for (i, deg) in [170.0, 100.0, 40.0, 100.0, 178.0].into_iter().enumerate() {
            outcome = c.update(angle(deg), i as u64 * FRAME_MS);
        }

        assert!(outcome.rep_completed);
        assert!(outcome.error_counted);
        assert_eq!(c.state().rep_count, 1);
        assert_eq!(c.state().error_count, 1);
    }

    #[test]
    fn lost_before_first_measurement_resumes_at_rest() {
        let mut c = counter();
        c.update(None, 0);
        assert_eq!(c.state().stage, LimbStage::Lost);
        c.update(angle(170.0), 100);
        assert_eq!(c.state().stage, LimbStage::Down);
    }

    #[test]
    fn lost_freezes_counts_and_resumes_stage() {
        let mut c = counter();
        feed(&mut c, &[170.0, 100.0, 40.0], 0);
        assert_eq!(c.state().stage, LimbStage::Up);

        for t in [300, 400, 500] {
            let outcome = c.update(None, t);
            assert_eq!(outcome, StepOutcome::default());
        }
        assert_eq!(c.state().stage, LimbStage::Lost);
        assert_eq!(c.state().current_angle, None);
        assert_eq!(c.state().feedback.as_ref().unwrap().kind, FeedbackKind::PoseLost);

        // Back from Up: one step to TransitionDown, then the rep completes.
        c.update(angle(170.0), 600);
        assert_eq!(c.state().stage, LimbStage::TransitionDown);
        c.update(angle(170.0), 700);
        assert_eq!(c.state().rep_count, 1);
        assert_eq!(c.state().last_rep_ms, Some(600));
    }

    #[test]
    fn compliment_follows_rep_then_expires() {
        let mut c = counter();
        let t = feed(&mut c, &[170.0, 100.0, 40.0, 100.0, 170.0], 0);
        assert_eq!(c.state().feedback.as_ref().unwrap().kind, FeedbackKind::Compliment);

        c.update(angle(170.0), t + 5_000);
        assert_eq!(c.state().feedback.as_ref().unwrap().kind, FeedbackKind::MaintainForm);
    }

    #[test]
    fn aborted_cycle_clears_start_time() {
        let mut c = counter();
        feed(&mut c, &[170.0, 120.0, 165.0], 0);
        assert_eq!(c.state().stage, LimbStage::Down);
        assert_eq!(c.state().rep_started_ms, None);
        assert_eq!(c.state().rep_count, 0);
    }
}
