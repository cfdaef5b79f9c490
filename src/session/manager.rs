use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TrackingError;
use crate::exercise::ExerciseConfig;
use crate::pose::LandmarkFrame;

use super::aggregator::SessionAggregator;
use super::calibration::{CalibrationReport, CalibrationStatus, Calibrator};
use super::state::{
    CalibratingSnapshot, CountdownSnapshot, HistorySample, SessionInfo, SessionPhase,
    SessionSnapshot, SessionSummary, StopReason,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Everything known about the current session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub config: ExerciseConfig,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    /// Frame-clock anchors.
    calibration_started_ms: Option<u64>,
    countdown_started_ms: Option<u64>,
    active_started_ms: Option<u64>,
    last_frame_ms: Option<u64>,
    calibrator: Calibrator,
    calibration: Option<CalibrationReport>,
    aggregator: SessionAggregator,
    summary: Option<SessionSummary>,
}

impl SessionState {
    fn begin(config: ExerciseConfig, started_at: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            calibrator: Calibrator::new(config.calibration, config.thresholds, config.limbs.len()),
            aggregator: SessionAggregator::new(id.clone(), &config),
            id,
            config,
            phase: SessionPhase::Calibrating,
            started_at,
            calibration_started_ms: None,
            countdown_started_ms: None,
            active_started_ms: None,
            last_frame_ms: None,
            calibration: None,
            summary: None,
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            exercise_id: self.config.exercise_id.clone(),
            kind: self.config.kind,
            started_at: self.started_at,
            phase: self.phase,
        }
    }

    fn active_elapsed_ms(&self) -> u64 {
        match (self.active_started_ms, self.last_frame_ms) {
            (Some(start), Some(last)) => last.saturating_sub(start),
            _ => 0,
        }
    }

    fn calibrating_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::Calibrating(CalibratingSnapshot {
            session_id: self.id.clone(),
            progress: self.calibrator.progress(),
            message: self.calibrator.message().to_string(),
        })
    }

    fn countdown_snapshot(&self, now_ms: u64) -> SessionSnapshot {
        let waited = self
            .countdown_started_ms
            .map_or(0, |start| now_ms.saturating_sub(start));
        SessionSnapshot::Countdown(CountdownSnapshot {
            session_id: self.id.clone(),
            remaining_ms: self.config.countdown_ms.saturating_sub(waited),
        })
    }

    fn enter_countdown(&mut self, now_ms: u64, report: CalibrationReport) {
        if let Some(warning) = &report.warning {
            log_warn!("session {} calibration: {}", self.id, warning);
        }
        self.aggregator.set_thresholds(report.thresholds);
        self.calibration = Some(report);
        self.phase = SessionPhase::Countdown;
        self.countdown_started_ms = Some(now_ms);
        log_info!("session {} calibrated, counting down", self.id);
    }

    fn enter_active(&mut self, now_ms: u64) {
        self.phase = SessionPhase::Active;
        self.active_started_ms = Some(now_ms);
        log_info!("session {} active", self.id);
    }

    fn finalize(&mut self, reason: StopReason) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let summary = SessionSummary {
            session_id: self.id.clone(),
            exercise_id: self.config.exercise_id.clone(),
            kind: self.config.kind,
            started_at: self.started_at,
            stopped_at: Utc::now(),
            duration_ms: self.active_elapsed_ms(),
            stop_reason: reason,
            limbs: self.aggregator.limb_summaries(),
            mismatch_count: self.aggregator.mismatch_count(),
            calibration: self.calibration.clone(),
        };

        log_info!(
            "session {} stopped ({:?}) after {}ms with {} reps",
            self.id,
            reason,
            summary.duration_ms,
            summary.total_reps()
        );

        self.phase = SessionPhase::Stopped;
        self.summary = Some(summary.clone());
        summary
    }
}

/// Owns at most one session and drives it frame by frame.
#[derive(Debug, Default)]
pub struct SessionManager {
    session: Option<SessionState>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_session(&mut self, config: ExerciseConfig) -> Result<SessionInfo, TrackingError> {
        if let Some(session) = &self.session {
            if session.phase != SessionPhase::Stopped {
                return Err(TrackingError::AlreadyActive);
            }
        }

        config.validate()?;

        let session = SessionState::begin(config, Utc::now());
        log_info!(
            "session {} started for {} ({} limbs)",
            session.id,
            session.config.exercise_id,
            session.config.limbs.len()
        );

        let info = session.info();
        self.session = Some(session);
        Ok(info)
    }

    /// Process one frame to completion.
    pub fn push_frame(&mut self, frame: &LandmarkFrame) -> Result<SessionSnapshot, TrackingError> {
        let session = self.session.as_mut().ok_or(TrackingError::NoSession)?;
        let now_ms = frame.timestamp_ms;

        match session.phase {
            SessionPhase::Inactive | SessionPhase::Stopped => {
                return Err(TrackingError::SessionStopped {
                    session_id: session.id.clone(),
                });
            }
            SessionPhase::Calibrating => {
                let started = *session.calibration_started_ms.get_or_insert(now_ms);
                if let Some(timeout_ms) = session.config.calibration_timeout_ms {
                    if now_ms.saturating_sub(started) >= timeout_ms {
                        log_warn!("session {} calibration timed out", session.id);
                        session.last_frame_ms = Some(now_ms);
                        session.finalize(StopReason::CalibrationTimeout);
                        return Err(TrackingError::CalibrationTimeout { timeout_ms });
                    }
                }

                let angles = session.aggregator.measure(frame);
                session.last_frame_ms = Some(now_ms);
                match session.calibrator.update(&angles, now_ms) {
                    CalibrationStatus::InProgress { .. } => Ok(session.calibrating_snapshot()),
                    CalibrationStatus::Complete(report) => {
                        session.enter_countdown(now_ms, report);
                        if session.config.countdown_ms == 0 {
                            session.enter_active(now_ms);
                            let snapshot = session.aggregator.process(frame, now_ms, 0);
                            Ok(SessionSnapshot::Active(snapshot))
                        } else {
                            Ok(session.countdown_snapshot(now_ms))
                        }
                    }
                }
            }
            SessionPhase::Countdown => {
                session.last_frame_ms = Some(now_ms);
                let started = session.countdown_started_ms.unwrap_or(now_ms);
                if now_ms.saturating_sub(started) < session.config.countdown_ms {
                    return Ok(session.countdown_snapshot(now_ms));
                }

                session.enter_active(now_ms);
                Ok(SessionSnapshot::Active(session.aggregator.process(frame, now_ms, 0)))
            }
            SessionPhase::Active => {
                // Out-of-order frames never move the clock backwards.
                let now_ms = session.last_frame_ms.map_or(now_ms, |last| last.max(now_ms));
                session.last_frame_ms = Some(now_ms);
                let elapsed = session.active_elapsed_ms();
                Ok(SessionSnapshot::Active(
                    session.aggregator.process(frame, now_ms, elapsed),
                ))
            }
        }
    }

    /// Stop the session and return its summary. Stopping twice returns the same summary.
    pub fn stop_session(&mut self) -> Result<SessionSummary, TrackingError> {
        let session = self.session.as_mut().ok_or(TrackingError::NoSession)?;
        Ok(session.finalize(StopReason::UserRequested))
    }

    pub fn live_snapshot(&self) -> SessionSnapshot {
        let Some(session) = &self.session else {
            return SessionSnapshot::Inactive;
        };

        match session.phase {
            SessionPhase::Inactive => SessionSnapshot::Inactive,
            SessionPhase::Calibrating => session.calibrating_snapshot(),
            SessionPhase::Countdown => {
                session.countdown_snapshot(session.last_frame_ms.unwrap_or_default())
            }
            SessionPhase::Active => {
                SessionSnapshot::Active(session.aggregator.snapshot(session.active_elapsed_ms()))
            }
            SessionPhase::Stopped => match &session.summary {
                Some(summary) => SessionSnapshot::Stopped(summary.clone()),
                None => SessionSnapshot::Inactive,
            },
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Inactive, |session| session.phase)
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(SessionState::info)
    }

    pub fn history(&self) -> Option<&VecDeque<HistorySample>> {
        self.session.as_ref().map(|session| session.aggregator.history())
    }

    /// Drop a stopped session so the manager reports `Inactive` again.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        match &self.session {
            Some(session) if session.phase != SessionPhase::Stopped => {
                Err(TrackingError::AlreadyActive)
            }
            _ => {
                self.session = None;
                Ok(())
            }
        }
    }
}
