//! Progress figures computed from stored sessions.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::StoredSession;

/// Accuracy points lost per error, scaled by reps.
const ERROR_PENALTY: f64 = 20.0;
const ADHERENCE_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryEntry {
    pub session_id: String,
    pub date: NaiveDate,
    pub reps: u32,
    pub accuracy: u8,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTotal {
    pub exercise_id: String,
    pub total_reps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalytics {
    pub history: Vec<SessionHistoryEntry>,
    /// In order of first appearance.
    pub exercise_stats: Vec<ExerciseTotal>,
    pub average_accuracy: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RiskStatus {
    Normal,
    Alert,
    HighRisk,
}

impl RiskStatus {
    pub fn from_accuracy(accuracy: u8) -> Self {
        if accuracy < 60 {
            RiskStatus::HighRisk
        } else if accuracy < 80 {
            RiskStatus::Alert
        } else {
            RiskStatus::Normal
        }
    }

    /// Errors in a session without reps still count against it here.
    pub fn for_session(session: &StoredSession) -> Self {
        Self::from_accuracy(accuracy_ratio(session.total_errors, session.total_reps.max(1)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryProgress {
    /// Consecutive training days ending today, or yesterday if today has none yet.
    pub current_streak: u32,
    /// Share of the last seven days with at least one session.
    pub adherence_pct: u8,
    /// Left/right rep imbalance, 0 when no sided reps were recorded.
    pub asymmetry_pct: f32,
    pub last_status: RiskStatus,
}

/// 100 when no reps were recorded.
pub fn session_accuracy(reps: u32, errors: u32) -> u8 {
    if reps == 0 {
        return 100;
    }
    accuracy_ratio(errors, reps)
}

fn accuracy_ratio(errors: u32, reps: u32) -> u8 {
    let penalty = (f64::from(errors) / f64::from(reps) * ERROR_PENALTY).floor();
    (100.0 - penalty).max(0.0) as u8
}

pub fn detailed_analytics(sessions: &[StoredSession]) -> DetailedAnalytics {
    let mut history = Vec::with_capacity(sessions.len());
    let mut exercise_stats: Vec<ExerciseTotal> = Vec::new();
    let mut accuracy_sum = 0u32;
    let mut scored = 0u32;

    for session in sessions {
        let accuracy = session_accuracy(session.total_reps, session.total_errors);
        history.push(SessionHistoryEntry {
            session_id: session.id.clone(),
            date: session.started_at.date_naive(),
            reps: session.total_reps,
            accuracy,
            duration_ms: session.duration_ms,
        });

        match exercise_stats
            .iter_mut()
            .find(|total| total.exercise_id == session.exercise_id)
        {
            Some(total) => total.total_reps += session.total_reps,
            None => exercise_stats.push(ExerciseTotal {
                exercise_id: session.exercise_id.clone(),
                total_reps: session.total_reps,
            }),
        }

        if session.total_reps > 0 {
            accuracy_sum += u32::from(accuracy);
            scored += 1;
        }
    }

    let average_accuracy = if scored == 0 {
        100
    } else {
        (f64::from(accuracy_sum) / f64::from(scored)).round() as u8
    };

    DetailedAnalytics {
        history,
        exercise_stats,
        average_accuracy,
    }
}

/// `None` when there is nothing to report on.
pub fn recovery_progress(sessions: &[StoredSession], today: NaiveDate) -> Option<RecoveryProgress> {
    let last = sessions.iter().max_by_key(|session| session.started_at)?;
    let days: HashSet<NaiveDate> = sessions
        .iter()
        .map(|session| session.started_at.date_naive())
        .collect();

    let mut cursor = today;
    if !days.contains(&cursor) {
        if let Some(yesterday) = cursor.checked_sub_days(Days::new(1)) {
            cursor = yesterday;
        }
    }
    let mut current_streak = 0;
    while days.contains(&cursor) {
        current_streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(previous) => cursor = previous,
            None => break,
        }
    }

    let trained = (0..ADHERENCE_WINDOW_DAYS)
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .filter(|day| days.contains(day))
        .count() as u64;
    let adherence_pct = (trained * 100 / ADHERENCE_WINDOW_DAYS) as u8;

    let left: u32 = sessions.iter().map(|s| s.reps_for("left")).sum();
    let right: u32 = sessions.iter().map(|s| s.reps_for("right")).sum();
    let sided = left + right;
    let asymmetry_pct = if sided == 0 {
        0.0
    } else {
        left.abs_diff(right) as f32 / sided as f32 * 100.0
    };

    Some(RecoveryProgress {
        current_streak,
        adherence_pct,
        asymmetry_pct,
        last_status: RiskStatus::for_session(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::ExerciseKind;
    use crate::session::StopReason;
    use chrono::{TimeZone, Utc};

    fn stored(id: &str, exercise: &str, day: u32, reps: u32, errors: u32) -> StoredSession {
        let started_at = Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap();
        StoredSession {
            id: id.to_string(),
            exercise_id: exercise.to_string(),
            kind: ExerciseKind::BicepCurl,
            started_at,
            stopped_at: started_at,
            duration_ms: 60_000,
            stop_reason: StopReason::UserRequested,
            total_reps: reps,
            total_errors: errors,
            mismatch_count: 0,
            limb_reps: Vec::new(),
            created_at: started_at,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn accuracy_penalizes_errors_per_rep() {
        assert_eq!(session_accuracy(0, 3), 100);
        assert_eq!(session_accuracy(10, 0), 100);
        assert_eq!(session_accuracy(10, 1), 98);
        assert_eq!(session_accuracy(3, 1), 94);
        assert_eq!(session_accuracy(2, 20), 0);
    }

    #[test]
    fn risk_thresholds() {
        assert_eq!(RiskStatus::from_accuracy(59), RiskStatus::HighRisk);
        assert_eq!(RiskStatus::from_accuracy(60), RiskStatus::Alert);
        assert_eq!(RiskStatus::from_accuracy(79), RiskStatus::Alert);
        assert_eq!(RiskStatus::from_accuracy(80), RiskStatus::Normal);
        assert_eq!(
            RiskStatus::for_session(&stored("a", "curl", 1, 0, 3)),
            RiskStatus::HighRisk
        );
    }

    #[test]
    fn detailed_analytics_aggregates() {
        let sessions = vec![
            stored("a", "bicep_curl", 1, 10, 1),
            stored("b", "squat", 2, 5, 0),
            stored("c", "bicep_curl", 3, 0, 0),
            stored("d", "bicep_curl", 4, 10, 5),
        ];
        let analytics = detailed_analytics(&sessions);

        let accuracies: Vec<u8> = analytics.history.iter().map(|e| e.accuracy).collect();
        assert_eq!(accuracies, [98, 100, 100, 90]);
        assert_eq!(analytics.history[1].date, date(2));
        assert_eq!(
            analytics.exercise_stats,
            [
                ExerciseTotal {
                    exercise_id: "bicep_curl".to_string(),
                    total_reps: 20
                },
                ExerciseTotal {
                    exercise_id: "squat".to_string(),
                    total_reps: 5
                },
            ]
        );
        // Session "c" has no reps and is left out of the average.
        assert_eq!(analytics.average_accuracy, 96);
    }

    #[test]
    fn empty_history_defaults() {
        let analytics = detailed_analytics(&[]);
        assert!(analytics.history.is_empty());
        assert_eq!(analytics.average_accuracy, 100);
        assert_eq!(recovery_progress(&[], date(10)), None);
    }

    #[test]
    fn streak_adherence_and_asymmetry() {
        let mut first = stored("a", "bicep_curl", 6, 10, 0);
        first.limb_reps = vec![("left".to_string(), 6), ("right".to_string(), 4)];
        let mut second = stored("b", "bicep_curl", 8, 10, 0);
        second.limb_reps = vec![("left".to_string(), 5), ("right".to_string(), 5)];
        let third = stored("c", "squat", 9, 8, 4);

        let progress = recovery_progress(&[first, second, third], date(10)).unwrap();
        // Nothing today, so the streak counts back from yesterday: 9 and 8.
        assert_eq!(progress.current_streak, 2);
        assert_eq!(progress.adherence_pct, 42);
        assert!((progress.asymmetry_pct - 10.0).abs() < 1e-4);
        assert_eq!(progress.last_status, RiskStatus::Normal);
    }

    #[test]
    fn streak_breaks_after_gap() {
        let sessions = vec![stored("a", "squat", 1, 5, 0)];
        let progress = recovery_progress(&sessions, date(10)).unwrap();
        assert_eq!(progress.current_streak, 0);
        assert_eq!(progress.adherence_pct, 0);
        assert_eq!(progress.asymmetry_pct, 0.0);
    }
}
