use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_kind, parse_stop_reason, to_i64, to_u32, to_u64},
    models::StoredSession,
};
use crate::exercise::LimbId;
use crate::session::{CalibrationReport, LimbSummary, SessionSummary};

fn row_to_stored(row: &Row) -> Result<StoredSession> {
    let kind: String = row.get("kind")?;
    let started_at: String = row.get("started_at")?;
    let stopped_at: String = row.get("stopped_at")?;
    let stop_reason: String = row.get("stop_reason")?;
    let created_at: String = row.get("created_at")?;

    Ok(StoredSession {
        id: row.get("id")?,
        exercise_id: row.get("exercise_id")?,
        kind: parse_kind(&kind)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_datetime(&stopped_at, "stopped_at")?,
        duration_ms: to_u64(row.get("duration_ms")?, "duration_ms")?,
        stop_reason: parse_stop_reason(&stop_reason)?,
        total_reps: to_u32(row.get("total_reps")?, "total_reps")?,
        total_errors: to_u32(row.get("total_errors")?, "total_errors")?,
        mismatch_count: to_u32(row.get("mismatch_count")?, "mismatch_count")?,
        limb_reps: Vec::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_limb(row: &Row) -> Result<LimbSummary> {
    let min_rep_ms: Option<i64> = row.get("min_rep_ms")?;
    Ok(LimbSummary {
        limb: LimbId::new(row.get::<_, String>("limb")?),
        total_reps: to_u32(row.get("total_reps")?, "total_reps")?,
        min_rep_ms: min_rep_ms.map(|ms| to_u64(ms, "min_rep_ms")).transpose()?,
        error_count: to_u32(row.get("error_count")?, "error_count")?,
    })
}

impl Database {
    /// Persist a finalized summary. Saving the same session again replaces it.
    pub async fn insert_summary(&self, summary: &SessionSummary) -> Result<()> {
        let record = summary.clone();
        self.execute(move |conn| {
            let calibration_json = record
                .calibration
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("failed to encode calibration report")?;

            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM limb_results WHERE session_id = ?1",
                params![record.session_id],
            )?;
            tx.execute("DELETE FROM sessions WHERE id = ?1", params![record.session_id])?;
            tx.execute(
                "INSERT INTO sessions (id, exercise_id, kind, started_at, stopped_at, duration_ms, stop_reason, total_reps, total_errors, mismatch_count, calibration_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.session_id,
                    record.exercise_id,
                    record.kind.as_str(),
                    record.started_at.to_rfc3339(),
                    record.stopped_at.to_rfc3339(),
                    to_i64(record.duration_ms)?,
                    record.stop_reason.as_str(),
                    record.total_reps(),
                    record.total_errors(),
                    record.mismatch_count,
                    calibration_json,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to insert session")?;

            for (position, limb) in record.limbs.iter().enumerate() {
                tx.execute(
                    "INSERT INTO limb_results (session_id, position, limb, total_reps, min_rep_ms, error_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.session_id,
                        to_i64(position as u64)?,
                        limb.limb.as_str(),
                        limb.total_reps,
                        limb.min_rep_ms.map(to_i64).transpose()?,
                        limb.error_count,
                    ],
                )
                .context("failed to insert limb result")?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, exercise_id, kind, started_at, stopped_at, duration_ms, stop_reason, total_reps, total_errors, mismatch_count, calibration_json, created_at
                 FROM sessions
                 WHERE id = ?1",
            )?;

            let stored = stmt
                .query_row(params![session_id], |row| {
                    let calibration: Option<String> = row.get("calibration_json")?;
                    Ok((row_to_stored(row), calibration))
                })
                .optional()?;

            let Some((stored, calibration_json)) = stored else {
                return Ok(None);
            };
            let stored = stored?;

            let calibration = calibration_json
                .map(|json| serde_json::from_str::<CalibrationReport>(&json))
                .transpose()
                .context("failed to decode calibration report")?;

            let mut stmt = conn.prepare(
                "SELECT limb, total_reps, min_rep_ms, error_count
                 FROM limb_results
                 WHERE session_id = ?1
                 ORDER BY position ASC",
            )?;
            let mut rows = stmt.query(params![stored.id])?;
            let mut limbs = Vec::new();
            while let Some(row) = rows.next()? {
                limbs.push(row_to_limb(row)?);
            }

            Ok(Some(SessionSummary {
                session_id: stored.id,
                exercise_id: stored.exercise_id,
                kind: stored.kind,
                started_at: stored.started_at,
                stopped_at: stored.stopped_at,
                duration_ms: stored.duration_ms,
                stop_reason: stored.stop_reason,
                limbs,
                mismatch_count: stored.mismatch_count,
                calibration,
            }))
        })
        .await
    }

    /// All stored sessions, oldest first.
    pub async fn list_summaries(&self) -> Result<Vec<StoredSession>> {
        self.execute(|conn| {
            let mut limb_reps: HashMap<String, Vec<(String, u32)>> = HashMap::new();
            {
                let mut stmt = conn.prepare(
                    "SELECT session_id, limb, total_reps
                     FROM limb_results
                     ORDER BY session_id, position ASC",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let session_id: String = row.get(0)?;
                    let limb: String = row.get(1)?;
                    let reps = to_u32(row.get(2)?, "total_reps")?;
                    limb_reps.entry(session_id).or_default().push((limb, reps));
                }
            }

            let mut stmt = conn.prepare(
                "SELECT id, exercise_id, kind, started_at, stopped_at, duration_ms, stop_reason, total_reps, total_errors, mismatch_count, created_at
                 FROM sessions
                 ORDER BY started_at ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                let mut stored = row_to_stored(row)?;
                stored.limb_reps = limb_reps.remove(&stored.id).unwrap_or_default();
                sessions.push(stored);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM limb_results WHERE session_id = ?1", params![session_id])?;
            let deleted = tx.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{AngleThresholds, CalibrationStrategy, ExerciseKind};
    use crate::session::StopReason;
    use chrono::{Duration, TimeZone};

    fn summary(id: &str, minutes: i64) -> SessionSummary {
        let started_at =
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        SessionSummary {
            session_id: id.to_string(),
            exercise_id: "bicep_curl".to_string(),
            kind: ExerciseKind::BicepCurl,
            started_at,
            stopped_at: started_at + Duration::minutes(5),
            duration_ms: 280_000,
            stop_reason: StopReason::UserRequested,
            limbs: vec![
                LimbSummary {
                    limb: LimbId::left(),
                    total_reps: 10,
                    min_rep_ms: Some(1_200),
                    error_count: 2,
                },
                LimbSummary {
                    limb: LimbId::right(),
                    total_reps: 8,
                    min_rep_ms: None,
                    error_count: 0,
                },
            ],
            mismatch_count: 1,
            calibration: Some(CalibrationReport {
                strategy: CalibrationStrategy::default(),
                thresholds: AngleThresholds {
                    lower: 160.0,
                    upper: 45.0,
                    over_extension_margin: 15.0,
                    over_contraction_margin: 15.0,
                },
                observed_min: None,
                observed_max: None,
                warning: None,
            }),
        }
    }

    #[tokio::test]
    async fn summary_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let original = summary("s-1", 0);
        db.insert_summary(&original).await.unwrap();

        let loaded = db.get_summary("s-1").await.unwrap();
        assert_eq!(loaded, Some(original));
        assert_eq!(db.get_summary("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_is_ordered_with_limb_reps() {
        let db = Database::open_in_memory().unwrap();
        db.insert_summary(&summary("later", 60)).await.unwrap();
        db.insert_summary(&summary("earlier", 0)).await.unwrap();

        let sessions = db.list_summaries().await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["earlier", "later"]);
        assert_eq!(sessions[0].total_reps, 18);
        assert_eq!(sessions[0].total_errors, 2);
        assert_eq!(sessions[0].reps_for("left"), 10);
        assert_eq!(sessions[0].reps_for("right"), 8);
    }

    #[tokio::test]
    async fn saving_twice_replaces() {
        let db = Database::open_in_memory().unwrap();
        let mut record = summary("s-1", 0);
        db.insert_summary(&record).await.unwrap();
        record.limbs.pop();
        db.insert_summary(&record).await.unwrap();

        let sessions = db.list_summaries().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].limb_reps.len(), 1);

        assert!(db.delete_session("s-1").await.unwrap());
        assert!(db.list_summaries().await.unwrap().is_empty());
    }
}
