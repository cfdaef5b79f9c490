//! Replays newline-delimited JSON landmark frames from stdin through a
//! tracking session, printing one snapshot per frame and the final summary.
//!
//! Environment:
//! - `PHYSIOCHECK_EXERCISE`: preset name (`bicepCurl`, `squat`, ...) or a path
//!   to an exercise config JSON file. Defaults to `bicepCurl`.
//! - `PHYSIOCHECK_SETTINGS`: optional tracker settings JSON file.
//! - `PHYSIOCHECK_DB`: optional SQLite file the summary is saved to.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use physiocheck_lib::{
    init_logging, preset_by_name, Database, ExerciseConfig, LandmarkFrame, SettingsStore,
    TrackerSettings, TrackingController, TrackingError,
};

fn load_exercise(source: &str) -> Result<ExerciseConfig> {
    if let Some(config) = preset_by_name(source) {
        return Ok(config);
    }

    let contents = fs::read_to_string(source)
        .with_context(|| format!("{source} is neither a preset nor a readable config file"))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse exercise config {source}"))
}

fn load_settings() -> Result<TrackerSettings> {
    match env::var_os("PHYSIOCHECK_SETTINGS") {
        Some(path) => Ok(SettingsStore::new(PathBuf::from(path))?.settings()),
        None => Ok(TrackerSettings::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let settings = load_settings()?;
    let exercise = env::var("PHYSIOCHECK_EXERCISE").unwrap_or_else(|_| "bicepCurl".to_string());
    let mut config = load_exercise(&exercise)?;
    settings.apply_to(&mut config);

    let database = env::var_os("PHYSIOCHECK_DB")
        .map(|path| Database::new(PathBuf::from(path)))
        .transpose()?;

    let controller = TrackingController::with_settings(database, &settings);
    let session = controller.start_session(config).await?;
    info!("replaying frames into session {}", session.session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let frame: LandmarkFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("skipping line {line_number}: {err}");
                continue;
            }
        };

        match controller.push_frame(&frame).await {
            Ok(snapshot) => println!("{}", serde_json::to_string(&snapshot)?),
            Err(err) => match err.downcast_ref::<TrackingError>() {
                Some(TrackingError::CalibrationTimeout { .. }) => {
                    warn!("{err}");
                    break;
                }
                Some(_) => return Err(err),
                None => return Err(err.context("frame processing failed")),
            },
        }
    }

    let summary = controller.stop_session().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
