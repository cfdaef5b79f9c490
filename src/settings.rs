use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::exercise::ExerciseConfig;

/// Tracker-wide defaults applied to every session config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Landmark confidence below which a joint is treated as not visible.
    pub min_visibility: f32,
    pub countdown_ms: u64,
    /// `None` lets calibration wait forever.
    pub calibration_timeout_ms: Option<u64>,
    pub max_history_samples: usize,
    pub smoothing_window: usize,
    /// Frames buffered between the capture side and the worker.
    pub frame_channel_capacity: usize,
    pub verify_exercise: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            min_visibility: 0.6,
            countdown_ms: 3_000,
            calibration_timeout_ms: Some(30_000),
            max_history_samples: 6_000,
            smoothing_window: 1,
            frame_channel_capacity: 32,
            verify_exercise: true,
        }
    }
}

impl TrackerSettings {
    pub fn apply_to(&self, config: &mut ExerciseConfig) {
        config.min_visibility = self.min_visibility;
        config.countdown_ms = self.countdown_ms;
        config.calibration_timeout_ms = self.calibration_timeout_ms;
        config.max_history_samples = self.max_history_samples;
        config.smoothing_window = self.smoothing_window;
        config.verify_exercise = self.verify_exercise;
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> TrackerSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TrackerSettings =
            serde_json::from_str(&contents).context("Failed to parse settings")?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::presets;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("physiocheck-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_uses_defaults() {
        let store = SettingsStore::new(temp_path()).unwrap();
        assert_eq!(store.settings(), TrackerSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let path = temp_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = TrackerSettings {
            countdown_ms: 5_000,
            calibration_timeout_ms: None,
            ..TrackerSettings::default()
        };
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.settings(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.settings(), settings);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_path();
        fs::write(&path, r#"{"countdownMs": 1000}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings().countdown_ms, 1_000);
        assert_eq!(store.settings().frame_channel_capacity, 32);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn applies_to_exercise_config() {
        let mut config = presets::squat();
        let settings = TrackerSettings {
            min_visibility: 0.8,
            countdown_ms: 0,
            ..TrackerSettings::default()
        };
        settings.apply_to(&mut config);
        assert_eq!(config.min_visibility, 0.8);
        assert_eq!(config.countdown_ms, 0);
        assert_eq!(config.validate(), Ok(()));
    }
}
