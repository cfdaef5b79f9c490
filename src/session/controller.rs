use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};

use crate::db::Database;
use crate::exercise::ExerciseConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pose::LandmarkFrame;
use crate::settings::TrackerSettings;

use super::manager::SessionManager;
use super::state::{SessionInfo, SessionSnapshot, SessionSummary};
use super::worker::{process_frame, FrameWorker, SubmitOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Async front of the tracker: owns the session, the frame worker and the
/// snapshot channel, and saves summaries when a store is attached.
#[derive(Clone)]
pub struct TrackingController {
    manager: Arc<Mutex<SessionManager>>,
    worker: Arc<Mutex<Option<FrameWorker>>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    metrics: MetricsCollector,
    db: Option<Database>,
    channel_capacity: usize,
}

impl TrackingController {
    pub fn new(db: Option<Database>) -> Self {
        Self::with_settings(db, &TrackerSettings::default())
    }

    pub fn with_settings(db: Option<Database>, settings: &TrackerSettings) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::Inactive);
        Self {
            manager: Arc::new(Mutex::new(SessionManager::new())),
            worker: Arc::new(Mutex::new(None)),
            snapshots: Arc::new(snapshots),
            metrics: MetricsCollector::new(),
            db,
            channel_capacity: settings.frame_channel_capacity,
        }
    }

    pub async fn start_session(&self, config: ExerciseConfig) -> Result<SessionInfo> {
        let mut worker = self.worker.lock().await;

        let info = {
            let mut manager = self.manager.lock().await;
            let info = manager.start_session(config)?;
            self.snapshots.send_replace(manager.live_snapshot());
            info
        };

        // A worker left over from a previous, stopped session.
        if let Some(previous) = worker.take() {
            previous.cancel().await?;
        }

        self.metrics.reset().await;
        *worker = Some(FrameWorker::spawn(
            self.channel_capacity,
            Arc::clone(&self.manager),
            Arc::clone(&self.snapshots),
            self.metrics.clone(),
        ));

        log_info!("tracking started for session {}", info.session_id);
        Ok(info)
    }

    /// Queue a frame for the worker without waiting. Returns false when the
    /// frame was dropped or no session is running.
    pub async fn submit_frame(&self, frame: LandmarkFrame) -> bool {
        let worker = self.worker.lock().await;
        let Some(worker) = worker.as_ref() else {
            self.metrics.record_rejected().await;
            return false;
        };

        match worker.try_submit(frame) {
            SubmitOutcome::Accepted => true,
            SubmitOutcome::Dropped => {
                log_warn!("frame channel full, dropping frame");
                self.metrics.record_dropped().await;
                false
            }
            SubmitOutcome::Closed => {
                self.metrics.record_rejected().await;
                false
            }
        }
    }

    /// Process a frame right away and return the resulting snapshot.
    pub async fn push_frame(&self, frame: &LandmarkFrame) -> Result<SessionSnapshot> {
        let snapshot = process_frame(&self.manager, frame, &self.snapshots, &self.metrics).await?;
        Ok(snapshot)
    }

    /// Finish queued frames, stop the session and save its summary.
    pub async fn stop_session(&self) -> Result<SessionSummary> {
        if let Some(worker) = self.worker.lock().await.take() {
            worker.drain().await?;
        }

        let summary = {
            let mut manager = self.manager.lock().await;
            let summary = manager.stop_session()?;
            self.snapshots.send_replace(manager.live_snapshot());
            summary
        };

        if let Some(db) = &self.db {
            if let Err(err) = db.insert_summary(&summary).await {
                log_error!("failed to save session {}: {err:?}", summary.session_id);
                return Err(err).context("failed to save session summary");
            }
        }

        Ok(summary)
    }

    /// Stop the worker without draining. The session itself is left as is.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(worker) = self.worker.lock().await.take() {
            worker.cancel().await?;
        }
        Ok(())
    }

    pub async fn live_snapshot(&self) -> SessionSnapshot {
        self.manager.lock().await.live_snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }

    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }
}
