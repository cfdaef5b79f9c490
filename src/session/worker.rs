use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackingError;
use crate::metrics::{FrameTiming, MetricsCollector};
use crate::pose::LandmarkFrame;

use super::manager::SessionManager;
use super::state::SessionSnapshot;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Channel full; the frame was discarded.
    Dropped,
    /// Worker no longer running.
    Closed,
}

/// Single consumer of the frame channel.
pub struct FrameWorker {
    sender: mpsc::Sender<LandmarkFrame>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl FrameWorker {
    pub fn spawn(
        capacity: usize,
        manager: Arc<Mutex<SessionManager>>,
        snapshots: Arc<watch::Sender<SessionSnapshot>>,
        metrics: MetricsCollector,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(frame_loop(
            receiver,
            manager,
            snapshots,
            metrics,
            cancel_token.clone(),
        ));

        Self {
            sender,
            cancel_token,
            handle,
        }
    }

    /// Never waits: a full channel drops the frame.
    pub fn try_submit(&self, frame: LandmarkFrame) -> SubmitOutcome {
        match self.sender.try_send(frame) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TrySendError::Full(_)) => SubmitOutcome::Dropped,
            Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
        }
    }

    /// Process every queued frame, then exit.
    pub async fn drain(self) -> Result<()> {
        let Self { sender, handle, .. } = self;
        drop(sender);
        handle.await.context("frame worker task failed to join")
    }

    /// Exit at the next frame boundary, discarding queued frames.
    pub async fn cancel(self) -> Result<()> {
        self.cancel_token.cancel();
        self.handle
            .await
            .context("frame worker task failed to join")
    }
}

async fn frame_loop(
    mut receiver: mpsc::Receiver<LandmarkFrame>,
    manager: Arc<Mutex<SessionManager>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    metrics: MetricsCollector,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("frame worker cancelled");
                break;
            }
            next = receiver.recv() => {
                let Some(frame) = next else {
                    log_info!("frame channel closed, worker exiting");
                    break;
                };
                if let Err(err) = process_frame(&manager, &frame, &snapshots, &metrics).await {
                    log_warn!("frame {} rejected: {err}", frame.timestamp_ms);
                }
            }
        }
    }
}

/// Run one frame through the session and publish the result.
pub async fn process_frame(
    manager: &Mutex<SessionManager>,
    frame: &LandmarkFrame,
    snapshots: &watch::Sender<SessionSnapshot>,
    metrics: &MetricsCollector,
) -> Result<SessionSnapshot, TrackingError> {
    let started = Instant::now();
    let (result, live) = {
        let mut guard = manager.lock().await;
        let result = guard.push_frame(frame);
        (result, guard.live_snapshot())
    };

    match &result {
        Ok(snapshot) => {
            metrics
                .record_frame(FrameTiming {
                    recorded_at: Utc::now(),
                    frame_timestamp_ms: frame.timestamp_ms,
                    phase: snapshot.phase(),
                    processing_us: started.elapsed().as_micros() as u64,
                })
                .await;
        }
        Err(_) => metrics.record_rejected().await,
    }

    snapshots.send_replace(live);
    result
}
