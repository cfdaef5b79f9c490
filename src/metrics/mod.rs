mod types;

pub use types::{FrameTiming, MetricsSnapshot};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_FRAMES: usize = 50;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_frames: Vec<FrameTiming>,
    processed_count: u64,
    dropped_count: u64,
    rejected_count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_frames: Vec::with_capacity(MAX_RECENT_FRAMES),
                processed_count: 0,
                dropped_count: 0,
                rejected_count: 0,
            })),
        }
    }

    pub async fn record_frame(&self, timing: FrameTiming) {
        let mut state = self.inner.lock().await;

        state.processed_count += 1;
        state.recent_frames.push(timing);

        if state.recent_frames.len() > MAX_RECENT_FRAMES {
            state.recent_frames.remove(0);
        }
    }

    pub async fn record_dropped(&self) {
        self.inner.lock().await.dropped_count += 1;
    }

    pub async fn record_rejected(&self) {
        self.inner.lock().await.rejected_count += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;

        let average_processing_us = if state.recent_frames.is_empty() {
            None
        } else {
            let total: u64 = state.recent_frames.iter().map(|f| f.processing_us).sum();
            Some(total / state.recent_frames.len() as u64)
        };

        MetricsSnapshot {
            recent_frames: state.recent_frames.clone(),
            processed_count: state.processed_count,
            dropped_count: state.dropped_count,
            rejected_count: state.rejected_count,
            average_processing_us,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.recent_frames.clear();
        state.processed_count = 0;
        state.dropped_count = 0;
        state.rejected_count = 0;
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
