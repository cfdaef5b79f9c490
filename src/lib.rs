pub mod analytics;
pub mod db;
pub mod error;
pub mod exercise;
pub mod metrics;
pub mod pose;
pub mod reps;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod utils;

pub use analytics::{detailed_analytics, recovery_progress, DetailedAnalytics, RiskStatus};
pub use db::{Database, StoredSession};
pub use error::TrackingError;
pub use exercise::{preset, preset_by_name, ExerciseConfig, ExerciseKind};
pub use pose::{Landmark, LandmarkFrame};
pub use scoring::{score_pose, AccuracyTier, PoseScore, ReferencePose, ScoringConfig};
pub use session::{
    SessionManager, SessionPhase, SessionSnapshot, SessionSummary, StopReason,
    TrackingController,
};
pub use settings::{SettingsStore, TrackerSettings};
pub use utils::init_logging;
