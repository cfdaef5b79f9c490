pub mod aggregator;
pub mod calibration;
pub mod controller;
pub mod manager;
pub mod state;
pub mod worker;

pub use aggregator::SessionAggregator;
pub use calibration::{CalibrationReport, CalibrationStatus, Calibrator};
pub use controller::TrackingController;
pub use manager::{SessionManager, SessionState};
pub use state::{
    ActiveSnapshot, CalibratingSnapshot, CountdownSnapshot, HistorySample, LimbSample,
    LimbSummary, SessionInfo, SessionPhase, SessionSnapshot, SessionSummary, StopReason,
};
pub use worker::{FrameWorker, SubmitOutcome};
