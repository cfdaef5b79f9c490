use serde::Serialize;
use thiserror::Error;

/// Protocol and configuration failures surfaced to the caller.
///
/// Per-frame input problems (hidden or missing landmarks) never become
/// errors; they degrade the affected limb to `Lost` instead.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingError {
    #[error("a tracking session is already active")]
    AlreadyActive,

    #[error("no tracking session has been started")]
    NoSession,

    #[error("tracking session {session_id} has already stopped")]
    SessionStopped { session_id: String },

    #[error("calibration did not complete within {timeout_ms} ms")]
    CalibrationTimeout { timeout_ms: u64 },

    #[error("invalid exercise configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl TrackingError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        TrackingError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Stable code for the service layer.
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::AlreadyActive => "ALREADY_ACTIVE",
            TrackingError::NoSession => "NO_SESSION",
            TrackingError::SessionStopped { .. } => "SESSION_STOPPED",
            TrackingError::CalibrationTimeout { .. } => "CALIBRATION_TIMEOUT",
            TrackingError::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_code_tag() {
        let json = serde_json::to_value(TrackingError::CalibrationTimeout { timeout_ms: 500 }).unwrap();
        assert_eq!(json["code"], "CALIBRATION_TIMEOUT");
        assert_eq!(json["timeout_ms"], 500);
        assert_eq!(TrackingError::AlreadyActive.code(), "ALREADY_ACTIVE");
    }
}
