pub mod config;
pub mod presets;

pub use config::{
    AngleThresholds, CalibrationStrategy, ExerciseConfig, ExerciseKind, LimbConfig, LimbId,
};
pub use presets::{preset, preset_by_name};
