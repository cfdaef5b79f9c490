pub mod angles;
pub mod landmarks;
pub mod verifier;

pub use angles::{calculate_angle, measure_joint, AngleSmoother, JointAngle, JointTriple};
pub use landmarks::{landmark_name, Landmark, LandmarkFrame, LandmarkIndex};
pub use verifier::{check_mismatch, ConflictingMovement};
