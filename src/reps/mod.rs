pub mod counter;
pub mod state;

pub use counter::{RepCounter, RepCounterSettings, StepOutcome};
pub use state::{Feedback, FeedbackKind, LimbRepState, LimbStage, Severity};
