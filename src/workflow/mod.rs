pub mod application_flow;
pub mod attempt_ctx;

pub use application_flow::{ApplicationFlow, AttemptOutcome, AttemptRunner, FlowSettings};
pub use attempt_ctx::{ApplicationAttempt, AttemptState};
