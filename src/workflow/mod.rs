//! Retry-bounded analysis workflow

pub mod engine;
pub mod state;
pub mod transitions;

pub use engine::{RunStatus, WorkflowEngine, WorkflowOutcome, WorkflowSettings};
pub use state::WorkflowState;
pub use transitions::{Decision, WorkflowStep};
