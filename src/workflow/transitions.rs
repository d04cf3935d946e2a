//! Transition Table
//!
//! Step → next step, either unconditionally or through a decision function
//! evaluated against the state the step produced.

use super::state::WorkflowState;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowStep {
    ExtractTask,
    GenerateQuery,
    ValidateQuery,
    ExecuteQuery,
    SynthesizeInsight,
    Report,
    IncrementRetry,
}

impl WorkflowStep {
    pub const ENTRY: WorkflowStep = WorkflowStep::ExtractTask;

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExtractTask => "extract_task",
            Self::GenerateQuery => "generate_query",
            Self::ValidateQuery => "validate_query",
            Self::ExecuteQuery => "execute_query",
            Self::SynthesizeInsight => "synthesize_insight",
            Self::Report => "report",
            Self::IncrementRetry => "increment_retry",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Continue,
    Retry,
    Failed,
}

impl Decision {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Retry => "retry",
            Self::Failed => "failed",
        }
    }
}

pub type DecideFn = fn(&WorkflowState, u32) -> Decision;

#[derive(Clone, Copy)]
pub enum Edge {
    Always(WorkflowStep),
    Branch {
        decide: DecideFn,
        on_continue: WorkflowStep,
        on_retry: WorkflowStep,
        on_failed: WorkflowStep,
    },
    Terminal,
}

/// The outgoing edge of every step.
pub const fn edge(step: WorkflowStep) -> Edge {
    use WorkflowStep::*;
    match step {
        ExtractTask => Edge::Always(GenerateQuery),
        GenerateQuery => Edge::Always(ValidateQuery),
        ValidateQuery => Edge::Branch {
            decide: should_retry_query,
            on_continue: ExecuteQuery,
            on_retry: IncrementRetry,
            on_failed: Report,
        },
        IncrementRetry => Edge::Always(GenerateQuery),
        ExecuteQuery => Edge::Branch {
            decide: should_retry_execution,
            on_continue: SynthesizeInsight,
            on_retry: IncrementRetry,
            on_failed: Report,
        },
        SynthesizeInsight => Edge::Always(Report),
        Report => Edge::Terminal,
    }
}

/// Next step after `step` given the state it produced, with the decision
/// taken when the edge branches. `None` once the run is over.
pub fn next_step(
    step: WorkflowStep,
    state: &WorkflowState,
    max_retries: u32,
) -> Option<(WorkflowStep, Option<Decision>)> {
    match edge(step) {
        Edge::Always(next) => Some((next, None)),
        Edge::Branch {
            decide,
            on_continue,
            on_retry,
            on_failed,
        } => {
            let decision = decide(state, max_retries);
            let next = match decision {
                Decision::Continue => on_continue,
                Decision::Retry => on_retry,
                Decision::Failed => on_failed,
            };
            Some((next, Some(decision)))
        }
        Edge::Terminal => None,
    }
}

fn retry_or_fail(state: &WorkflowState, max_retries: u32) -> Decision {
    if state.retry_count() < max_retries {
        Decision::Retry
    } else {
        Decision::Failed
    }
}

pub fn should_retry_query(state: &WorkflowState, max_retries: u32) -> Decision {
    match state.validation_result() {
        Some(result) if result.is_valid => Decision::Continue,
        _ => retry_or_fail(state, max_retries),
    }
}

pub fn should_retry_execution(state: &WorkflowState, max_retries: u32) -> Decision {
    if state.query_result().is_some() {
        Decision::Continue
    } else {
        retry_or_fail(state, max_retries)
    }
}
