//! Workflow Engine
//!
//! Transition functions plus the driver loop that walks the transition table
//! from `ExtractTask` to `Report`. Collaborator failures are recorded on the
//! state and routed by the retry policy; only a malformed ticket escapes.

use super::state::WorkflowState;
use super::transitions::{next_step, WorkflowStep};
use crate::agent_prompts::RetryFeedback;
use crate::db::QueryExecutor;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::models::{DatabaseSchema, Insight, Ticket, ValidationResult};
use crate::tools::insight_synthesizer::DEFAULT_SAMPLE_ROWS;
use crate::tools::{InsightSynthesizer, SqlGenerator, SqlValidator};
use crate::tracker::TicketReporter;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const NO_QUERY_TO_VALIDATE: &str = "No SQL query to validate";
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_retries: u32,
    pub in_progress_status: String,
    pub sample_rows: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            in_progress_status: "In Progress".to_string(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub final_state: WorkflowState,
    pub path: Vec<WorkflowStep>,
    pub report_comment: String,
}

impl WorkflowOutcome {
    pub fn ticket_id(&self) -> &str {
        &self.final_state.ticket().ticket_id
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn generation_attempts(&self) -> usize {
        self.path
            .iter()
            .filter(|s| **s == WorkflowStep::GenerateQuery)
            .count()
    }
}

pub struct WorkflowEngine {
    generator: SqlGenerator,
    validator: SqlValidator,
    synthesizer: InsightSynthesizer,
    executor: Arc<dyn QueryExecutor>,
    reporter: Arc<dyn TicketReporter>,
    schema: Arc<DatabaseSchema>,
    settings: WorkflowSettings,
}

impl WorkflowEngine {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        schema: Arc<DatabaseSchema>,
        executor: Arc<dyn QueryExecutor>,
        reporter: Arc<dyn TicketReporter>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(llm.clone()),
            validator: SqlValidator::new(),
            synthesizer: InsightSynthesizer::new(llm).with_sample_rows(settings.sample_rows),
            executor,
            reporter,
            schema,
            settings,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.settings.max_retries
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Runs one ticket to its terminal state. Errors only for a malformed
    /// ticket; every other failure ends in a failure report.
    pub async fn run(&self, ticket: impl Into<Arc<Ticket>>) -> Result<WorkflowOutcome> {
        let ticket: Arc<Ticket> = ticket.into();
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow", ticket_id = %ticket.ticket_id, run_id = %run_id);
        self.drive(WorkflowState::new(ticket), run_id)
            .instrument(span)
            .await
    }

    async fn drive(&self, initial: WorkflowState, run_id: Uuid) -> Result<WorkflowOutcome> {
        let mut state = initial;
        let mut step = WorkflowStep::ENTRY;
        let mut path = Vec::new();
        let mut report = None;

        loop {
            path.push(step);
            state = match step {
                WorkflowStep::ExtractTask => self.extract_task(&state)?,
                WorkflowStep::GenerateQuery => self.generate_query(&state).await,
                WorkflowStep::ValidateQuery => self.validate_query(&state),
                WorkflowStep::ExecuteQuery => self.execute_query(&state).await,
                WorkflowStep::SynthesizeInsight => self.synthesize_insight(&state).await,
                WorkflowStep::IncrementRetry => increment_retry(&state),
                WorkflowStep::Report => {
                    report = Some(self.report(&state).await);
                    state
                }
            };

            match next_step(step, &state, self.settings.max_retries) {
                Some((next, Some(decision))) => {
                    info!("{} -> {} ({})", step, next, decision.code());
                    step = next;
                }
                Some((next, None)) => step = next,
                None => break,
            }
        }

        let (status, report_comment) =
            report.unwrap_or_else(|| (RunStatus::Failed, String::new()));

        Ok(WorkflowOutcome {
            run_id,
            status,
            final_state: state,
            path,
            report_comment,
        })
    }

    pub fn extract_task(&self, state: &WorkflowState) -> Result<WorkflowState> {
        let ticket = state.ticket();
        info!("Extracting task from ticket {}", ticket.ticket_id);
        ticket.validate()?;
        Ok(state.with_task_description(ticket.description.clone()))
    }

    pub async fn generate_query(&self, state: &WorkflowState) -> WorkflowState {
        let task = state.task_description().unwrap_or_default();
        let feedback = retry_feedback(state);

        match self.generator.generate(task, &self.schema, feedback.as_ref()).await {
            Ok(query) => {
                info!("Generated query: {}", query);
                state.with_candidate_query(Some(query)).with_error(None)
            }
            Err(e) => {
                error!("Error generating SQL: {}", e);
                state
                    .with_candidate_query(None)
                    .with_error(Some(e.to_string()))
            }
        }
    }

    pub fn validate_query(&self, state: &WorkflowState) -> WorkflowState {
        let Some(query) = state.candidate_query() else {
            let result = ValidationResult::invalid(NO_QUERY_TO_VALIDATE);
            let error = state
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| result.error_summary());
            return state
                .with_validation_result(result)
                .with_error(Some(error));
        };

        let result = self.validator.validate(query, &self.schema);
        if result.is_valid {
            info!("Query passed validation");
            state.with_validation_result(result)
        } else {
            warn!("Query failed validation: {}", result.error_summary());
            let error = result.error_summary();
            state
                .with_validation_result(result)
                .with_error(Some(error))
        }
    }

    pub async fn execute_query(&self, state: &WorkflowState) -> WorkflowState {
        let Some(query) = state.candidate_query() else {
            return state
                .with_query_result(None)
                .with_error(Some("No SQL query to execute".to_string()));
        };

        match self.executor.execute(query).await {
            Ok(result) => {
                info!("Query returned {} rows", result.row_count);
                state.with_query_result(Some(result)).with_error(None)
            }
            Err(e) => {
                error!("Error executing query: {}", e);
                state
                    .with_query_result(None)
                    .with_error(Some(e.to_string()))
            }
        }
    }

    pub async fn synthesize_insight(&self, state: &WorkflowState) -> WorkflowState {
        let insight = match state.query_result() {
            Some(result) => {
                let task = state.task_description().unwrap_or_default();
                self.synthesizer.synthesize(task, result).await
            }
            None => Insight {
                summary: "Unable to generate insights - no query results available.".to_string(),
                key_points: vec!["Query execution failed.".to_string()],
                recommendations: None,
            },
        };
        state.with_insight(insight)
    }

    /// Posts the outcome to the ticket. Reporter failures are logged and do
    /// not change the status already decided by the workflow.
    pub async fn report(&self, state: &WorkflowState) -> (RunStatus, String) {
        let ticket_id = &state.ticket().ticket_id;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

        let (status, comment) = match state.insight() {
            Some(insight) => (
                RunStatus::Succeeded,
                format_success_comment(state, insight, &timestamp),
            ),
            None => (RunStatus::Failed, format_failure_comment(state, &timestamp)),
        };

        info!("Updating ticket {}", ticket_id);

        if let Err(e) = self
            .reporter
            .transition_status(ticket_id, &self.settings.in_progress_status)
            .await
        {
            warn!(
                "Failed to transition {} to '{}': {}",
                ticket_id, self.settings.in_progress_status, e
            );
        }

        if let Err(e) = self.reporter.add_comment(ticket_id, &comment).await {
            warn!("Failed to post comment on {}: {}", ticket_id, e);
        }

        match status {
            RunStatus::Succeeded => info!("Successfully processed ticket {}", ticket_id),
            RunStatus::Failed => error!("Failed to process ticket {}", ticket_id),
        }

        (status, comment)
    }
}

pub fn increment_retry(state: &WorkflowState) -> WorkflowState {
    info!(
        "Incrementing retry counter from {} to {}",
        state.retry_count(),
        state.retry_count() + 1
    );
    state.with_retry_incremented()
}

/// Feedback for the generator once at least one attempt has failed.
fn retry_feedback(state: &WorkflowState) -> Option<RetryFeedback> {
    if state.retry_count() == 0 {
        return None;
    }
    state.error_message().map(|error| RetryFeedback {
        previous_query: state.candidate_query().map(str::to_string),
        error: error.to_string(),
    })
}

pub fn format_success_comment(state: &WorkflowState, insight: &Insight, timestamp: &str) -> String {
    let mut comment = String::from("*Data Analysis Results*\n\n");
    comment.push_str(&format!("*Summary:* {}\n\n", insight.summary));

    comment.push_str("*Key Points:*\n");
    for point in &insight.key_points {
        comment.push_str(&format!("- {}\n", point));
    }

    if let Some(recommendations) = &insight.recommendations {
        comment.push_str("\n*Recommendations:*\n");
        for rec in recommendations {
            comment.push_str(&format!("- {}\n", rec));
        }
    }

    if let Some(query) = state.candidate_query() {
        comment.push_str(&format!("\n*Query:*\n{{code:sql}}\n{}\n{{code}}\n", query));
    }

    if let Some(result) = state.query_result() {
        comment.push_str(&format!(
            "\nRows returned: {} (executed in {:.2} ms)\n",
            result.row_count, result.duration_ms
        ));
    }

    comment.push_str(&format!("\n_Generated at {}_", timestamp));
    comment
}

pub fn format_failure_comment(state: &WorkflowState, timestamp: &str) -> String {
    format!(
        "*Task processing failed*\n\nError: {}\nAttempts made: {}\n\n_Reported at {}_",
        state.error_message().unwrap_or(UNKNOWN_ERROR),
        state.retry_count() + 1,
        timestamp
    )
}
