//! Workflow State
//!
//! The single record threaded through every transition. Updates go through
//! `with_*` methods that return a new value and leave the receiver untouched.

use crate::models::{Insight, QueryResult, Ticket, ValidationResult};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    ticket: Arc<Ticket>,
    task_description: Option<String>,
    candidate_query: Option<String>,
    validation_result: Option<ValidationResult>,
    query_result: Option<QueryResult>,
    insight: Option<Insight>,
    error_message: Option<String>,
    retry_count: u32,
}

impl WorkflowState {
    pub fn new(ticket: impl Into<Arc<Ticket>>) -> Self {
        Self {
            ticket: ticket.into(),
            task_description: None,
            candidate_query: None,
            validation_result: None,
            query_result: None,
            insight: None,
            error_message: None,
            retry_count: 0,
        }
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn task_description(&self) -> Option<&str> {
        self.task_description.as_deref()
    }

    pub fn candidate_query(&self) -> Option<&str> {
        self.candidate_query.as_deref()
    }

    pub fn validation_result(&self) -> Option<&ValidationResult> {
        self.validation_result.as_ref()
    }

    pub fn query_result(&self) -> Option<&QueryResult> {
        self.query_result.as_ref()
    }

    pub fn insight(&self) -> Option<&Insight> {
        self.insight.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn with_task_description(&self, task_description: impl Into<String>) -> Self {
        Self {
            task_description: Some(task_description.into()),
            ..self.clone()
        }
    }

    pub fn with_candidate_query(&self, candidate_query: Option<String>) -> Self {
        Self {
            candidate_query,
            ..self.clone()
        }
    }

    pub fn with_validation_result(&self, validation_result: ValidationResult) -> Self {
        Self {
            validation_result: Some(validation_result),
            ..self.clone()
        }
    }

    pub fn with_query_result(&self, query_result: Option<QueryResult>) -> Self {
        Self {
            query_result,
            ..self.clone()
        }
    }

    pub fn with_insight(&self, insight: Insight) -> Self {
        Self {
            insight: Some(insight),
            ..self.clone()
        }
    }

    pub fn with_error(&self, error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..self.clone()
        }
    }

    pub fn with_retry_incremented(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }
}
