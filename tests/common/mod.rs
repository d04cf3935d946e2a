#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use ticket_analyst::db::{QueryExecutor, SchemaProvider};
use ticket_analyst::llm::LanguageModel;
use ticket_analyst::tracker::{TicketReporter, TicketSource};
use ticket_analyst::{
    AgentError, DatabaseSchema, QueryResult, Record, Result, Ticket, TicketStatus,
    WorkflowEngine, WorkflowSettings,
};

/// Replays scripted values in order; the last one repeats forever.
pub struct Script<T: Clone> {
    items: Mutex<VecDeque<T>>,
}

impl<T: Clone> Script<T> {
    pub fn new(items: Vec<T>) -> Self {
        assert!(!items.is_empty(), "a script needs at least one item");
        Self {
            items: Mutex::new(items.into()),
        }
    }

    pub fn next(&self) -> T {
        let mut items = self.items.lock().unwrap();
        if items.len() > 1 {
            items.pop_front().unwrap()
        } else {
            items.front().cloned().unwrap()
        }
    }
}

pub type Reply = std::result::Result<String, String>;

pub fn ok(text: &str) -> Reply {
    Ok(text.to_string())
}

pub fn fail(message: &str) -> Reply {
    Err(message.to_string())
}

/// Answers generation prompts and insight prompts from separate scripts.
pub struct ScriptedLlm {
    sql: Script<Reply>,
    insight: Script<Reply>,
    pub sql_prompts: Mutex<Vec<String>>,
    pub insight_prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(sql: Vec<Reply>, insight: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            sql: Script::new(sql),
            insight: Script::new(insight),
            sql_prompts: Mutex::new(Vec::new()),
            insight_prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn sql_calls(&self) -> usize {
        self.sql_prompts.lock().unwrap().len()
    }

    pub fn insight_calls(&self) -> usize {
        self.insight_prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let reply = if prompt.contains("DATABASE SCHEMA:") {
            self.sql_prompts.lock().unwrap().push(prompt.to_string());
            self.sql.next()
        } else {
            self.insight_prompts.lock().unwrap().push(prompt.to_string());
            self.insight.next()
        };
        reply.map_err(AgentError::Llm)
    }
}

pub struct ScriptedExecutor {
    results: Script<std::result::Result<QueryResult, String>>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<std::result::Result<QueryResult, String>>) -> Arc<Self> {
        Arc::new(Self {
            results: Script::new(results),
            executed: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, query: &str) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(query.to_string());
        self.results.next().map_err(AgentError::Database)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub transitions: Mutex<Vec<(String, String)>>,
    pub comments: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn transitions(&self) -> Vec<(String, String)> {
        self.transitions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketReporter for RecordingReporter {
    async fn transition_status(&self, ticket_id: &str, status_name: &str) -> Result<()> {
        if self.fail {
            return Err(AgentError::Tracker("Transition to 'In Progress' not available.".to_string()));
        }
        self.transitions
            .lock()
            .unwrap()
            .push((ticket_id.to_string(), status_name.to_string()));
        Ok(())
    }

    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        if self.fail {
            return Err(AgentError::Tracker("HTTP error 503".to_string()));
        }
        self.comments
            .lock()
            .unwrap()
            .push((ticket_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Schema plus scripted execution, standing in for a real database.
pub struct FakeStore {
    pub schema: DatabaseSchema,
    pub executor: Arc<ScriptedExecutor>,
}

#[async_trait]
impl SchemaProvider for FakeStore {
    async fn get_schema(&self) -> Result<DatabaseSchema> {
        Ok(self.schema.clone())
    }
}

#[async_trait]
impl QueryExecutor for FakeStore {
    async fn execute(&self, query: &str) -> Result<QueryResult> {
        self.executor.execute(query).await
    }
}

/// In-memory tracker: a fixed ticket list, per-ticket last comment authors
/// and a recording reporter.
pub struct FakeTracker {
    pub tickets: Vec<Ticket>,
    pub last_authors: Vec<(String, String)>,
    pub account_id: Option<String>,
    pub reporter: Arc<RecordingReporter>,
}

#[async_trait]
impl TicketReporter for FakeTracker {
    async fn transition_status(&self, ticket_id: &str, status_name: &str) -> Result<()> {
        self.reporter.transition_status(ticket_id, status_name).await
    }

    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        self.reporter.add_comment(ticket_id, text).await
    }
}

#[async_trait]
impl TicketSource for FakeTracker {
    async fn active_tickets(&self, limit: usize) -> Result<Vec<Ticket>> {
        Ok(self.tickets.iter().take(limit).cloned().collect())
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.tickets
            .iter()
            .find(|t| t.ticket_id == ticket_id)
            .cloned()
            .ok_or_else(|| {
                AgentError::Tracker("Resource not found. Please check the provided identifier.".to_string())
            })
    }

    async fn last_comment_author(&self, ticket_id: &str) -> Result<Option<String>> {
        Ok(self
            .last_authors
            .iter()
            .find(|(id, _)| id == ticket_id)
            .map(|(_, author)| author.clone()))
    }

    fn own_account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }
}

pub const VALID_QUERY: &str =
    "SELECT segment, COUNT(DISTINCT model_code) AS model_count FROM models GROUP BY segment";
pub const GHOST_QUERY: &str = "SELECT segment FROM ghost_table";
pub const THREE_POINT_INSIGHT: &str = "Summary: SUVs lead the lineup.\n\nKey Points:\n- SUV has 12 models\n- Sedan has 7 models\n- Two segments in total\n\nRecommendations:\n- Review the sedan range";

pub fn cars_schema() -> DatabaseSchema {
    DatabaseSchema::new()
        .with_table(
            "models",
            &[
                ("model_id", "INTEGER"),
                ("model_code", "TEXT"),
                ("segment", "TEXT"),
                ("updated_at", "TEXT"),
            ],
        )
        .with_table(
            "dealerships",
            &[("dealership_id", "INTEGER"), ("region", "TEXT")],
        )
}

pub fn segment_rows() -> QueryResult {
    let rows = vec![("SUV", 12), ("Sedan", 7)]
        .into_iter()
        .map(|(segment, count)| {
            let mut record = Record::new();
            record.insert("segment".to_string(), json!(segment));
            record.insert("model_count".to_string(), json!(count));
            record
        })
        .collect();
    QueryResult::new(
        rows,
        vec!["segment".to_string(), "model_count".to_string()],
        2.5,
    )
}

pub fn ticket(id: &str, description: &str) -> Ticket {
    Ticket::new(id, "Data analysis request", description, TicketStatus::Open)
}

pub fn settings(max_retries: u32) -> WorkflowSettings {
    WorkflowSettings {
        max_retries,
        ..WorkflowSettings::default()
    }
}

pub fn engine(
    llm: Arc<ScriptedLlm>,
    executor: Arc<ScriptedExecutor>,
    reporter: Arc<RecordingReporter>,
    max_retries: u32,
) -> WorkflowEngine {
    WorkflowEngine::new(
        llm,
        Arc::new(cars_schema()),
        executor,
        reporter,
        settings(max_retries),
    )
}
