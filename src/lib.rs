pub mod agent;
pub mod agent_prompts;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod tools;
pub mod tracker;
pub mod workflow;

pub use agent::DataAnalysisAgent;
pub use error::{AgentError, Result};
pub use models::{
    ColumnInfo, DatabaseSchema, Insight, QueryResult, Record, Ticket, TicketStatus,
    ValidationResult,
};
pub use workflow::{RunStatus, WorkflowEngine, WorkflowOutcome, WorkflowSettings, WorkflowState};
