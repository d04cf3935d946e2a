//! Domain Models
//!
//! Value types shared by the workflow, the tools and the external collaborators.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Ticket status as understood by the agent. Tracker-specific names that do not
/// map onto a known status are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Failed,
    Other(String),
}

impl TicketStatus {
    pub fn from_tracker_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "open" | "to do" | "todo" => TicketStatus::Open,
            "in progress" | "in_progress" => TicketStatus::InProgress,
            "resolved" | "done" => TicketStatus::Resolved,
            "closed" => TicketStatus::Closed,
            "failed" => TicketStatus::Failed,
            _ => TicketStatus::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
            TicketStatus::Failed => "FAILED",
            TicketStatus::Other(name) => name,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A work item requesting an analysis. Read-only to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub summary: String,
    pub description: String,
    pub status: TicketStatus,
    pub assignee: Option<String>,
}

impl Ticket {
    pub fn new(
        ticket_id: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
        status: TicketStatus,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            summary: summary.into(),
            description: description.into(),
            status,
            assignee: None,
        }
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// A ticket without an identifier or without a description cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.ticket_id.trim().is_empty() {
            return Err(AgentError::MalformedTicket(
                "ticket has no identifier".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(AgentError::MalformedTicket(format!(
                "ticket {} has no description",
                self.ticket_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
}

/// Table name → ordered columns. Tables iterate in name order so that anything
/// rendered from the schema is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    tables: BTreeMap<String, Vec<ColumnInfo>>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, table: &str, column_name: &str, data_type: &str) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(ColumnInfo {
                column_name: column_name.to_string(),
                data_type: data_type.to_string(),
            });
    }

    /// Registers a table with no columns yet (or leaves an existing one alone).
    pub fn add_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn with_table(mut self, table: &str, columns: &[(&str, &str)]) -> Self {
        self.add_table(table);
        for (name, data_type) in columns {
            self.add_column(table, name, data_type);
        }
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = (&String, &Vec<ColumnInfo>)> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|t| t.as_str())
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables.get(table).map(|c| c.as_slice())
    }

    pub fn column_names(&self) -> BTreeSet<&str> {
        self.tables
            .values()
            .flat_map(|cols| cols.iter().map(|c| c.column_name.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table_names().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Column lookup is global across every table.
    pub fn has_column(&self, name: &str) -> bool {
        self.tables
            .values()
            .flatten()
            .any(|c| c.column_name.eq_ignore_ascii_case(name))
    }
}

/// Outcome of the static query checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestion: Option<String>,
}

impl ValidationResult {
    pub fn from_checks(
        errors: Vec<String>,
        warnings: Vec<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestion,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self::from_checks(vec![error.into()], Vec::new(), None)
    }

    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// One result row: column name → value.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Record>,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub duration_ms: f64,
}

impl QueryResult {
    pub fn new(rows: Vec<Record>, column_names: Vec<String>, duration_ms: f64) -> Self {
        Self {
            row_count: rows.len(),
            rows,
            column_names,
            duration_ms,
        }
    }
}

/// Synthesized summary of a query result. `recommendations` is `None` when the
/// analysis produced none, which is distinct from an explicitly empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
    pub key_points: Vec<String>,
    pub recommendations: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_tracker_name() {
        assert_eq!(TicketStatus::from_tracker_name("To Do"), TicketStatus::Open);
        assert_eq!(
            TicketStatus::from_tracker_name("In Progress"),
            TicketStatus::InProgress
        );
        assert_eq!(TicketStatus::from_tracker_name("Done"), TicketStatus::Resolved);
        assert_eq!(
            TicketStatus::from_tracker_name("Blocked"),
            TicketStatus::Other("Blocked".to_string())
        );
    }

    #[test]
    fn test_ticket_validation() {
        let ok = Ticket::new("DATA-1", "Models", "count models", TicketStatus::Open);
        assert!(ok.validate().is_ok());

        let blank = Ticket::new("DATA-2", "Models", "   ", TicketStatus::Open);
        assert!(matches!(
            blank.validate(),
            Err(AgentError::MalformedTicket(_))
        ));

        let no_id = Ticket::new("", "Models", "count models", TicketStatus::Open);
        assert!(no_id.validate().is_err());
    }

    #[test]
    fn test_schema_lookup_is_case_insensitive_and_global() {
        let schema = DatabaseSchema::new()
            .with_table("models", &[("model_code", "TEXT"), ("segment", "TEXT")])
            .with_table("dealerships", &[("region", "TEXT")]);

        assert!(schema.has_table("MODELS"));
        assert!(!schema.has_table("ghost_table"));
        assert!(schema.has_column("region"));
        assert!(schema.has_column("Segment"));
        assert_eq!(schema.len(), 2);
        assert_eq!(
            schema.table_names().collect::<Vec<_>>(),
            vec!["dealerships", "models"]
        );
    }

    #[test]
    fn test_validation_result_validity_follows_errors() {
        let ok = ValidationResult::from_checks(vec![], vec!["slow".to_string()], None);
        assert!(ok.is_valid);
        let bad = ValidationResult::invalid("Invalid Syntax");
        assert!(!bad.is_valid);
        assert_eq!(bad.error_summary(), "Invalid Syntax");
    }
}
