//! Ticket Tracker
//!
//! The two seams the agent uses against the issue tracker: a reporter for
//! the final side effects and a source for reading tickets.

pub mod jira;

use crate::error::Result;
use crate::models::Ticket;
use async_trait::async_trait;

pub use jira::JiraClient;

/// Best-effort side effects invoked from the report step.
#[async_trait]
pub trait TicketReporter: Send + Sync {
    async fn transition_status(&self, ticket_id: &str, status_name: &str) -> Result<()>;
    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()>;
}

#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Open tickets assigned to the agent, newest first, at most `limit`.
    async fn active_tickets(&self, limit: usize) -> Result<Vec<Ticket>>;
    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket>;
    async fn last_comment_author(&self, ticket_id: &str) -> Result<Option<String>>;
    /// Account id the agent posts comments as, when known.
    fn own_account_id(&self) -> Option<&str>;
}
