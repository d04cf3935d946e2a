//! Data Analysis Agent
//!
//! Wires configuration and collaborators into a workflow engine and feeds it
//! tickets, either one by id or a batch of active ones.

use crate::config::{Config, Secrets};
use crate::db::{self, QueryExecutor, SchemaProvider};
use crate::error::Result;
use crate::llm::{LanguageModel, LlmClient};
use crate::models::Ticket;
use crate::tracker::{JiraClient, TicketReporter, TicketSource};
use crate::workflow::{WorkflowEngine, WorkflowOutcome, WorkflowSettings};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct DataAnalysisAgent {
    engine: WorkflowEngine,
    source: Arc<dyn TicketSource>,
}

impl DataAnalysisAgent {
    /// Fetches the schema once and builds the engine around the given
    /// collaborators.
    pub async fn new<S, T>(
        config: &Config,
        store: Arc<S>,
        llm: Arc<dyn LanguageModel>,
        tracker: Arc<T>,
    ) -> Result<Self>
    where
        S: SchemaProvider + QueryExecutor + 'static,
        T: TicketReporter + TicketSource + 'static,
    {
        let schema = store.get_schema().await?;
        info!("Loaded schema with {} tables", schema.len());
        if schema.is_empty() {
            warn!("Database schema is empty; every query will fail validation");
        }

        let settings = WorkflowSettings {
            max_retries: config.agent.max_retries,
            in_progress_status: config.agent.in_progress_status.clone(),
            sample_rows: config.agent.sample_rows,
        };

        let executor: Arc<dyn QueryExecutor> = store;
        let reporter: Arc<dyn TicketReporter> = tracker.clone();
        let source: Arc<dyn TicketSource> = tracker;

        Ok(Self {
            engine: WorkflowEngine::new(llm, Arc::new(schema), executor, reporter, settings),
            source,
        })
    }

    /// Builds the real database, language model and Jira clients.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let secrets = Secrets::from_env()?;

        let store = Arc::new(db::connect(&config.database.url).await?);
        let llm: Arc<dyn LanguageModel> =
            Arc::new(LlmClient::new(secrets.openai_api_key.clone(), &config.agent.llm));
        let tracker = Arc::new(
            JiraClient::new(
                &secrets.jira_base_url,
                &secrets.jira_user_email,
                &secrets.jira_api_token,
            )
            .with_search(&config.tracker.jql, config.tracker.batch_size as usize)
            .connect()
            .await?,
        );

        Self::new(config, store, llm, tracker).await
    }

    pub async fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::load(path)?;
        Self::from_config(&config).await
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub async fn process_ticket(&self, ticket: Ticket) -> Result<WorkflowOutcome> {
        info!("Processing ticket {}", ticket.ticket_id);
        self.engine.run(ticket).await
    }

    pub async fn process_ticket_by_id(&self, ticket_id: &str) -> Result<WorkflowOutcome> {
        let ticket = self.source.get_ticket(ticket_id).await?;
        self.process_ticket(ticket).await
    }

    /// Processes up to `max_tickets` active tickets one after another. Tickets
    /// whose latest comment came from the agent itself are skipped, as are
    /// tickets that fail before the workflow starts.
    pub async fn process_open_tickets(&self, max_tickets: usize) -> Result<Vec<WorkflowOutcome>> {
        let tickets = self.source.active_tickets(max_tickets).await?;
        info!("Found {} open data analysis tickets", tickets.len());

        let mut outcomes = Vec::new();
        for ticket in tickets {
            if self.already_answered(&ticket.ticket_id).await {
                info!("Skipping {}: last comment is ours", ticket.ticket_id);
                continue;
            }

            let ticket_id = ticket.ticket_id.clone();
            match self.process_ticket(ticket).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Skipping ticket {}: {}", ticket_id, e),
            }
        }

        Ok(outcomes)
    }

    async fn already_answered(&self, ticket_id: &str) -> bool {
        let Some(own_id) = self.source.own_account_id() else {
            return false;
        };
        match self.source.last_comment_author(ticket_id).await {
            Ok(Some(author)) => author == own_id,
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read comments for {}: {}", ticket_id, e);
                false
            }
        }
    }
}
