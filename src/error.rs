use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed ticket: {0}")]
    MalformedTicket(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AgentError {
    /// Errors that abort a run before (or instead of) the workflow. Everything
    /// else is recorded on the workflow state and handled by the retry policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::Config(_)
                | AgentError::MalformedTicket(_)
                | AgentError::Io(_)
                | AgentError::Yaml(_)
        )
    }
}

impl From<rusqlite::Error> for AgentError {
    fn from(err: rusqlite::Error) -> Self {
        AgentError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for AgentError {
    fn from(err: sqlx::Error) -> Self {
        AgentError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Tracker(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
