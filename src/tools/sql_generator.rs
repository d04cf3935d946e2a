//! SQL Generation
//!
//! Renders the schema, asks the language model for a single query and cleans
//! the response down to executable text.

use crate::agent_prompts::{build_sql_generation_prompt, RetryFeedback};
use crate::error::{AgentError, Result};
use crate::llm::LanguageModel;
use crate::models::DatabaseSchema;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SqlGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Returns the cleaned query, or an error when the model call fails or
    /// yields nothing usable.
    pub async fn generate(
        &self,
        task_description: &str,
        schema: &DatabaseSchema,
        feedback: Option<&RetryFeedback>,
    ) -> Result<String> {
        let prompt = build_sql_generation_prompt(&format_schema(schema), task_description, feedback);

        info!("Generating SQL query for task: {}", task_description);

        let response = self.llm.invoke(&prompt).await.map_err(|e| {
            warn!("Error generating SQL query: {}", e);
            e
        })?;

        let query = clean_query_response(&response);
        if query.is_empty() {
            return Err(AgentError::Llm("Empty response from LLM".to_string()));
        }
        Ok(query)
    }
}

/// `Table: t` followed by one `  - column (type)` line per column, tables in
/// name order, columns in declared order.
pub fn format_schema(schema: &DatabaseSchema) -> String {
    let mut text = String::new();
    for (table, columns) in schema.tables() {
        text.push_str(&format!("Table: {}\nColumns:\n", table));
        for column in columns {
            text.push_str(&format!("  - {} ({})\n", column.column_name, column.data_type));
        }
        text.push('\n');
    }
    text
}

pub fn clean_query_response(response: &str) -> String {
    let trimmed = response
        .trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```SQL")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let without_label = trimmed
        .strip_prefix("SQL:")
        .or_else(|| trimmed.strip_prefix("sql:"))
        .unwrap_or(trimmed);

    without_label.trim().to_string()
}
