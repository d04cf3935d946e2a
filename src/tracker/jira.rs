//! Jira REST Client
//!
//! Basic-auth client over the Jira Cloud REST API (v2 for issues, comments and
//! transitions, v3 for search and the current user).

use super::{TicketReporter, TicketSource};
use crate::config::DEFAULT_ACTIVE_JQL;
use crate::error::{AgentError, Result};
use crate::models::{Ticket, TicketStatus};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

const DEFAULT_BATCH_SIZE: usize = 50;
const MAX_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
    account_id: Option<String>,
    jql: String,
    batch_size: usize,
}

impl JiraClient {
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            email: email.to_string(),
            api_token: strip_bearer(api_token).to_string(),
            account_id: None,
            jql: DEFAULT_ACTIVE_JQL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_search(mut self, jql: &str, batch_size: usize) -> Self {
        self.jql = jql.to_string();
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Builds the client and resolves the authenticated account. Any failure
    /// here is a configuration problem.
    pub async fn connect(self) -> Result<Self> {
        let mut client = self;
        let account_id = client.fetch_account_id().await.map_err(|e| {
            AgentError::Config(format!("Failed to authenticate with Jira: {}", e))
        })?;
        info!("Authenticated with Jira at {}", client.base_url);
        client.account_id = account_id;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method, &url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        interpret_response(status, &text)
    }

    async fn fetch_account_id(&self) -> Result<Option<String>> {
        let me = self
            .request(Method::GET, "rest/api/3/myself", &[], None)
            .await?;
        Ok(me
            .as_ref()
            .and_then(|m| m.get("accountId"))
            .and_then(|id| id.as_str())
            .map(str::to_string))
    }

    pub async fn get_issue(&self, issue_key: &str) -> Result<Value> {
        self.request(Method::GET, &format!("rest/api/2/issue/{}", issue_key), &[], None)
            .await?
            .ok_or_else(|| AgentError::Tracker(format!("Issue {} returned no body", issue_key)))
    }

    pub async fn get_comments(&self, issue_key: &str) -> Result<Value> {
        self.request(
            Method::GET,
            &format!("rest/api/2/issue/{}/comment", issue_key),
            &[],
            None,
        )
        .await
        .map(|body| body.unwrap_or_else(|| json!({ "comments": [] })))
    }

    pub async fn post_comment(&self, issue_key: &str, comment: &str) -> Result<Option<Value>> {
        self.request(
            Method::POST,
            &format!("rest/api/2/issue/{}/comment", issue_key),
            &[],
            Some(json!({ "body": comment })),
        )
        .await
    }

    pub async fn get_available_transitions(&self, issue_key: &str) -> Result<Vec<Value>> {
        let data = self
            .request(
                Method::GET,
                &format!("rest/api/2/issue/{}/transitions", issue_key),
                &[],
                None,
            )
            .await?;
        Ok(data
            .and_then(|d| d.get("transitions").and_then(|t| t.as_array()).cloned())
            .unwrap_or_default())
    }

    pub async fn transition_issue(&self, issue_key: &str, status_name: &str) -> Result<()> {
        let transitions = self.get_available_transitions(issue_key).await?;
        let transition_id = find_transition_id(&transitions, status_name)?;
        self.request(
            Method::POST,
            &format!("rest/api/2/issue/{}/transitions", issue_key),
            &[],
            Some(json!({ "transition": { "id": transition_id } })),
        )
        .await?;
        info!("Transitioned {} to '{}'", issue_key, status_name);
        Ok(())
    }

    /// Pages through the configured JQL search. `limit` of `None` fetches
    /// every match.
    pub async fn get_active_issues(&self, limit: Option<usize>) -> Result<Vec<Value>> {
        let mut all_issues: Vec<Value> = Vec::new();
        let mut start_at = 0usize;

        loop {
            let current_max = match limit {
                Some(limit) => limit.saturating_sub(all_issues.len()).min(self.batch_size),
                None => self.batch_size,
            };
            if current_max == 0 {
                break;
            }

            let params = [
                ("jql", self.jql.clone()),
                ("maxResults", current_max.to_string()),
                ("startAt", start_at.to_string()),
            ];
            let result = self
                .request(Method::GET, "rest/api/3/search", &params, None)
                .await?;

            let Some(result) = result else { break };
            let Some(issues) = result.get("issues").and_then(|i| i.as_array()) else {
                break;
            };
            if issues.is_empty() {
                break;
            }

            let total = result.get("total").and_then(|t| t.as_u64()).unwrap_or(0) as usize;
            all_issues.extend(issues.iter().cloned());

            if limit.is_some_and(|limit| all_issues.len() >= limit) {
                break;
            }
            if start_at + issues.len() >= total {
                break;
            }
            start_at += issues.len();
        }

        if let Some(limit) = limit {
            all_issues.truncate(limit);
        }
        Ok(all_issues)
    }
}

#[async_trait]
impl TicketReporter for JiraClient {
    async fn transition_status(&self, ticket_id: &str, status_name: &str) -> Result<()> {
        self.transition_issue(ticket_id, status_name).await
    }

    async fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        self.post_comment(ticket_id, text).await.map(|_| ())
    }
}

#[async_trait]
impl TicketSource for JiraClient {
    async fn active_tickets(&self, limit: usize) -> Result<Vec<Ticket>> {
        self.get_active_issues(Some(limit))
            .await?
            .iter()
            .map(extract_ticket)
            .collect()
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        extract_ticket(&self.get_issue(ticket_id).await?)
    }

    async fn last_comment_author(&self, ticket_id: &str) -> Result<Option<String>> {
        Ok(last_comment_author_id(&self.get_comments(ticket_id).await?))
    }

    fn own_account_id(&self) -> Option<&str> {
        self.account_id()
    }
}

pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

pub fn strip_bearer(api_token: &str) -> &str {
    api_token.strip_prefix("Bearer ").unwrap_or(api_token)
}

/// 200/201 carry a JSON body; other 2xx carry none.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<Option<Value>> {
    match status.as_u16() {
        200 | 201 => {
            if body.trim().is_empty() {
                Ok(None)
            } else {
                serde_json::from_str(body)
                    .map(Some)
                    .map_err(|e| AgentError::Tracker(format!("Invalid JSON from Jira: {}", e)))
            }
        }
        code if status.is_success() => {
            debug!("Jira returned {} without a body", code);
            Ok(None)
        }
        401 => Err(AgentError::Tracker(
            "Unauthorized access. Please check your API token and email.".to_string(),
        )),
        403 => Err(AgentError::Tracker(
            "Forbidden access. You do not have permission to perform this action.".to_string(),
        )),
        404 => Err(AgentError::Tracker(
            "Resource not found. Please check the provided identifier.".to_string(),
        )),
        400 => {
            let detail = serde_json::from_str::<Value>(body)
                .ok()
                .map(|content| content.get("errors").cloned().unwrap_or(content))
                .map(|errors| errors.to_string())
                .unwrap_or_else(|| body.to_string());
            Err(AgentError::Tracker(format!(
                "Bad Request. Please check the request payload! Error: {}",
                detail
            )))
        }
        _ => Err(AgentError::Tracker(format!("HTTP error {}: {}", status, body))),
    }
}

pub fn find_transition_id(transitions: &[Value], status_name: &str) -> Result<String> {
    if transitions.is_empty() {
        return Err(AgentError::Tracker(
            "No transitions found for this issue.".to_string(),
        ));
    }
    transitions
        .iter()
        .find(|t| {
            t.get("name")
                .and_then(|n| n.as_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(status_name))
        })
        .and_then(|t| match t.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        })
        .ok_or_else(|| {
            AgentError::Tracker(format!("Transition to '{}' not available.", status_name))
        })
}

/// Plain text of an Atlassian Document Format node: text nodes joined by
/// spaces, depth first.
pub fn extract_text_from_adf(node: &Value) -> String {
    match node {
        Value::Array(items) => items
            .iter()
            .map(extract_text_from_adf)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => {
            if map.get("type").and_then(|t| t.as_str()) == Some("text") {
                map.get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string()
            } else if let Some(content) = map.get("content") {
                extract_text_from_adf(content)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

pub fn extract_ticket(issue: &Value) -> Result<Ticket> {
    let key = issue
        .get("key")
        .and_then(|k| k.as_str())
        .ok_or_else(|| AgentError::Tracker("Issue JSON has no key".to_string()))?;
    let fields = issue.get("fields").cloned().unwrap_or_else(|| json!({}));

    let description = match fields.get("description") {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(adf @ Value::Object(_)) => adf
            .get("content")
            .map(extract_text_from_adf)
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => String::new(),
    };

    let status = fields
        .pointer("/status/name")
        .and_then(|s| s.as_str())
        .map(TicketStatus::from_tracker_name)
        .unwrap_or(TicketStatus::Open);

    let summary = fields
        .get("summary")
        .and_then(|s| s.as_str())
        .unwrap_or_default();

    let mut ticket = Ticket::new(key, summary, description, status);
    if let Some(assignee) = fields
        .pointer("/assignee/displayName")
        .and_then(|a| a.as_str())
    {
        ticket = ticket.with_assignee(assignee);
    }
    Ok(ticket)
}

pub fn last_comment_author_id(comments: &Value) -> Option<String> {
    comments
        .get("comments")
        .and_then(|c| c.as_array())
        .and_then(|c| c.last())
        .and_then(|c| c.pointer("/author/accountId"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}
