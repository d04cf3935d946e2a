//! Insight Synthesis
//!
//! Summarizes a query result through the language model and parses the
//! delimited response into an [`Insight`]. Never fails: a model error yields a
//! fallback insight instead.

use crate::agent_prompts::build_insight_prompt;
use crate::llm::LanguageModel;
use crate::models::{Insight, QueryResult, Record};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_SAMPLE_ROWS: usize = 10;
pub const NO_PATTERNS_KEY_POINT: &str = "No significant patterns were identified in the data.";
pub const FAILED_SUMMARY: &str = "Detailed insight generation failed.";
pub const REVIEW_MANUALLY: &str = "Review the query results manually.";

pub struct InsightSynthesizer {
    llm: Arc<dyn LanguageModel>,
    sample_rows: usize,
}

impl InsightSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }

    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows.max(1);
        self
    }

    pub async fn synthesize(&self, task_description: &str, result: &QueryResult) -> Insight {
        let summary = format_result_summary(result, self.sample_rows);
        let prompt = build_insight_prompt(task_description, &summary);

        info!("Generating insights for task: {}", task_description);

        match self.llm.invoke(&prompt).await {
            Ok(response) if !response.trim().is_empty() => parse_insight_response(&response),
            Ok(_) => {
                warn!("Empty response from LLM while generating insights");
                fallback_insight(result)
            }
            Err(e) => {
                warn!("Error generating insights: {}", e);
                fallback_insight(result)
            }
        }
    }
}

/// Row count, column names and at most `sample_rows` rows rendered as text.
pub fn format_result_summary(result: &QueryResult, sample_rows: usize) -> String {
    let mut summary = format!(
        "Total rows: {}\nColumns: {}\n\n",
        result.row_count,
        result.column_names.join(", ")
    );

    if !result.rows.is_empty() {
        summary.push_str("Data sample:\n");
        for row in result.rows.iter().take(sample_rows) {
            summary.push_str(&render_row(row, &result.column_names));
            summary.push('\n');
        }
    }

    summary
}

fn render_row(row: &Record, column_names: &[String]) -> String {
    column_names
        .iter()
        .map(|column| {
            let value = match row.get(column) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "null".to_string(),
            };
            format!("{}: {}", column, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Summary,
    KeyPoints,
    Recommendations,
}

fn strip_header<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    if line.len() >= header.len()
        && line.is_char_boundary(header.len())
        && line[..header.len()].eq_ignore_ascii_case(header)
    {
        Some(line[header.len()..].trim())
    } else {
        None
    }
}

pub fn parse_insight_response(response: &str) -> Insight {
    let mut section = Section::Preamble;
    let mut summary_lines: Vec<String> = Vec::new();
    let mut key_points = Vec::new();
    let mut recommendations = Vec::new();

    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = strip_header(line, "Summary:") {
            section = Section::Summary;
            if !rest.is_empty() {
                summary_lines.push(rest.to_string());
            }
            continue;
        }
        if strip_header(line, "Key Points:").is_some() {
            section = Section::KeyPoints;
            continue;
        }
        if strip_header(line, "Recommendations:").is_some() {
            section = Section::Recommendations;
            continue;
        }

        let bullet = line.strip_prefix('-').map(|b| b.trim().to_string());
        match (section, bullet) {
            (Section::KeyPoints, Some(point)) if !point.is_empty() => key_points.push(point),
            (Section::Recommendations, Some(rec)) if !rec.is_empty() => recommendations.push(rec),
            (Section::Summary, None) => summary_lines.push(line.to_string()),
            _ => {}
        }
    }

    let summary = if summary_lines.is_empty() {
        response
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        summary_lines.join(" ")
    };

    if key_points.is_empty() {
        key_points.push(NO_PATTERNS_KEY_POINT.to_string());
    }

    Insight {
        summary,
        key_points,
        recommendations: if recommendations.is_empty() {
            None
        } else {
            Some(recommendations)
        },
    }
}

pub fn fallback_insight(result: &QueryResult) -> Insight {
    Insight {
        summary: FAILED_SUMMARY.to_string(),
        key_points: vec![format!("Query returned {} rows.", result.row_count)],
        recommendations: Some(vec![REVIEW_MANUALLY.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedLlm {
        response: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for CannedLlm {
        async fn invoke(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response
                .clone()
                .ok_or_else(|| AgentError::Llm("connection refused".to_string()))
        }
    }

    fn canned(response: Option<&str>) -> Arc<CannedLlm> {
        Arc::new(CannedLlm {
            response: response.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn segment_result(rows: usize) -> QueryResult {
        let records = (0..rows)
            .map(|i| {
                let mut record = Record::new();
                record.insert("segment".to_string(), json!(format!("segment_{}", i)));
                record.insert("model_count".to_string(), json!(i * 2));
                record
            })
            .collect();
        QueryResult::new(
            records,
            vec!["segment".to_string(), "model_count".to_string()],
            4.2,
        )
    }

    #[test]
    fn test_parse_full_response() {
        let insight = parse_insight_response(
            "Summary: SUVs dominate the lineup.\n\nKey Points:\n- SUV has 12 models\n- Sedan has 7 models\n- Coupe has 2 models\n\nRecommendations:\n- Expand the coupe range\n",
        );
        assert_eq!(insight.summary, "SUVs dominate the lineup.");
        assert_eq!(insight.key_points.len(), 3);
        assert_eq!(insight.key_points[0], "SUV has 12 models");
        assert_eq!(
            insight.recommendations,
            Some(vec!["Expand the coupe range".to_string()])
        );
    }

    #[test]
    fn test_empty_key_points_get_default() {
        let insight = parse_insight_response("Summary: Nothing stands out.\nKey Points:\n");
        assert_eq!(insight.key_points, vec![NO_PATTERNS_KEY_POINT.to_string()]);
        assert_eq!(insight.recommendations, None);
    }

    #[test]
    fn test_missing_summary_uses_first_line() {
        let insight = parse_insight_response("Two segments found.\nKey Points:\n- SUV leads");
        assert_eq!(insight.summary, "Two segments found.");
        assert_eq!(insight.key_points, vec!["SUV leads".to_string()]);
    }

    #[test]
    fn test_result_summary_is_bounded() {
        let summary = format_result_summary(&segment_result(25), DEFAULT_SAMPLE_ROWS);
        assert!(summary.starts_with("Total rows: 25\nColumns: segment, model_count\n"));
        assert!(summary.contains("segment: segment_0, model_count: 0"));
        assert!(summary.contains("segment: segment_9"));
        assert!(!summary.contains("segment_10"));
    }

    #[tokio::test]
    async fn test_synthesize_parses_model_output() {
        let llm = canned(Some("Summary: Two segments.\nKey Points:\n- a\n- b\n- c"));
        let synthesizer = InsightSynthesizer::new(llm.clone()).with_sample_rows(1);
        let insight = synthesizer.synthesize("count models", &segment_result(2)).await;
        assert_eq!(insight.summary, "Two segments.");
        assert_eq!(insight.key_points.len(), 3);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("segment_0"));
        assert!(!prompts[0].contains("segment_1"));
    }

    #[tokio::test]
    async fn test_synthesize_failure_yields_fallback() {
        let synthesizer = InsightSynthesizer::new(canned(None));
        let insight = synthesizer.synthesize("count models", &segment_result(2)).await;
        assert_eq!(insight.summary, FAILED_SUMMARY);
        assert_eq!(insight.key_points, vec!["Query returned 2 rows.".to_string()]);
        assert_eq!(insight.recommendations, Some(vec![REVIEW_MANUALLY.to_string()]));
    }
}
