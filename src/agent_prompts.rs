//! Agent Prompts - Prompt templates for query generation and insight synthesis
//!
//! The generator and the synthesizer only supply the variable parts (schema
//! listing, task, result summary); the wording lives here.

/// Feedback from a failed attempt, appended to the generation prompt on retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFeedback {
    pub previous_query: Option<String>,
    pub error: String,
}

/// Prompt asking for exactly one executable query over the given schema
pub fn build_sql_generation_prompt(
    schema_text: &str,
    task_description: &str,
    feedback: Option<&RetryFeedback>,
) -> String {
    let mut prompt = format!(
        r#"You are an expert SQL writer who helps generate safe and efficient SQL queries.

DATABASE SCHEMA:
{}
USER REQUEST:
{}

Write a SQL query that fulfills the user's request. The query should be:
1. Safe and well-formed (read-only, a single SELECT statement)
2. Efficient
3. Only use tables and columns that exist in the DATABASE SCHEMA
4. Include appropriate JOINs, WHERE clauses, and aggregations as needed

Return ONLY the executable SQL query without any explanations, comments, or markdown formatting."#,
        schema_text, task_description
    );

    if let Some(feedback) = feedback {
        prompt.push_str("\n\nPREVIOUS ATTEMPT FAILED.\n");
        if let Some(query) = &feedback.previous_query {
            prompt.push_str(&format!("Previous query:\n{}\n", query));
        }
        prompt.push_str(&format!(
            "Error: {}\nFix the problem and return a corrected query.",
            feedback.error
        ));
    }

    prompt
}

/// Prompt asking for a summary, key points and recommendations in a delimited format
pub fn build_insight_prompt(task_description: &str, result_summary: &str) -> String {
    format!(
        r#"You are a data analyst providing insights on data analysis results.

ORIGINAL TASK DESCRIPTION: {}

DATA ANALYSIS RESULTS:
{}
Based on the above data, provide:
1. A concise summary (2-3 sentences) highlighting the key findings
2. 3-5 specific key points or observations from the data
3. 0-3 actionable recommendations based on these insights (if applicable)

Format your response as follows:
Summary: <brief summary>

Key Points:
- <point 1>
- <point 2>
- ...

Recommendations:
- <point 1>
- <point 2>
- ..."#,
        task_description, result_summary
    )
}
