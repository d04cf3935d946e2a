use std::io::Write;
use tempfile::NamedTempFile;
use ticket_analyst::config::Config;
use ticket_analyst::AgentError;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
agent:
  max_retries: 2
  in_progress_status: "Under Review"
  sample_rows: 5
  llm:
    model_name: gpt-4o
    temperature: 0.2
    max_tokens: 800
database:
  url: sqlite://data/cars.db
tracker:
  batch_size: 25
logging:
  level: debug
  file: null
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.agent.max_retries, 2);
    assert_eq!(config.agent.in_progress_status, "Under Review");
    assert_eq!(config.agent.sample_rows, 5);
    assert_eq!(config.agent.llm.model_name, "gpt-4o");
    assert_eq!(config.agent.llm.max_tokens, 800);
    assert_eq!(config.tracker.batch_size, 25);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, None);
}

#[test]
fn test_missing_sections_take_defaults() {
    let file = write_config("database:\n  url: \"sqlite::memory:\"\n");

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.agent.max_retries, 3);
    assert_eq!(config.agent.in_progress_status, "In Progress");
    assert_eq!(config.agent.llm.model_name, "gpt-4o-mini");
    assert_eq!(config.tracker.batch_size, 50);
    assert_eq!(config.logging.file.as_deref(), Some("data_analyzer.log"));
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let file = write_config(
        "agent:\n  llm:\n    temperature: 3.5\ndatabase:\n  url: \"sqlite::memory:\"\n",
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, AgentError::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Config::load("/nonexistent/ticket-analyst.yaml").unwrap_err();
    assert!(matches!(err, AgentError::Config(_)));
}
