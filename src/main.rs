use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use ticket_analyst::agent::DataAnalysisAgent;
use ticket_analyst::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ticket-analyst")]
#[command(about = "Answers data-analysis tickets with validated SQL and a written insight")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Process a single ticket by id
    #[arg(long, conflicts_with = "max_tickets")]
    ticket: Option<String>,

    /// Maximum number of active tickets to process
    #[arg(long, default_value_t = 5)]
    max_tickets: usize,
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log level")?;

    let stdout_layer = fmt::layer().with_timer(ChronoUtc::rfc_3339());

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;
    Ok(())
}

async fn run(args: Args, config: Config) -> Result<()> {
    let agent = DataAnalysisAgent::from_config(&config).await?;

    match args.ticket {
        Some(ticket_id) => {
            info!("Processing single ticket: {}", ticket_id);
            let outcome = agent.process_ticket_by_id(&ticket_id).await?;
            info!(
                "Processing complete for {}: {:?} after {} generation attempt(s)",
                outcome.ticket_id(),
                outcome.status,
                outcome.generation_attempts()
            );
        }
        None => {
            info!("Processing up to {} open tickets", args.max_tickets);
            let outcomes = agent.process_open_tickets(args.max_tickets).await?;
            let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
            info!(
                "Processing complete. Processed {} tickets ({} succeeded)",
                outcomes.len(),
                succeeded
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {:#}", e);
        return ExitCode::from(1);
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error in main application: {:#}", e);
            ExitCode::from(1)
        }
    }
}
