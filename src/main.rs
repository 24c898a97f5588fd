use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use loglens::{Config, OllamaClient, Pipeline, PromptTemplate};

/// Built-in sample batch, analyzed when no log file is given.
const SAMPLE_LOGS: [&str; 3] = [
    "2024-01-20 10:15:23 INFO Server started successfully",
    "2024-01-20 10:15:24 ERROR Database connection failed",
    "2024-01-20 10:15:25 WARNING High memory usage detected",
];

#[derive(Parser)]
#[command(name = "loglens")]
#[command(about = "Summarize log batches with a local Ollama model", version)]
struct Cli {
    /// Log file to analyze, one event per line (built-in samples if omitted)
    log_file: Option<PathBuf>,

    /// Inference server endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Model to run the analysis with
    #[arg(short, long)]
    model: Option<String>,

    /// Prompt template path
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Connection attempts before giving up
    #[arg(long)]
    max_retries: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(template) = cli.template {
        config.template_path = template;
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }

    let lines: Vec<String> = match &cli.log_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read log file {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => SAMPLE_LOGS.iter().map(|s| s.to_string()).collect(),
    };

    log::info!("=== Log Analysis Starting ===");
    let template = PromptTemplate::load(&config.template_path)?;
    let service = OllamaClient::new(config.endpoint.as_str(), config.timeout)?;

    let mut pipeline = Pipeline::new(config, service, template);
    let analysis = pipeline.run(&lines)?;

    log::info!("=== Analysis Complete ===");
    println!("{}", analysis);
    Ok(())
}
