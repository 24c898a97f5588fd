//! Runtime configuration for the analysis pipeline

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1:8b";
const DEFAULT_TEMPLATE_PATH: &str = "prompt.txt";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Immutable pipeline configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the inference server.
    pub endpoint: String,
    /// Model the analysis runs with.
    pub model: String,
    /// Path to the prompt template file.
    pub template_path: PathBuf,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connection attempts before giving up.
    pub max_retries: u32,
    /// Base delay of the exponential backoff; doubled per attempt.
    pub backoff_base: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            endpoint: env_or("OLLAMA_CONNECTION_STRING", defaults.endpoint),
            model: env_or("OLLAMA_MODEL", defaults.model),
            template_path: std::env::var("PROMPT_TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            timeout: Duration::from_secs(env_parsed("OLLAMA_TIMEOUT", DEFAULT_TIMEOUT_SECS)),
            max_retries: env_parsed("OLLAMA_MAX_RETRIES", defaults.max_retries),
            backoff_base: defaults.backoff_base,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring unparseable {}={:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
