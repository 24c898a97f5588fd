pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stats;
pub mod template;

pub use crate::client::{InferenceService, OllamaClient};
pub use crate::config::Config;
pub use crate::error::{ClientError, PipelineError, TemplateError};
pub use crate::pipeline::{Pipeline, Stage};
pub use crate::stats::LogStats;
pub use crate::template::PromptTemplate;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
