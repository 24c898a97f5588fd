//! Error taxonomy for the analysis pipeline

use thiserror::Error;

/// Failure of a single inference-service call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure: refused connection, unreachable host, timeout.
    #[error("connection to inference service failed: {0}")]
    Connection(String),

    /// The service answered with a non-success HTTP status.
    #[error("inference service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The service answered but the body was not the expected shape.
    #[error("could not decode inference service response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Connection-class failures are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

/// Prompt template problems, fatal at load or render time.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read prompt template `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("prompt template is missing the {{logs}} placeholder")]
    MissingPlaceholder,

    #[error("prompt template must contain exactly one {{logs}} placeholder, found {0}")]
    DuplicatePlaceholder(usize),
}

/// Pipeline-level errors. Each stage maps its failures into exactly one
/// variant; the first error aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("inference service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },

    #[error("unexpected response from inference service: {0}")]
    MalformedResponse(ClientError),

    #[error("failed to provision model `{model}`: {source}")]
    Provisioning { model: String, source: ClientError },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("log analysis failed: {0}")]
    Analysis(ClientError),
}
