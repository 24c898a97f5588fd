//! Blocking HTTP client for an Ollama-compatible inference service

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// The four operations the pipeline needs from an inference service.
pub trait InferenceService {
    /// Lightweight readiness check.
    fn probe(&self) -> Result<(), ClientError>;

    /// Names of the models currently present on the service.
    fn list_models(&self) -> Result<Vec<String>, ClientError>;

    /// Fetch a model by name, blocking until the service finishes.
    fn pull_model(&self, name: &str) -> Result<(), ClientError>;

    /// Non-streaming text generation.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, ClientError>;
}

// Ollama API structures
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    // An absent list means no models are installed yet.
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// Client for the Ollama HTTP API.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_status(
        resp: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ClientError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(ClientError::Status(resp.status()))
        }
    }
}

impl InferenceService for OllamaClient {
    fn probe(&self) -> Result<(), ClientError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.client.get(&url).send()?;
        Self::check_status(resp).map(|_| ())
    }

    fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = Self::check_status(self.client.get(&url).send()?)?;

        let tags: TagsResponse = resp.json()?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn pull_model(&self, name: &str) -> Result<(), ClientError> {
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            name,
            stream: false,
        };
        let resp = self.client.post(&url).json(&request).send()?;
        Self::check_status(resp).map(|_| ())
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, ClientError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };
        let resp = Self::check_status(self.client.post(&url).json(&request).send()?)?;

        let body: GenerateResponse = resp.json()?;
        Ok(body.response)
    }
}
