//! Prompt template loading and rendering

use std::fs;
use std::path::Path;

use crate::error::TemplateError;

/// The single substitution point every template must carry.
pub const PLACEHOLDER: &str = "{logs}";

/// A prompt template with exactly one `{logs}` substitution point.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Wrap a template string, validating the placeholder contract.
    pub fn new(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        match text.matches(PLACEHOLDER).count() {
            0 => Err(TemplateError::MissingPlaceholder),
            1 => Ok(Self { text }),
            n => Err(TemplateError::DuplicatePlaceholder(n)),
        }
    }

    /// Read a template from disk and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(text)
    }

    /// Substitute the logs block into the placeholder.
    pub fn render(&self, logs: &str) -> Result<String, TemplateError> {
        if !self.text.contains(PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder);
        }
        Ok(self.text.replacen(PLACEHOLDER, logs, 1))
    }
}
