//! Typed errors for the company intelligence library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Orchestrators swallow these
//! at their boundary and degrade to an absent result; everything below
//! them propagates with `?`.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur below the orchestrator boundary.
#[derive(Debug, Error)]
pub enum IntelError {
    /// Completion or embedding backend failed
    #[error("AI service error: {0}")]
    AI(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A backend call exceeded the configured deadline
    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: String, timeout: Duration },

    /// Prompt template could not be built or rendered
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Tokenizer or splitter could not be initialised
    #[error("splitter error: {0}")]
    Splitter(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl IntelError {
    /// Wrap any displayable backend failure.
    pub fn ai(message: impl Into<String>) -> Self {
        Self::AI(message.into().into())
    }

    /// Wrap any displayable storage failure.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into().into())
    }
}

/// Errors raised by prompt templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A value was not supplied for a declared variable
    #[error("template '{template}' is missing variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    /// The template text references a slot that was not declared
    #[error("template '{template}' references undeclared variable '{variable}'")]
    UndeclaredVariable { template: String, variable: String },
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, IntelError>;
