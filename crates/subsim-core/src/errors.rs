//! Structured error types shared across subsim crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SubsimError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (parameter names, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the subset simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SubsimError {
    /// Malformed run configuration, reported before any evaluation.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Numerical degeneracy that cannot be recovered from.
    #[error("numerical error: {0}")]
    Numerical(ErrorInfo),
    /// Failure raised by the performance function, passed through unchanged.
    #[error("evaluation error: {0}")]
    Evaluation(ErrorInfo),
    /// Serialization, schema and artefact I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SubsimError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SubsimError::Config(info)
            | SubsimError::Numerical(info)
            | SubsimError::Evaluation(info)
            | SubsimError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        SubsimError::Config(ErrorInfo::new(code, message))
    }

    /// Shorthand for a numerical error.
    pub fn numerical(code: &str, message: impl Into<String>) -> Self {
        SubsimError::Numerical(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O or (de)serialization failure tied to a filesystem path.
    pub fn io(code: &str, err: impl ToString, path: &std::path::Path) -> Self {
        SubsimError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display()),
        )
    }

    /// Returns true when the error originates from configuration validation.
    pub fn is_config(&self) -> bool {
        matches!(self, SubsimError::Config(_))
    }
}
