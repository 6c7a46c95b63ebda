//! Messages exchanged with the render engine.
//!
//! The JSON shapes are:
//!
//! ```json
//! {"id": 1, "input": "digraph {}", "options": {"engine": "dot", "format": "svg"}}
//! {"id": 1, "result": {"status": "success", "output": "<svg>...</svg>"}}
//! {"id": 1, "result": {"status": "failure", "errors": [{"level": "error", "message": "..."}]}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Layout engine and output format requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub engine: String,
    pub format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            engine: "dot".to_string(),
            format: "svg".to_string(),
        }
    }
}

/// A render request correlated by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub id: u64,
    pub input: String,
    pub options: RenderOptions,
}

impl RenderRequest {
    /// Creates a request for DOT layout with SVG output.
    pub fn new(id: u64, input: impl Into<String>) -> Self {
        Self {
            id,
            input: input.into(),
            options: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// A message reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.level, self.message)
    }
}

/// Outcome of one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    pub status: RenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Diagnostic>,
}

impl RenderResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Success,
            output: Some(output.into()),
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<Diagnostic>) -> Self {
        Self {
            status: RenderStatus::Failure,
            output: None,
            errors,
        }
    }

    /// Interpret the result.
    ///
    /// Any diagnostic fails the render, even next to a successful status.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Diagnostics`] when the engine reported anything
    /// and [`RenderError::InvalidResponse`] when a clean result has no output.
    pub fn into_output(self) -> Result<String, RenderError> {
        if !self.errors.is_empty() {
            return Err(RenderError::Diagnostics(self.errors));
        }
        match (self.status, self.output) {
            (RenderStatus::Success, Some(output)) => Ok(output),
            _ => Err(RenderError::InvalidResponse),
        }
    }
}

/// A result correlated with the id of its request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub id: u64,
    pub result: RenderResult,
}
