//! Error types for typeviz operations.
//!
//! [`TypevizError`] is returned by the [`DiagramBuilder`](crate::DiagramBuilder)
//! facade. [`RenderError`] is returned by the render worker and carries the
//! engine diagnostics of a failed render.

use std::{fmt, io, time::Duration};

use thiserror::Error;

use typeviz_core::TypeGraphError;

use crate::worker::Diagnostic;

/// Why a render request did not produce SVG.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine reported diagnostics; every one is kept in order.
    #[error("{}", DiagnosticList(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// The engine answered without diagnostics and without output.
    #[error("invalid response from render engine")]
    InvalidResponse,

    #[error("render worker is no longer running")]
    ChannelClosed,

    #[error("render request timed out after {0:?}")]
    Timeout(Duration),
}

struct DiagnosticList<'a>(&'a [Diagnostic]);

impl fmt::Display for DiagnosticList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// The main error type for typeviz operations.
#[derive(Debug, Error)]
pub enum TypevizError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Schema error: {err}")]
    Schema { err: serde_json::Error, src: String },

    #[error("Graph error: {0}")]
    Graph(#[from] TypeGraphError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TypevizError {
    /// Create a new `Schema` error with the JSON it was raised for.
    pub fn new_schema_error(err: serde_json::Error, src: impl Into<String>) -> Self {
        Self::Schema {
            err,
            src: src.into(),
        }
    }
}
