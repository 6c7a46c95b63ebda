//! Render engines driven by the worker thread.

use super::protocol::{RenderRequest, RenderResult};

/// A synchronous layout engine.
///
/// The worker owns the engine on a dedicated thread and calls [`render`] once
/// per request, in arrival order.
///
/// [`render`]: RenderEngine::render
pub trait RenderEngine: Send {
    /// Identifies the engine build. It is part of every cache key, so two
    /// engines that may lay out the same input differently must report
    /// different versions.
    fn version(&self) -> &str;

    /// Lay out `request.input` and report the outcome.
    fn render(&mut self, request: &RenderRequest) -> RenderResult;
}

#[cfg(feature = "graphviz")]
pub use graphviz::GraphvizEngine;

#[cfg(feature = "graphviz")]
mod graphviz {
    use std::{io, process::Command};

    use graphviz_rust::{
        cmd::{CommandArg, Format, Layout},
        exec_dot,
    };
    use log::{debug, info};

    use super::RenderEngine;
    use crate::worker::protocol::{Diagnostic, RenderRequest, RenderResult, Severity};

    /// Engine running the system Graphviz `dot` binary.
    #[derive(Debug, Clone)]
    pub struct GraphvizEngine {
        version: String,
    }

    impl GraphvizEngine {
        /// Locate `dot` and record its version.
        ///
        /// # Errors
        ///
        /// Returns an I/O error if `dot -V` can not be executed or fails.
        pub fn new() -> io::Result<Self> {
            let output = Command::new("dot").arg("-V").output()?;
            if !output.status.success() {
                return Err(io::Error::other(format!(
                    "`dot -V` exited with {}",
                    output.status
                )));
            }

            // `dot -V` prints its banner on stderr.
            let banner = if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            let version = String::from_utf8_lossy(&banner).trim().to_string();
            info!(version; "Found Graphviz");

            Ok(Self { version })
        }
    }

    impl RenderEngine for GraphvizEngine {
        fn version(&self) -> &str {
            &self.version
        }

        fn render(&mut self, request: &RenderRequest) -> RenderResult {
            debug!(id = request.id, input_len = request.input.len(); "Running dot");

            let args = vec![
                CommandArg::Layout(Layout::Dot),
                CommandArg::Format(Format::Svg),
            ];
            match exec_dot(request.input.clone(), args) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(svg) => RenderResult::success(svg),
                    Err(err) => RenderResult::failure(vec![Diagnostic::new(
                        Severity::Error,
                        format!("dot produced invalid UTF-8: {err}"),
                    )]),
                },
                Err(err) => RenderResult::failure(vec![Diagnostic::new(
                    Severity::Error,
                    err.to_string().trim().to_string(),
                )]),
            }
        }
    }
}
