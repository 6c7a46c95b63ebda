//! Configuration types for typeviz diagram rendering.
//!
//! This module provides configuration structures that control which schema
//! types are displayed, how the graph is laid out, how render results are
//! cached, and how the render worker behaves. All types implement
//! [`serde::Deserialize`] for flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level application configuration combining every section.
//! - [`DisplayOptions`] - Controls which schema types and fields are displayed.
//! - [`LayoutConfig`] - Controls rank separation and node fonts.
//! - [`CacheConfig`] - Controls the rendered SVG cache.
//! - [`WorkerConfig`] - Controls the render worker.
//!
//! # Example
//!
//! ```
//! # use typeviz::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert_eq!(config.cache().max_size(), 10);
//! assert!(config.display().show_leaf_fields);
//! ```

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

pub use typeviz_core::DisplayOptions;

/// Top-level application configuration combining every section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Display options section.
    #[serde(default)]
    display: DisplayOptions,

    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Cache configuration section.
    #[serde(default)]
    cache: CacheConfig,

    /// Worker configuration section.
    #[serde(default)]
    worker: WorkerConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(
        display: DisplayOptions,
        layout: LayoutConfig,
        cache: CacheConfig,
        worker: WorkerConfig,
    ) -> Self {
        Self {
            display,
            layout,
            cache,
            worker,
        }
    }

    /// Returns the display options.
    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    /// Returns the display options for modification.
    pub fn display_mut(&mut self) -> &mut DisplayOptions {
        &mut self.display
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the cache configuration.
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Returns the cache configuration for modification.
    pub fn cache_mut(&mut self) -> &mut CacheConfig {
        &mut self.cache
    }

    /// Returns the worker configuration.
    pub fn worker(&self) -> &WorkerConfig {
        &self.worker
    }
}

/// Graph layout settings passed to the rendering engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Separation between ranks, in inches.
    rank_separation: f32,

    /// Font family for node labels.
    font_name: String,

    /// Font size for node labels, in points.
    font_size: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        // Wide ranks keep deep type hierarchies readable.
        Self {
            rank_separation: 2.0,
            font_name: "helvetica".to_string(),
            font_size: 16,
        }
    }
}

impl LayoutConfig {
    /// Creates a new [`LayoutConfig`].
    ///
    /// # Arguments
    ///
    /// * `rank_separation` - Separation between ranks, in inches.
    /// * `font_name` - Font family for node labels.
    /// * `font_size` - Font size for node labels, in points.
    pub fn new(rank_separation: f32, font_name: impl Into<String>, font_size: u32) -> Self {
        Self {
            rank_separation,
            font_name: font_name.into(),
            font_size,
        }
    }

    pub fn rank_separation(&self) -> f32 {
        self.rank_separation
    }

    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }
}

/// Settings of the rendered SVG cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether rendered diagrams are cached at all.
    enabled: bool,

    /// Maximum number of cached diagrams.
    max_size: usize,

    /// Key under which the access-order index is stored.
    namespace: String,

    /// Directory for file-backed storage; platform cache directory when unset.
    directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 10,
            namespace: "TypevizSvgCache".to_string(),
            directory: None,
        }
    }
}

impl CacheConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn directory(&self) -> Option<&PathBuf> {
        self.directory.as_ref()
    }
}

/// Settings of the render worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Milliseconds after which an unanswered render request fails.
    ///
    /// Requests wait indefinitely when unset.
    request_timeout_ms: Option<u64>,
}

impl WorkerConfig {
    /// Creates a worker configuration with the given request timeout.
    pub fn with_request_timeout(timeout: Duration) -> Self {
        Self {
            request_timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Returns the request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
