//! Typeviz - GraphQL schema diagrams.
//!
//! Selects the part of a schema reachable from a root type, compiles it into
//! a Graphviz description with HTML-like table nodes, and renders that
//! description to SVG through a long-lived engine behind a content cache.

pub mod cache;
pub mod codec;
pub mod config;
pub mod description;
pub mod dot;
pub mod hash;
pub mod worker;

mod compiler;
mod error;

pub use typeviz_core::{identifier, schema};
pub use typeviz_core::{DisplayOptions, TypeGraph, TypeGraphError};

pub use compiler::{Compiler, compile};
pub use error::{RenderError, TypevizError};
pub use worker::{RenderEngine, RenderWorker};

use std::sync::Arc;

use log::{debug, info, trace};

use cache::{LruCache, Storage};
use config::AppConfig;
use description::GraphDescription;
use schema::Schema;

/// Builder for turning schemas into diagrams.
///
/// # Examples
///
/// ```rust
/// use typeviz::{DiagramBuilder, config::AppConfig};
///
/// let json = r#"{
///     "queryType": "Query",
///     "types": [
///         {"name": "Query", "kind": "OBJECT", "fields": [{"name": "me", "type": "User"}]},
///         {"name": "User", "kind": "OBJECT", "fields": [{"name": "id", "type": "ID!"}]},
///         {"name": "ID", "kind": "SCALAR"}
///     ]
/// }"#;
///
/// let builder = DiagramBuilder::new(AppConfig::default());
/// let schema = builder.parse_schema(json).expect("Failed to parse schema");
/// let graph = builder.build_graph(&schema).expect("Failed to build graph");
/// let dot = builder.to_dot(&graph);
///
/// assert!(dot.contains("TYPE::User"));
/// ```
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    config: AppConfig,
}

impl DiagramBuilder {
    /// Create a new diagram builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse a schema from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`TypevizError::Schema`] for malformed JSON, unknown type
    /// kinds, invalid type references and duplicate type names.
    pub fn parse_schema(&self, json: &str) -> Result<Schema, TypevizError> {
        info!("Parsing schema");
        let schema: Schema = serde_json::from_str(json)
            .map_err(|err| TypevizError::new_schema_error(err, json))?;
        debug!(types = schema.types().count(); "Schema parsed successfully");
        Ok(schema)
    }

    /// Select the types to display, following the configured display options.
    ///
    /// # Errors
    ///
    /// Returns [`TypevizError::Graph`] if the root type is unknown or a
    /// reachable type references a type missing from the schema.
    pub fn build_graph(&self, schema: &Schema) -> Result<TypeGraph, TypevizError> {
        let options = self.config.display();
        info!(root_type:? = options.root_type; "Building type graph");

        let graph = TypeGraph::from_schema(schema, options)?;
        debug!(nodes = graph.len(), root = graph.root_type(); "Type graph built");
        Ok(graph)
    }

    /// Compile `graph` with the configured layout.
    pub fn compile(&self, graph: &TypeGraph) -> GraphDescription {
        Compiler::new(self.config.layout()).compile(graph)
    }

    /// Compile `graph` and serialize it as DOT text.
    pub fn to_dot(&self, graph: &TypeGraph) -> String {
        let description = self.compile(graph);
        let dot = dot::to_dot(&description);
        trace!(dot; "Generated DOT");
        dot
    }

    /// Start a render worker for `engine`.
    ///
    /// Results are cached in `storage` unless caching is disabled in the
    /// configuration or no storage is given.
    ///
    /// # Errors
    ///
    /// Returns [`TypevizError::Io`] if the worker threads can not be spawned.
    pub fn spawn_worker<E, S>(
        &self,
        engine: E,
        storage: Option<S>,
    ) -> Result<RenderWorker, TypevizError>
    where
        E: RenderEngine + 'static,
        S: Storage + 'static,
    {
        let cache_config = self.config.cache();
        let cache = storage.filter(|_| cache_config.enabled()).map(|storage| {
            Arc::new(LruCache::new(
                storage,
                cache_config.namespace(),
                cache_config.max_size(),
            ))
        });

        Ok(RenderWorker::spawn(engine, cache, self.config.worker())?)
    }

    /// Render `graph` to SVG through `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`TypevizError::Render`] if the worker fails to render.
    pub async fn render_svg(
        &self,
        worker: &RenderWorker,
        graph: &TypeGraph,
    ) -> Result<String, TypevizError> {
        let dot = self.to_dot(graph);
        info!(dot_len = dot.len(); "Rendering SVG");

        let svg = worker.render_string(&dot).await?;
        debug!(svg_len = svg.len(); "SVG rendered");
        Ok(svg)
    }
}
