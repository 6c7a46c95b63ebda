//! CLI logic for the typeviz diagram tool.
//!
//! Reads a schema JSON file, selects the types to display and writes either
//! the DOT description or the SVG rendered by Graphviz.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::info;

use typeviz::{DiagramBuilder, TypeGraph, TypevizError};

/// Run the typeviz CLI application
///
/// # Errors
///
/// Returns `TypevizError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Schema parsing errors
/// - Type graph errors
/// - Rendering errors
pub fn run(args: &Args) -> Result<(), TypevizError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing schema"
    );

    let mut app_config = config::load_config(args.config.as_ref())?;
    if let Some(root_type) = &args.root_type {
        app_config.display_mut().root_type = Some(root_type.clone());
    }
    if args.no_cache {
        app_config.cache_mut().set_enabled(false);
    }

    let source = fs::read_to_string(&args.input)?;

    let builder = DiagramBuilder::new(app_config);
    let schema = builder.parse_schema(&source)?;
    let graph = builder.build_graph(&schema)?;

    if args.dot {
        fs::write(&args.output, builder.to_dot(&graph))?;
        info!(output_file = args.output; "DOT exported successfully");
        return Ok(());
    }

    let svg = render(&builder, &graph)?;
    fs::write(&args.output, svg)?;

    info!(output_file = args.output; "SVG exported successfully");

    Ok(())
}

#[cfg(feature = "graphviz")]
fn render(builder: &DiagramBuilder, graph: &TypeGraph) -> Result<String, TypevizError> {
    use typeviz::worker::GraphvizEngine;

    let engine = GraphvizEngine::new()?;
    let storage = cache_storage(builder.config().cache());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let worker = builder.spawn_worker(engine, storage)?;
        builder.render_svg(&worker, graph).await
    })
}

#[cfg(not(feature = "graphviz"))]
fn render(_builder: &DiagramBuilder, _graph: &TypeGraph) -> Result<String, TypevizError> {
    Err(TypevizError::Config(
        "SVG rendering requires the `graphviz` feature; use --dot to write DOT instead"
            .to_string(),
    ))
}

/// Open the file-backed SVG cache, if caching is enabled and possible.
///
/// A cache that can not be opened only disables caching.
#[cfg(feature = "graphviz")]
fn cache_storage(cache: &typeviz::config::CacheConfig) -> Option<typeviz::cache::FileStorage> {
    use log::{debug, warn};

    if !cache.enabled() {
        debug!("SVG cache disabled");
        return None;
    }

    let directory = match cache.directory() {
        Some(directory) => directory.clone(),
        None => config::project_dirs()?.cache_dir().join("svg"),
    };

    match typeviz::cache::FileStorage::new(&directory) {
        Ok(storage) => {
            debug!(path = directory.display().to_string(); "Using SVG cache");
            Some(storage)
        }
        Err(err) => {
            warn!(err:%, path = directory.display().to_string(); "Can not open SVG cache");
            None
        }
    }
}
