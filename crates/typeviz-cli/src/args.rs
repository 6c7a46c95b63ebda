//! Command-line argument definitions for the typeviz CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the schema and output paths, the
//! configuration file, display overrides, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the typeviz diagram tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the schema JSON file
    #[arg(help = "Path to the schema JSON file")]
    pub input: String,

    /// Path to the output file
    #[arg(short, long, default_value = "out.svg")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Type to start the diagram from instead of the query type
    #[arg(long)]
    pub root_type: Option<String>,

    /// Write the DOT description instead of rendering SVG
    #[arg(long)]
    pub dot: bool,

    /// Bypass the rendered SVG cache
    #[arg(long)]
    pub no_cache: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
