//! typeviz CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use typeviz_cli::{Args, error_adapter::to_reportables};

fn main() {
    // Panics inside the render worker threads are reported through miette too
    miette::set_panic_hook();

    let args = Args::parse();

    // An unknown level only degrades logging; the diagram is still produced
    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    // Module directives from RUST_LOG still apply; the flag sets the default level
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting typeviz");
    debug!(args:?; "Parsed arguments");

    if let Err(err) = typeviz_cli::run(&args) {
        let reporter = miette::GraphicalReportHandler::new();
        let reportables = to_reportables(&err);

        // A rejected render yields one report per engine diagnostic
        for reportable in &reportables {
            let mut writer = String::new();
            reporter
                .render_report(&mut writer, reportable)
                .expect("Writing to String buffer is infallible");

            error!("{writer}");
        }

        debug!(reports = reportables.len(), input = args.input; "Run failed");
        process::exit(1);
    }

    info!(output = args.output; "Completed successfully");
}
