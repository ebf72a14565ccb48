//! `esql` entry point.

use std::{io, process, str::FromStr};

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use esql_cli::{to_reportables, Args};

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", args.log_level);
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting esql");
    debug!(args:?; "Parsed arguments");

    let stdout = io::stdout();
    if let Err(err) = esql_cli::run(&args, &mut stdout.lock()) {
        let reporter = miette::GraphicalReportHandler::new();

        for reportable in to_reportables(&err) {
            let mut writer = String::new();
            reporter
                .render_report(&mut writer, reportable)
                .expect("Writing to String buffer is infallible");

            error!("{writer}");
        }

        process::exit(1);
    }

    info!("Completed successfully");
}
