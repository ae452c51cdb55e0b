//! calvault - calendar task authoring CLI
//!
//! Writes calendar tasks as individual Markdown files into a notes vault and
//! watches the task folder for newly created files.

use std::process::ExitCode;

use calvault::cli::Cli;
use calvault::output::{emit_error, infer_command_name_from_args};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest `RUST_LOG` value we try to parse
const MAX_FILTER_LEN: usize = 4096;

fn main() -> ExitCode {
    init_tracing();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = emit_error(&command, &err, json);
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

/// Logging stays off unless `RUST_LOG` holds a usable filter.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|raw| !raw.trim().is_empty() && raw.len() <= MAX_FILTER_LEN)
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
