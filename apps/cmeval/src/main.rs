//! cmeval - CMake build-description evaluator
//!
//! Runs the evaluator over a source tree and renders the resulting event
//! stream, either as a human summary or as JSON lines for a downstream
//! build-graph assembler. The exit code mirrors the run report.

mod cli;
mod output;

use clap::Parser;
use cmeval_config::Config;
use cmeval_errors::Error;
use cmeval_evaluator::{Evaluator, EvaluatorOptions};
use std::process;
use tracing::error;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(&cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            error!("evaluation aborted: {e}");
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> Result<i32, Error> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(name) = &cli.config_name {
        config.eval.config_name = name.clone();
    }
    if cli.json {
        config.eval.json_events = true;
    }

    let source_dir = cli.source_dir.canonicalize().unwrap_or_else(|_| cli.source_dir.clone());
    let binary_dir = cli
        .binary_dir
        .clone()
        .unwrap_or_else(|| source_dir.join("build"));

    let mut options = EvaluatorOptions::new(source_dir, binary_dir).with_config(config.clone());
    for define in &cli.defines {
        let (name, value) = define
            .split_once('=')
            .map_or((define.as_str(), ""), |(n, v)| (n, v));
        options = options.define(name, value);
    }

    let mut evaluator = Evaluator::new(options)?;
    evaluator.run()?;
    let outcome = evaluator.finish();

    if config.eval.json_events {
        output::write_json_events(&outcome, &mut std::io::stdout().lock())?;
    } else {
        output::write_summary(&outcome, &mut std::io::stdout().lock())?;
    }
    if let Some(path) = &cli.events_out {
        let file = std::fs::File::create(path).map_err(|e| Error::io_with_path(&e, path.clone()))?;
        output::write_json_events(&outcome, &mut std::io::BufWriter::new(file))?;
    }

    Ok(outcome.report.overall_status.exit_code())
}

fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
