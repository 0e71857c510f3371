//! Command-line interface definition

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cmeval", version, about = "Evaluate CMakeLists.txt into build events")]
pub struct Cli {
    /// Source directory containing the top-level CMakeLists.txt
    #[arg(default_value = ".")]
    pub source_dir: PathBuf,

    /// Binary (build) directory; defaults to <source>/build
    #[arg(short = 'B', long = "binary-dir")]
    pub binary_dir: Option<PathBuf>,

    /// Preseed variables, NAME=VALUE (repeatable)
    #[arg(short = 'D', value_name = "NAME=VALUE")]
    pub defines: Vec<String>,

    /// Configuration file (TOML); defaults to ~/.config/cmeval/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Configuration name for eager generator-expression resolution
    #[arg(long = "config-name")]
    pub config_name: Option<String>,

    /// Emit events as JSON lines on stdout instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Also write events as JSON lines to this file
    #[arg(long = "events-out", value_name = "FILE")]
    pub events_out: Option<PathBuf>,

    /// Log filter (e.g. "debug", "cmeval_evaluator=trace")
    #[arg(long = "log-level", env = "CMEVAL_LOG")]
    pub log_level: Option<String>,
}
