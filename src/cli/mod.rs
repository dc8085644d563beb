//! CLI definitions for layerconf
//!
//! This module defines the CLI structure using clap's derive macros.

use crate::format::OutputFormat;
use clap::Parser;

/// Load, merge and process layered configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration locators in priority order, e.g. file:app.yml env:^APP_
    #[arg(required = true)]
    pub locators: Vec<String>,

    /// Search directories for the file loader (overrides LAYERCONF_PATH)
    #[arg(short, long, value_delimiter = ':')]
    pub path: Vec<String>,

    /// Merge layers only, leaving directives unprocessed
    #[arg(long)]
    pub no_process: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Print only the section at this dotted name
    #[arg(short, long)]
    pub section: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}
