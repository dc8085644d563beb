//! layerconf
//!
//! Loads configuration layers from files and the environment, merges them
//! and prints the processed result.

use anyhow::{Context, Result};
use clap::Parser;
use layerconf::cli::Cli;
use layerconf::decode::lookup;
use layerconf::{EnvLoader, FileLoader, Processor, ProcessorConfig};
use serde_json::Value;
use std::fs::OpenOptions;
use tracing::level_filters::LevelFilter;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from(level).into())
            .from_env_lossy()
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let files = if cli.path.is_empty() {
        FileLoader::from_env()
    } else {
        FileLoader::new(&cli.path)
    };
    debug!(dirs = ?files.dirs(), "File loader search path");

    let processor = Processor::new(
        ProcessorConfig::default()
            .with_loader("file", files)
            .with_loader("env", EnvLoader::new())
            .disable_processing(cli.no_process),
    );

    let tree = processor
        .load(cli.locators.iter().map(String::as_str))?
        .unwrap_or_default();
    let output = match &cli.section {
        Some(name) => lookup(&tree, name)
            .cloned()
            .with_context(|| format!("section \"{}\" not found", name))?,
        None => Value::Object(tree),
    };

    println!("{}", cli.format.render(&output)?.trim_end());
    Ok(())
}
