//! pixshift - on-the-fly `<picture>` rewriting and image transcoding.

mod cli;
mod config;
mod core;
mod dom;
mod format;
mod intercept;
mod logger;
mod rewrite;
mod transcode;
mod url_codec;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PixConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(PixConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(config),
        Commands::Rewrite { input, host } => cli::rewrite::rewrite_file(input, host, &config),
        Commands::Convert {
            input,
            format,
            output,
        } => cli::convert::convert_file(input, *format, output.as_deref(), &config).map(|_| ()),
    }
}
