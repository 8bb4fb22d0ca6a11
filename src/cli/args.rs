//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::format::FormatKind;

/// On-the-fly `<picture>` rewriting and image transcoding server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: pixshift.toml)
    #[arg(short = 'C', long, global = true, default_value = "pixshift.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve a directory or proxy an origin, rewriting HTML and transcoding images
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Rewrite an HTML file and print the result
    #[command(visible_alias = "r")]
    Rewrite {
        /// HTML file to rewrite (`-` reads stdin)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Host the page is served from (absolute URLs on other hosts are left alone)
        #[arg(long, default_value = "localhost")]
        host: String,
    },

    /// Transcode a local image into a destination format
    #[command(visible_alias = "c")]
    Convert {
        /// Source image (jpeg, png or webp)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Destination format
        #[arg(short, long, value_parser = parse_destination)]
        format: FormatKind,

        /// Output path (default: `<input>.<ext>`)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Static directory to serve
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Proxy this origin instead of serving a directory
    #[arg(short, long, value_hint = clap::ValueHint::Url)]
    pub upstream: Option<String>,

    /// Disable the transcode cache
    #[arg(long)]
    pub no_cache: bool,
}

fn parse_destination(value: &str) -> Result<FormatKind, String> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jxl" => Ok(FormatKind::Jxl),
        "avif" => Ok(FormatKind::Avif),
        "webp" => Ok(FormatKind::WebP),
        other => Err(format!("`{other}` is not a destination format (jxl, avif, webp)")),
    }
}

impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
