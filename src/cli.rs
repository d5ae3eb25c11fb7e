//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use objdl_core::download::{DEFAULT_CHUNK_SIZE, DEFAULT_REGION, DEFAULT_WORKERS};

/// Batch download objects from an S3-compatible store.
///
/// Lists every object under the URL prefix, downloads each one in bounded
/// byte-range chunks across a fixed number of concurrent workers, and stores
/// it under `<output>/<entity>/<file name>`.
#[derive(Parser, Debug, Clone)]
#[command(name = "objdl")]
#[command(author, version, about)]
pub struct Args {
    /// Store URL: http(s)://endpoint[:port]/<bucket>/<prefix>
    pub url: String,

    /// Destination root directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Access key ID for the store
    #[arg(long, env = "OBJDL_ACCESS_KEY", hide_env_values = true)]
    pub access_key: String,

    /// Secret access key for the store
    #[arg(long, env = "OBJDL_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Signing region
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Concurrent downloads per wave (1-64)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub workers: u8,

    /// Bytes requested per range (at least 1)
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    /// Only download objects whose stem is listed in this file (one per line)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Only list objects directly under the prefix
    #[arg(long)]
    pub no_recursive: bool,

    /// Put every file directly under the output directory
    #[arg(long)]
    pub flat: bool,

    /// Retries for transient range failures (0-10)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// List and print destinations without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
