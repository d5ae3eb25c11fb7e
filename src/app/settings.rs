//! Merges CLI arguments with file configuration.
//!
//! Precedence: explicit CLI value > config file > built-in default.

use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};

use objdl_core::download::constants::{CONNECT_TIMEOUT_SECS, PRESIGN_TTL_SECS, READ_TIMEOUT_SECS};

use crate::app::config::FileConfig;
use crate::cli::Args;

/// Which defaulted arguments were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) region: bool,
    pub(crate) workers: bool,
    pub(crate) chunk_size: bool,
    pub(crate) max_retries: bool,
}

/// Network settings that only come from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HttpSettings {
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
    pub(crate) presign_ttl: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            presign_ttl: Duration::from_secs(PRESIGN_TTL_SECS),
        }
    }
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    (args, sources_from_matches(&matches))
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        region: is_commandline_value(matches, "region"),
        workers: is_commandline_value(matches, "workers"),
        chunk_size: is_commandline_value(matches, "chunk_size"),
        max_retries: is_commandline_value(matches, "max_retries"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.region
        && let Some(region) = &file_config.region
    {
        args.region.clone_from(region);
    }

    if !cli_sources.workers
        && let Some(workers) = file_config.workers
    {
        args.workers = workers;
    }

    if !cli_sources.chunk_size
        && let Some(chunk_size) = file_config.chunk_size
    {
        args.chunk_size = chunk_size;
    }

    if !cli_sources.max_retries
        && let Some(max_retries) = file_config.max_retries
    {
        args.max_retries = max_retries;
    }

    args
}

pub(crate) fn resolve_http_settings(file_config: Option<&FileConfig>) -> HttpSettings {
    let defaults = HttpSettings::default();
    let Some(file_config) = file_config else {
        return defaults;
    };
    HttpSettings {
        connect_timeout_secs: file_config
            .connect_timeout_secs
            .unwrap_or(defaults.connect_timeout_secs),
        read_timeout_secs: file_config
            .read_timeout_secs
            .unwrap_or(defaults.read_timeout_secs),
        presign_ttl: file_config
            .presign_ttl_secs
            .map_or(defaults.presign_ttl, Duration::from_secs),
    }
}

/// Priority: quiet flag > verbose flag > default (info). `RUST_LOG` wins
/// over all of them at subscriber setup.
pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
