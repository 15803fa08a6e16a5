//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use mirror_core::DEFAULT_CONCURRENCY;

/// Mirror a Caddy file-server directory tree to a local directory.
///
/// Directory listings are requested as JSON and walked concurrently; files are
/// fetched with conditional GETs so unchanged files are not transferred again.
#[derive(Parser, Debug)]
#[command(name = "mirror-caddy")]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the Caddy browse listing to mirror
    pub base_url: String,

    /// Local directory to mirror into
    #[arg(default_value = ".")]
    pub download_dir: PathBuf,

    /// Maximum concurrent file downloads (1-1024)
    #[arg(
        short = 'c',
        long,
        env = "PARALLEL_JOBS",
        default_value_t = DEFAULT_CONCURRENCY as u16,
        value_parser = clap::value_parser!(u16).range(1..=1024)
    )]
    pub concurrency: u16,

    /// Maximum concurrent directory listing requests (0 for unbounded)
    #[arg(long, default_value_t = 0)]
    pub listing_concurrency: usize,

    /// Connect timeout per request in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Total timeout per request in seconds
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Default tracing level for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Listing cap, `None` when unbounded.
    pub fn listing_limit(&self) -> Option<usize> {
        (self.listing_concurrency > 0).then_some(self.listing_concurrency)
    }
}
