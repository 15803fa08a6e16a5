use std::io::{self, IsTerminal};
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use mirror_core::{Mirror, MirrorConfig};
use tracing::debug;

use crate::ProcessExit;
use crate::app::progress_manager::SpinnerSlot;
use crate::app::{exit_handler, progress_manager, terminal};
use crate::cli::Args;

/// Validates `args` into a run configuration.
pub(crate) fn build_config(args: &Args) -> Result<MirrorConfig> {
    let config = MirrorConfig::new(&args.base_url, &args.download_dir)?
        .with_concurrency(usize::from(args.concurrency))?
        .with_listing_concurrency(args.listing_limit())
        .with_timeouts(
            Duration::from_secs(args.connect_timeout),
            Duration::from_secs(args.timeout),
        );
    Ok(config)
}

pub(crate) async fn run_mirror(args: &Args, spinner: SpinnerSlot) -> Result<ProcessExit> {
    let config = build_config(args)?;
    debug!(?config, "configuration resolved");

    let mirror = Mirror::new(config)?;
    mirror.prepare().await?;

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        args.verbose,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, mirror.found_counter(), spinner);

    let files = mirror.discover().await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let summary = mirror.mirror_files(files).await;
    Ok(exit_handler::determine_exit_outcome(&summary))
}
