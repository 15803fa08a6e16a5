//! CLI entry point for mirror-caddy.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, warn};

mod app;
mod cli;

use app::{progress_manager, runtime, terminal};
use cli::Args;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every discovered file was downloaded or unchanged.
    Success,
    /// Setup failed or at least one file failed.
    Failure,
    /// Stopped by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::is_no_color_requested(&args);
    let spinner = progress_manager::SpinnerSlot::default();
    terminal::init_tracing(args.log_level(), no_color, spinner.clone());
    debug!(?args, "CLI arguments parsed");

    let outcome = tokio::select! {
        result = runtime::run_mirror(&args, spinner) => match result {
            Ok(exit) => exit,
            Err(e) => {
                error!(error = %format!("{e:#}"), "mirror failed");
                ProcessExit::Failure
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            progress_manager::clear_spinner_line();
            warn!("Interrupted");
            // Transfers still in flight leave only `.tmp` files behind.
            std::process::exit(i32::from(ProcessExit::Interrupted.code()));
        }
    };

    ExitCode::from(outcome.code())
}
