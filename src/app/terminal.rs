use tracing_subscriber::EnvFilter;

use crate::app::progress_manager::SpinnerSlot;
use crate::cli::Args;

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(
    no_color_flag: bool,
    no_color_env: bool,
    dumb_terminal: bool,
) -> bool {
    no_color_flag || no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested(args: &Args) -> bool {
    should_disable_color(args.no_color, no_color_env_requested(), is_dumb_terminal())
}

/// The spinner replaces per-file log lines only at default verbosity.
pub(crate) fn should_use_spinner(
    stderr_is_terminal: bool,
    quiet: bool,
    verbose: u8,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && verbose == 0 && !dumb_terminal
}

/// Directives applied when `RUST_LOG` is unset: our crates at `level`,
/// dependencies at `warn`.
pub(crate) fn default_directives(level: &str) -> String {
    format!("warn,mirror_core={level},mirror_caddy={level}")
}

/// Installs the stderr subscriber. Log lines go through `spinner` so they
/// never interleave with the discovery spinner.
pub(crate) fn init_tracing(level: &str, no_color: bool, spinner: SpinnerSlot) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let _ = tracing_subscriber::fmt()
        .with_writer(spinner)
        .with_ansi(!no_color)
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}
