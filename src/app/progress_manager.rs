//! Progress UI (spinner) for the discovery phase.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mirror_core::ProgressCounter;
use tracing_subscriber::fmt::MakeWriter;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// The spinner currently on screen, if any.
///
/// Shared by the spinner task and the log writer so log lines are printed
/// with the spinner line cleared and redrawn afterwards.
#[derive(Clone, Default)]
pub(crate) struct SpinnerSlot(Arc<Mutex<Option<ProgressBar>>>);

impl SpinnerSlot {
    fn set(&self, bar: Option<ProgressBar>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = bar;
        }
    }

    /// Runs `f` with the active spinner hidden.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self.0.lock().ok().and_then(|slot| slot.clone());
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

/// Stderr writer that hides the spinner while a log line is written.
pub(crate) struct SuspendingStderr {
    slot: SpinnerSlot,
}

impl Write for SuspendingStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.slot.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.slot.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for SpinnerSlot {
    type Writer = SuspendingStderr;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendingStderr { slot: self.clone() }
    }
}

/// Spawns the discovery spinner when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    found: Arc<ProgressCounter>,
    slot: SpinnerSlot,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(found, Arc::clone(&stop), slot);
    (Some(handle), stop)
}

pub(crate) fn spinner_message(found: usize) -> String {
    format!("Enumerating files... {found} found")
}

fn spawn_spinner_inner(
    found: Arc<ProgressCounter>,
    stop: Arc<AtomicBool>,
    slot: SpinnerSlot,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(REFRESH_INTERVAL);
        slot.set(Some(spinner.clone()));

        while !stop.load(Ordering::SeqCst) {
            spinner.set_message(spinner_message(found.get()));
            tokio::time::sleep(REFRESH_INTERVAL).await;
        }

        slot.set(None);
        spinner.finish_and_clear();
    })
}

/// Erases a partially drawn spinner line on stderr.
pub(crate) fn clear_spinner_line() {
    eprint!("\r\x1b[K");
}
