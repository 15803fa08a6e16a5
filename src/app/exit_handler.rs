//! Exit code logic for the mirror process.
//!
//! Single responsibility: map a run summary to the process exit outcome.

use mirror_core::MirrorSummary;

use crate::ProcessExit;

/// Any failed file makes the run a failure; an empty run is a success.
pub(crate) fn determine_exit_outcome(summary: &MirrorSummary) -> ProcessExit {
    if summary.has_failures() {
        ProcessExit::Failure
    } else {
        ProcessExit::Success
    }
}
