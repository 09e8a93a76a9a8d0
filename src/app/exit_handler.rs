//! Exit code logic for the geoharvest process.
//!
//! Single responsibility: map profile outcomes and errors to the process exit outcome.

use geoharvest::HarvestError;

use crate::ProcessExit;

/// Determines the process exit outcome from completed and failed profile counts.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Exit outcome for an error that aborted the whole command.
///
/// Missing arguments are a usage error, everything else a failure.
pub(crate) fn exit_for_error(error: &anyhow::Error) -> ProcessExit {
    match error.downcast_ref::<HarvestError>() {
        Some(HarvestError::MissingRequiredArguments { .. }) => ProcessExit::Usage,
        _ => ProcessExit::Failure,
    }
}
