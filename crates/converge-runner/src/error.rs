//! Error types for convergence runs.

use converge_host::HostError;
use thiserror::Error;

/// Errors that abort a convergence run.
#[derive(Debug, Error)]
pub enum RunError {
  /// The guard predicate could not be evaluated.
  #[error("guard for step '{step}' could not be evaluated: {cause}")]
  Guard {
    step: String,
    #[source]
    cause: HostError,
  },

  /// The step action failed.
  #[error("action for step '{step}' failed: {cause}")]
  Action {
    step: String,
    #[source]
    cause: HostError,
  },
}

impl RunError {
  /// Name of the step that aborted the run.
  pub fn step(&self) -> &str {
    match self {
      RunError::Guard { step, .. } | RunError::Action { step, .. } => step,
    }
  }

  /// The underlying host error.
  pub fn cause(&self) -> &HostError {
    match self {
      RunError::Guard { cause, .. } | RunError::Action { cause, .. } => cause,
    }
  }
}
