//! Run report types.

use converge_config::ResourceKind;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::RunError;

/// Outcome of one step in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
  Success,
  /// Guard said the host is converged, or an only-on-notify step was not notified.
  Skipped,
  Failed,
  /// The run aborted before this step was considered.
  NotReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Converged,
  Failed,
}

/// Outcome of a single step, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
  pub name: String,
  pub kind: ResourceKind,
  pub outcome: StepOutcome,
}

/// Result of a complete convergence run.
#[derive(Debug, Serialize)]
pub struct RunReport {
  /// Unique run ID.
  pub run_id: String,
  pub recipe_id: String,
  pub status: RunStatus,
  /// Per-step outcomes, in declaration order.
  pub steps: Vec<StepReport>,
  /// Names of steps whose action ran, in execution order. A step re-triggered
  /// by an immediate notification appears once per execution.
  pub executed: Vec<String>,
  /// The error that aborted the run.
  #[serde(serialize_with = "serialize_error")]
  pub error: Option<RunError>,
}

impl RunReport {
  pub fn is_converged(&self) -> bool {
    self.status == RunStatus::Converged
  }

  /// Outcome of the step with the given name.
  pub fn outcome(&self, step: &str) -> Option<StepOutcome> {
    self
      .steps
      .iter()
      .find(|s| s.name == step)
      .map(|s| s.outcome)
  }

  /// Number of steps with the given outcome.
  pub fn count(&self, outcome: StepOutcome) -> usize {
    self.steps.iter().filter(|s| s.outcome == outcome).count()
  }

  pub fn error(&self) -> Option<&RunError> {
    self.error.as_ref()
  }

  /// Convert into a `Result`, keeping the report on success.
  pub fn into_result(self) -> Result<RunReport, RunError> {
    match self.error {
      Some(error) => Err(error),
      None => Ok(self),
    }
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

fn serialize_error<S: Serializer>(error: &Option<RunError>, serializer: S) -> Result<S::Ok, S::Error> {
  match error {
    None => serializer.serialize_none(),
    Some(error) => {
      let phase = match error {
        RunError::Guard { .. } => "guard",
        RunError::Action { .. } => "action",
      };
      let mut state = serializer.serialize_struct("RunError", 5)?;
      state.serialize_field("step", error.step())?;
      state.serialize_field("phase", phase)?;
      state.serialize_field("exit_code", &error.cause().exit_code())?;
      state.serialize_field("cause", &error.cause().to_string())?;
      state.serialize_field("message", &error.to_string())?;
      state.end()
    }
  }
}
