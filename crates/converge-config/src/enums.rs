use std::fmt;

use serde::{Deserialize, Serialize};

/// When a notification delivers its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
  /// Run the target right after the notifying step succeeds.
  #[serde(alias = "immediately")]
  Immediate,
  /// Run the target once, after every declared step has converged.
  #[default]
  Delayed,
}

/// How a guard's predicate gates the step action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolarity {
  /// Skip the action when the predicate holds.
  #[default]
  NotIf,
  /// Run the action only when the predicate holds.
  OnlyIf,
}

impl GuardPolarity {
  /// Whether a predicate result means the action should be skipped.
  pub fn skips(self, predicate_holds: bool) -> bool {
    match self {
      GuardPolarity::NotIf => predicate_holds,
      GuardPolarity::OnlyIf => !predicate_holds,
    }
  }
}

/// Resource kind tag, used for the idempotency semantics of the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Execute,
  Package,
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ResourceKind::Execute => f.write_str("execute"),
      ResourceKind::Package => f.write_str("package"),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageOp {
  #[default]
  Install,
  Remove,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_if_skips_when_predicate_holds() {
    assert!(GuardPolarity::NotIf.skips(true));
    assert!(!GuardPolarity::NotIf.skips(false));
  }

  #[test]
  fn test_only_if_skips_when_predicate_fails() {
    assert!(GuardPolarity::OnlyIf.skips(false));
    assert!(!GuardPolarity::OnlyIf.skips(true));
  }

  #[test]
  fn test_timing_accepts_immediately_alias() {
    let timing: Timing = serde_json::from_str("\"immediately\"").unwrap();
    assert_eq!(timing, Timing::Immediate);
    assert_eq!(Timing::default(), Timing::Delayed);
  }
}
