use std::fmt;
use std::sync::Arc;

use converge_config::{GuardPolarity, ResourceKind, Timing};
use converge_host::{Action, HostError, Predicate};

/// A guard: a read-only predicate plus the polarity deciding what its result means.
#[derive(Clone)]
pub struct Guard {
  predicate: Arc<dyn Predicate>,
  polarity: GuardPolarity,
}

impl Guard {
  pub fn new(predicate: Arc<dyn Predicate>, polarity: GuardPolarity) -> Self {
    Self {
      predicate,
      polarity,
    }
  }

  /// Skip the action when the predicate holds.
  pub fn not_if(predicate: Arc<dyn Predicate>) -> Self {
    Self::new(predicate, GuardPolarity::NotIf)
  }

  /// Run the action only when the predicate holds.
  pub fn only_if(predicate: Arc<dyn Predicate>) -> Self {
    Self::new(predicate, GuardPolarity::OnlyIf)
  }

  pub fn polarity(&self) -> GuardPolarity {
    self.polarity
  }

  pub fn describe(&self) -> String {
    let keyword = match self.polarity {
      GuardPolarity::NotIf => "not_if",
      GuardPolarity::OnlyIf => "only_if",
    };
    format!("{} {}", keyword, self.predicate.describe())
  }

  /// Evaluate the predicate and report whether the action should be skipped.
  pub fn should_skip(&self) -> Result<bool, HostError> {
    let holds = self.predicate.evaluate()?;
    Ok(self.polarity.skips(holds))
  }
}

impl fmt::Debug for Guard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.describe())
  }
}

/// A resolved notification: the target is an index into the recipe's steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
  pub target: usize,
  pub timing: Timing,
}

/// One unit of desired state. Immutable once the recipe is built.
#[derive(Clone)]
pub struct Step {
  pub(crate) name: String,
  pub(crate) kind: ResourceKind,
  pub(crate) action: Arc<dyn Action>,
  pub(crate) guard: Option<Guard>,
  pub(crate) notifications: Vec<Notification>,
  pub(crate) only_on_notify: bool,
}

impl Step {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> ResourceKind {
    self.kind
  }

  pub fn action(&self) -> &dyn Action {
    self.action.as_ref()
  }

  pub fn guard(&self) -> Option<&Guard> {
    self.guard.as_ref()
  }

  pub fn notifications(&self) -> &[Notification] {
    &self.notifications
  }

  /// Whether the step runs only when notified.
  pub fn only_on_notify(&self) -> bool {
    self.only_on_notify
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("action", &self.action.describe())
      .field("guard", &self.guard)
      .field("notifications", &self.notifications)
      .field("only_on_notify", &self.only_on_notify)
      .finish()
  }
}
