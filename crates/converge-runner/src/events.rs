//! Execution events and notifiers for observability.
//!
//! Events are emitted during a run so that callers can observe progress,
//! persist it, or stream it to a UI.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Why a step's action is being run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
  /// Reached in declaration order.
  Sequence,
  /// Notified immediately by another step.
  Immediate { notifier: String },
  /// Queued by a delayed notification and run at end of run.
  Delayed,
}

/// Why a step did not run its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// The guard decided the host is already converged.
  Guard,
  /// The step only runs on notification and was not notified.
  NotNotified,
}

/// Events emitted during a convergence run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  RunStarted {
    run_id: String,
    recipe_id: String,
  },

  StepStarted {
    run_id: String,
    step: String,
    trigger: Trigger,
  },

  StepSkipped {
    run_id: String,
    step: String,
    reason: SkipReason,
  },

  StepCompleted {
    run_id: String,
    step: String,
  },

  StepFailed {
    run_id: String,
    step: String,
    error: String,
  },

  /// A delayed notification was queued for end of run.
  NotificationQueued {
    run_id: String,
    notifier: String,
    target: String,
  },

  RunCompleted {
    run_id: String,
  },

  RunFailed {
    run_id: String,
    step: String,
    error: String,
  },
}

/// Trait for receiving execution events.
///
/// The runner calls `notify` for each event; implementations decide what to
/// do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Sends never block the run.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
