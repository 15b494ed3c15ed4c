//! Converge Runner
//!
//! This crate provides the [`ConvergenceRunner`], which applies a locked
//! [`Recipe`](converge_recipe::Recipe) to the host:
//!
//! ```text
//! for each step, in declaration order:
//!   already handled by an immediate notification?  -> leave as is
//!   only runs on notification?                      -> skipped
//!   guard says skip?                                -> skipped
//!   run action
//!     ok     -> success; immediate targets run now, delayed targets queue
//!     error  -> failed; abort, nothing else runs
//! then run every queued target once, in queue order, ignoring guards
//! ```
//!
//! Every run produces a [`RunReport`] naming the outcome of each step,
//! including steps never reached because the run aborted. Progress is also
//! published as [`ExecutionEvent`]s through an [`ExecutionNotifier`].

mod error;
mod events;
mod report;
mod runner;

pub use error::RunError;
pub use events::{
  ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier, SkipReason, Trigger,
};
pub use report::{RunReport, RunStatus, StepOutcome, StepReport};
pub use runner::ConvergenceRunner;
