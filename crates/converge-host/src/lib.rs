//! Converge Host
//!
//! Everything that touches the host lives here:
//!
//! - [`Invoker`] runs commands and reports exit code and stderr. [`ProcessInvoker`]
//!   is the real implementation, with optional per-command timeouts.
//! - [`PackageManager`] abstracts the system package database. [`AptPackageManager`]
//!   drives `dpkg-query` and `apt-get` through an [`Invoker`].
//! - [`Action`] is the side-effecting operation of a step; [`Predicate`] is the
//!   read-only check behind a guard.
//!
//! The runner only ever sees `Action` and `Predicate` trait objects, so it never
//! builds or parses command lines itself.

mod action;
mod error;
mod invoke;
mod package;
mod predicate;

pub use action::{Action, ExecuteAction, FnAction, PackageAction};
pub use error::HostError;
pub use invoke::{CommandOutput, CommandSpec, Invoker, ProcessInvoker};
pub use package::{AptPackageManager, PackageManager};
pub use predicate::{CommandSucceeds, FileExists, FnPredicate, PackageInstalled, Predicate};
