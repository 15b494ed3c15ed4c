//! Converge Config
//!
//! This crate contains the serializable recipe configuration types for converge.
//! These types represent recipe definitions before they are resolved into
//! executable steps.
//!
//! Recipes can be loaded from:
//! - JSON files (via CLI with `converge run recipe.json`)
//! - YAML files (via CLI with `converge run recipe.yaml`)
//!
//! The resolver takes these configuration types, validates the notification
//! graph, and binds every step to host capabilities for execution.

mod command;
mod enums;
mod guard;
mod recipe;
mod step;

pub use command::CommandLine;
pub use enums::{GuardPolarity, PackageOp, ResourceKind, Timing};
pub use guard::{CheckDef, GuardDef};
pub use recipe::RecipeDef;
pub use step::{NotifyDef, ResourceDef, StepDef};
