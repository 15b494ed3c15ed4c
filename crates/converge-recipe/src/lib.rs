//! Converge Recipe
//!
//! This crate provides the "locked" recipe representation for converge.
//! A locked recipe is a validated, immutable list of steps that is ready for
//! a convergence run.
//!
//! Key differences from `converge-config`:
//! - Notification targets are resolved to step indices at build time
//! - The notification graph is checked for unknown targets and cycles
//! - Actions and guards are bound to host capabilities

mod builder;
mod error;
mod graph;
mod recipe;
mod step;

pub use builder::{RecipeBuilder, StepDecl};
pub use error::ConfigurationError;
pub use graph::NotificationGraph;
pub use recipe::Recipe;
pub use step::{Guard, Notification, Step};

pub use converge_config::{GuardPolarity, ResourceKind, Timing};
