use thiserror::Error;

/// A malformed step graph, detected before any action runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  #[error("recipe has no steps")]
  Empty,

  #[error("duplicate step name: {name}")]
  DuplicateStep { name: String },

  #[error("step '{step}' notifies unknown step '{target}'")]
  UnknownTarget { step: String, target: String },

  #[error("notification cycle: {}", .path.join(" -> "))]
  Cycle { path: Vec<String> },
}
