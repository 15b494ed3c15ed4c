use converge_recipe::ConfigurationError;
use thiserror::Error;

/// Errors that can occur during recipe resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The step graph is malformed.
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),

  /// A step was declared without a name.
  #[error("step #{position} has an empty name")]
  EmptyName { position: usize },

  /// An execute step (or command guard) has nothing to run.
  #[error("step '{step}' has an empty command")]
  EmptyCommand { step: String },

  /// A package step names no package.
  #[error("step '{step}' has an empty package name")]
  EmptyPackage { step: String },
}
