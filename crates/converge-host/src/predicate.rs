//! Guard predicates.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::HostError;
use crate::invoke::{CommandSpec, Invoker};
use crate::package::PackageManager;

/// A read-only check over host state.
///
/// Implementations must not change the host; the runner may evaluate a
/// predicate any number of times.
pub trait Predicate: Send + Sync {
  fn describe(&self) -> String;

  fn evaluate(&self) -> Result<bool, HostError>;
}

/// A predicate backed by a closure.
pub struct FnPredicate<F> {
  description: String,
  f: F,
}

impl<F> FnPredicate<F>
where
  F: Fn() -> Result<bool, HostError> + Send + Sync,
{
  pub fn new(description: impl Into<String>, f: F) -> Self {
    Self {
      description: description.into(),
      f,
    }
  }
}

impl<F> Predicate for FnPredicate<F>
where
  F: Fn() -> Result<bool, HostError> + Send + Sync,
{
  fn describe(&self) -> String {
    self.description.clone()
  }

  fn evaluate(&self) -> Result<bool, HostError> {
    (self.f)()
  }
}

/// Holds when a path exists.
pub struct FileExists {
  path: PathBuf,
}

impl FileExists {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Predicate for FileExists {
  fn describe(&self) -> String {
    format!("file {} exists", self.path.display())
  }

  fn evaluate(&self) -> Result<bool, HostError> {
    self.path.try_exists().map_err(|source| HostError::Io {
      path: self.path.clone(),
      source,
    })
  }
}

/// Holds when a command exits with status 0.
///
/// A non-zero exit means "does not hold"; only a command that cannot be run
/// to completion is an error.
pub struct CommandSucceeds {
  spec: CommandSpec,
  invoker: Arc<dyn Invoker>,
}

impl CommandSucceeds {
  pub fn new(spec: CommandSpec, invoker: Arc<dyn Invoker>) -> Self {
    Self { spec, invoker }
  }
}

impl Predicate for CommandSucceeds {
  fn describe(&self) -> String {
    format!("`{}` succeeds", self.spec.display())
  }

  fn evaluate(&self) -> Result<bool, HostError> {
    Ok(self.invoker.invoke(&self.spec)?.success())
  }
}

/// Holds when a package is installed.
pub struct PackageInstalled {
  package: String,
  manager: Arc<dyn PackageManager>,
}

impl PackageInstalled {
  pub fn new(package: impl Into<String>, manager: Arc<dyn PackageManager>) -> Self {
    Self {
      package: package.into(),
      manager,
    }
  }
}

impl Predicate for PackageInstalled {
  fn describe(&self) -> String {
    format!("package {} installed", self.package)
  }

  fn evaluate(&self) -> Result<bool, HostError> {
    Ok(self.manager.installed_version(&self.package)?.is_some())
  }
}
