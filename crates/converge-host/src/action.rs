//! Step actions.

use std::sync::Arc;

use converge_config::PackageOp;
use tracing::{debug, info};

use crate::error::HostError;
use crate::invoke::{CommandSpec, Invoker};
use crate::package::PackageManager;

/// The side-effecting operation a step performs.
///
/// The runner treats an action as atomic: it is called once, blocks until the
/// host operation is done, and either succeeds or fails.
pub trait Action: Send + Sync {
  /// Short description for logs and reports.
  fn describe(&self) -> String;

  fn apply(&self) -> Result<(), HostError>;
}

/// An action backed by a closure.
pub struct FnAction<F> {
  description: String,
  f: F,
}

impl<F> FnAction<F>
where
  F: Fn() -> Result<(), HostError> + Send + Sync,
{
  pub fn new(description: impl Into<String>, f: F) -> Self {
    Self {
      description: description.into(),
      f,
    }
  }
}

impl<F> Action for FnAction<F>
where
  F: Fn() -> Result<(), HostError> + Send + Sync,
{
  fn describe(&self) -> String {
    self.description.clone()
  }

  fn apply(&self) -> Result<(), HostError> {
    (self.f)()
  }
}

/// Runs a command. Not idempotent: every call runs the command again.
pub struct ExecuteAction {
  spec: CommandSpec,
  invoker: Arc<dyn Invoker>,
}

impl ExecuteAction {
  pub fn new(spec: CommandSpec, invoker: Arc<dyn Invoker>) -> Self {
    Self { spec, invoker }
  }

  pub fn spec(&self) -> &CommandSpec {
    &self.spec
  }
}

impl Action for ExecuteAction {
  fn describe(&self) -> String {
    format!("execute `{}`", self.spec.display())
  }

  fn apply(&self) -> Result<(), HostError> {
    let output = self.invoker.invoke(&self.spec)?.into_result(&self.spec)?;
    debug!(command = %self.spec.display(), stdout = %output.stdout.trim_end(), "command output");
    Ok(())
  }
}

/// Installs or removes a package. Idempotent: consults the package database
/// first and does nothing when the package is already in the wanted state.
pub struct PackageAction {
  package: String,
  version: Option<String>,
  op: PackageOp,
  manager: Arc<dyn PackageManager>,
}

impl PackageAction {
  pub fn new(
    package: impl Into<String>,
    version: Option<String>,
    op: PackageOp,
    manager: Arc<dyn PackageManager>,
  ) -> Self {
    Self {
      package: package.into(),
      version,
      op,
      manager,
    }
  }
}

impl Action for PackageAction {
  fn describe(&self) -> String {
    let verb = match self.op {
      PackageOp::Install => "install",
      PackageOp::Remove => "remove",
    };
    match &self.version {
      Some(version) => format!("{} package {}={}", verb, self.package, version),
      None => format!("{} package {}", verb, self.package),
    }
  }

  fn apply(&self) -> Result<(), HostError> {
    let installed = self.manager.installed_version(&self.package)?;

    match self.op {
      PackageOp::Install => {
        let satisfied = match (&installed, &self.version) {
          (Some(current), Some(wanted)) => current == wanted,
          (Some(_), None) => true,
          (None, _) => false,
        };
        if satisfied {
          info!(package = %self.package, installed = ?installed, "package already installed");
          return Ok(());
        }
        self
          .manager
          .install(&self.package, self.version.as_deref())
      }
      PackageOp::Remove => {
        if installed.is_none() {
          info!(package = %self.package, "package already absent");
          return Ok(());
        }
        self.manager.remove(&self.package)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  /// In-memory package database.
  #[derive(Default)]
  struct FakePackages {
    installed: Mutex<Vec<(String, String)>>,
    transactions: Mutex<Vec<String>>,
  }

  impl FakePackages {
    fn with(package: &str, version: &str) -> Self {
      let fake = Self::default();
      fake
        .installed
        .lock()
        .unwrap()
        .push((package.to_string(), version.to_string()));
      fake
    }

    fn transactions(&self) -> Vec<String> {
      self.transactions.lock().unwrap().clone()
    }
  }

  impl PackageManager for FakePackages {
    fn installed_version(&self, package: &str) -> Result<Option<String>, HostError> {
      Ok(
        self
          .installed
          .lock()
          .unwrap()
          .iter()
          .find(|(name, _)| name == package)
          .map(|(_, version)| version.clone()),
      )
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<(), HostError> {
      let version = version.unwrap_or("latest").to_string();
      self
        .transactions
        .lock()
        .unwrap()
        .push(format!("install {}={}", package, version));
      let mut installed = self.installed.lock().unwrap();
      installed.retain(|(name, _)| name != package);
      installed.push((package.to_string(), version));
      Ok(())
    }

    fn remove(&self, package: &str) -> Result<(), HostError> {
      self
        .transactions
        .lock()
        .unwrap()
        .push(format!("remove {}", package));
      self
        .installed
        .lock()
        .unwrap()
        .retain(|(name, _)| name != package);
      Ok(())
    }
  }

  #[test]
  fn test_install_is_noop_when_present() {
    let packages = Arc::new(FakePackages::with("speedtest", "1.2.0"));
    let action = PackageAction::new("speedtest", None, PackageOp::Install, packages.clone());

    action.apply().unwrap();

    assert!(packages.transactions().is_empty());
  }

  #[test]
  fn test_install_runs_when_absent_then_converges() {
    let packages = Arc::new(FakePackages::default());
    let action = PackageAction::new("speedtest", None, PackageOp::Install, packages.clone());

    action.apply().unwrap();
    action.apply().unwrap();

    assert_eq!(packages.transactions(), vec!["install speedtest=latest"]);
  }

  #[test]
  fn test_install_upgrades_to_pinned_version() {
    let packages = Arc::new(FakePackages::with("speedtest", "1.1.0"));
    let action = PackageAction::new(
      "speedtest",
      Some("1.2.0".to_string()),
      PackageOp::Install,
      packages.clone(),
    );

    action.apply().unwrap();

    assert_eq!(packages.transactions(), vec!["install speedtest=1.2.0"]);
    assert_eq!(action.describe(), "install package speedtest=1.2.0");
  }

  #[test]
  fn test_remove_is_noop_when_absent() {
    let packages = Arc::new(FakePackages::default());
    let action = PackageAction::new("speedtest", None, PackageOp::Remove, packages.clone());

    action.apply().unwrap();

    assert!(packages.transactions().is_empty());
  }

  #[test]
  fn test_fn_action_propagates_errors() {
    let action = FnAction::new("always fails", || Err(HostError::other("boom")));

    assert_eq!(action.describe(), "always fails");
    assert_eq!(action.apply().unwrap_err().to_string(), "boom");
  }
}
