//! System package database access.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::HostError;
use crate::invoke::{CommandSpec, Invoker};

/// The package-manager seam consumed by package actions and guards.
pub trait PackageManager: Send + Sync {
  /// Installed version of `package`, or `None` when it is not installed.
  fn installed_version(&self, package: &str) -> Result<Option<String>, HostError>;

  /// Install `package`, pinned to `version` when one is given.
  fn install(&self, package: &str, version: Option<&str>) -> Result<(), HostError>;

  fn remove(&self, package: &str) -> Result<(), HostError>;
}

/// Debian/Ubuntu package manager: `dpkg-query` for state, `apt-get` for changes.
pub struct AptPackageManager {
  invoker: Arc<dyn Invoker>,
  timeout_ms: Option<u64>,
}

impl AptPackageManager {
  pub fn new(invoker: Arc<dyn Invoker>) -> Self {
    Self {
      invoker,
      timeout_ms: None,
    }
  }

  /// Apply a timeout to every `apt-get` transaction.
  pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
    self.timeout_ms = timeout_ms;
    self
  }

  fn apt_get(&self, args: &[&str]) -> CommandSpec {
    let argv = ["apt-get", "-y", "-q"].iter().chain(args.iter()).copied();
    CommandSpec::argv(argv)
      .with_env("DEBIAN_FRONTEND", "noninteractive")
      .with_timeout_ms(self.timeout_ms)
  }
}

impl PackageManager for AptPackageManager {
  fn installed_version(&self, package: &str) -> Result<Option<String>, HostError> {
    let spec = CommandSpec::argv(["dpkg-query", "-W", "-f=${Status}\t${Version}", package]);
    let output = self.invoker.invoke(&spec)?;

    // Exit 1 means the package is unknown; 2 and above are database errors.
    if output.exit_code == Some(1) {
      debug!(package = %package, "package unknown to dpkg");
      return Ok(None);
    }

    let output = output.into_result(&spec)?;
    Ok(parse_dpkg_status(&output.stdout))
  }

  fn install(&self, package: &str, version: Option<&str>) -> Result<(), HostError> {
    let target = match version {
      Some(version) => format!("{}={}", package, version),
      None => package.to_string(),
    };
    let spec = self.apt_get(&["install", &target]);

    info!(package = %package, version = ?version, "installing package");
    self.invoker.invoke(&spec)?.into_result(&spec)?;
    Ok(())
  }

  fn remove(&self, package: &str) -> Result<(), HostError> {
    let spec = self.apt_get(&["remove", package]);

    info!(package = %package, "removing package");
    self.invoker.invoke(&spec)?.into_result(&spec)?;
    Ok(())
  }
}

/// Parse `${Status}\t${Version}` as printed by `dpkg-query -W -f`.
fn parse_dpkg_status(stdout: &str) -> Option<String> {
  let (status, version) = stdout.trim_end().split_once('\t')?;
  if status == "install ok installed" && !version.is_empty() {
    Some(version.to_string())
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;
  use crate::invoke::CommandOutput;

  /// Invoker that records commands and replays canned outputs.
  struct ScriptedInvoker {
    calls: Mutex<Vec<CommandSpec>>,
    outputs: Mutex<VecDeque<CommandOutput>>,
  }

  impl ScriptedInvoker {
    fn new(outputs: Vec<CommandOutput>) -> Arc<Self> {
      Arc::new(Self {
        calls: Mutex::new(Vec::new()),
        outputs: Mutex::new(outputs.into()),
      })
    }

    fn commands(&self) -> Vec<String> {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|spec| spec.display())
        .collect()
    }
  }

  impl Invoker for ScriptedInvoker {
    fn invoke(&self, spec: &CommandSpec) -> Result<CommandOutput, HostError> {
      self.calls.lock().unwrap().push(spec.clone());
      Ok(
        self
          .outputs
          .lock()
          .unwrap()
          .pop_front()
          .expect("unexpected invocation"),
      )
    }
  }

  fn output(exit_code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
      exit_code: Some(exit_code),
      stdout: stdout.to_string(),
      stderr: String::new(),
    }
  }

  #[test]
  fn test_parse_dpkg_status() {
    assert_eq!(
      parse_dpkg_status("install ok installed\t1.2.0.84-1.ea6b6773cf\n"),
      Some("1.2.0.84-1.ea6b6773cf".to_string())
    );
    assert_eq!(parse_dpkg_status("deinstall ok config-files\t1.0\n"), None);
    assert_eq!(parse_dpkg_status("unknown ok not-installed\t"), None);
    assert_eq!(parse_dpkg_status(""), None);
  }

  #[test]
  fn test_unknown_package_is_not_installed() {
    let invoker = ScriptedInvoker::new(vec![output(1, "")]);
    let apt = AptPackageManager::new(invoker.clone());

    assert_eq!(apt.installed_version("speedtest").unwrap(), None);
    assert_eq!(
      invoker.commands(),
      vec!["dpkg-query -W -f=${Status}\t${Version} speedtest".to_string()]
    );
  }

  #[test]
  fn test_unreadable_status_database_is_an_error() {
    let invoker = ScriptedInvoker::new(vec![CommandOutput {
      exit_code: Some(2),
      stdout: String::new(),
      stderr: "dpkg-query: error: parsing file '/var/lib/dpkg/status' near line 12\n".to_string(),
    }]);
    let apt = AptPackageManager::new(invoker);

    let err = apt.installed_version("speedtest").unwrap_err();
    assert_eq!(err.exit_code(), Some(2));
    assert!(err.to_string().contains("/var/lib/dpkg/status"));
  }

  #[test]
  fn test_install_pins_version_noninteractively() {
    let invoker = ScriptedInvoker::new(vec![output(0, "")]);
    let apt = AptPackageManager::new(invoker.clone()).with_timeout_ms(Some(60_000));

    apt.install("speedtest", Some("1.2.0")).unwrap();

    let calls = invoker.calls.lock().unwrap();
    assert_eq!(calls[0].display(), "apt-get -y -q install speedtest=1.2.0");
    assert_eq!(
      calls[0].env.get("DEBIAN_FRONTEND").map(String::as_str),
      Some("noninteractive")
    );
    assert_eq!(calls[0].timeout_ms, Some(60_000));
  }

  #[test]
  fn test_failed_transaction_is_an_error() {
    let invoker = ScriptedInvoker::new(vec![CommandOutput {
      exit_code: Some(100),
      stdout: String::new(),
      stderr: "E: Unable to locate package speedtest\n".to_string(),
    }]);
    let apt = AptPackageManager::new(invoker);

    let err = apt.install("speedtest", None).unwrap_err();
    assert_eq!(err.exit_code(), Some(100));
    assert!(err.to_string().contains("Unable to locate package"));
  }
}
