//! Command invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use converge_config::CommandLine;
use tokio::process::Command;
use tracing::debug;

use crate::error::HostError;

/// A fully specified command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub command: CommandLine,
  pub env: BTreeMap<String, String>,
  pub cwd: Option<PathBuf>,
  pub timeout_ms: Option<u64>,
}

impl CommandSpec {
  /// A command line handed verbatim to `sh -c`.
  pub fn shell(line: impl Into<String>) -> Self {
    Self::new(CommandLine::Shell(line.into()))
  }

  /// An argv vector executed without a shell.
  pub fn argv<I, S>(argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::new(CommandLine::Argv(argv.into_iter().map(Into::into).collect()))
  }

  pub fn new(command: CommandLine) -> Self {
    Self {
      command,
      env: BTreeMap::new(),
      cwd: None,
      timeout_ms: None,
    }
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
    self.timeout_ms = timeout_ms;
    self
  }

  /// Human-readable form used in logs and errors.
  pub fn display(&self) -> String {
    self.command.to_string()
  }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
  /// `None` when the process was terminated by a signal.
  pub exit_code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }

  /// Turn a non-zero exit into [`HostError::CommandFailed`].
  pub fn into_result(self, spec: &CommandSpec) -> Result<CommandOutput, HostError> {
    if self.success() {
      Ok(self)
    } else {
      Err(HostError::CommandFailed {
        command: spec.display(),
        exit_code: self.exit_code,
        stderr: self.stderr.trim().to_string(),
      })
    }
  }
}

/// The action-invocation interface.
///
/// Implementations block until the command has finished. A command that ran
/// and exited non-zero is reported through [`CommandOutput`]; `Err` is reserved
/// for commands that could not be run to completion at all.
pub trait Invoker: Send + Sync {
  fn invoke(&self, spec: &CommandSpec) -> Result<CommandOutput, HostError>;
}

/// Runs commands as child processes of the current process.
///
/// Children are driven on a private current-thread tokio runtime so that
/// timeouts can kill them; callers see an ordinary blocking call. Each child
/// leads its own process group, and a timeout kills the whole group. Must not
/// be used from inside another tokio runtime.
pub struct ProcessInvoker {
  runtime: tokio::runtime::Runtime,
}

impl ProcessInvoker {
  pub fn new() -> Result<Self, HostError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(|e| HostError::other(format!("failed to start process runtime: {}", e)))?;

    Ok(Self { runtime })
  }
}

impl Invoker for ProcessInvoker {
  fn invoke(&self, spec: &CommandSpec) -> Result<CommandOutput, HostError> {
    self.runtime.block_on(run_command(spec))
  }
}

async fn run_command(spec: &CommandSpec) -> Result<CommandOutput, HostError> {
  let mut command = match &spec.command {
    CommandLine::Shell(line) => {
      let mut command = Command::new("sh");
      command.arg("-c").arg(line);
      command
    }
    CommandLine::Argv(argv) => {
      let (program, args) = argv.split_first().ok_or(HostError::EmptyCommand)?;
      let mut command = Command::new(program);
      command.args(args);
      command
    }
  };

  command
    .envs(&spec.env)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  if let Some(cwd) = &spec.cwd {
    command.current_dir(cwd);
  }
  // Own process group, so a timeout can take down everything the command started.
  #[cfg(unix)]
  command.process_group(0);

  debug!(command = %spec.display(), timeout_ms = ?spec.timeout_ms, "invoking command");

  let spawn_error = |source: std::io::Error| HostError::Spawn {
    command: spec.display(),
    source,
  };
  let child = command.spawn().map_err(spawn_error)?;
  let pid = child.id();

  let output = match spec.timeout_ms {
    Some(timeout_ms) => {
      match tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait_with_output()).await
      {
        Ok(output) => output,
        Err(_) => {
          if let Some(pid) = pid {
            kill_process_group(pid);
          }
          return Err(HostError::Timeout {
            command: spec.display(),
            timeout_ms,
          });
        }
      }
    }
    None => child.wait_with_output().await,
  }
  .map_err(spawn_error)?;

  let result = CommandOutput {
    exit_code: output.status.code(),
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
  };

  debug!(command = %spec.display(), exit_code = ?result.exit_code, "command finished");

  Ok(result)
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
  // SAFETY: killpg only sends a signal. A group that has already exited
  // yields ESRCH, which is fine.
  let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
  if rc != 0 {
    debug!(pid, "process group already gone");
  }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
  use super::*;

  fn invoker() -> ProcessInvoker {
    ProcessInvoker::new().expect("failed to create invoker")
  }

  #[test]
  fn test_shell_command_captures_stdout() {
    let output = invoker().invoke(&CommandSpec::shell("echo hello | tr a-z A-Z")).unwrap();

    assert!(output.success());
    assert_eq!(output.stdout.trim(), "HELLO");
  }

  #[test]
  fn test_non_zero_exit_is_reported_not_raised() {
    let spec = CommandSpec::shell("echo broken >&2; exit 3");
    let output = invoker().invoke(&spec).unwrap();

    assert!(!output.success());
    assert_eq!(output.exit_code, Some(3));

    let err = output.into_result(&spec).unwrap_err();
    match err {
      HostError::CommandFailed {
        exit_code, stderr, ..
      } => {
        assert_eq!(exit_code, Some(3));
        assert_eq!(stderr, "broken");
      }
      other => panic!("expected CommandFailed, got {:?}", other),
    }
  }

  #[test]
  fn test_argv_passes_arguments_without_shell() {
    let output = invoker()
      .invoke(&CommandSpec::argv(["echo", "$HOME", "a|b"]))
      .unwrap();

    assert_eq!(output.stdout.trim(), "$HOME a|b");
  }

  #[test]
  fn test_env_and_cwd_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let spec = CommandSpec::shell("echo \"$GREETING\"; pwd")
      .with_env("GREETING", "hi")
      .with_cwd(dir.path());

    let output = invoker().invoke(&spec).unwrap();
    let mut lines = output.stdout.lines();
    assert_eq!(lines.next(), Some("hi"));

    let reported = std::fs::canonicalize(lines.next().unwrap()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
  }

  #[test]
  fn test_timeout_kills_command() {
    let spec = CommandSpec::argv(["sleep", "5"]).with_timeout_ms(Some(100));
    let started = std::time::Instant::now();

    let err = invoker().invoke(&spec).unwrap_err();

    assert!(matches!(err, HostError::Timeout { timeout_ms: 100, .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
  }

  #[test]
  fn test_timeout_kills_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("installed");
    let spec = CommandSpec::shell("sh -c 'sleep 1; touch \"$MARKER\"' | cat")
      .with_env("MARKER", marker.to_string_lossy())
      .with_timeout_ms(Some(200));

    let err = invoker().invoke(&spec).unwrap_err();
    assert!(matches!(err, HostError::Timeout { timeout_ms: 200, .. }));

    std::thread::sleep(Duration::from_millis(1500));
    assert!(!marker.exists(), "command kept running after its timeout");
  }

  #[test]
  fn test_empty_argv_is_rejected() {
    let err = invoker()
      .invoke(&CommandSpec::argv(Vec::<String>::new()))
      .unwrap_err();
    assert!(matches!(err, HostError::EmptyCommand));
  }

  #[test]
  fn test_missing_program_fails_to_spawn() {
    let err = invoker()
      .invoke(&CommandSpec::argv(["/nonexistent/converge-test-binary"]))
      .unwrap_err();
    assert!(matches!(err, HostError::Spawn { .. }));
  }
}
