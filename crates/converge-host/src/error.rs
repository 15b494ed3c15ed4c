use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while touching the host.
#[derive(Debug, Error)]
pub enum HostError {
  /// The command ran and exited unsuccessfully.
  #[error("command `{command}` failed with {}: {stderr}", exit_label(.exit_code))]
  CommandFailed {
    command: String,
    exit_code: Option<i32>,
    stderr: String,
  },

  /// The command did not finish within its timeout and was killed.
  #[error("command `{command}` timed out after {timeout_ms}ms")]
  Timeout { command: String, timeout_ms: u64 },

  /// The command could not be started.
  #[error("failed to spawn `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  /// An argv command with no program.
  #[error("empty command")]
  EmptyCommand,

  /// Filesystem state could not be read.
  #[error("cannot inspect {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{message}")]
  Other { message: String },
}

impl HostError {
  /// Create a free-form host error.
  pub fn other(message: impl Into<String>) -> Self {
    Self::Other {
      message: message.into(),
    }
  }

  /// Exit code of a failed command, if the error carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      HostError::CommandFailed { exit_code, .. } => *exit_code,
      _ => None,
    }
  }
}

fn exit_label(exit_code: &Option<i32>) -> String {
  match exit_code {
    Some(code) => format!("exit code {}", code),
    None => "no exit code (terminated by signal)".to_string(),
  }
}
