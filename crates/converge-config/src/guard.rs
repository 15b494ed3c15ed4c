use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::command::CommandLine;
use crate::enums::GuardPolarity;

/// A guard attached to a step.
///
/// ```json
/// {
///   "polarity": "not_if",
///   "check": "file_exists",
///   "path": "/etc/apt/sources.list.d/ookla_speedtest-cli.list"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardDef {
  #[serde(default)]
  pub polarity: GuardPolarity,
  #[serde(flatten)]
  pub check: CheckDef,
}

/// The read-only check a guard evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckDef {
  /// Holds when the path exists.
  FileExists { path: PathBuf },
  /// Holds when the command exits with status 0.
  Command {
    command: CommandLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
  },
  /// Holds when the package is installed.
  PackageInstalled { package: String },
}
