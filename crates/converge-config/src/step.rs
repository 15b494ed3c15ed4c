use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::command::CommandLine;
use crate::enums::{PackageOp, ResourceKind, Timing};
use crate::guard::GuardDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  /// Unique name within the recipe; notification targets refer to it.
  pub name: String,
  #[serde(flatten)]
  pub resource: ResourceDef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub guard: Option<GuardDef>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub notifies: Vec<NotifyDef>,
  /// Only run when another step notifies this one.
  #[serde(default)]
  pub only_on_notify: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl StepDef {
  pub fn kind(&self) -> ResourceKind {
    self.resource.kind()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDef {
  /// Run a command.
  Execute {
    command: CommandLine,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<PathBuf>,
  },
  /// Install or remove a system package.
  Package {
    package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    action: PackageOp,
  },
}

impl ResourceDef {
  pub fn kind(&self) -> ResourceKind {
    match self {
      ResourceDef::Execute { .. } => ResourceKind::Execute,
      ResourceDef::Package { .. } => ResourceKind::Package,
    }
  }
}

/// A notification from one step to another, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyDef {
  pub target: String,
  #[serde(default)]
  pub timing: Timing,
}
