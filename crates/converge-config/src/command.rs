use std::fmt;

use serde::{Deserialize, Serialize};

/// A command to run on the host.
///
/// A plain string is handed verbatim to `sh -c`; an array is executed as an
/// argv vector with no shell involved. Neither form is parsed or re-escaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
  Shell(String),
  Argv(Vec<String>),
}

impl fmt::Display for CommandLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CommandLine::Shell(line) => f.write_str(line),
      CommandLine::Argv(argv) => f.write_str(&argv.join(" ")),
    }
  }
}
