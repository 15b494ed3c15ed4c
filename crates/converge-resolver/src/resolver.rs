use std::sync::Arc;

use converge_config::{CheckDef, CommandLine, GuardDef, RecipeDef, ResourceDef, StepDef};
use converge_host::{
  Action, AptPackageManager, CommandSpec, CommandSucceeds, ExecuteAction, FileExists, Invoker,
  PackageAction, PackageInstalled, PackageManager, Predicate,
};
use converge_recipe::{Guard, Recipe, RecipeBuilder, StepDecl};
use tracing::debug;

use crate::error::ResolveError;

/// Resolver transforms a RecipeDef into a locked Recipe.
pub trait Resolver {
  /// Resolve a recipe definition into a locked recipe.
  ///
  /// This process:
  /// 1. Checks every step definition is complete
  /// 2. Binds actions and guards to host capabilities
  /// 3. Validates the notification graph (known targets, no cycles)
  fn resolve(&self, def: RecipeDef) -> Result<Recipe, ResolveError>;
}

/// Standard resolver: commands run through an [`Invoker`], packages through apt
/// unless another [`PackageManager`] is supplied.
pub struct StandardResolver {
  invoker: Arc<dyn Invoker>,
  packages: Option<Arc<dyn PackageManager>>,
}

impl StandardResolver {
  /// Create a new resolver with the given command invoker.
  pub fn new(invoker: Arc<dyn Invoker>) -> Self {
    Self {
      invoker,
      packages: None,
    }
  }

  /// Use `packages` for package steps and guards instead of apt.
  pub fn with_package_manager(mut self, packages: Arc<dyn PackageManager>) -> Self {
    self.packages = Some(packages);
    self
  }

  /// Package manager for a step. The apt default carries the step's timeout.
  fn package_manager(&self, timeout_ms: Option<u64>) -> Arc<dyn PackageManager> {
    match &self.packages {
      Some(packages) => packages.clone(),
      None => Arc::new(AptPackageManager::new(self.invoker.clone()).with_timeout_ms(timeout_ms)),
    }
  }

  /// Resolve a single step definition.
  fn resolve_step(&self, position: usize, def: StepDef) -> Result<StepDecl, ResolveError> {
    if def.name.trim().is_empty() {
      return Err(ResolveError::EmptyName { position });
    }

    let kind = def.kind();
    let action: Arc<dyn Action> = match def.resource {
      ResourceDef::Execute { command, env, cwd } => {
        ensure_command(&def.name, &command)?;
        let mut spec = CommandSpec::new(command).with_timeout_ms(def.timeout_ms);
        spec.env = env;
        spec.cwd = cwd;
        Arc::new(ExecuteAction::new(spec, self.invoker.clone()))
      }
      ResourceDef::Package {
        package,
        version,
        action,
      } => {
        if package.trim().is_empty() {
          return Err(ResolveError::EmptyPackage { step: def.name });
        }
        Arc::new(PackageAction::new(
          package,
          version,
          action,
          self.package_manager(def.timeout_ms),
        ))
      }
    };

    let mut decl = StepDecl::new(def.name.clone(), kind, action);
    if let Some(guard) = def.guard {
      decl = decl.guard(self.resolve_guard(&def.name, guard)?);
    }
    for notify in def.notifies {
      decl = decl.notifies(notify.target, notify.timing);
    }
    if def.only_on_notify {
      decl = decl.only_on_notify();
    }

    debug!(step = %def.name, kind = %kind, "resolved step");

    Ok(decl)
  }

  fn resolve_guard(&self, step: &str, def: GuardDef) -> Result<Guard, ResolveError> {
    let predicate: Arc<dyn Predicate> = match def.check {
      CheckDef::FileExists { path } => Arc::new(FileExists::new(path)),
      CheckDef::Command {
        command,
        timeout_ms,
      } => {
        ensure_command(step, &command)?;
        Arc::new(CommandSucceeds::new(
          CommandSpec::new(command).with_timeout_ms(timeout_ms),
          self.invoker.clone(),
        ))
      }
      CheckDef::PackageInstalled { package } => {
        if package.trim().is_empty() {
          return Err(ResolveError::EmptyPackage {
            step: step.to_string(),
          });
        }
        Arc::new(PackageInstalled::new(package, self.package_manager(None)))
      }
    };

    Ok(Guard::new(predicate, def.polarity))
  }
}

impl Resolver for StandardResolver {
  fn resolve(&self, def: RecipeDef) -> Result<Recipe, ResolveError> {
    let mut builder = RecipeBuilder::new(def.recipe_id, def.name);
    for (position, step) in def.steps.into_iter().enumerate() {
      builder = builder.step(self.resolve_step(position, step)?);
    }
    Ok(builder.build()?)
  }
}

fn ensure_command(step: &str, command: &CommandLine) -> Result<(), ResolveError> {
  let empty = match command {
    CommandLine::Shell(line) => line.trim().is_empty(),
    CommandLine::Argv(argv) => argv.first().is_none_or(|program| program.is_empty()),
  };
  if empty {
    return Err(ResolveError::EmptyCommand {
      step: step.to_string(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use converge_config::{GuardPolarity, ResourceKind, Timing};
  use converge_host::{CommandOutput, HostError};
  use converge_recipe::{ConfigurationError, Notification};

  use super::*;

  /// Invoker that records commands and always succeeds.
  #[derive(Default)]
  struct RecordingInvoker {
    commands: Mutex<Vec<String>>,
  }

  impl Invoker for RecordingInvoker {
    fn invoke(&self, spec: &CommandSpec) -> Result<CommandOutput, HostError> {
      self.commands.lock().unwrap().push(spec.display());
      Ok(CommandOutput {
        exit_code: Some(0),
        stdout: String::new(),
        stderr: String::new(),
      })
    }
  }

  /// Package manager that reports a fixed set of installed packages.
  struct StaticPackages(Vec<&'static str>);

  impl PackageManager for StaticPackages {
    fn installed_version(&self, package: &str) -> Result<Option<String>, HostError> {
      Ok(
        self
          .0
          .iter()
          .any(|installed| *installed == package)
          .then(|| "1.0".to_string()),
      )
    }

    fn install(&self, _package: &str, _version: Option<&str>) -> Result<(), HostError> {
      Ok(())
    }

    fn remove(&self, _package: &str) -> Result<(), HostError> {
      Ok(())
    }
  }

  fn parse(json: &str) -> RecipeDef {
    serde_json::from_str(json).unwrap()
  }

  const SPEEDTEST: &str = r#"{
    "recipe_id": "speedtest",
    "name": "Install speedtest",
    "steps": [
      {
        "name": "install-speedtest-repo",
        "type": "execute",
        "command": "curl -s https://packagecloud.io/install/repositories/ookla/speedtest-cli/script.deb.sh | bash",
        "guard": { "check": "file_exists", "path": "/nonexistent/ookla_speedtest-cli.list" },
        "notifies": [{ "target": "apt-update", "timing": "immediate" }]
      },
      { "name": "apt-update", "type": "execute", "command": ["apt-get", "update"], "only_on_notify": true },
      { "name": "speedtest", "type": "package", "package": "speedtest" }
    ]
  }"#;

  #[test]
  fn test_resolve_speedtest_recipe() {
    let invoker = Arc::new(RecordingInvoker::default());
    let resolver = StandardResolver::new(invoker.clone());

    let recipe = resolver.resolve(parse(SPEEDTEST)).unwrap();

    assert_eq!(recipe.recipe_id(), "speedtest");
    assert_eq!(recipe.len(), 3);

    let repo = &recipe.steps()[0];
    assert_eq!(repo.kind(), ResourceKind::Execute);
    assert_eq!(
      repo.notifications(),
      &[Notification {
        target: 1,
        timing: Timing::Immediate,
      }]
    );
    let guard = repo.guard().unwrap();
    assert_eq!(guard.polarity(), GuardPolarity::NotIf);
    assert!(!guard.should_skip().unwrap());

    assert!(recipe.steps()[1].only_on_notify());
    assert_eq!(recipe.steps()[2].kind(), ResourceKind::Package);
    assert_eq!(recipe.steps()[2].action().describe(), "install package speedtest");

    // Resolution never touches the host.
    assert!(invoker.commands.lock().unwrap().is_empty());

    recipe.steps()[1].action().apply().unwrap();
    assert_eq!(
      invoker.commands.lock().unwrap().as_slice(),
      &["apt-get update".to_string()]
    );
  }

  #[test]
  fn test_package_guard_uses_supplied_package_manager() {
    let resolver = StandardResolver::new(Arc::new(RecordingInvoker::default()))
      .with_package_manager(Arc::new(StaticPackages(vec!["speedtest"])));

    let recipe = resolver
      .resolve(parse(
        r#"{
          "recipe_id": "r",
          "name": "r",
          "steps": [{
            "name": "configure",
            "type": "execute",
            "command": "speedtest --accept-license --version",
            "guard": { "polarity": "only_if", "check": "package_installed", "package": "speedtest" }
          }]
        }"#,
      ))
      .unwrap();

    let guard = recipe.steps()[0].guard().unwrap();
    assert_eq!(guard.polarity(), GuardPolarity::OnlyIf);
    assert!(!guard.should_skip().unwrap());
  }

  #[test]
  fn test_resolve_fails_on_unknown_target() {
    let resolver = StandardResolver::new(Arc::new(RecordingInvoker::default()));

    let result = resolver.resolve(parse(
      r#"{
        "recipe_id": "r",
        "name": "r",
        "steps": [{
          "name": "a",
          "type": "execute",
          "command": "true",
          "notifies": [{ "target": "missing", "timing": "immediate" }]
        }]
      }"#,
    ));

    assert!(matches!(
      result,
      Err(ResolveError::Configuration(
        ConfigurationError::UnknownTarget { .. }
      ))
    ));
  }

  #[test]
  fn test_resolve_fails_on_empty_recipe() {
    let resolver = StandardResolver::new(Arc::new(RecordingInvoker::default()));

    let result = resolver.resolve(parse(r#"{ "recipe_id": "r", "name": "r", "steps": [] }"#));

    assert!(matches!(
      result,
      Err(ResolveError::Configuration(ConfigurationError::Empty))
    ));
  }

  #[test]
  fn test_resolve_fails_on_empty_command() {
    let resolver = StandardResolver::new(Arc::new(RecordingInvoker::default()));

    let result = resolver.resolve(parse(
      r#"{ "recipe_id": "r", "name": "r", "steps": [{ "name": "a", "type": "execute", "command": [] }] }"#,
    ));

    assert!(matches!(result, Err(ResolveError::EmptyCommand { .. })));
  }

  #[test]
  fn test_resolve_fails_on_empty_name() {
    let resolver = StandardResolver::new(Arc::new(RecordingInvoker::default()));

    let result = resolver.resolve(parse(
      r#"{ "recipe_id": "r", "name": "r", "steps": [{ "name": " ", "type": "package", "package": "curl" }] }"#,
    ));

    assert!(matches!(
      result,
      Err(ResolveError::EmptyName { position: 0 })
    ));
  }
}
