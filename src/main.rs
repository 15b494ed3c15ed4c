use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use converge_config::RecipeDef;
use converge_host::ProcessInvoker;
use converge_resolver::{Resolver, StandardResolver};
use converge_runner::{ConvergenceRunner, RunReport, StepOutcome};

/// Converge - idempotent provisioning steps for a single host
#[derive(Parser)]
#[command(name = "converge")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Converge the host to a recipe
  Run {
    /// Path to the recipe file (JSON or YAML)
    recipe_file: PathBuf,

    /// Write the JSON run report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
  },

  /// Load and validate a recipe without touching the host
  Check {
    /// Path to the recipe file (JSON or YAML)
    recipe_file: PathBuf,
  },
}

fn main() -> Result<ExitCode> {
  init_tracing();
  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      recipe_file,
      report,
    }) => run_recipe(&recipe_file, report.as_deref()),
    Some(Commands::Check { recipe_file }) => {
      check_recipe(&recipe_file)?;
      Ok(ExitCode::SUCCESS)
    }
    None => {
      println!("converge - use --help to see available commands");
      Ok(ExitCode::SUCCESS)
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run_recipe(recipe_file: &Path, report_file: Option<&Path>) -> Result<ExitCode> {
  let recipe_def = load_recipe(recipe_file)?;
  info!(recipe_id = %recipe_def.recipe_id, name = %recipe_def.name, "recipe_loaded");

  let invoker = ProcessInvoker::new().context("failed to create process invoker")?;
  let resolver = StandardResolver::new(Arc::new(invoker));
  let recipe = resolver
    .resolve(recipe_def)
    .context("failed to resolve recipe")?;

  info!(recipe_id = %recipe.recipe_id(), steps = recipe.len(), "recipe_resolved");

  let report = ConvergenceRunner::new().run(&recipe);
  print_summary(&report);

  let json = report.to_json().context("failed to serialize run report")?;
  match report_file {
    Some(path) => std::fs::write(path, json)
      .with_context(|| format!("failed to write report file: {}", path.display()))?,
    None => println!("{}", json),
  }

  if report.is_converged() {
    Ok(ExitCode::SUCCESS)
  } else {
    Ok(ExitCode::FAILURE)
  }
}

fn check_recipe(recipe_file: &Path) -> Result<()> {
  let recipe_def = load_recipe(recipe_file)?;

  // Resolution binds to the host lazily, so nothing runs here.
  let invoker = ProcessInvoker::new().context("failed to create process invoker")?;
  let recipe = StandardResolver::new(Arc::new(invoker))
    .resolve(recipe_def)
    .context("recipe is invalid")?;

  eprintln!(
    "Recipe '{}' ({}) is valid ({} steps)",
    recipe.recipe_id(),
    recipe.name(),
    recipe.len()
  );
  for (index, step) in recipe.steps().iter().enumerate() {
    let targets: Vec<&str> = recipe
      .graph()
      .targets(index)
      .iter()
      .filter_map(|&target| recipe.step(target).map(|target| target.name()))
      .collect();
    if targets.is_empty() {
      eprintln!("  {} [{}]", step.name(), step.kind());
    } else {
      eprintln!("  {} [{}] -> {}", step.name(), step.kind(), targets.join(", "));
    }
  }

  Ok(())
}

fn load_recipe(recipe_file: &Path) -> Result<RecipeDef> {
  let content = std::fs::read_to_string(recipe_file)
    .with_context(|| format!("failed to read recipe file: {}", recipe_file.display()))?;

  parse_recipe(recipe_file, &content)
    .with_context(|| format!("failed to parse recipe file: {}", recipe_file.display()))
}

fn parse_recipe(recipe_file: &Path, content: &str) -> Result<RecipeDef> {
  let extension = recipe_file
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase);

  match extension.as_deref() {
    Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(content)?),
    _ => Ok(serde_json::from_str(content)?),
  }
}

fn print_summary(report: &RunReport) {
  eprintln!("Run {} ({}):", report.run_id, report.recipe_id);
  for step in &report.steps {
    eprintln!("  {:<12} {} [{}]", outcome_label(step.outcome), step.name, step.kind);
  }
  eprintln!("Actions executed: {}", report.executed.len());

  match report.error() {
    Some(e) => eprintln!("Run failed: {}", e),
    None => eprintln!("Run converged"),
  }
}

fn outcome_label(outcome: StepOutcome) -> &'static str {
  match outcome {
    StepOutcome::Success => "success",
    StepOutcome::Skipped => "skipped",
    StepOutcome::Failed => "failed",
    StepOutcome::NotReached => "not-reached",
  }
}
