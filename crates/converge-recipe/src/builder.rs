//! Recipe construction and load-time validation.

use std::collections::HashMap;
use std::sync::Arc;

use converge_config::{ResourceKind, Timing};
use converge_host::Action;
use tracing::warn;

use crate::error::ConfigurationError;
use crate::graph::NotificationGraph;
use crate::recipe::Recipe;
use crate::step::{Guard, Notification, Step};

/// A step declaration whose notification targets are still names.
pub struct StepDecl {
  name: String,
  kind: ResourceKind,
  action: Arc<dyn Action>,
  guard: Option<Guard>,
  notifies: Vec<(String, Timing)>,
  only_on_notify: bool,
}

impl StepDecl {
  pub fn new(name: impl Into<String>, kind: ResourceKind, action: Arc<dyn Action>) -> Self {
    Self {
      name: name.into(),
      kind,
      action,
      guard: None,
      notifies: Vec::new(),
      only_on_notify: false,
    }
  }

  pub fn guard(mut self, guard: Guard) -> Self {
    self.guard = Some(guard);
    self
  }

  /// Notify the step named `target` after this step's action succeeds.
  pub fn notifies(mut self, target: impl Into<String>, timing: Timing) -> Self {
    self.notifies.push((target.into(), timing));
    self
  }

  /// Run this step only when another step notifies it.
  pub fn only_on_notify(mut self) -> Self {
    self.only_on_notify = true;
    self
  }
}

/// Builds a [`Recipe`], resolving notification names into step indices.
///
/// `build` fails with a [`ConfigurationError`] when the recipe is empty, a
/// name is declared twice, a notification names a missing step, or the
/// notifications form a cycle.
pub struct RecipeBuilder {
  recipe_id: String,
  name: String,
  steps: Vec<StepDecl>,
}

impl RecipeBuilder {
  pub fn new(recipe_id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      recipe_id: recipe_id.into(),
      name: name.into(),
      steps: Vec::new(),
    }
  }

  pub fn step(mut self, step: StepDecl) -> Self {
    self.steps.push(step);
    self
  }

  pub fn build(self) -> Result<Recipe, ConfigurationError> {
    if self.steps.is_empty() {
      return Err(ConfigurationError::Empty);
    }

    let mut indices: HashMap<String, usize> = HashMap::with_capacity(self.steps.len());
    for (index, decl) in self.steps.iter().enumerate() {
      if indices.insert(decl.name.clone(), index).is_some() {
        return Err(ConfigurationError::DuplicateStep {
          name: decl.name.clone(),
        });
      }
    }

    let mut edges = Vec::new();
    let mut steps = Vec::with_capacity(self.steps.len());
    for (index, decl) in self.steps.into_iter().enumerate() {
      let mut notifications = Vec::with_capacity(decl.notifies.len());
      for (target, timing) in decl.notifies {
        let target_index =
          *indices
            .get(&target)
            .ok_or_else(|| ConfigurationError::UnknownTarget {
              step: decl.name.clone(),
              target: target.clone(),
            })?;
        edges.push((index, target_index));
        notifications.push(Notification {
          target: target_index,
          timing,
        });
      }

      steps.push(Step {
        name: decl.name,
        kind: decl.kind,
        action: decl.action,
        guard: decl.guard,
        notifications,
        only_on_notify: decl.only_on_notify,
      });
    }

    let graph = NotificationGraph::new(steps.len(), &edges);
    if let Some(cycle) = graph.find_cycle() {
      return Err(ConfigurationError::Cycle {
        path: cycle.into_iter().map(|i| steps[i].name.clone()).collect(),
      });
    }

    for (index, step) in steps.iter().enumerate() {
      if step.only_on_notify && graph.notifiers(index).is_empty() {
        warn!(
          recipe_id = %self.recipe_id,
          step = %step.name,
          "step only runs on notification but nothing notifies it"
        );
      }
    }

    Ok(Recipe {
      recipe_id: self.recipe_id,
      name: self.name,
      steps,
      graph,
    })
  }
}
