use crate::graph::NotificationGraph;
use crate::step::Step;

/// A locked recipe ready for a convergence run.
#[derive(Debug, Clone)]
pub struct Recipe {
  pub(crate) recipe_id: String,
  pub(crate) name: String,
  pub(crate) steps: Vec<Step>,
  pub(crate) graph: NotificationGraph,
}

impl Recipe {
  pub fn recipe_id(&self) -> &str {
    &self.recipe_id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Steps in declaration order.
  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn step(&self, index: usize) -> Option<&Step> {
    self.steps.get(index)
  }

  /// Index of the step with the given name.
  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == name)
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn graph(&self) -> &NotificationGraph {
    &self.graph
  }
}
