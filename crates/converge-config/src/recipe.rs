use serde::{Deserialize, Serialize};

use crate::step::StepDef;

/// A recipe: an ordered list of steps converging one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDef {
  pub recipe_id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub steps: Vec<StepDef>,
}
