use serde::{Deserialize, Serialize};

/// A named group of lessons with a suggested proficiency level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  pub id: String,
  pub title: String,
  pub level_tag: Option<String>,
  pub description: Option<String>,
  #[sqlx(rename = "sort_order")]
  pub order: i64,
}

/// Built-in module ladder used when no remote modules are configured
pub fn fallback_modules() -> Vec<Module> {
  [
    ("module-a1", "Module A1", "A1", "First steps and essential vocabulary."),
    ("module-a2", "Module A2", "A2", "Daily routines and frequent expressions."),
    ("module-a2-plus", "Module A2+", "A2+", "Short messages and guided reading."),
    ("module-b1", "Module B1", "B1", "Basic conversations and general comprehension."),
    ("module-b1-plus", "Module B1+", "B1+", "More confident communication in varied situations."),
    ("module-b2", "Module B2", "B2", "Clear texts and confident discussions."),
    ("module-b2-plus", "Module B2+", "B2+", "Argumentation and nuance on complex topics."),
    ("module-c1", "Module C1", "C1", "Flexible language in professional contexts."),
    ("module-c1-plus", "Module C1+", "C1+", "High precision on technical and abstract topics."),
    ("module-c2", "Module C2", "C2", "Advanced mastery and natural fluency."),
  ]
  .into_iter()
  .enumerate()
  .map(|(order, (id, title, level_tag, description))| Module {
    id: id.to_string(),
    title: title.to_string(),
    level_tag: Some(level_tag.to_string()),
    description: Some(description.to_string()),
    order: order as i64,
  })
  .collect()
}

/// Fallback policy: lessons without a module tag are credited to the first
/// module in display order. Named explicitly because it silently changes if
/// module ordering changes.
pub fn fallback_module_id(modules: &[Module]) -> Option<&str> {
  modules.first().map(|m| m.id.as_str())
}
