use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum score that counts a lesson as completed
pub const PASSING_SCORE: f64 = 70.0;

/// A lesson as published by the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
  pub id: String,
  pub title: String,
  pub module_id: Option<String>,
}

/// Raw score value. Historical clients wrote both numbers and strings, so
/// both shapes must coerce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
  Number(f64),
  Text(String),
}

impl Score {
  /// Numeric value, if the raw score parses as a finite number
  pub fn points(&self) -> Option<f64> {
    match self {
      Score::Number(n) if n.is_finite() => Some(*n),
      Score::Number(_) => None,
      Score::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    }
  }
}

/// Completion state for a single lesson. Owned by the completion store;
/// the progression engine only reads these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionEntry {
  #[serde(default)]
  pub watched: bool,
  #[serde(default)]
  pub score: Option<Score>,
}

impl CompletionEntry {
  /// A lesson counts as completed when it was watched or scored at least
  /// the passing mark. Malformed scores count as not completed.
  pub fn is_completed(&self) -> bool {
    self.watched
      || self
        .score
        .as_ref()
        .and_then(Score::points)
        .is_some_and(|points| points >= PASSING_SCORE)
  }
}

/// Materialized completion ledger, keyed by lesson id
pub type CompletionLedger = HashMap<String, CompletionEntry>;

/// Row shape for the lesson_completions table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompletionRow {
  pub lesson_id: String,
  pub watched: bool,
  pub score: Option<String>,
}

impl CompletionRow {
  pub fn into_entry(self) -> (String, CompletionEntry) {
    let entry = CompletionEntry {
      watched: self.watched,
      score: self.score.map(Score::Text),
    };
    (self.lesson_id, entry)
  }
}
