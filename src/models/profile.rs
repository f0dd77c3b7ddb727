use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored per-user preferences: proficiency level and the currently
/// selected module
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub user_id: String,
  pub level: Option<String>,
  pub current_module_id: Option<String>,
  pub updated_at: DateTime<Utc>,
}
