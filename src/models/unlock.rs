use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status value that grants access regardless of the passed flag
pub const STATUS_UNLOCKED: &str = "unlocked";

/// Why a module unlock was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnlockReason {
  /// Earned enough experience inside the module
  Xp,
  /// Passed the external placement assessment
  #[default]
  Assessment,
}

impl std::fmt::Display for UnlockReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Xp => write!(f, "xp"),
      Self::Assessment => write!(f, "assessment"),
    }
  }
}

impl std::str::FromStr for UnlockReason {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "xp" => Ok(Self::Xp),
      "assessment" => Ok(Self::Assessment),
      _ => Err(format!("Unknown unlock reason: {}", s)),
    }
  }
}

/// Persisted unlock for one (user, module) pair. Created once, never deleted;
/// unlocking is permanent for a given user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockRecord {
  pub passed: bool,
  pub status: String,
  pub reason: UnlockReason,
  pub unlocked_at: DateTime<Utc>,
}

impl UnlockRecord {
  /// Record written when a module crosses its experience threshold
  pub fn xp_unlock() -> Self {
    Self {
      passed: true,
      status: STATUS_UNLOCKED.to_string(),
      reason: UnlockReason::Xp,
      unlocked_at: Utc::now(),
    }
  }

  /// Record written by the assessment flow on a passing result
  pub fn assessment_pass() -> Self {
    Self {
      passed: true,
      status: STATUS_UNLOCKED.to_string(),
      reason: UnlockReason::Assessment,
      unlocked_at: Utc::now(),
    }
  }

  /// Any record with a pass or an unlocked status is authoritative,
  /// regardless of how it was earned
  pub fn grants_access(&self) -> bool {
    self.passed || self.status == STATUS_UNLOCKED
  }
}

/// Row shape for the module_unlocks table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnlockRow {
  pub module_id: String,
  pub passed: bool,
  pub status: String,
  pub reason: String,
  pub unlocked_at: DateTime<Utc>,
}

impl UnlockRow {
  pub fn into_record(self) -> (String, UnlockRecord) {
    let record = UnlockRecord {
      passed: self.passed,
      status: self.status,
      reason: self.reason.parse().unwrap_or_default(),
      unlocked_at: self.unlocked_at,
    };
    (self.module_id, record)
  }
}
