//! Module progression and unlock engine
//!
//! Folds the completion ledger and the current catalog snapshot into
//! per-module experience totals, a derived proficiency level, and an unlock
//! decision for every module.
//!
//! Key principles:
//! - Derived state is recomputed from whole snapshots, never patched
//! - Unlocking is monotonic: once a module opens it never re-locks
//! - The engine only creates unlock records; it never deletes or rewrites
//!   records earned another way
//! - All entry points take their inputs explicitly, so recomputation is
//!   deterministic and unit-testable

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::catalog::{CatalogIndex, UNASSIGNED_MODULE_ID};
use crate::levels::Level;
use crate::models::lesson::CompletionRow;
use crate::models::module::{fallback_module_id, fallback_modules};
use crate::models::unlock::UnlockRow;
use crate::models::{CompletionLedger, Module, UnlockRecord};

// ---------------------------------------------------------------------------
/// Experience Constants
// ---------------------------------------------------------------------------

/// Experience awarded per completed lesson
pub const XP_PER_LESSON: i64 = 10;

/// Experience target used when the active module is unknown
pub const DEFAULT_XP_TARGET: i64 = 150;

// ---------------------------------------------------------------------------
/// Module Progress
// ---------------------------------------------------------------------------

/// Per-module experience summary. `earned` can exceed `required` when the
/// user completed lessons that have since left the visible catalog, but it
/// is always a non-negative multiple of [`XP_PER_LESSON`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub total: i64,
    pub earned: i64,
    pub required: i64,
}

impl ModuleProgress {
    /// Experience path to an unlock: a real target exists and was reached
    pub fn meets_xp_threshold(&self) -> bool {
        self.required > 0 && self.earned >= self.required
    }
}

/// Fold the completion ledger over the catalog snapshot. Lessons without a
/// module tag are credited to `fallback_module_id` (the first module in
/// display order), or to the unassigned bucket when no modules exist.
///
/// Pure and order-independent: the same ledger and snapshot always produce
/// the same map.
pub fn aggregate_module_progress(
    ledger: &CompletionLedger,
    catalog: &CatalogIndex,
    fallback_module_id: Option<&str>,
) -> HashMap<String, ModuleProgress> {
    let mut summary: HashMap<String, ModuleProgress> = HashMap::new();

    for lesson in catalog.lessons() {
        let module_id = lesson
            .module_id
            .as_deref()
            .or(fallback_module_id)
            .unwrap_or(UNASSIGNED_MODULE_ID);
        let progress = summary.entry(module_id.to_string()).or_default();
        progress.total += 1;
        if ledger.get(&lesson.id).is_some_and(|e| e.is_completed()) {
            progress.earned += XP_PER_LESSON;
        }
    }

    for progress in summary.values_mut() {
        progress.required = progress.total * XP_PER_LESSON;
    }

    summary
}

// ---------------------------------------------------------------------------
/// Unlock Decisions
// ---------------------------------------------------------------------------

/// Decide, per module, whether the user may enter it. The first module in
/// display order is always open; any other module opens through a persisted
/// record (assessment or prior xp unlock) or by meeting the experience
/// threshold right now. There is no path back to locked.
pub fn evaluate_module_unlocks(
    modules: &[Module],
    progress: &HashMap<String, ModuleProgress>,
    unlocks: &HashMap<String, UnlockRecord>,
) -> HashMap<String, bool> {
    let first_module_id = fallback_module_id(modules);
    modules
        .iter()
        .map(|module| {
            let unlocked = is_module_unlocked(&module.id, first_module_id, progress, unlocks);
            (module.id.clone(), unlocked)
        })
        .collect()
}

fn is_module_unlocked(
    module_id: &str,
    first_module_id: Option<&str>,
    progress: &HashMap<String, ModuleProgress>,
    unlocks: &HashMap<String, UnlockRecord>,
) -> bool {
    if Some(module_id) == first_module_id {
        return true;
    }
    if unlocks.get(module_id).is_some_and(|r| r.grants_access()) {
        return true;
    }
    progress
        .get(module_id)
        .is_some_and(|p| p.meets_xp_threshold())
}

/// Modules that meet the experience threshold but have no persisted unlock
/// yet. This check-then-write guard keeps the side effect idempotent: a
/// module with any existing record is never reported again. Sorted so
/// repeated recomputations issue writes in a stable order.
pub fn newly_qualified_modules(
    progress: &HashMap<String, ModuleProgress>,
    unlocks: &HashMap<String, UnlockRecord>,
) -> Vec<String> {
    let mut qualified: Vec<String> = progress
        .iter()
        .filter(|(module_id, p)| {
            p.meets_xp_threshold() && !unlocks.contains_key(module_id.as_str())
        })
        .map(|(module_id, _)| module_id.clone())
        .collect();
    qualified.sort();
    qualified
}

// ---------------------------------------------------------------------------
/// Progression Facade
// ---------------------------------------------------------------------------

/// Snapshot handed to the UI: derived level, distance to the next one, and
/// the unlock decision for every module. Safe to recompute on every render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub current_level: Level,
    pub next_level: Option<Level>,
    pub percent_to_next: i64,
    pub remaining_xp: i64,
    pub module_unlocks: HashMap<String, bool>,
}

impl ProgressionState {
    /// Derive the display state. Experience is scoped to the active module,
    /// not a lifetime total: displayed progress is always relative to the
    /// module the user currently works in.
    pub fn compute(
        raw_level: &str,
        progress: &HashMap<String, ModuleProgress>,
        module_unlocks: HashMap<String, bool>,
        active_module_id: Option<&str>,
    ) -> Self {
        let current_level = Level::normalize(raw_level);
        let next_level = current_level.next();

        let active = active_module_id.and_then(|id| progress.get(id));
        let xp_total = active.map(|p| p.earned).unwrap_or(0);
        let xp_target = active
            .map(|p| p.required)
            .filter(|required| *required > 0)
            .unwrap_or(DEFAULT_XP_TARGET);

        let (percent_to_next, remaining_xp) = if next_level.is_none() {
            // Mastery reached
            (100, 0)
        } else {
            let percent = ((xp_total as f64 / xp_target as f64) * 100.0).round() as i64;
            (percent.clamp(0, 100), (xp_target - xp_total).max(0))
        };

        Self {
            current_level,
            next_level,
            percent_to_next,
            remaining_xp,
            module_unlocks,
        }
    }
}

// ---------------------------------------------------------------------------
// Database Operations
// ---------------------------------------------------------------------------

/// Load the configured modules in display order, falling back to the
/// built-in ladder when none are configured
pub async fn load_modules(pool: &SqlitePool) -> Result<Vec<Module>, String> {
    let modules: Vec<Module> = sqlx::query_as(
        r#"
        SELECT id, title, level_tag, description, sort_order
        FROM modules
        ORDER BY sort_order, id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to load modules: {}", e))?;

    if modules.is_empty() {
        Ok(fallback_modules())
    } else {
        Ok(modules)
    }
}

/// Materialize the completion ledger for one user
pub async fn load_completion_ledger(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<CompletionLedger, String> {
    let rows: Vec<CompletionRow> = sqlx::query_as(
        r#"
        SELECT lesson_id, watched, score
        FROM lesson_completions
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to load completions: {}", e))?;

    Ok(rows.into_iter().map(CompletionRow::into_entry).collect())
}

/// Load all persisted unlock records for one user
pub async fn load_module_unlocks(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<String, UnlockRecord>, String> {
    let rows: Vec<UnlockRow> = sqlx::query_as(
        r#"
        SELECT module_id, passed, status, reason, unlocked_at
        FROM module_unlocks
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to load module unlocks: {}", e))?;

    Ok(rows.into_iter().map(UnlockRow::into_record).collect())
}

/// Create-or-update a single unlock record. The upsert converges: repeated
/// identical writes leave the same row, and the original unlock timestamp
/// is preserved.
pub async fn save_module_unlock(
    pool: &SqlitePool,
    user_id: &str,
    module_id: &str,
    record: &UnlockRecord,
) -> Result<(), String> {
    sqlx::query(
        r#"
        INSERT INTO module_unlocks (user_id, module_id, passed, status, reason, unlocked_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, module_id) DO UPDATE SET
            passed = excluded.passed,
            status = excluded.status,
            reason = excluded.reason
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .bind(record.passed)
    .bind(&record.status)
    .bind(record.reason.to_string())
    .bind(record.unlocked_at)
    .execute(pool)
    .await
    .map_err(|e| format!("Failed to save module unlock: {}", e))?;

    Ok(())
}

/// Persist an xp unlock for every module that newly qualifies. Safe to call
/// on every recomputation; modules with any existing record are skipped and
/// a failed write simply re-triggers on the next pass.
pub async fn sync_xp_unlocks(
    pool: &SqlitePool,
    user_id: &str,
    progress: &HashMap<String, ModuleProgress>,
    unlocks: &HashMap<String, UnlockRecord>,
) -> Result<Vec<String>, String> {
    let qualified = newly_qualified_modules(progress, unlocks);
    for module_id in &qualified {
        save_module_unlock(pool, user_id, module_id, &UnlockRecord::xp_unlock()).await?;
    }
    Ok(qualified)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
