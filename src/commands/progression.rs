//! Tauri commands for the module progression and unlock engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tauri::State;

use crate::db::AppState;
use crate::levels::can_access_level;
use crate::models::module::fallback_module_id;
use crate::models::{Module, UnlockRecord, UserProfile};
use crate::progression::{
    aggregate_module_progress, evaluate_module_unlocks, load_completion_ledger,
    load_module_unlocks, load_modules, save_module_unlock, sync_xp_unlocks, ModuleProgress,
    ProgressionState,
};

/// Recomputed view over the latest ledger and catalog snapshot. Persisting
/// xp unlocks happens here, so every read-side command leaves the unlock
/// store up to date.
struct Recomputed {
    modules: Vec<Module>,
    progress: HashMap<String, ModuleProgress>,
    unlocks: HashMap<String, UnlockRecord>,
}

async fn recompute(state: &AppState, user_id: &str) -> Result<Recomputed, String> {
    let modules = load_modules(&state.db).await?;
    let ledger = load_completion_ledger(&state.db, user_id).await?;
    let catalog = state.catalog_snapshot();

    let progress = aggregate_module_progress(&ledger, &catalog, fallback_module_id(&modules));

    let mut unlocks = load_module_unlocks(&state.db, user_id).await?;
    let written = sync_xp_unlocks(&state.db, user_id, &progress, &unlocks).await?;
    if !written.is_empty() {
        unlocks = load_module_unlocks(&state.db, user_id).await?;
    }

    Ok(Recomputed { modules, progress, unlocks })
}

/// Get the configured modules in display order
#[tauri::command]
pub async fn get_modules(state: State<'_, Arc<AppState>>) -> Result<Vec<Module>, String> {
    load_modules(&state.db).await
}

/// Per-module experience summary for one user
#[tauri::command]
pub async fn get_module_progress(
    state: State<'_, Arc<AppState>>,
    user_id: String,
) -> Result<HashMap<String, ModuleProgress>, String> {
    let recomputed = recompute(&state, &user_id).await?;
    Ok(recomputed.progress)
}

/// Unlock decision for every module
#[tauri::command]
pub async fn get_module_unlocks(
    state: State<'_, Arc<AppState>>,
    user_id: String,
) -> Result<HashMap<String, bool>, String> {
    let recomputed = recompute(&state, &user_id).await?;
    Ok(evaluate_module_unlocks(
        &recomputed.modules,
        &recomputed.progress,
        &recomputed.unlocks,
    ))
}

/// Full progression snapshot for the UI header. Level and active module
/// default to the stored profile when not passed explicitly.
#[tauri::command]
pub async fn get_progression_state(
    state: State<'_, Arc<AppState>>,
    user_id: String,
    level: Option<String>,
    selected_module_id: Option<String>,
) -> Result<ProgressionState, String> {
    let profile: Option<UserProfile> = sqlx::query_as(
        "SELECT user_id, level, current_module_id, updated_at FROM user_profiles WHERE user_id = ?",
    )
    .bind(&user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| format!("Failed to fetch user profile: {}", e))?;

    let recomputed = recompute(&state, &user_id).await?;
    let module_unlocks = evaluate_module_unlocks(
        &recomputed.modules,
        &recomputed.progress,
        &recomputed.unlocks,
    );

    let raw_level = level
        .or_else(|| profile.as_ref().and_then(|p| p.level.clone()))
        .unwrap_or_default();
    let active_module_id = selected_module_id
        .or_else(|| profile.as_ref().and_then(|p| p.current_module_id.clone()))
        .or_else(|| fallback_module_id(&recomputed.modules).map(str::to_string));

    Ok(ProgressionState::compute(
        &raw_level,
        &recomputed.progress,
        module_unlocks,
        active_module_id.as_deref(),
    ))
}

/// Level-tag gate, separate from the unlock flow: compares the stored
/// profile level against the module's suggested level. Fail-open, so an
/// untagged module or an unrecognized profile label never blocks entry.
#[tauri::command]
pub async fn check_level_access(
    state: State<'_, Arc<AppState>>,
    user_id: String,
    module_id: String,
) -> Result<bool, String> {
    let modules = load_modules(&state.db).await?;
    let module = modules
        .iter()
        .find(|m| m.id == module_id)
        .ok_or_else(|| format!("Unknown module: {}", module_id))?;

    let profile: Option<UserProfile> = sqlx::query_as(
        "SELECT user_id, level, current_module_id, updated_at FROM user_profiles WHERE user_id = ?",
    )
    .bind(&user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| format!("Failed to fetch user profile: {}", e))?;

    let level = profile.as_ref().and_then(|p| p.level.as_deref());
    Ok(can_access_level(level, module.level_tag.as_deref()))
}

/// Payload handed back when the UI asks to enter a locked module. The quiz
/// flow itself is external; its result returns via record_assessment_result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    pub module_id: String,
    pub module_title: String,
    /// How many catalog lessons the quiz would gate, for display
    pub lesson_count: i64,
    pub already_unlocked: bool,
}

#[tauri::command]
pub async fn request_assessment(
    state: State<'_, Arc<AppState>>,
    user_id: String,
    module_id: String,
) -> Result<AssessmentRequest, String> {
    let recomputed = recompute(&state, &user_id).await?;
    let module = recomputed
        .modules
        .iter()
        .find(|m| m.id == module_id)
        .ok_or_else(|| format!("Unknown module: {}", module_id))?;

    let unlocked = evaluate_module_unlocks(
        &recomputed.modules,
        &recomputed.progress,
        &recomputed.unlocks,
    );

    Ok(AssessmentRequest {
        module_id: module.id.clone(),
        module_title: module.title.clone(),
        lesson_count: state.catalog_snapshot().lesson_count(&module.id),
        already_unlocked: unlocked.get(&module.id).copied().unwrap_or(false),
    })
}

/// Assessment path: a passing result persists an unlock record that stays
/// authoritative regardless of later ledger changes. Failures write nothing,
/// so the xp path can still unlock the module later.
#[tauri::command]
pub async fn record_assessment_result(
    state: State<'_, Arc<AppState>>,
    user_id: String,
    module_id: String,
    passed: bool,
) -> Result<bool, String> {
    let modules = load_modules(&state.db).await?;
    if !modules.iter().any(|m| m.id == module_id) {
        return Err(format!("Unknown module: {}", module_id));
    }

    if passed {
        save_module_unlock(
            &state.db,
            &user_id,
            &module_id,
            &UnlockRecord::assessment_pass(),
        )
        .await?;
    }

    Ok(passed)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;
    use crate::levels::Level;
    use crate::test_utils::*;
    use serial_test::serial;
    use tauri::Manager;

    #[tokio::test]
    #[serial]
    async fn test_get_modules_uses_fallback_ladder() {
        let pool = setup_test_db().await;
        let state = Arc::new(AppState::new(pool.clone()));
        let app = tauri::test::mock_app();
        app.manage(state);

        let modules = get_modules(app.state()).await.expect("Should load modules");
        assert_eq!(modules.len(), 10);
        assert_eq!(modules[0].id, "module-a1");

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_progress_reflects_catalog_and_ledger() {
        let pool = setup_test_db().await;
        seed_test_completions(&pool, "user-1", &[("l1", true, None), ("l3", false, Some("80"))])
            .await;

        let state = Arc::new(AppState::new(pool.clone()));
        state.replace_catalog(CatalogIndex::from_snapshot(&mock_lesson_snapshot()));
        let app = tauri::test::mock_app();
        app.manage(state);

        let progress = get_module_progress(app.state(), "user-1".into())
            .await
            .expect("Should compute progress");
        // l1 watched, l2 pending, l5 untagged lands in module-a1
        assert_eq!(progress["module-a1"], ModuleProgress { total: 3, earned: 10, required: 30 });
        assert_eq!(progress["module-a2"], ModuleProgress { total: 2, earned: 10, required: 20 });

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_unlocks_persist_xp_threshold_crossing() {
        let pool = setup_test_db().await;
        seed_test_completions(
            &pool,
            "user-1",
            &[("l3", true, None), ("l4", false, Some("75"))],
        )
        .await;

        let state = Arc::new(AppState::new(pool.clone()));
        state.replace_catalog(CatalogIndex::from_snapshot(&mock_lesson_snapshot()));
        let app = tauri::test::mock_app();
        app.manage(state);

        let unlocks = get_module_unlocks(app.state(), "user-1".into())
            .await
            .expect("Should compute unlocks");
        assert!(unlocks["module-a1"]); // first module, always open
        assert!(unlocks["module-a2"]); // xp threshold met
        assert!(!unlocks["module-b1"]);

        // The crossing persisted exactly one record
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM module_unlocks WHERE user_id = 'user-1' AND reason = 'xp'",
        )
        .fetch_one(&pool)
        .await
        .expect("Should count unlock rows");
        assert_eq!(count, 1);

        // Calling again writes nothing new
        get_module_unlocks(app.state(), "user-1".into()).await.unwrap();
        let count_after: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM module_unlocks WHERE user_id = 'user-1'")
                .fetch_one(&pool)
                .await
                .expect("Should count unlock rows");
        assert_eq!(count_after, 1);

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_progression_state_defaults_from_profile() {
        let pool = setup_test_db().await;
        seed_test_completions(&pool, "user-1", &[("l3", true, None)]).await;

        let state = Arc::new(AppState::new(pool.clone()));
        state.replace_catalog(CatalogIndex::from_snapshot(&mock_lesson_snapshot()));
        let app = tauri::test::mock_app();
        app.manage(state);

        crate::commands::update_user_profile(
            app.state(),
            "user-1".into(),
            Some("Communicator".into()),
            Some("module-a2".into()),
        )
        .await
        .expect("Should store profile");

        let progression = get_progression_state(app.state(), "user-1".into(), None, None)
            .await
            .expect("Should compute progression state");

        assert_eq!(progression.current_level, Level::B1);
        assert_eq!(progression.next_level, Some(Level::B1Plus));
        // module-a2: earned 10 of 20
        assert_eq!(progression.percent_to_next, 50);
        assert_eq!(progression.remaining_xp, 10);
        assert!(progression.module_unlocks["module-a1"]);

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_progression_state_with_empty_catalog_is_conservative() {
        let pool = setup_test_db().await;
        seed_test_completions(&pool, "user-1", &[("l1", true, None)]).await;

        let state = Arc::new(AppState::new(pool.clone()));
        let app = tauri::test::mock_app();
        app.manage(state);

        let progression =
            get_progression_state(app.state(), "user-1".into(), Some("A1".into()), None)
                .await
                .expect("Should compute progression state");

        // No catalog yet: default target, only the first module open
        assert_eq!(progression.remaining_xp, crate::progression::DEFAULT_XP_TARGET);
        assert!(progression.module_unlocks["module-a1"]);
        assert!(progression.module_unlocks.values().filter(|v| **v).count() == 1);

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_check_level_access_compares_profile_to_tag() {
        let pool = setup_test_db().await;
        let state = Arc::new(AppState::new(pool.clone()));
        let app = tauri::test::mock_app();
        app.manage(state);

        // No profile stored: fail-open
        let open = check_level_access(app.state(), "user-1".into(), "module-c2".into())
            .await
            .expect("Should check access");
        assert!(open);

        crate::commands::update_user_profile(app.state(), "user-1".into(), Some("B1".into()), None)
            .await
            .expect("Should store profile");

        let below = check_level_access(app.state(), "user-1".into(), "module-a2".into())
            .await
            .expect("Should check access");
        assert!(below);
        let above = check_level_access(app.state(), "user-1".into(), "module-c2".into())
            .await
            .expect("Should check access");
        assert!(!above);

        let unknown = check_level_access(app.state(), "user-1".into(), "module-x".into()).await;
        assert!(unknown.is_err());

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_request_assessment_reports_lock_state() {
        let pool = setup_test_db().await;
        let state = Arc::new(AppState::new(pool.clone()));
        let app = tauri::test::mock_app();
        app.manage(state);

        let request = request_assessment(app.state(), "user-1".into(), "module-b2".into())
            .await
            .expect("Should build request");
        assert_eq!(request.module_id, "module-b2");
        assert_eq!(request.module_title, "Module B2");
        assert_eq!(request.lesson_count, 0); // no catalog yet
        assert!(!request.already_unlocked);

        let unknown = request_assessment(app.state(), "user-1".into(), "module-x".into()).await;
        assert!(unknown.is_err());
        assert!(unknown.unwrap_err().contains("Unknown module"));

        teardown_test_db(pool).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_assessment_pass_unlocks_permanently() {
        let pool = setup_test_db().await;
        let state = Arc::new(AppState::new(pool.clone()));
        let app = tauri::test::mock_app();
        app.manage(state);

        // A failed attempt writes nothing
        let failed =
            record_assessment_result(app.state(), "user-1".into(), "module-b2".into(), false)
                .await
                .expect("Should record failure");
        assert!(!failed);
        let unlocks = get_module_unlocks(app.state(), "user-1".into()).await.unwrap();
        assert!(!unlocks["module-b2"]);

        // A pass persists and the module stays open with an empty ledger
        record_assessment_result(app.state(), "user-1".into(), "module-b2".into(), true)
            .await
            .expect("Should record pass");
        let unlocks = get_module_unlocks(app.state(), "user-1".into()).await.unwrap();
        assert!(unlocks["module-b2"]);

        let request = request_assessment(app.state(), "user-1".into(), "module-b2".into())
            .await
            .expect("Should build request");
        assert!(request.already_unlocked);

        teardown_test_db(pool).await;
    }
}
