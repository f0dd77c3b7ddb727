pub mod catalog;
pub mod progression;

use crate::db::AppState;
use crate::models::{CompletionEntry, CompletionLedger, Score, UserProfile};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tauri::State;

#[tauri::command]
pub async fn get_user_profile(
  state: State<'_, Arc<AppState>>,
  user_id: String,
) -> Result<Option<UserProfile>, String> {
  sqlx::query_as::<_, UserProfile>(
    "SELECT user_id, level, current_module_id, updated_at FROM user_profiles WHERE user_id = ?"
  )
  .bind(&user_id)
  .fetch_optional(&state.db)
  .await
  .map_err(|e| format!("Failed to fetch user profile: {}", e))
}

/// Upsert the stored profile. Omitted fields keep their current values.
#[tauri::command]
pub async fn update_user_profile(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  level: Option<String>,
  current_module_id: Option<String>,
) -> Result<(), String> {
  sqlx::query(
    r#"
    INSERT INTO user_profiles (user_id, level, current_module_id, updated_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(user_id) DO UPDATE SET
      level = COALESCE(excluded.level, user_profiles.level),
      current_module_id = COALESCE(excluded.current_module_id, user_profiles.current_module_id),
      updated_at = excluded.updated_at
    "#,
  )
  .bind(&user_id)
  .bind(&level)
  .bind(&current_module_id)
  .bind(Utc::now())
  .execute(&state.db)
  .await
  .map_err(|e| format!("Failed to update user profile: {}", e))?;

  Ok(())
}

/// Record a lesson completion. This is the ledger writer for the hosting
/// screen; the progression engine itself only reads the ledger.
#[tauri::command]
pub async fn save_lesson_completion(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  lesson_id: String,
  watched: bool,
  score: Option<String>,
) -> Result<(), String> {
  sqlx::query(
    r#"
    INSERT INTO lesson_completions (user_id, lesson_id, watched, score, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(user_id, lesson_id) DO UPDATE SET
      watched = excluded.watched,
      score = excluded.score,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(&user_id)
  .bind(&lesson_id)
  .bind(watched)
  .bind(&score)
  .bind(Utc::now())
  .execute(&state.db)
  .await
  .map_err(|e| format!("Failed to save lesson completion: {}", e))?;

  Ok(())
}

#[tauri::command]
pub async fn get_lesson_completions(
  state: State<'_, Arc<AppState>>,
  user_id: String,
) -> Result<CompletionLedger, String> {
  crate::progression::load_completion_ledger(&state.db, &user_id).await
}

/// Aggregate practice stats derived from the completion ledger
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
  pub days_practiced: i64,
  pub lessons_tracked: i64,
  pub lessons_completed: i64,
}

#[tauri::command]
pub async fn get_practice_summary(
  state: State<'_, Arc<AppState>>,
  user_id: String,
) -> Result<PracticeSummary, String> {
  let rows: Vec<(bool, Option<String>, DateTime<Utc>)> = sqlx::query_as(
    "SELECT watched, score, updated_at FROM lesson_completions WHERE user_id = ?",
  )
  .bind(&user_id)
  .fetch_all(&state.db)
  .await
  .map_err(|e| format!("Failed to load practice summary: {}", e))?;

  let days: HashSet<NaiveDate> = rows
    .iter()
    .map(|(_, _, updated_at)| updated_at.date_naive())
    .collect();
  let completed = rows
    .iter()
    .filter(|(watched, score, _)| {
      let entry = CompletionEntry {
        watched: *watched,
        score: score.clone().map(Score::Text),
      };
      entry.is_completed()
    })
    .count();

  Ok(PracticeSummary {
    days_practiced: days.len() as i64,
    lessons_tracked: rows.len() as i64,
    lessons_completed: completed as i64,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
