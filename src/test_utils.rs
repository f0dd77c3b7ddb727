//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for modules, completions, and unlocks
//! - Mock data factories

use crate::models::LessonRecord;
use chrono::Utc;
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed a small remote-configured module ladder
pub async fn seed_test_modules(pool: &SqlitePool) -> Vec<String> {
  let modules = vec![
    ("module-a1", "Module A1", "A1", 0),
    ("module-a2", "Module A2", "A2", 1),
    ("module-b1", "Module B1", "B1", 2),
  ];

  let mut ids = Vec::new();

  for (id, title, level_tag, sort_order) in modules {
    sqlx::query(
      r#"
      INSERT OR REPLACE INTO modules (id, title, level_tag, description, sort_order)
      VALUES (?1, ?2, ?3, NULL, ?4)
      "#,
    )
    .bind(id)
    .bind(title)
    .bind(level_tag)
    .bind(sort_order)
    .execute(pool)
    .await
    .expect("Failed to seed module");

    ids.push(id.to_string());
  }

  ids
}

/// Seed completion ledger rows for one user.
/// Each entry is (lesson_id, watched, raw score text).
pub async fn seed_test_completions(
  pool: &SqlitePool,
  user_id: &str,
  entries: &[(&str, bool, Option<&str>)],
) {
  for &(lesson_id, watched, score) in entries {
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
    .bind(user_id)
    .bind(lesson_id)
    .bind(watched)
    .bind(score)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("Failed to seed completion");
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Create a mock catalog lesson
pub fn mock_lesson(id: &str, module_id: Option<&str>) -> LessonRecord {
  LessonRecord {
    id: id.to_string(),
    title: format!("Lesson {}", id),
    module_id: module_id.map(str::to_string),
  }
}

/// Create a mock catalog snapshot spanning two modules plus one untagged lesson
pub fn mock_lesson_snapshot() -> Vec<LessonRecord> {
  vec![
    mock_lesson("l1", Some("module-a1")),
    mock_lesson("l2", Some("module-a1")),
    mock_lesson("l3", Some("module-a2")),
    mock_lesson("l4", Some("module-a2")),
    mock_lesson("l5", None),
  ]
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('modules', 'lesson_completions', 'module_unlocks', 'user_profiles')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_modules_returns_ids() {
    let pool = setup_test_db().await;

    let ids = seed_test_modules(&pool).await;
    assert_eq!(ids.len(), 3);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
      .fetch_one(&pool)
      .await
      .expect("Failed to count modules");
    assert_eq!(count, 3);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_completions_upserts() {
    let pool = setup_test_db().await;

    seed_test_completions(&pool, "user-1", &[("l1", false, Some("50"))]).await;
    seed_test_completions(&pool, "user-1", &[("l1", true, None)]).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_completions")
      .fetch_one(&pool)
      .await
      .expect("Failed to count completions");
    assert_eq!(count, 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_snapshot_shape() {
    let snapshot = mock_lesson_snapshot();
    assert_eq!(snapshot.len(), 5);
    assert!(snapshot.iter().any(|l| l.module_id.is_none()));
  }
}
