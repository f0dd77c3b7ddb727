//! Tauri commands for the remote lesson catalog feed

use std::sync::{Arc, PoisonError};
use tauri::State;

use crate::catalog::{
  subscribe_catalog, CatalogClient, CatalogConfig, CatalogEvent, CatalogIndex,
};
use crate::db::AppState;
use crate::models::LessonRecord;
use crate::models::module::fallback_module_id;
use crate::progression::load_modules;

/// Start the live catalog subscription. Each delivery replaces the shared
/// index wholesale; feed errors reset it to empty so stale catalog data can
/// never drive an unlock decision.
#[tauri::command]
pub async fn catalog_start_feed(state: State<'_, Arc<AppState>>) -> Result<(), String> {
  let config = CatalogConfig::from_env().map_err(|e| e.to_string())?;
  let client = CatalogClient::new(&config).map_err(|e| e.to_string())?;

  let app_state = state.inner().clone();
  let subscription = subscribe_catalog(client, config.poll_interval(), move |event| {
    match event {
      CatalogEvent::Snapshot(snapshot) => {
        app_state.replace_catalog(CatalogIndex::from_snapshot(&snapshot));
      }
      CatalogEvent::Error(e) => {
        eprintln!("Catalog feed error: {}", e);
        app_state.replace_catalog(CatalogIndex::empty());
      }
    }
  });

  let mut feed = state.feed.lock().unwrap_or_else(PoisonError::into_inner);
  if let Some(previous) = feed.replace(subscription) {
    previous.unsubscribe();
  }
  Ok(())
}

/// Stop the live catalog subscription, if one is running
#[tauri::command]
pub async fn catalog_stop_feed(state: State<'_, Arc<AppState>>) -> Result<(), String> {
  let previous = state
    .feed
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
    .take();
  if let Some(subscription) = previous {
    subscription.unsubscribe();
  }
  Ok(())
}

/// One-shot fetch outside the poll cadence. A failed fetch resets the index
/// before surfacing the error.
#[tauri::command]
pub async fn catalog_refresh(state: State<'_, Arc<AppState>>) -> Result<Vec<LessonRecord>, String> {
  let config = CatalogConfig::from_env().map_err(|e| e.to_string())?;
  let client = CatalogClient::new(&config).map_err(|e| e.to_string())?;

  match client.fetch_lessons().await {
    Ok(snapshot) => {
      state.replace_catalog(CatalogIndex::from_snapshot(&snapshot));
      Ok(snapshot)
    }
    Err(e) => {
      state.replace_catalog(CatalogIndex::empty());
      Err(e.to_string())
    }
  }
}

/// Lessons from the current snapshot, optionally narrowed to one module.
/// Untagged lessons belong to the first module in display order.
#[tauri::command]
pub async fn get_lessons(
  state: State<'_, Arc<AppState>>,
  module_id: Option<String>,
) -> Result<Vec<LessonRecord>, String> {
  let index = state.catalog_snapshot();
  let lessons = index.lessons().to_vec();

  let Some(module_id) = module_id else {
    return Ok(lessons);
  };

  let modules = load_modules(&state.db).await?;
  let fallback = fallback_module_id(&modules).map(str::to_string);

  Ok(
    lessons
      .into_iter()
      .filter(|lesson| {
        index.module_of(&lesson.id).or(fallback.as_deref()) == Some(module_id.as_str())
      })
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
