mod catalog;
mod commands;
mod db;
mod levels;
mod models;
mod progression;
#[cfg(test)]
mod test_utils;

use db::AppState;
use std::sync::Arc;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tauri::Builder::default()
    .plugin(tauri_plugin_opener::init())
    .setup(|app| {
      // Initialize database
      let app_handle = app.handle().clone();
      tauri::async_runtime::block_on(async move {
        match db::initialize_db(&app_handle).await {
          Ok(pool) => {
            let state = Arc::new(AppState::new(pool));
            app_handle.manage(state);
            println!("Database ready");
          }
          Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
          }
        }
      });
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      commands::get_user_profile,
      commands::update_user_profile,
      commands::save_lesson_completion,
      commands::get_lesson_completions,
      commands::get_practice_summary,
      // Catalog commands
      commands::catalog::catalog_start_feed,
      commands::catalog::catalog_stop_feed,
      commands::catalog::catalog_refresh,
      commands::catalog::get_lessons,
      // Progression commands
      commands::progression::get_modules,
      commands::progression::get_module_progress,
      commands::progression::get_module_unlocks,
      commands::progression::get_progression_state,
      commands::progression::check_level_access,
      commands::progression::request_assessment,
      commands::progression::record_assessment_result,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
