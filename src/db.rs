use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock};
use tauri::Manager;

use crate::catalog::{CatalogIndex, CatalogSubscription};

pub type DbPool = SqlitePool;

/// Application state shared across commands
pub struct AppState {
  pub db: DbPool,
  /// Latest catalog index; replaced wholesale on every feed delivery
  catalog: RwLock<CatalogIndex>,
  /// Live catalog feed handle, if a subscription is running
  pub feed: Mutex<Option<CatalogSubscription>>,
}

impl AppState {
  pub fn new(db: DbPool) -> Self {
    Self {
      db,
      catalog: RwLock::new(CatalogIndex::empty()),
      feed: Mutex::new(None),
    }
  }

  /// Current catalog index. Before the first snapshot arrives this is the
  /// empty index, so downstream unlock decisions start conservative.
  pub fn catalog_snapshot(&self) -> CatalogIndex {
    self
      .catalog
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Whole-value replace; snapshots are never merged
  pub fn replace_catalog(&self, index: CatalogIndex) {
    *self
      .catalog
      .write()
      .unwrap_or_else(PoisonError::into_inner) = index;
  }
}

/// Get the path to the database file
/// Stored in: ~/Library/Application Support/com.linguapath.app/lingua-path.db
fn get_db_path<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<PathBuf, Box<dyn std::error::Error>> {
  let data_dir = app
    .path()
    .app_data_dir()
    .map_err(|e| format!("Failed to get app data dir: {}", e))?;

  // Create directory if it doesn't exist
  fs::create_dir_all(&data_dir)?;

  Ok(data_dir.join("lingua-path.db"))
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<DbPool, Box<dyn std::error::Error>> {
  let db_path = get_db_path(app)?;
  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  println!("Initializing database at: {}", db_path.display());

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  println!("Database initialized successfully");

  Ok(pool)
}
