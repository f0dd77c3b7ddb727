//! Remote lesson catalog client and live index
//!
//! The lesson catalog is published by a remote content service and can change
//! while the app is running. Deliveries are whole-snapshot replacements, not
//! incremental patches: every snapshot is authoritative at that instant and
//! derived structures are rebuilt from scratch. On feed failure the index is
//! reset to empty rather than keeping stale data, because a stale catalog
//! could incorrectly lock or unlock a module.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use url::Url;

use crate::models::LessonRecord;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Bucket key for lessons the catalog has not assigned to any module
pub const UNASSIGNED_MODULE_ID: &str = "unassigned";

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CatalogConfig {
  pub base_url: String,
  pub poll_interval_secs: u64,
}

impl CatalogConfig {
  pub fn from_env() -> Result<Self, CatalogError> {
    let base_url = env::var("CATALOG_BASE_URL")
      .map_err(|_| CatalogError::MissingConfig("CATALOG_BASE_URL".into()))?;
    let poll_interval_secs = env::var("CATALOG_POLL_SECONDS")
      .ok()
      .and_then(|v| v.parse().ok())
      .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    Ok(Self { base_url, poll_interval_secs })
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs.max(1))
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid catalog base URL: {0}")]
  InvalidBaseUrl(#[from] url::ParseError),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),
}

impl Serialize for CatalogError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Catalog Client
/// ---------------------------------------------------------------------------

/// Wire shape of a catalog lesson. Older catalog entries carry the module id
/// under `module` instead of `moduleId`, and may omit the title.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogLesson {
  id: String,
  #[serde(default)]
  title: Option<String>,
  #[serde(default)]
  module_id: Option<String>,
  #[serde(default)]
  module: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
  http: Client,
  base_url: String,
}

impl CatalogClient {
  pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
    // Validate eagerly so a bad URL fails at startup, not on first poll
    Url::parse(&config.base_url)?;
    let http = Client::builder()
      .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
      .build()?;
    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
    })
  }

  /// Fetch the current catalog snapshot
  pub async fn fetch_lessons(&self) -> Result<Vec<LessonRecord>, CatalogError> {
    let lessons: Vec<CatalogLesson> = self
      .http
      .get(format!("{}/lessons", self.base_url))
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    let records = lessons
      .into_iter()
      .enumerate()
      .map(|(index, lesson)| LessonRecord {
        id: lesson.id,
        title: lesson
          .title
          .unwrap_or_else(|| format!("Lesson {}", index + 1)),
        // Blank tags mean untagged, same as a missing key
        module_id: lesson
          .module_id
          .or(lesson.module)
          .filter(|module| !module.trim().is_empty()),
      })
      .collect();

    Ok(records)
  }
}

/// ---------------------------------------------------------------------------
/// Catalog Index
/// ---------------------------------------------------------------------------

/// Derived view over the latest catalog snapshot: lesson ownership and
/// per-module lesson counts. Rebuilt wholesale on every delivery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogIndex {
  lessons: Vec<LessonRecord>,
  lesson_modules: HashMap<String, Option<String>>,
  module_lesson_counts: HashMap<String, i64>,
}

impl CatalogIndex {
  /// The fail-safe state: no lessons, no counts
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn from_snapshot(snapshot: &[LessonRecord]) -> Self {
    let mut lesson_modules = HashMap::new();
    let mut module_lesson_counts: HashMap<String, i64> = HashMap::new();

    for lesson in snapshot {
      lesson_modules.insert(lesson.id.clone(), lesson.module_id.clone());
      let bucket = lesson
        .module_id
        .as_deref()
        .unwrap_or(UNASSIGNED_MODULE_ID);
      *module_lesson_counts.entry(bucket.to_string()).or_default() += 1;
    }

    Self {
      lessons: snapshot.to_vec(),
      lesson_modules,
      module_lesson_counts,
    }
  }

  pub fn lessons(&self) -> &[LessonRecord] {
    &self.lessons
  }

  pub fn is_empty(&self) -> bool {
    self.lessons.is_empty()
  }

  /// Owning module for a lesson; None when the lesson is unknown or untagged
  pub fn module_of(&self, lesson_id: &str) -> Option<&str> {
    self
      .lesson_modules
      .get(lesson_id)
      .and_then(|module| module.as_deref())
  }

  pub fn lesson_count(&self, module_id: &str) -> i64 {
    self
      .module_lesson_counts
      .get(module_id)
      .copied()
      .unwrap_or(0)
  }
}

/// ---------------------------------------------------------------------------
/// Feed Subscription
/// ---------------------------------------------------------------------------

/// Event delivered to feed subscribers
#[derive(Debug)]
pub enum CatalogEvent {
  /// Authoritative snapshot of the entire catalog
  Snapshot(Vec<LessonRecord>),
  /// Feed failure; consumers should drop derived state, not keep stale data
  Error(CatalogError),
}

/// Handle for a live catalog subscription. The poll task is aborted when the
/// handle is dropped, so cleanup happens on every exit path.
pub struct CatalogSubscription {
  handle: tokio::task::JoinHandle<()>,
}

impl CatalogSubscription {
  pub fn unsubscribe(self) {
    self.handle.abort();
  }
}

impl Drop for CatalogSubscription {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// Start polling the catalog. The first snapshot is delivered immediately,
/// then every `poll_interval`. Each delivery is a whole-snapshot replace.
pub fn subscribe_catalog<F>(
  client: CatalogClient,
  poll_interval: Duration,
  mut on_event: F,
) -> CatalogSubscription
where
  F: FnMut(CatalogEvent) + Send + 'static,
{
  let handle = tokio::spawn(async move {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
      ticker.tick().await;
      match client.fetch_lessons().await {
        Ok(snapshot) => on_event(CatalogEvent::Snapshot(snapshot)),
        Err(e) => on_event(CatalogEvent::Error(e)),
      }
    }
  });
  CatalogSubscription { handle }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
