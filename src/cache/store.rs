//! Key/value store with expiry.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::key::CacheKey;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
  value: Arc<dyn Any + Send + Sync>,
  stored_at: Instant,
}

/// Read-through cache shared by the components of one session.
///
/// Any `Clone + Send + Sync + 'static` value can be stored. A lookup with a
/// different type than the one stored under a key is treated as a miss.
pub struct Cache {
  entries: Mutex<HashMap<String, CacheEntry>>,
  ttl: Duration,
}

impl Default for Cache {
  fn default() -> Self {
    Self::new()
  }
}

impl Cache {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl: DEFAULT_TTL,
    }
  }

  /// Set how long an entry stays fresh.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_fresh(&self, entry: &CacheEntry) -> bool {
    entry.stored_at.elapsed() < self.ttl
  }

  /// Return the cached value for `key`, or run `fetcher` and cache its result.
  ///
  /// A failing fetcher leaves any previous entry untouched and its error is
  /// not remembered.
  pub async fn fetch_with_cache<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    {
      let entries = self.entries();
      if let Some(entry) = entries.get(key) {
        if self.is_fresh(entry) {
          if let Some(value) = entry.value.downcast_ref::<T>() {
            debug!(key, "Cache hit");
            return Ok(value.clone());
          }
        }
      }
    }

    debug!(key, "Cache miss");
    let value = fetcher().await?;

    self.entries().insert(
      key.to_string(),
      CacheEntry {
        value: Arc::new(value.clone()),
        stored_at: Instant::now(),
      },
    );

    Ok(value)
  }

  /// Drop one entry, or every entry when `key` is `None`.
  pub fn invalidate(&self, key: Option<&str>) {
    let mut entries = self.entries();
    match key {
      Some(key) => {
        entries.remove(key);
      }
      None => entries.clear(),
    }
  }

  /// Drop every cached read of one project.
  pub fn invalidate_project(&self, project_id: &str) {
    for key in CacheKey::all_for(project_id) {
      self.invalidate(Some(&key.as_key()));
    }
  }

  /// Whether a fresh entry exists for `key`.
  pub fn has(&self, key: &str) -> bool {
    self
      .entries()
      .get(key)
      .map(|entry| self.is_fresh(entry))
      .unwrap_or(false)
  }

  /// Read without fetching. An expired entry is evicted and reads as `None`.
  pub fn get<T>(&self, key: &str) -> Option<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let mut entries = self.entries();
    let entry = entries.get(key)?;
    if !self.is_fresh(entry) {
      entries.remove(key);
      return None;
    }
    entry.value.downcast_ref::<T>().cloned()
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
