//! Reconciles the local project model with the remote board.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::notify::{LogNotifier, Notice, Notifier};
use super::pending::{FailureOutcome, PendingQueue};
use super::remote::RemoteClient;
use crate::board::ProjectModel;
use crate::cache::{Cache, CacheKey};
use crate::error::RemoteError;
use crate::github::types::{FieldValue, Item, PendingUpdate};

/// Consecutive push failures after which an edit is reported as unsynced.
pub const DEFAULT_MAX_PUSH_FAILURES: u32 = 5;

/// Tuning and collaborators of a coordinator
#[derive(Clone)]
pub struct SyncOptions {
  pub max_push_failures: u32,
  pub notifier: Arc<dyn Notifier>,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      max_push_failures: DEFAULT_MAX_PUSH_FAILURES,
      notifier: Arc::new(LogNotifier),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Items were fetched and applied to the model
  Synced { items: usize },
  /// Another sync was already running
  Skipped,
}

/// Result of one pass over the pending queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
  pub pushed: usize,
  pub failed: usize,
}

/// Keeps one project's model in step with the remote service.
///
/// The model shows the last fetched remote state with every still-pending
/// local edit applied on top. Edits are pushed right away and again before
/// each sync until the remote accepts them. Failed edits are never rolled
/// back; after `max_push_failures` consecutive failures the user is told the
/// card is unsynced, and pushing continues.
#[derive(Clone)]
pub struct SyncCoordinator {
  inner: Arc<Inner>,
}

struct Inner {
  project_id: String,
  remote: Arc<dyn RemoteClient>,
  cache: Arc<Cache>,
  model: Arc<Mutex<ProjectModel>>,
  pending: Mutex<PendingQueue>,
  syncing: AtomicBool,
  timer: Mutex<Option<JoinHandle<()>>>,
  last_synced: Mutex<Option<DateTime<Utc>>>,
  options: SyncOptions,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag however the sync ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

impl SyncCoordinator {
  pub fn new(
    project_id: impl Into<String>,
    remote: Arc<dyn RemoteClient>,
    cache: Arc<Cache>,
    model: Arc<Mutex<ProjectModel>>,
    options: SyncOptions,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        project_id: project_id.into(),
        remote,
        cache,
        model,
        pending: Mutex::new(PendingQueue::new()),
        syncing: AtomicBool::new(false),
        timer: Mutex::new(None),
        last_synced: Mutex::new(None),
        options,
      }),
    }
  }

  pub fn project_id(&self) -> &str {
    &self.inner.project_id
  }

  /// Shared handle to the model this coordinator writes to.
  pub fn model(&self) -> Arc<Mutex<ProjectModel>> {
    Arc::clone(&self.inner.model)
  }

  /// Run `f` with the model locked. `f` must not await or re-enter the
  /// coordinator.
  pub fn with_model<R>(&self, f: impl FnOnce(&mut ProjectModel) -> R) -> R {
    f(&mut lock(&self.inner.model))
  }

  fn report_error(&self, context: &str, e: RemoteError) -> RemoteError {
    error!(project = %self.inner.project_id, error = %e, "{}", context);
    self
      .inner
      .options
      .notifier
      .notify(Notice::error(e.user_message()));
    e
  }

  /// Populate the model through the cache.
  pub async fn load_project(&self) -> Result<(), RemoteError> {
    let inner = &self.inner;
    let project_id = inner.project_id.as_str();

    let snapshot = inner
      .cache
      .fetch_with_cache(&CacheKey::project(project_id).as_key(), || {
        inner.remote.fetch_project(project_id)
      })
      .await
      .map_err(|e| self.report_error("Failed to load project", e))?;

    let items = inner
      .cache
      .fetch_with_cache(&CacheKey::items(project_id).as_key(), || {
        inner.remote.fetch_items(project_id)
      })
      .await
      .map_err(|e| self.report_error("Failed to load items", e))?;

    lock(&inner.model).set_project(snapshot);
    let items = self.rebase_pending(items);
    lock(&inner.model).set_items(items);
    Ok(())
  }

  /// Push pending edits, then replace the model's items with fresh remote
  /// state. Overlapping calls are dropped, not queued.
  pub async fn sync(&self) -> Result<SyncOutcome, RemoteError> {
    let inner = &self.inner;
    if inner.syncing.swap(true, Ordering::SeqCst) {
      debug!(project = %inner.project_id, "Sync already running, skipping");
      return Ok(SyncOutcome::Skipped);
    }
    let _in_flight = InFlight(&inner.syncing);

    self.push_pending_updates().await;

    let key = CacheKey::items(&inner.project_id).as_key();
    inner.cache.invalidate(Some(&key));
    let items = inner
      .cache
      .fetch_with_cache(&key, || inner.remote.fetch_items(&inner.project_id))
      .await
      .map_err(|e| self.report_error("Sync failed", e))?;

    let items = self.rebase_pending(items);
    let count = items.len();
    lock(&inner.model).set_items(items);
    *lock(&inner.last_synced) = Some(Utc::now());

    info!(project = %inner.project_id, items = count, "Sync complete");
    Ok(SyncOutcome::Synced { items: count })
  }

  /// Try every pending edit once. Failures stay queued.
  pub async fn push_pending_updates(&self) -> PushReport {
    let inner = &self.inner;
    let batch = lock(&inner.pending).snapshot();
    let mut report = PushReport::default();

    for (seq, update) in batch {
      let result = inner
        .remote
        .update_single_select_field(
          &update.project_id,
          &update.item_id,
          &update.field_id,
          &update.option_id,
        )
        .await;

      match result {
        Ok(()) => {
          lock(&inner.pending).confirm(&update.item_id, seq);
          report.pushed += 1;
          debug!(item = %update.item_id, option = %update.option_id, "Pushed update");
        }
        Err(e) => {
          report.failed += 1;
          let outcome = lock(&inner.pending).record_failure(
            &update.item_id,
            seq,
            inner.options.max_push_failures,
          );
          warn!(item = %update.item_id, error = %e, ?outcome, "Failed to push update");

          if let FailureOutcome::Unsynced(attempts) = outcome {
            inner.options.notifier.notify(Notice::warning(format!(
              "Card {} is not synced after {} attempts: {}",
              update.item_id,
              attempts,
              e.user_message()
            )));
          }
        }
      }
    }

    report
  }

  /// Queue `update` (replacing any earlier edit of the same item) and start
  /// pushing right away. The handle may be dropped.
  ///
  /// The push is spawned, so this must be called from within a tokio runtime.
  pub fn queue_update(&self, update: PendingUpdate) -> JoinHandle<PushReport> {
    lock(&self.inner.pending).insert(update);
    let coordinator = self.clone();
    tokio::spawn(async move { coordinator.push_pending_updates().await })
  }

  /// Move a card locally and queue the matching remote write.
  ///
  /// `to_column` may be a column id or name. Returns `None` when nothing
  /// moved. Like [`Self::queue_update`], needs a tokio runtime.
  pub fn move_card(&self, card_id: &str, to_column: &str) -> Option<JoinHandle<PushReport>> {
    let update = {
      let mut model = lock(&self.inner.model);
      let column_id = model.resolve_column(to_column)?.id.clone();
      let field_id = model.status_field()?.id.clone();
      if !model.move_card(card_id, &column_id) {
        return None;
      }
      PendingUpdate {
        project_id: self.inner.project_id.clone(),
        item_id: card_id.to_string(),
        field_id,
        option_id: column_id,
      }
    };
    Some(self.queue_update(update))
  }

  /// Re-apply pending edits on top of freshly fetched items.
  fn rebase_pending(&self, mut items: Vec<Item>) -> Vec<Item> {
    let pending: Vec<PendingUpdate> = lock(&self.inner.pending).updates().cloned().collect();
    if pending.is_empty() {
      return items;
    }

    let model = lock(&self.inner.model);
    let Some(field) = model.status_field() else {
      return items;
    };

    for update in pending.iter().filter(|u| u.field_id == field.id) {
      let Some(option) = field.options.iter().find(|o| o.id == update.option_id) else {
        continue;
      };
      if let Some(item) = items.iter_mut().find(|i| i.id == update.item_id) {
        item.field_values.insert(
          field.name.clone(),
          FieldValue::option(option.name.clone(), option.id.clone()),
        );
      }
    }
    items
  }

  /// Run `sync` every `interval_seconds`. Zero means manual sync only.
  /// Must be called from within a tokio runtime.
  pub fn start_auto_sync(&self, interval_seconds: u64) {
    self.stop_auto_sync();
    if interval_seconds == 0 {
      debug!(project = %self.inner.project_id, "Auto-sync disabled");
      return;
    }

    let period = Duration::from_secs(interval_seconds);
    let weak = Arc::downgrade(&self.inner);
    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
          break;
        };
        let coordinator = SyncCoordinator { inner };
        // Detached so that stopping the timer leaves a running sync alone.
        tokio::spawn(async move {
          // Already reported through the notifier.
          if let Err(e) = coordinator.sync().await {
            debug!(
              project = %coordinator.inner.project_id,
              error = %e,
              "Scheduled sync failed"
            );
          }
        });
      }
    });

    *lock(&self.inner.timer) = Some(handle);
    info!(project = %self.inner.project_id, interval_seconds, "Auto-sync started");
  }

  pub fn stop_auto_sync(&self) {
    if let Some(handle) = lock(&self.inner.timer).take() {
      handle.abort();
      debug!(project = %self.inner.project_id, "Auto-sync stopped");
    }
  }

  pub fn is_auto_syncing(&self) -> bool {
    lock(&self.inner.timer).is_some()
  }

  /// Drop every unconfirmed edit and reload from the remote.
  pub async fn force_refresh(&self) -> Result<SyncOutcome, RemoteError> {
    let discarded = {
      let mut pending = lock(&self.inner.pending);
      let count = pending.len();
      pending.clear();
      count
    };
    if discarded > 0 {
      warn!(discarded, "Discarding unconfirmed local edits");
    }

    self.inner.cache.invalidate_project(&self.inner.project_id);
    let outcome = self.sync().await?;
    if let SyncOutcome::Synced { .. } = outcome {
      self
        .inner
        .options
        .notifier
        .notify(Notice::info("Board refreshed"));
    }
    Ok(outcome)
  }

  pub fn has_pending_updates(&self) -> bool {
    !lock(&self.inner.pending).is_empty()
  }

  pub fn pending_updates(&self) -> Vec<PendingUpdate> {
    lock(&self.inner.pending).updates().cloned().collect()
  }

  /// Edits that have failed too often to be considered in flight.
  pub fn unsynced_items(&self) -> Vec<PendingUpdate> {
    lock(&self.inner.pending).unsynced(self.inner.options.max_push_failures)
  }

  pub fn is_syncing(&self) -> bool {
    self.inner.syncing.load(Ordering::SeqCst)
  }

  pub fn last_synced(&self) -> Option<DateTime<Utc>> {
    *lock(&self.inner.last_synced)
  }

  /// Stop the timer and forget pending edits.
  pub fn destroy(&self) {
    self.stop_auto_sync();
    lock(&self.inner.pending).clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::columns;
  use crate::sync::testing::{sample_items, sample_project, MockRemote, RecordingNotifier};
  use std::sync::atomic::Ordering;

  fn setup(
    remote: &Arc<MockRemote>,
    max_push_failures: u32,
  ) -> (SyncCoordinator, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator = SyncCoordinator::new(
      "PVT_1",
      remote.clone(),
      Arc::new(Cache::new()),
      Arc::new(Mutex::new(ProjectModel::new())),
      SyncOptions {
        max_push_failures,
        notifier: notifier.clone(),
      },
    );
    (coordinator, notifier)
  }

  async fn loaded(
    max_push_failures: u32,
  ) -> (Arc<MockRemote>, SyncCoordinator, Arc<RecordingNotifier>) {
    let remote = Arc::new(MockRemote::new(sample_items()));
    let (coordinator, notifier) = setup(&remote, max_push_failures);
    coordinator.load_project().await.unwrap();
    (remote, coordinator, notifier)
  }

  fn column_of(coordinator: &SyncCoordinator, card: &str) -> Option<String> {
    coordinator.with_model(|m| m.column_of(card).map(|c| c.id.clone()))
  }

  #[tokio::test]
  async fn test_load_project_reads_through_cache() {
    let (remote, coordinator, _) = loaded(5).await;

    assert_eq!(coordinator.with_model(|m| m.items().len()), 3);
    assert_eq!(column_of(&coordinator, "C").as_deref(), Some("todo"));

    coordinator.load_project().await.unwrap();
    assert_eq!(remote.fetch_project_calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_push_stays_pending_until_next_sync() {
    let (remote, coordinator, _) = loaded(5).await;
    remote.fail_updates.store(true, Ordering::SeqCst);

    let report = coordinator.move_card("A", "Done").unwrap().await.unwrap();

    assert_eq!(report, PushReport { pushed: 0, failed: 1 });
    assert!(coordinator.has_pending_updates());

    remote.fail_updates.store(false, Ordering::SeqCst);
    let outcome = coordinator.sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { items: 3 });
    assert!(!coordinator.has_pending_updates());
    assert_eq!(*remote.pushed.lock().unwrap(), vec![("A".to_string(), "done".to_string())]);
    assert_eq!(column_of(&coordinator, "A").as_deref(), Some("done"));
  }

  #[tokio::test]
  async fn test_successful_push_clears_pending() {
    let (remote, coordinator, _) = loaded(5).await;

    let report = coordinator.move_card("C", "doing").unwrap().await.unwrap();

    assert_eq!(report.pushed, 1);
    assert!(!coordinator.has_pending_updates());
    assert_eq!(remote.update_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_pending_move_survives_sync_with_failing_push() {
    let (remote, coordinator, _) = loaded(5).await;
    remote.fail_updates.store(true, Ordering::SeqCst);

    coordinator.move_card("A", "doing").unwrap().await.unwrap();
    coordinator.sync().await.unwrap();

    // Remote still says Todo, the local edit is layered on top.
    assert_eq!(column_of(&coordinator, "A").as_deref(), Some("doing"));
    assert!(coordinator.has_pending_updates());
  }

  #[tokio::test]
  async fn test_overlapping_sync_is_dropped() {
    let (remote, coordinator, _) = loaded(5).await;
    let gate = remote.hold_fetches();
    let before = remote.fetch_items_calls.load(Ordering::SeqCst);

    let first = tokio::spawn({
      let coordinator = coordinator.clone();
      async move { coordinator.sync().await }
    });
    for _ in 0..100 {
      if remote.fetch_items_calls.load(Ordering::SeqCst) > before {
        break;
      }
      tokio::task::yield_now().await;
    }
    assert!(coordinator.is_syncing());

    let second = coordinator.sync().await.unwrap();
    assert_eq!(second, SyncOutcome::Skipped);
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), before + 1);

    gate.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, SyncOutcome::Synced { items: 3 });
    assert!(!coordinator.is_syncing());
  }

  #[tokio::test]
  async fn test_fetch_error_is_reported_and_flag_cleared() {
    let (remote, coordinator, notifier) = loaded(5).await;
    remote.fail_fetch.store(true, Ordering::SeqCst);

    let result = coordinator.sync().await;

    assert!(matches!(result, Err(RemoteError::Network(_))));
    assert!(!coordinator.is_syncing());
    assert_eq!(
      notifier.messages(),
      vec!["Network error: check your connection".to_string()]
    );

    remote.fail_fetch.store(false, Ordering::SeqCst);
    assert!(coordinator.sync().await.is_ok());
    assert!(coordinator.last_synced().is_some());
  }

  #[tokio::test]
  async fn test_force_refresh_discards_unpushed_edits() {
    let (remote, coordinator, notifier) = loaded(5).await;
    remote.fail_updates.store(true, Ordering::SeqCst);
    coordinator.move_card("A", "done").unwrap().await.unwrap();
    assert!(coordinator.has_pending_updates());

    let outcome = coordinator.force_refresh().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { items: 3 });
    assert!(!coordinator.has_pending_updates());
    // Nothing was pushed by the refresh itself.
    assert_eq!(remote.update_calls.load(Ordering::SeqCst), 1);
    // The local move is gone; the remote state wins.
    assert_eq!(column_of(&coordinator, "A").as_deref(), Some("todo"));
    assert_eq!(notifier.messages(), vec!["Board refreshed".to_string()]);
  }

  #[tokio::test]
  async fn test_unsynced_reported_once_after_threshold() {
    let (remote, coordinator, notifier) = loaded(2).await;
    remote.fail_updates.store(true, Ordering::SeqCst);

    coordinator.move_card("A", "done").unwrap().await.unwrap();
    assert!(coordinator.unsynced_items().is_empty());

    coordinator.sync().await.unwrap();
    coordinator.sync().await.unwrap();

    let unsynced = coordinator.unsynced_items();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].item_id, "A");
    let warnings: Vec<String> = notifier
      .messages()
      .into_iter()
      .filter(|m| m.contains("not synced"))
      .collect();
    assert_eq!(warnings.len(), 1);
    assert!(coordinator.has_pending_updates());
  }

  #[tokio::test]
  async fn test_move_card_unknown_target_queues_nothing() {
    let (_, coordinator, _) = loaded(5).await;

    assert!(coordinator.move_card("A", "Blocked").is_none());
    assert!(coordinator.move_card("missing", "done").is_none());
    assert!(!coordinator.has_pending_updates());
  }

  #[tokio::test]
  async fn test_move_to_fallback_column_queues_nothing() {
    let mut project = sample_project();
    project.fields[0].options.clear();
    let remote =
      Arc::new(MockRemote::new(vec![Item::new("A", "Write docs")]).with_project(project));
    let (coordinator, _) = setup(&remote, 5);
    coordinator.load_project().await.unwrap();

    assert!(coordinator.move_card("A", columns::FALLBACK_COLUMN_ID).is_none());
    assert!(coordinator.move_card("A", "No Status").is_none());
    assert!(!coordinator.has_pending_updates());
    assert_eq!(remote.update_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_requeue_replaces_pending_update() {
    let (remote, coordinator, _) = loaded(5).await;
    remote.fail_updates.store(true, Ordering::SeqCst);

    coordinator.move_card("A", "doing").unwrap().await.unwrap();
    coordinator.move_card("A", "done").unwrap().await.unwrap();

    let pending = coordinator.pending_updates();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].option_id, "done");
  }

  #[tokio::test(start_paused = true)]
  async fn test_auto_sync_runs_on_interval() {
    let (remote, coordinator, _) = loaded(5).await;
    let base = remote.fetch_items_calls.load(Ordering::SeqCst);

    coordinator.start_auto_sync(10);
    assert!(coordinator.is_auto_syncing());

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), base + 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), base + 2);

    coordinator.stop_auto_sync();
    coordinator.stop_auto_sync();
    assert!(!coordinator.is_auto_syncing());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), base + 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stopping_timer_leaves_running_sync_alone() {
    let (remote, coordinator, _) = loaded(5).await;
    let gate = remote.hold_fetches();
    let base = remote.fetch_items_calls.load(Ordering::SeqCst);
    remote.items.lock().unwrap().push(Item::new("D", "Late arrival"));

    coordinator.start_auto_sync(10);
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    for _ in 0..100 {
      if remote.fetch_items_calls.load(Ordering::SeqCst) > base {
        break;
      }
      tokio::task::yield_now().await;
    }
    assert!(coordinator.is_syncing());

    coordinator.stop_auto_sync();
    gate.notify_one();
    for _ in 0..100 {
      if !coordinator.is_syncing() {
        break;
      }
      tokio::task::yield_now().await;
    }

    assert!(!coordinator.is_syncing());
    assert!(coordinator.with_model(|m| m.item("D").is_some()));
    assert!(coordinator.last_synced().is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_zero_interval_is_manual_only() {
    let (remote, coordinator, _) = loaded(5).await;
    let base = remote.fetch_items_calls.load(Ordering::SeqCst);

    coordinator.start_auto_sync(0);

    assert!(!coordinator.is_auto_syncing());
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(remote.fetch_items_calls.load(Ordering::SeqCst), base);
  }

  #[tokio::test(start_paused = true)]
  async fn test_destroy_stops_timer_and_clears_pending() {
    let (remote, coordinator, _) = loaded(5).await;
    remote.fail_updates.store(true, Ordering::SeqCst);
    coordinator.move_card("A", "done").unwrap().await.unwrap();
    coordinator.start_auto_sync(5);

    coordinator.destroy();

    assert!(!coordinator.is_auto_syncing());
    assert!(!coordinator.has_pending_updates());
  }
}
