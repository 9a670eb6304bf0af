//! In-memory remote and notifier for coordinator tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::Notify;

use super::notify::{Notice, Notifier};
use super::remote::RemoteClient;
use crate::error::RemoteError;
use crate::github::types::{Field, FieldOption, FieldType, FieldValue, Item, ProjectSnapshot};

pub fn sample_project() -> ProjectSnapshot {
  ProjectSnapshot {
    id: "PVT_1".into(),
    title: "Roadmap".into(),
    fields: vec![Field {
      id: "F_status".into(),
      name: "Status".into(),
      field_type: FieldType::SingleSelect,
      options: vec![
        FieldOption { id: "todo".into(), name: "Todo".into() },
        FieldOption { id: "doing".into(), name: "InProgress".into() },
        FieldOption { id: "done".into(), name: "Done".into() },
      ],
    }],
  }
}

pub fn sample_items() -> Vec<Item> {
  vec![
    Item::new("A", "Write docs").with_field("Status", FieldValue::option("Todo", "todo")),
    Item::new("B", "Ship it").with_field("Status", FieldValue::option("Done", "done")),
    Item::new("C", "Triage"),
  ]
}

/// Remote that keeps its board in memory and applies accepted updates.
pub struct MockRemote {
  pub project: ProjectSnapshot,
  pub items: Mutex<Vec<Item>>,
  pub fetch_project_calls: AtomicU32,
  pub fetch_items_calls: AtomicU32,
  pub update_calls: AtomicU32,
  pub fail_fetch: AtomicBool,
  pub fail_updates: AtomicBool,
  pub pushed: Mutex<Vec<(String, String)>>,
  gate: Mutex<Option<Arc<Notify>>>,
}

impl MockRemote {
  pub fn new(items: Vec<Item>) -> Self {
    Self {
      project: sample_project(),
      items: Mutex::new(items),
      fetch_project_calls: AtomicU32::new(0),
      fetch_items_calls: AtomicU32::new(0),
      update_calls: AtomicU32::new(0),
      fail_fetch: AtomicBool::new(false),
      fail_updates: AtomicBool::new(false),
      pushed: Mutex::new(Vec::new()),
      gate: Mutex::new(None),
    }
  }

  pub fn with_project(mut self, project: ProjectSnapshot) -> Self {
    self.project = project;
    self
  }

  /// Make item fetches wait until the returned handle is notified.
  pub fn hold_fetches(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.gate.lock().unwrap() = Some(gate.clone());
    gate
  }
}

impl RemoteClient for MockRemote {
  fn fetch_project<'a>(
    &'a self,
    _project_id: &'a str,
  ) -> BoxFuture<'a, Result<ProjectSnapshot, RemoteError>> {
    Box::pin(async move {
      self.fetch_project_calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.project.clone())
    })
  }

  fn fetch_items<'a>(&'a self, _project_id: &'a str) -> BoxFuture<'a, Result<Vec<Item>, RemoteError>> {
    Box::pin(async move {
      self.fetch_items_calls.fetch_add(1, Ordering::SeqCst);
      let gate = self.gate.lock().unwrap().clone();
      if let Some(gate) = gate {
        gate.notified().await;
      }
      if self.fail_fetch.load(Ordering::SeqCst) {
        return Err(RemoteError::Network("connection refused".into()));
      }
      Ok(self.items.lock().unwrap().clone())
    })
  }

  fn update_single_select_field<'a>(
    &'a self,
    _project_id: &'a str,
    item_id: &'a str,
    _field_id: &'a str,
    option_id: &'a str,
  ) -> BoxFuture<'a, Result<(), RemoteError>> {
    Box::pin(async move {
      self.update_calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_updates.load(Ordering::SeqCst) {
        return Err(RemoteError::api(Some(500), "update rejected"));
      }

      let option = self
        .project
        .fields
        .iter()
        .flat_map(|f| f.options.iter())
        .find(|o| o.id == option_id)
        .cloned();
      let mut items = self.items.lock().unwrap();
      if let (Some(option), Some(item)) = (option, items.iter_mut().find(|i| i.id == item_id)) {
        item
          .field_values
          .insert("Status".into(), FieldValue::option(option.name, option.id));
      }
      self
        .pushed
        .lock()
        .unwrap()
        .push((item_id.to_string(), option_id.to_string()));
      Ok(())
    })
  }
}

/// Notifier that remembers every message.
#[derive(Default)]
pub struct RecordingNotifier {
  notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
  pub fn messages(&self) -> Vec<String> {
    self
      .notices
      .lock()
      .unwrap()
      .iter()
      .map(|n| n.message.clone())
      .collect()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notice: Notice) {
    self.notices.lock().unwrap().push(notice);
  }
}
