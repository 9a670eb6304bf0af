//! Local snapshot of one project and its derived board.

use indexmap::IndexMap;
use tracing::debug;

use super::columns;
use super::events::{Channel, EventBus, ModelEvent, Subscription};
use crate::github::types::{Column, Field, FieldValue, Item, ProjectSnapshot};

pub const DEFAULT_STATUS_FIELD: &str = "Status";

/// Authoritative in-process state of one project.
///
/// Every mutation recomputes the column partition before observers are
/// notified, so a callback never sees items and columns disagree.
pub struct ProjectModel {
  project: Option<ProjectSnapshot>,
  items: IndexMap<String, Item>,
  columns: Vec<Column>,
  status_field: Option<Field>,
  status_field_name: String,
  events: EventBus,
}

impl Default for ProjectModel {
  fn default() -> Self {
    Self::new()
  }
}

impl ProjectModel {
  pub fn new() -> Self {
    Self::with_status_field(DEFAULT_STATUS_FIELD)
  }

  /// Use a differently named single-select field for columns.
  pub fn with_status_field(name: impl Into<String>) -> Self {
    Self {
      project: None,
      items: IndexMap::new(),
      columns: columns::column_shells(None),
      status_field: None,
      status_field_name: name.into(),
      events: EventBus::new(),
    }
  }

  pub fn subscribe<F>(&self, channel: Channel, callback: F) -> Subscription
  where
    F: Fn(&ModelEvent) + Send + Sync + 'static,
  {
    self.events.subscribe(channel, callback)
  }

  pub fn events(&self) -> &EventBus {
    &self.events
  }

  fn recompute_columns(&mut self) {
    self.columns = columns::partition(self.status_field.as_ref(), self.items.values());
  }

  // Mutations

  pub fn set_project(&mut self, snapshot: ProjectSnapshot) {
    self.status_field =
      columns::find_status_field(&snapshot.fields, &self.status_field_name).cloned();
    self.project = Some(snapshot.clone());
    self.recompute_columns();
    debug!(
      project = %snapshot.id,
      columns = self.columns.len(),
      "Project snapshot replaced"
    );
    self.events.publish(&ModelEvent::ProjectUpdated(snapshot));
  }

  pub fn set_items(&mut self, items: Vec<Item>) {
    self.items.clear();
    for item in items {
      self.items.insert(item.id.clone(), item);
    }
    self.recompute_columns();
    self.events.publish(&ModelEvent::ItemsUpdated(self.items()));
  }

  /// Merge `fields` into an existing item. Unknown ids are ignored.
  pub fn update_item<I>(&mut self, id: &str, fields: I)
  where
    I: IntoIterator<Item = (String, FieldValue)>,
  {
    let Some(item) = self.items.get_mut(id) else {
      return;
    };
    item.field_values.extend(fields);
    let updated = item.clone();
    self.recompute_columns();
    self.events.publish(&ModelEvent::ItemUpdated(updated));
  }

  pub fn add_item(&mut self, item: Item) {
    self.items.insert(item.id.clone(), item.clone());
    self.recompute_columns();
    self.events.publish(&ModelEvent::ItemAdded(item));
  }

  pub fn remove_item(&mut self, id: &str) {
    let Some(removed) = self.items.shift_remove(id) else {
      return;
    };
    self.recompute_columns();
    self.events.publish(&ModelEvent::ItemRemoved(removed));
  }

  /// Optimistically move a card to another column.
  ///
  /// Returns `false` without touching anything when the card is unknown or
  /// the target is not an option of the status field. The fallback column is
  /// never a valid target.
  pub fn move_card(&mut self, card_id: &str, to_column_id: &str) -> bool {
    let Some(field) = self.status_field.as_ref() else {
      return false;
    };
    let Some(option) = field.options.iter().find(|o| o.id == to_column_id) else {
      return false;
    };
    let field_name = field.name.clone();
    let value = FieldValue::option(option.name.clone(), option.id.clone());
    let Some(item) = self.items.get_mut(card_id) else {
      return false;
    };

    item.field_values.insert(field_name, value);
    self.recompute_columns();
    self.events.publish(&ModelEvent::CardMoved {
      card_id: card_id.to_string(),
      to_column_id: to_column_id.to_string(),
    });
    true
  }

  pub fn clear(&mut self) {
    self.project = None;
    self.items.clear();
    self.status_field = None;
    self.columns = columns::column_shells(None);
    self.events.publish(&ModelEvent::StateCleared);
  }

  // Reads

  pub fn project(&self) -> Option<&ProjectSnapshot> {
    self.project.as_ref()
  }

  pub fn items(&self) -> Vec<Item> {
    self.items.values().cloned().collect()
  }

  pub fn item(&self, id: &str) -> Option<&Item> {
    self.items.get(id)
  }

  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  pub fn column_cards(&self, column_id: &str) -> &[Item] {
    self
      .columns
      .iter()
      .find(|c| c.id == column_id)
      .map(|c| c.cards.as_slice())
      .unwrap_or(&[])
  }

  pub fn status_field(&self) -> Option<&Field> {
    self.status_field.as_ref()
  }

  pub fn status_field_name(&self) -> &str {
    &self.status_field_name
  }

  /// Find a column by id, then by case-insensitive name.
  pub fn resolve_column(&self, id_or_name: &str) -> Option<&Column> {
    self
      .columns
      .iter()
      .find(|c| c.id == id_or_name)
      .or_else(|| {
        self
          .columns
          .iter()
          .find(|c| c.name.eq_ignore_ascii_case(id_or_name))
      })
  }

  /// Column currently holding `card_id`.
  pub fn column_of(&self, card_id: &str) -> Option<&Column> {
    self
      .columns
      .iter()
      .find(|c| c.cards.iter().any(|card| card.id == card_id))
  }
}
