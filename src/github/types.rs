use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of a project field. Only single-select fields can drive columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
  SingleSelect,
  Other,
}

/// One option of a single-select field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
  pub id: String,
  pub name: String,
}

/// Project field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
  pub id: String,
  pub name: String,
  pub field_type: FieldType,
  #[serde(default)]
  pub options: Vec<FieldOption>,
}

impl Field {
  pub fn is_single_select(&self) -> bool {
    self.field_type == FieldType::SingleSelect
  }
}

/// Project metadata and field definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
  pub id: String,
  pub title: String,
  pub fields: Vec<Field>,
}

/// Value of one field on an item. `option_id` is set for single-select values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
  pub value: String,
  pub option_id: Option<String>,
}

impl FieldValue {
  pub fn text(value: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      option_id: None,
    }
  }

  pub fn option(name: impl Into<String>, option_id: impl Into<String>) -> Self {
    Self {
      value: name.into(),
      option_id: Some(option_id.into()),
    }
  }
}

/// A project item (issue, pull request or draft), keyed by field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub id: String,
  pub title: String,
  pub number: Option<u64>,
  pub url: Option<String>,
  pub field_values: IndexMap<String, FieldValue>,
}

impl Item {
  pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      number: None,
      url: None,
      field_values: IndexMap::new(),
    }
  }

  /// Builder-style helper to set a field value.
  pub fn with_field(mut self, field_name: impl Into<String>, value: FieldValue) -> Self {
    self.field_values.insert(field_name.into(), value);
    self
  }

  pub fn field(&self, field_name: &str) -> Option<&FieldValue> {
    self.field_values.get(field_name)
  }
}

/// Board column derived from a status field option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
  pub id: String,
  pub name: String,
  pub field_id: String,
  pub cards: Vec<Item>,
}

/// A local edit waiting to be confirmed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingUpdate {
  pub project_id: String,
  pub item_id: String,
  pub field_id: String,
  pub option_id: String,
}
