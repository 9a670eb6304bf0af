//! Column partition derived from the status field.

use crate::github::types::{Column, Field, Item};

/// Id of the single column used when there is no status option to group by.
pub const FALLBACK_COLUMN_ID: &str = "__no_status";
pub const FALLBACK_COLUMN_NAME: &str = "No Status";

/// Find the single-select field with the given name.
pub fn find_status_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
  fields
    .iter()
    .find(|f| f.name == name && f.is_single_select())
}

/// Empty columns, one per status option in option order. A missing status
/// field or one without options yields the single fallback column.
pub fn column_shells(status_field: Option<&Field>) -> Vec<Column> {
  match status_field {
    Some(field) if !field.options.is_empty() => field
      .options
      .iter()
      .map(|option| Column {
        id: option.id.clone(),
        name: option.name.clone(),
        field_id: field.id.clone(),
        cards: Vec::new(),
      })
      .collect(),
    _ => vec![Column {
      id: FALLBACK_COLUMN_ID.to_string(),
      name: FALLBACK_COLUMN_NAME.to_string(),
      field_id: String::new(),
      cards: Vec::new(),
    }],
  }
}

/// Assign every item to exactly one column.
///
/// Items whose status option matches a column go there; everything else goes
/// to the first column.
pub fn partition<'a>(
  status_field: Option<&Field>,
  items: impl IntoIterator<Item = &'a Item>,
) -> Vec<Column> {
  let mut columns = column_shells(status_field);

  for item in items {
    let target = status_field
      .and_then(|field| item.field(&field.name))
      .and_then(|value| value.option_id.as_deref())
      .and_then(|option_id| columns.iter().position(|c| c.id == option_id))
      .unwrap_or(0);

    if let Some(column) = columns.get_mut(target) {
      column.cards.push(item.clone());
    }
  }

  columns
}
