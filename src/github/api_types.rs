//! Serde types matching GitHub GraphQL responses for Projects v2.
//!
//! These stay separate from the domain types so that the oddities of the
//! API (union fragments, nullable nodes) do not leak into the board model.

use serde::{Deserialize, Serialize};

use super::types::{Field, FieldOption, FieldType, FieldValue, Item, ProjectSnapshot};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V> {
  pub query: &'a str,
  pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
  pub data: Option<T>,
  #[serde(default)]
  pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
  pub message: String,
  #[serde(rename = "type")]
  pub error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPageInfo {
  pub has_next_page: bool,
  pub end_cursor: Option<String>,
}

/// A connection whose nodes may be null or empty fragments
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConnection<T> {
  #[serde(default = "Vec::new")]
  pub nodes: Vec<Option<T>>,
  pub page_info: Option<ApiPageInfo>,
}

// ============================================================================
// Project and fields
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProjectNodeData {
  pub node: Option<ApiProject>,
}

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  pub id: String,
  pub title: String,
  pub fields: ApiConnection<ApiField>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFieldOption {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiField {
  pub id: Option<String>,
  pub name: Option<String>,
  pub data_type: Option<String>,
  pub options: Option<Vec<ApiFieldOption>>,
}

impl ApiField {
  pub fn into_field(self) -> Option<Field> {
    let field_type = match self.data_type.as_deref() {
      Some("SINGLE_SELECT") => FieldType::SingleSelect,
      _ => FieldType::Other,
    };
    Some(Field {
      id: self.id?,
      name: self.name?,
      field_type,
      options: self
        .options
        .unwrap_or_default()
        .into_iter()
        .map(|o| FieldOption {
          id: o.id,
          name: o.name,
        })
        .collect(),
    })
  }
}

impl From<ApiProject> for ProjectSnapshot {
  fn from(project: ApiProject) -> Self {
    ProjectSnapshot {
      id: project.id,
      title: project.title,
      fields: project
        .fields
        .nodes
        .into_iter()
        .flatten()
        .filter_map(ApiField::into_field)
        .collect(),
    }
  }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ItemsNodeData {
  pub node: Option<ApiProjectItems>,
}

#[derive(Debug, Deserialize)]
pub struct ApiProjectItems {
  pub items: ApiConnection<ApiItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiItemContent {
  pub title: Option<String>,
  pub number: Option<u64>,
  pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFieldRef {
  pub name: Option<String>,
}

/// One field value; which members are set depends on the value's type
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFieldValue {
  pub name: Option<String>,
  pub option_id: Option<String>,
  pub text: Option<String>,
  pub number: Option<f64>,
  pub date: Option<String>,
  pub field: Option<ApiFieldRef>,
}

impl ApiFieldValue {
  fn into_entry(self) -> Option<(String, FieldValue)> {
    let field_name = self.field?.name?;
    let value = if let Some(option_id) = self.option_id {
      FieldValue::option(self.name.unwrap_or_default(), option_id)
    } else if let Some(text) = self.text {
      FieldValue::text(text)
    } else if let Some(number) = self.number {
      FieldValue::text(number.to_string())
    } else {
      FieldValue::text(self.date?)
    };
    Some((field_name, value))
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
  pub id: String,
  pub content: Option<ApiItemContent>,
  pub field_values: ApiConnection<ApiFieldValue>,
}

impl ApiItem {
  pub fn into_item(self) -> Item {
    let (title, number, url) = match self.content {
      Some(content) => (
        content.title.unwrap_or_default(),
        content.number,
        content.url,
      ),
      None => (String::new(), None, None),
    };

    Item {
      id: self.id,
      title,
      number,
      url,
      field_values: self
        .field_values
        .nodes
        .into_iter()
        .flatten()
        .filter_map(ApiFieldValue::into_entry)
        .collect(),
    }
  }
}

// ============================================================================
// Queries
// ============================================================================

pub const PROJECT_QUERY: &str = r#"
query($id: ID!) {
  node(id: $id) {
    ... on ProjectV2 {
      id
      title
      fields(first: 50) {
        nodes {
          ... on ProjectV2FieldCommon { id name dataType }
          ... on ProjectV2SingleSelectField { options { id name } }
        }
      }
    }
  }
}
"#;

pub const ITEMS_QUERY: &str = r#"
query($id: ID!, $cursor: String) {
  node(id: $id) {
    ... on ProjectV2 {
      items(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          content {
            ... on Issue { title number url }
            ... on PullRequest { title number url }
            ... on DraftIssue { title }
          }
          fieldValues(first: 20) {
            nodes {
              ... on ProjectV2ItemFieldSingleSelectValue {
                name optionId
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldTextValue {
                text
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldNumberValue {
                number
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldDateValue {
                date
                field { ... on ProjectV2FieldCommon { name } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

pub const UPDATE_SINGLE_SELECT_MUTATION: &str = r#"
mutation($project: ID!, $item: ID!, $field: ID!, $option: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $project
    itemId: $item
    fieldId: $field
    value: { singleSelectOptionId: $option }
  }) {
    projectV2Item { id }
  }
}
"#;
