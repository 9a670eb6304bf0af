use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::RemoteError;
use crate::github::api_types::{
  GraphQlError, GraphQlRequest, GraphQlResponse, ItemsNodeData, ProjectNodeData, ITEMS_QUERY,
  PROJECT_QUERY, UPDATE_SINGLE_SELECT_MUTATION,
};
use crate::github::types::{Item, ProjectSnapshot};
use crate::retry::{with_retry, RetryPolicy};
use crate::sync::RemoteClient;

/// GitHub GraphQL API client for Projects v2
#[derive(Clone)]
pub struct GitHubClient {
  http: reqwest::Client,
  endpoint: Url,
  token: String,
  retry: RetryPolicy,
}

impl GitHubClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    let endpoint = config.github.endpoint()?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("ghkanban/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      token,
      retry: RetryPolicy::default(),
    })
  }

  /// Run one GraphQL operation and unwrap its `data`.
  async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T, RemoteError>
  where
    V: Serialize,
    T: DeserializeOwned,
  {
    let response = self
      .http
      .post(self.endpoint.clone())
      .bearer_auth(&self.token)
      .json(&GraphQlRequest { query, variables })
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(RemoteError::from_status(status.as_u16(), body.trim().to_string()));
    }

    let body: GraphQlResponse<T> = response.json().await?;
    if let Some(error) = body.errors.into_iter().next() {
      return Err(classify_graphql_error(error));
    }

    body
      .data
      .ok_or_else(|| RemoteError::api(None, "GraphQL response without data"))
  }

  /// Get project metadata and field definitions
  pub async fn get_project(&self, project_id: &str) -> Result<ProjectSnapshot, RemoteError> {
    let data: ProjectNodeData = self
      .graphql(PROJECT_QUERY, json!({ "id": project_id }))
      .await?;

    data
      .node
      .map(ProjectSnapshot::from)
      .ok_or_else(|| RemoteError::api(Some(404), format!("Project {} not found", project_id)))
  }

  /// Get every item of a project, following pagination
  pub async fn get_items(&self, project_id: &str) -> Result<Vec<Item>, RemoteError> {
    let mut all_items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
      let data: ItemsNodeData = self
        .graphql(ITEMS_QUERY, json!({ "id": project_id, "cursor": cursor }))
        .await?;

      let connection = data
        .node
        .ok_or_else(|| RemoteError::api(Some(404), format!("Project {} not found", project_id)))?
        .items;

      all_items.extend(connection.nodes.into_iter().flatten().map(|i| i.into_item()));

      match connection.page_info {
        Some(page) if page.has_next_page && page.end_cursor.is_some() => {
          cursor = page.end_cursor;
        }
        _ => break,
      }
    }

    debug!(project = project_id, items = all_items.len(), "Fetched project items");
    Ok(all_items)
  }

  /// Set a single-select field on one item
  pub async fn set_single_select(
    &self,
    project_id: &str,
    item_id: &str,
    field_id: &str,
    option_id: &str,
  ) -> Result<(), RemoteError> {
    let _: serde_json::Value = self
      .graphql(
        UPDATE_SINGLE_SELECT_MUTATION,
        json!({
          "project": project_id,
          "item": item_id,
          "field": field_id,
          "option": option_id,
        }),
      )
      .await?;
    Ok(())
  }
}

fn classify_graphql_error(error: GraphQlError) -> RemoteError {
  let status = match error.error_type.as_deref() {
    Some("NOT_FOUND") => Some(404),
    Some("FORBIDDEN") | Some("RATE_LIMITED") => Some(403),
    _ => None,
  };
  RemoteError::api(status, error.message)
}

impl RemoteClient for GitHubClient {
  fn fetch_project<'a>(
    &'a self,
    project_id: &'a str,
  ) -> BoxFuture<'a, Result<ProjectSnapshot, RemoteError>> {
    Box::pin(with_retry(self.retry, move || self.get_project(project_id)))
  }

  fn fetch_items<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, Result<Vec<Item>, RemoteError>> {
    Box::pin(with_retry(self.retry, move || self.get_items(project_id)))
  }

  // Writes are not retried here; the pending queue retries them.
  fn update_single_select_field<'a>(
    &'a self,
    project_id: &'a str,
    item_id: &'a str,
    field_id: &'a str,
    option_id: &'a str,
  ) -> BoxFuture<'a, Result<(), RemoteError>> {
    Box::pin(self.set_single_select(project_id, item_id, field_id, option_id))
  }
}
