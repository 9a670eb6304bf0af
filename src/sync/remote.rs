//! The remote operations the sync core depends on.

use futures::future::BoxFuture;

use crate::error::RemoteError;
use crate::github::types::{Item, ProjectSnapshot};

/// Remote source of truth for a project board.
///
/// Pagination and transport details stay inside the implementation.
pub trait RemoteClient: Send + Sync {
  /// Project metadata and field definitions.
  fn fetch_project<'a>(&'a self, project_id: &'a str)
    -> BoxFuture<'a, Result<ProjectSnapshot, RemoteError>>;

  /// Every item of the project.
  fn fetch_items<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, Result<Vec<Item>, RemoteError>>;

  /// Set a single-select field of one item.
  fn update_single_select_field<'a>(
    &'a self,
    project_id: &'a str,
    item_id: &'a str,
    field_id: &'a str,
    option_id: &'a str,
  ) -> BoxFuture<'a, Result<(), RemoteError>>;
}
