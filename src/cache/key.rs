//! Cache keys for project queries.

/// Remote reads that go through the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheKey {
  /// Project metadata and field definitions
  Project { project_id: String },
  /// Full item list of a project
  Items { project_id: String },
}

impl CacheKey {
  pub fn project(project_id: &str) -> Self {
    Self::Project {
      project_id: project_id.to_string(),
    }
  }

  pub fn items(project_id: &str) -> Self {
    Self::Items {
      project_id: project_id.to_string(),
    }
  }

  /// Stable string key used by the cache map.
  pub fn as_key(&self) -> String {
    match self {
      Self::Project { project_id } => format!("project:{}", project_id),
      Self::Items { project_id } => format!("items:{}", project_id),
    }
  }

  /// All keys belonging to one project.
  pub fn all_for(project_id: &str) -> [CacheKey; 2] {
    [Self::project(project_id), Self::items(project_id)]
  }
}

impl std::fmt::Display for CacheKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Project { project_id } => write!(f, "project {}", project_id),
      Self::Items { project_id } => write!(f, "items of project {}", project_id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_are_distinct_per_kind() {
    let project = CacheKey::project("PVT_1").as_key();
    let items = CacheKey::items("PVT_1").as_key();
    assert_ne!(project, items);
    assert_eq!(items, "items:PVT_1");
  }

  #[test]
  fn test_all_for_covers_both_kinds() {
    let keys = CacheKey::all_for("PVT_2");
    assert!(keys.contains(&CacheKey::project("PVT_2")));
    assert!(keys.contains(&CacheKey::items("PVT_2")));
  }
}
