//! Plain-text and JSON views of the board.

use serde::Serialize;

use crate::board::ProjectModel;
use crate::github::types::{Column, Item, PendingUpdate};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

fn card_label(item: &Item) -> String {
  let title = if item.title.is_empty() {
    "(untitled)"
  } else {
    item.title.as_str()
  };
  match item.number {
    Some(number) => format!("#{} {}", number, truncate(title, 60)),
    None => truncate(title, 60),
  }
}

/// Render every column with its cards. Cards with an unconfirmed edit are
/// marked with `*`.
pub fn render_board(model: &ProjectModel, pending: &[PendingUpdate]) -> String {
  let mut out = String::new();
  if let Some(project) = model.project() {
    out.push_str(&format!("{}\n", project.title));
  }

  for column in model.columns() {
    out.push_str(&format!("\n{} ({})\n", column.name, column.cards.len()));
    for card in &column.cards {
      let marker = if pending.iter().any(|p| p.item_id == card.id) {
        "*"
      } else {
        " "
      };
      out.push_str(&format!("  {} {}  [{}]\n", marker, card_label(card), card.id));
    }
  }

  out
}

#[derive(Serialize)]
struct BoardJson<'a> {
  project: Option<&'a str>,
  columns: &'a [Column],
  pending: Vec<&'a str>,
}

pub fn render_board_json(model: &ProjectModel, pending: &[PendingUpdate]) -> serde_json::Result<String> {
  serde_json::to_string_pretty(&BoardJson {
    project: model.project().map(|p| p.title.as_str()),
    columns: model.columns(),
    pending: pending.iter().map(|p| p.item_id.as_str()).collect(),
  })
}
