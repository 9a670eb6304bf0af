//! User-facing notifications raised by the sync layer.

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Warning,
  Error,
}

/// Short message meant for a transient toast or status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Info,
      message: message.into(),
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Warning,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Error,
      message: message.into(),
    }
  }
}

/// Display surface for notices (status bar, toast, stderr...)
pub trait Notifier: Send + Sync {
  fn notify(&self, notice: Notice);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, notice: Notice) {
    match notice.level {
      NoticeLevel::Info => info!(message = %notice.message, "Notice"),
      NoticeLevel::Warning => warn!(message = %notice.message, "Notice"),
      NoticeLevel::Error => error!(message = %notice.message, "Notice"),
    }
  }
}
