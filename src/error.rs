//! Errors raised by the remote project service.

use thiserror::Error;

/// Failure of a remote call.
///
/// The variants are ordered by precedence: a response that is both an
/// authentication failure and a transport failure is reported as `Auth`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
  /// Credentials were rejected
  #[error("authentication failed: {0}")]
  Auth(String),

  /// The request never produced a response
  #[error("network error: {0}")]
  Network(String),

  /// The service answered with an error
  #[error("{message}")]
  Api {
    status: Option<u16>,
    message: String,
  },

  #[error("{0}")]
  Other(String),
}

impl RemoteError {
  pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
    Self::Api {
      status,
      message: message.into(),
    }
  }

  /// Authentication failures are never retried.
  pub fn is_auth(&self) -> bool {
    matches!(self, Self::Auth(_))
  }

  /// Short message suitable for a transient user notification.
  pub fn user_message(&self) -> String {
    match self {
      Self::Auth(_) => "Authentication failed: invalid token".to_string(),
      Self::Network(_) => "Network error: check your connection".to_string(),
      Self::Api { status, message } => match status {
        Some(401) => "Invalid token".to_string(),
        Some(403) => "Rate limited or insufficient permission".to_string(),
        Some(404) => "Resource not found".to_string(),
        _ => message.clone(),
      },
      Self::Other(message) => message.clone(),
    }
  }

  /// Build an error from an HTTP status and body text.
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    if status == 401 {
      Self::Auth(message)
    } else {
      Self::api(Some(status), message)
    }
  }
}

impl From<reqwest::Error> for RemoteError {
  fn from(e: reqwest::Error) -> Self {
    if e.status().map(|s| s.as_u16()) == Some(401) {
      Self::Auth(e.to_string())
    } else if e.is_connect() || e.is_timeout() || e.is_request() {
      Self::Network(e.to_string())
    } else if let Some(status) = e.status() {
      Self::api(Some(status.as_u16()), e.to_string())
    } else if e.is_decode() {
      Self::api(None, format!("invalid response: {}", e))
    } else {
      Self::Other(e.to_string())
    }
  }
}
