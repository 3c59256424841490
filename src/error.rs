//! Error taxonomy for the synchronization layer.
//!
//! Three families matter to callers: client-side validation failures
//! (surfaced inline next to the offending input, no request is sent),
//! remote failures (non-2xx responses), and transport failures. The type
//! is `Clone` so results can flow through shared in-flight futures in the
//! request cache.

/// Errors produced by gateways, controllers, and the session guard.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
  /// A required-field or format check failed before any request was sent.
  /// `field` names the offending input so a form can render the message
  /// inline.
  #[error("invalid {field}: {message}")]
  Validation { field: &'static str, message: String },

  /// The remote service answered with a non-2xx status.
  #[error("remote error (status {status}): {message}")]
  Remote { status: u16, message: String },

  /// The request never produced a response (DNS, connect, TLS, body read).
  /// Indistinguishable from a generic remote failure for the user.
  #[error("network error: {0}")]
  Network(String),

  /// Configuration file missing or malformed.
  #[error("config error: {0}")]
  Config(String),

  /// The persisted token store could not be read or written.
  #[error("token store error: {0}")]
  TokenStore(String),

  /// A mutation was submitted while another one was still in flight on
  /// the same list or detail view. Rejected client-side, nothing was sent.
  #[error("a submission is already in flight")]
  SubmissionInFlight,

  /// A poll-driven fetch was discarded before its result arrived.
  #[error("fetch was cancelled")]
  Cancelled,
}

impl Error {
  /// Validation error constructor, used by draft checks.
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Error::Validation {
      field,
      message: message.into(),
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Error::Network(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_error_names_the_field() {
    let err = Error::validation("password", "required");
    assert_eq!(err.to_string(), "invalid password: required");
  }

  #[test]
  fn remote_error_carries_status() {
    let err = Error::Remote {
      status: 404,
      message: "no such invoice".into(),
    };
    assert!(err.to_string().contains("404"));
  }
}
