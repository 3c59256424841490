//! The `notify(kind, message)` side channel.
//!
//! Toast presentation belongs to the embedding shell; the sync layer only
//! reports mutation outcomes through this trait.

use std::sync::Mutex;

/// Outcome kind for a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
  Success,
  Error,
}

/// Receives mutation outcomes. Implemented by the embedding shell
/// (e.g. a toast container); the default implementation logs.
pub trait Notifier: Send + Sync {
  fn notify(&self, kind: NotifyKind, message: &str);
}

/// Default notifier that forwards to `tracing`.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    match kind {
      NotifyKind::Success => tracing::info!(target: "smartinvoice::notify", "{message}"),
      NotifyKind::Error => tracing::warn!(target: "smartinvoice::notify", "{message}"),
    }
  }
}

/// Test notifier that records every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  events: Mutex<Vec<(NotifyKind, String)>>,
}

impl RecordingNotifier {
  pub fn events(&self) -> Vec<(NotifyKind, String)> {
    self
      .events
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
      .clone()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    self
      .events
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
      .push((kind, message.to_string()));
  }
}
