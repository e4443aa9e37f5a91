//! Review-recorded notifications.
//!
//! Consumers such as an XP tracker subscribe with a [`ReviewListener`]. The
//! notification is informational only: nothing a listener does can change a
//! schedule.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecorded {
  pub item_id: String,
  /// quality >= 3
  pub correct: bool,
}

pub trait ReviewListener: Send + Sync {
  fn review_recorded(&self, event: &ReviewRecorded);
}

impl<F> ReviewListener for F
where
  F: Fn(&ReviewRecorded) + Send + Sync,
{
  fn review_recorded(&self, event: &ReviewRecorded) {
    self(event)
  }
}

/// Writes every review to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl ReviewListener for LogListener {
  fn review_recorded(&self, event: &ReviewRecorded) {
    tracing::debug!(item_id = %event.item_id, correct = event.correct, "review recorded");
  }
}
