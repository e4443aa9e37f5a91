use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::ReviewEvent;
use crate::config;

/// Per-item scheduling state, keyed by vocabulary item id.
///
/// The serialized form (camelCase) is the persisted record shared by every
/// storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
  pub item_id: String,
  pub ease_factor: f64,
  /// Days to wait before the next review
  pub interval: u32,
  /// Consecutive successful reviews since the last lapse
  pub repetitions: u32,
  pub next_review_due: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_reviewed_at: Option<DateTime<Utc>>,
  /// Chronological, append-only
  #[serde(default)]
  pub history: Vec<ReviewEvent>,
}

impl ScheduleState {
  /// Fresh state for an item entering the review pool: due immediately.
  pub fn new(item_id: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      item_id: item_id.into(),
      ease_factor: config::DEFAULT_EASE_FACTOR,
      interval: 0,
      repetitions: 0,
      next_review_due: now,
      last_reviewed_at: None,
      history: Vec::new(),
    }
  }

  pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
    self.next_review_due <= as_of
  }

  /// Mean quality over the history, `None` if never reviewed
  pub fn average_quality(&self) -> Option<f64> {
    if self.history.is_empty() {
      return None;
    }
    let sum: u32 = self.history.iter().map(|e| u32::from(e.quality.value())).sum();
    Some(sum as f64 / self.history.len() as f64)
  }

  pub fn stage(&self) -> MemoryStage {
    MemoryStage::of(Some(self))
  }
}

/// Descriptive label for where an item sits in the schedule. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStage {
  Unseen,
  Learning,
  Young,
  Mature,
}

impl MemoryStage {
  pub fn of(state: Option<&ScheduleState>) -> Self {
    match state {
      None => Self::Unseen,
      Some(s) if s.repetitions < 2 => Self::Learning,
      Some(s) if s.interval < config::MATURE_INTERVAL_DAYS => Self::Young,
      Some(_) => Self::Mature,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unseen => "unseen",
      Self::Learning => "learning",
      Self::Young => "young",
      Self::Mature => "mature",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "unseen" => Some(Self::Unseen),
      "learning" => Some(Self::Learning),
      "young" => Some(Self::Young),
      "mature" => Some(Self::Mature),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Quality;
  use chrono::{Duration, TimeZone};

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
  }

  fn event(quality: i64) -> ReviewEvent {
    ReviewEvent::new(t0(), Quality::new(quality).unwrap(), 5)
  }

  #[test]
  fn test_new_defaults() {
    let state = ScheduleState::new("word_1", t0());
    assert_eq!(state.item_id, "word_1");
    assert!((state.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(state.interval, 0);
    assert_eq!(state.repetitions, 0);
    assert_eq!(state.next_review_due, t0());
    assert!(state.last_reviewed_at.is_none());
    assert!(state.history.is_empty());
  }

  #[test]
  fn test_is_due_boundary() {
    let state = ScheduleState::new("w", t0());
    assert!(state.is_due(t0()));
    assert!(state.is_due(t0() + Duration::seconds(1)));
    assert!(!state.is_due(t0() - Duration::seconds(1)));
  }

  #[test]
  fn test_average_quality() {
    let mut state = ScheduleState::new("w", t0());
    assert_eq!(state.average_quality(), None);

    state.history.push(event(5));
    state.history.push(event(2));
    assert_eq!(state.average_quality(), Some(3.5));
  }

  #[test]
  fn test_stage_progression() {
    assert_eq!(MemoryStage::of(None), MemoryStage::Unseen);

    let mut state = ScheduleState::new("w", t0());
    assert_eq!(state.stage(), MemoryStage::Learning);

    state.repetitions = 2;
    state.interval = 6;
    assert_eq!(state.stage(), MemoryStage::Young);

    state.repetitions = 4;
    state.interval = 40;
    assert_eq!(state.stage(), MemoryStage::Mature);

    // Lapse drops back to learning regardless of interval
    state.repetitions = 0;
    state.interval = 1;
    assert_eq!(state.stage(), MemoryStage::Learning);
  }

  #[test]
  fn test_stage_as_str_roundtrip() {
    for stage in [
      MemoryStage::Unseen,
      MemoryStage::Learning,
      MemoryStage::Young,
      MemoryStage::Mature,
    ] {
      assert_eq!(MemoryStage::from_str(stage.as_str()), Some(stage));
    }
    assert_eq!(MemoryStage::from_str("Mature"), None);
  }

  #[test]
  fn test_persisted_shape() {
    let mut state = ScheduleState::new("word_1", t0());
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["itemId"], "word_1");
    assert_eq!(json["interval"], 0);
    assert_eq!(json["nextReviewDue"], "2025-01-10T09:00:00Z");
    assert!(json.get("lastReviewedAt").is_none());
    assert_eq!(json["history"], serde_json::json!([]));

    state.last_reviewed_at = Some(t0());
    state.history.push(event(4));
    let text = serde_json::to_string(&state).unwrap();
    let back: ScheduleState = serde_json::from_str(&text).unwrap();
    assert_eq!(back, state);
  }
}
