//! Per-learner schedule table and the review update.
//!
//! `Scheduler` owns every `ScheduleState` for one learner. All mutation goes
//! through [`Scheduler::initialize`] and [`Scheduler::record_review`]; reads never
//! change state.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::sm2::calculate_sm2;
use crate::config;
use crate::domain::{MemoryStage, Quality, ReviewEvent, ScheduleState};
use crate::error::SchedulerError;

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
  states: HashMap<String, ScheduleState>,
}

impl Scheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a table from previously persisted states. Later duplicates win.
  pub fn from_states(states: impl IntoIterator<Item = ScheduleState>) -> Self {
    Self {
      states: states
        .into_iter()
        .map(|s| (s.item_id.clone(), s))
        .collect(),
    }
  }

  /// Put an item into the review pool, due at `now`.
  ///
  /// Returns false and leaves the existing state alone if the item is already tracked.
  pub fn initialize(&mut self, item_id: &str, now: DateTime<Utc>) -> bool {
    if self.states.contains_key(item_id) {
      return false;
    }
    self
      .states
      .insert(item_id.to_string(), ScheduleState::new(item_id, now));
    true
  }

  /// Apply one review and return the replacement state.
  ///
  /// Quality is validated before the lookup, so a bad rating never touches the table.
  /// A `now` earlier than the item's last review (clock stepped back, racing
  /// requests) is clamped to that review's time so history stays chronological.
  pub fn record_review(
    &mut self,
    item_id: &str,
    quality: i64,
    time_spent_seconds: u32,
    now: DateTime<Utc>,
  ) -> Result<ScheduleState, SchedulerError> {
    let quality = Quality::new(quality)?;
    let current = self
      .states
      .get(item_id)
      .ok_or_else(|| SchedulerError::NotInitialized {
        item_id: item_id.to_string(),
      })?;

    let now = match current.history.last() {
      Some(last) if last.timestamp > now => {
        tracing::warn!(
          "Review of {} at {} predates its last review at {}; clamping",
          item_id,
          now,
          last.timestamp
        );
        last.timestamp
      }
      _ => now,
    };

    let result = calculate_sm2(
      quality,
      current.ease_factor,
      current.interval,
      current.repetitions,
      now,
    );

    let mut history = current.history.clone();
    history.push(ReviewEvent::new(now, quality, time_spent_seconds));

    let next = ScheduleState {
      item_id: item_id.to_string(),
      ease_factor: result.ease_factor,
      interval: result.interval_days,
      repetitions: result.repetitions,
      next_review_due: result.next_review,
      last_reviewed_at: Some(now),
      history,
    };
    self.states.insert(item_id.to_string(), next.clone());
    Ok(next)
  }

  /// States due at `as_of`, earliest first (ties by item id).
  pub fn due(&self, as_of: DateTime<Utc>) -> Vec<&ScheduleState> {
    let mut due: Vec<&ScheduleState> = self.states.values().filter(|s| s.is_due(as_of)).collect();
    due.sort_by(|a, b| {
      a.next_review_due
        .cmp(&b.next_review_due)
        .then_with(|| a.item_id.cmp(&b.item_id))
    });
    due
  }

  pub fn due_ids(&self, as_of: DateTime<Utc>) -> Vec<String> {
    self.due(as_of).into_iter().map(|s| s.item_id.clone()).collect()
  }

  /// Earliest upcoming due time after `as_of`, if anything is scheduled
  pub fn next_due_after(&self, as_of: DateTime<Utc>) -> Option<DateTime<Utc>> {
    self
      .states
      .values()
      .map(|s| s.next_review_due)
      .filter(|due| *due > as_of)
      .min()
  }

  pub fn get(&self, item_id: &str) -> Option<&ScheduleState> {
    self.states.get(item_id)
  }

  pub fn contains(&self, item_id: &str) -> bool {
    self.states.contains_key(item_id)
  }

  /// Mean recall quality, or the neutral score when there is no history yet
  pub fn average_quality(&self, item_id: &str) -> f64 {
    self
      .states
      .get(item_id)
      .and_then(ScheduleState::average_quality)
      .unwrap_or(config::NEUTRAL_AVERAGE_QUALITY)
  }

  pub fn stage(&self, item_id: &str) -> MemoryStage {
    MemoryStage::of(self.states.get(item_id))
  }

  pub fn states(&self) -> impl Iterator<Item = &ScheduleState> {
    self.states.values()
  }

  /// All states sorted by item id, ready to persist
  pub fn snapshot(&self) -> Vec<ScheduleState> {
    let mut states: Vec<ScheduleState> = self.states.values().cloned().collect();
    states.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    states
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }

  /// Full progress reset: forget every item
  pub fn reset(&mut self) {
    self.states.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::MIN_EASE_FACTOR;
  use chrono::{Duration, TimeZone};
  use proptest::prelude::*;

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
  }

  fn day(n: i64) -> DateTime<Utc> {
    t0() + Duration::days(n)
  }

  #[test]
  fn test_initialize_defaults() {
    let mut scheduler = Scheduler::new();
    assert!(scheduler.initialize("word_1", t0()));

    let state = scheduler.get("word_1").unwrap();
    assert!((state.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(state.interval, 0);
    assert_eq!(state.repetitions, 0);
    assert_eq!(state.next_review_due, t0());
    assert!(state.last_reviewed_at.is_none());
    assert!(state.history.is_empty());
  }

  #[test]
  fn test_initialize_is_idempotent() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("word_1", t0());
    scheduler.record_review("word_1", 5, 10, t0()).unwrap();
    let before = scheduler.get("word_1").unwrap().clone();

    assert!(!scheduler.initialize("word_1", day(3)));
    assert_eq!(scheduler.get("word_1"), Some(&before));
    assert_eq!(scheduler.len(), 1);
  }

  #[test]
  fn test_word_1_scenario() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("word_1", t0());

    let s = scheduler.record_review("word_1", 5, 10, t0()).unwrap();
    assert!((s.ease_factor - 2.6).abs() < 1e-9);
    assert_eq!(s.interval, 1);
    assert_eq!(s.repetitions, 1);
    assert_eq!(s.next_review_due, day(1));
    assert_eq!(s.last_reviewed_at, Some(t0()));

    let s = scheduler.record_review("word_1", 5, 8, day(1)).unwrap();
    assert!((s.ease_factor - 2.7).abs() < 1e-9);
    assert_eq!(s.interval, 6);
    assert_eq!(s.repetitions, 2);
    assert_eq!(s.next_review_due, day(7));

    let s = scheduler.record_review("word_1", 1, 20, day(7)).unwrap();
    // 2.7 - 0.54
    assert!((s.ease_factor - 2.16).abs() < 1e-9);
    assert!(s.ease_factor >= MIN_EASE_FACTOR);
    assert_eq!(s.interval, 1);
    assert_eq!(s.repetitions, 0);
    assert_eq!(s.next_review_due, day(8));

    let qualities: Vec<u8> = s.history.iter().map(|e| e.quality.value()).collect();
    assert_eq!(qualities, vec![5, 5, 1]);
    let spent: Vec<u32> = s.history.iter().map(|e| e.time_spent_seconds).collect();
    assert_eq!(spent, vec![10, 8, 20]);
  }

  #[test]
  fn test_graduation_ladder() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("w", t0());

    let first = scheduler.record_review("w", 5, 1, t0()).unwrap();
    let second = scheduler.record_review("w", 5, 1, day(1)).unwrap();
    let third = scheduler.record_review("w", 5, 1, day(7)).unwrap();

    assert_eq!(first.interval, 1);
    assert_eq!(second.interval, 6);
    // Scaled by the ease factor produced by this same review
    assert_eq!(third.interval, (6.0 * third.ease_factor).round() as u32);
    assert_eq!(third.interval, 17);
  }

  #[test]
  fn test_earlier_review_is_clamped_to_last_review() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("w", t0());
    scheduler.record_review("w", 4, 3, day(2)).unwrap();

    let s = scheduler.record_review("w", 5, 3, day(2) - Duration::seconds(1)).unwrap();
    assert_eq!(s.history.len(), 2);
    assert_eq!(s.history[1].timestamp, day(2));
    assert_eq!(s.last_reviewed_at, Some(day(2)));
    assert_eq!(s.next_review_due, day(2) + Duration::days(6));
    assert!(crate::persistence::validate_states(&[s]).is_ok());
  }

  #[test]
  fn test_invalid_quality_leaves_state_unchanged() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("w", t0());
    scheduler.record_review("w", 4, 3, t0()).unwrap();
    let before = scheduler.get("w").unwrap().clone();

    let err = scheduler.record_review("w", 6, 3, day(1)).unwrap_err();
    assert_eq!(err, SchedulerError::InvalidQuality { quality: 6 });
    assert_eq!(scheduler.get("w"), Some(&before));

    assert!(scheduler.record_review("w", -1, 3, day(1)).is_err());
    assert_eq!(scheduler.get("w"), Some(&before));
  }

  #[test]
  fn test_review_uninitialized_item() {
    let mut scheduler = Scheduler::new();
    let err = scheduler.record_review("ghost", 4, 3, t0()).unwrap_err();
    assert_eq!(
      err,
      SchedulerError::NotInitialized {
        item_id: "ghost".to_string()
      }
    );
    assert!(scheduler.is_empty());
  }

  #[test]
  fn test_invalid_quality_checked_before_lookup() {
    let mut scheduler = Scheduler::new();
    let err = scheduler.record_review("ghost", 9, 3, t0()).unwrap_err();
    assert_eq!(err, SchedulerError::InvalidQuality { quality: 9 });
  }

  #[test]
  fn test_due_only_past_items() {
    let mut scheduler = Scheduler::from_states([
      ScheduleState {
        next_review_due: day(-1),
        ..ScheduleState::new("yesterday", day(-1))
      },
      ScheduleState {
        next_review_due: day(3),
        ..ScheduleState::new("later", day(0))
      },
    ]);
    assert_eq!(scheduler.due_ids(day(0)), vec!["yesterday".to_string()]);
    assert_eq!(scheduler.next_due_after(day(0)), Some(day(3)));

    scheduler.initialize("fresh", day(0));
    assert_eq!(
      scheduler.due_ids(day(0)),
      vec!["yesterday".to_string(), "fresh".to_string()]
    );
  }

  #[test]
  fn test_due_ordering_is_deterministic() {
    let mut scheduler = Scheduler::new();
    for id in ["c", "a", "b"] {
      scheduler.initialize(id, t0());
    }
    scheduler.initialize("early", day(-2));

    assert_eq!(scheduler.due_ids(t0()), vec!["early", "a", "b", "c"]);
  }

  #[test]
  fn test_average_quality_neutral_default() {
    let mut scheduler = Scheduler::new();
    assert_eq!(scheduler.average_quality("unknown"), 2.5);

    scheduler.initialize("w", t0());
    assert_eq!(scheduler.average_quality("w"), 2.5);

    scheduler.record_review("w", 4, 1, t0()).unwrap();
    scheduler.record_review("w", 1, 1, day(1)).unwrap();
    assert_eq!(scheduler.average_quality("w"), 2.5);
    scheduler.record_review("w", 5, 1, day(2)).unwrap();
    assert!((scheduler.average_quality("w") - 10.0 / 3.0).abs() < 1e-9);
  }

  #[test]
  fn test_stage_transitions() {
    let mut scheduler = Scheduler::new();
    assert_eq!(scheduler.stage("w"), MemoryStage::Unseen);

    scheduler.initialize("w", t0());
    assert_eq!(scheduler.stage("w"), MemoryStage::Learning);

    scheduler.record_review("w", 5, 1, t0()).unwrap();
    scheduler.record_review("w", 5, 1, day(1)).unwrap();
    assert_eq!(scheduler.stage("w"), MemoryStage::Young);

    scheduler.record_review("w", 5, 1, day(7)).unwrap();
    scheduler.record_review("w", 5, 1, day(24)).unwrap();
    assert_eq!(scheduler.stage("w"), MemoryStage::Mature);

    scheduler.record_review("w", 0, 1, day(80)).unwrap();
    assert_eq!(scheduler.stage("w"), MemoryStage::Learning);
  }

  #[test]
  fn test_snapshot_sorted_and_reset() {
    let mut scheduler = Scheduler::new();
    scheduler.initialize("b", t0());
    scheduler.initialize("a", t0());

    let ids: Vec<String> = scheduler.snapshot().into_iter().map(|s| s.item_id).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let restored = Scheduler::from_states(scheduler.snapshot());
    assert_eq!(restored.len(), 2);

    scheduler.reset();
    assert!(scheduler.is_empty());
    assert!(scheduler.due(day(100)).is_empty());
  }

  fn reviews() -> impl Strategy<Value = Vec<(i64, u32)>> {
    prop::collection::vec((0i64..=5, 0u32..600), 1..40)
  }

  proptest! {
    #[test]
    fn prop_ease_never_below_floor(seq in reviews()) {
      let mut scheduler = Scheduler::new();
      scheduler.initialize("w", t0());
      for (i, (quality, spent)) in seq.iter().enumerate() {
        let s = scheduler.record_review("w", *quality, *spent, day(i as i64)).unwrap();
        prop_assert!(s.ease_factor >= MIN_EASE_FACTOR);
      }
    }

    #[test]
    fn prop_consecutive_blackouts_hit_floor(n in 1usize..60) {
      let mut scheduler = Scheduler::new();
      scheduler.initialize("w", t0());
      for i in 0..n {
        let s = scheduler.record_review("w", 0, 0, day(i as i64)).unwrap();
        prop_assert!(s.ease_factor >= MIN_EASE_FACTOR);
      }
    }

    #[test]
    fn prop_lapse_resets(prefix in reviews(), lapse in 0i64..3) {
      let mut scheduler = Scheduler::new();
      scheduler.initialize("w", t0());
      for (i, (quality, spent)) in prefix.iter().enumerate() {
        scheduler.record_review("w", *quality, *spent, day(i as i64)).unwrap();
      }
      let at = day(prefix.len() as i64);
      let s = scheduler.record_review("w", lapse, 0, at).unwrap();
      prop_assert_eq!(s.repetitions, 0);
      prop_assert_eq!(s.interval, 1);
      prop_assert_eq!(s.next_review_due, at + Duration::days(1));
    }

    #[test]
    fn prop_history_append_only(seq in reviews()) {
      let mut scheduler = Scheduler::new();
      scheduler.initialize("w", t0());
      let mut previous: Vec<ReviewEvent> = Vec::new();
      for (i, (quality, spent)) in seq.iter().enumerate() {
        let s = scheduler.record_review("w", *quality, *spent, day(i as i64)).unwrap();
        prop_assert_eq!(s.history.len(), i + 1);
        prop_assert_eq!(&s.history[..i], &previous[..]);
        let last = &s.history[i];
        prop_assert_eq!(i64::from(last.quality.value()), *quality);
        prop_assert_eq!(last.time_spent_seconds, *spent);
        prop_assert!(s.history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        previous = s.history.clone();
      }
    }

    #[test]
    fn prop_repetitions_count_successes_since_lapse(seq in reviews()) {
      let mut scheduler = Scheduler::new();
      scheduler.initialize("w", t0());
      let mut streak = 0u32;
      for (i, (quality, spent)) in seq.iter().enumerate() {
        let s = scheduler.record_review("w", *quality, *spent, day(i as i64)).unwrap();
        streak = if *quality < 3 { 0 } else { streak + 1 };
        prop_assert_eq!(s.repetitions, streak);
        prop_assert!(s.interval >= 1);
      }
    }

    #[test]
    fn prop_due_set_matches_definition(
      offsets in prop::collection::vec(-30i64..30, 0..20),
      as_of_offset in -30i64..30,
      unknown in prop::collection::vec("[x-z]{1,4}", 0..5),
    ) {
      let states: Vec<ScheduleState> = offsets
        .iter()
        .enumerate()
        .map(|(i, off)| ScheduleState {
          next_review_due: day(*off),
          ..ScheduleState::new(format!("item{i}"), t0())
        })
        .collect();
      let scheduler = Scheduler::from_states(states.clone());
      let as_of = day(as_of_offset);

      let due = scheduler.due_ids(as_of);
      for state in &states {
        prop_assert_eq!(due.contains(&state.item_id), state.next_review_due <= as_of);
      }
      for id in &unknown {
        prop_assert!(!due.contains(id));
      }
      prop_assert_eq!(&due, &scheduler.due_ids(as_of));
      let dues: Vec<DateTime<Utc>> = scheduler.due(as_of).iter().map(|s| s.next_review_due).collect();
      prop_assert!(dues.windows(2).all(|w| w[0] <= w[1]));
    }
  }
}
