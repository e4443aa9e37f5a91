use chrono::{DateTime, Duration, Utc};

use crate::config::MIN_EASE_FACTOR;
use crate::domain::Quality;

pub struct Sm2Result {
  pub ease_factor: f64,
  pub interval_days: u32,
  pub repetitions: u32,
  pub next_review: DateTime<Utc>,
}

/// Updated ease factor for a review of the given quality, floored at `MIN_EASE_FACTOR`.
pub fn next_ease_factor(quality: Quality, current_ease_factor: f64) -> f64 {
  let q = f64::from(quality.value());

  // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  (current_ease_factor + ease_delta).max(MIN_EASE_FACTOR)
}

/// `now` plus whole days, saturating at the latest representable instant.
pub fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
  Duration::try_days(i64::from(days))
    .and_then(|d| now.checked_add_signed(d))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn calculate_sm2(
  quality: Quality,
  current_ease_factor: f64,
  current_interval: u32,
  current_repetitions: u32,
  now: DateTime<Utc>,
) -> Sm2Result {
  let new_ease_factor = next_ease_factor(quality, current_ease_factor);

  let (new_interval, new_repetitions) = if !quality.is_correct() {
    // Lapse: see it again tomorrow
    (1, 0)
  } else {
    let repetitions = current_repetitions.saturating_add(1);
    let interval = match repetitions {
      1 => 1,
      2 => 6,
      // Float-to-int `as` saturates on overflow
      _ => (f64::from(current_interval) * new_ease_factor).round() as u32,
    };
    (interval, repetitions)
  };

  Sm2Result {
    ease_factor: new_ease_factor,
    interval_days: new_interval,
    repetitions: new_repetitions,
    next_review: add_days(now, new_interval),
  }
}
