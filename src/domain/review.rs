use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Self-rated recall quality for a single review, 0 (blackout) to 5 (perfect).
///
/// Only constructed through validation, so a `Quality` in hand is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
  pub const MAX: u8 = 5;

  /// Lowest quality that still counts as a successful recall
  pub const PASSING: u8 = 3;

  pub fn new(value: i64) -> Result<Self, SchedulerError> {
    match u8::try_from(value) {
      Ok(v) if v <= Self::MAX => Ok(Self(v)),
      _ => Err(SchedulerError::InvalidQuality { quality: value }),
    }
  }

  pub fn value(self) -> u8 {
    self.0
  }

  /// A review below `PASSING` is a lapse
  pub fn is_correct(self) -> bool {
    self.0 >= Self::PASSING
  }
}

impl TryFrom<i64> for Quality {
  type Error = SchedulerError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Quality> for u8 {
  fn from(quality: Quality) -> Self {
    quality.0
  }
}

/// One entry of an item's review history. Appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
  pub timestamp: DateTime<Utc>,
  pub quality: Quality,
  pub time_spent_seconds: u32,
}

impl ReviewEvent {
  pub fn new(timestamp: DateTime<Utc>, quality: Quality, time_spent_seconds: u32) -> Self {
    Self {
      timestamp,
      quality,
      time_spent_seconds,
    }
  }
}
