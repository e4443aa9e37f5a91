//! Item selection for free practice sessions.
//!
//! Practice never changes the schedule; it only decides which tracked items to
//! drill. The pool is every tracked item, narrowed to one learning mode when
//! asked. Sources then pick from that pool:
//! - `All`: the whole pool
//! - `Category`: one category of the pool, chosen at random
//! - `Weakest`: lowest average recall quality first
//! - `Recent`: reviewed within the last week, or the whole pool if nothing was

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::{BTreeSet, HashSet};

use super::scheduler::Scheduler;
use crate::catalog::Catalog;
use crate::config;
use crate::domain::{LearningMode, ScheduleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PracticeSource {
  #[default]
  All,
  Category,
  Weakest,
  Recent,
}

impl PracticeSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::All => "all",
      Self::Category => "category",
      Self::Weakest => "weakest",
      Self::Recent => "recent",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "all" => Some(Self::All),
      "category" => Some(Self::Category),
      "weakest" => Some(Self::Weakest),
      "recent" => Some(Self::Recent),
      _ => None,
    }
  }
}

/// Result of a practice selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PracticeSelection {
  /// Category drawn for `PracticeSource::Category`
  pub category: Option<String>,
  /// Shuffled, at most `PRACTICE_LIMIT` ids
  pub item_ids: Vec<String>,
}

/// Tracked states, sorted by id, restricted to `mode` when given.
///
/// With a mode, items the catalog does not know are left out.
pub fn practice_pool<'s>(
  scheduler: &'s Scheduler,
  catalog: &Catalog,
  mode: Option<LearningMode>,
) -> Vec<&'s ScheduleState> {
  let in_mode: Option<HashSet<&str>> =
    mode.map(|m| catalog.by_mode(m).into_iter().map(|item| item.id.as_str()).collect());

  let mut pool: Vec<&ScheduleState> = scheduler
    .states()
    .filter(|s| in_mode.as_ref().is_none_or(|ids| ids.contains(s.item_id.as_str())))
    .collect();
  pool.sort_by(|a, b| a.item_id.cmp(&b.item_id));
  pool
}

fn ids(states: &[&ScheduleState]) -> Vec<String> {
  states.iter().map(|s| s.item_id.clone()).collect()
}

/// Pool ordered by ascending average quality (neutral for no history), ties by id
pub fn rank_weakest(pool: &[&ScheduleState], limit: usize) -> Vec<String> {
  let mut scored: Vec<(f64, &str)> = pool
    .iter()
    .map(|s| {
      let score = s.average_quality().unwrap_or(config::NEUTRAL_AVERAGE_QUALITY);
      (score, s.item_id.as_str())
    })
    .collect();
  scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
  scored
    .into_iter()
    .take(limit)
    .map(|(_, id)| id.to_string())
    .collect()
}

/// Pool items reviewed within `window_days` before `now`
pub fn recent_items(pool: &[&ScheduleState], now: DateTime<Utc>, window_days: i64) -> Vec<String> {
  let since = now - Duration::days(window_days);
  pool
    .iter()
    .filter(|s| s.last_reviewed_at.is_some_and(|at| at >= since))
    .map(|s| s.item_id.clone())
    .collect()
}

/// Categories present in the pool, in name order
pub fn pool_categories(pool: &[&ScheduleState], catalog: &Catalog) -> Vec<String> {
  let categories: BTreeSet<&str> = pool
    .iter()
    .filter_map(|s| catalog.get(&s.item_id))
    .map(|item| item.category.as_str())
    .collect();
  categories.into_iter().map(str::to_string).collect()
}

/// Candidate pool for a source, before shuffling
pub fn candidates<R: Rng + ?Sized>(
  pool: &[&ScheduleState],
  catalog: &Catalog,
  source: PracticeSource,
  now: DateTime<Utc>,
  rng: &mut R,
) -> PracticeSelection {
  match source {
    PracticeSource::All => PracticeSelection {
      category: None,
      item_ids: ids(pool),
    },
    PracticeSource::Category => {
      let Some(category) = pool_categories(pool, catalog).choose(rng).cloned() else {
        return PracticeSelection::default();
      };
      let in_category: HashSet<&str> = catalog
        .by_category(&category)
        .into_iter()
        .map(|item| item.id.as_str())
        .collect();
      let item_ids = pool
        .iter()
        .filter(|s| in_category.contains(s.item_id.as_str()))
        .map(|s| s.item_id.clone())
        .collect();
      PracticeSelection {
        category: Some(category),
        item_ids,
      }
    }
    PracticeSource::Weakest => PracticeSelection {
      category: None,
      item_ids: rank_weakest(pool, config::WEAKEST_LIMIT),
    },
    PracticeSource::Recent => {
      let recent = recent_items(pool, now, config::RECENT_WINDOW_DAYS);
      PracticeSelection {
        category: None,
        item_ids: if recent.is_empty() { ids(pool) } else { recent },
      }
    }
  }
}

/// Shuffled practice list of at most `PRACTICE_LIMIT` item ids
pub fn select_practice_items<R: Rng + ?Sized>(
  scheduler: &Scheduler,
  catalog: &Catalog,
  mode: Option<LearningMode>,
  source: PracticeSource,
  now: DateTime<Utc>,
  rng: &mut R,
) -> PracticeSelection {
  let pool = practice_pool(scheduler, catalog, mode);
  let mut selection = candidates(&pool, catalog, source, now, rng);
  selection.item_ids.shuffle(rng);
  selection.item_ids.truncate(config::PRACTICE_LIMIT);
  selection
}
