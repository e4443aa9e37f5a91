//! A learner's live schedule, backed by the persistence chain.
//!
//! `LearnerSession` is the in-process owner of one learner's `Scheduler`. Every
//! mutation is applied in memory first and then written through the
//! `FallbackChain`; a failed write is logged and remembered, never undone.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::domain::{LearningMode, MemoryStage, ScheduleState, VocabularyItem};
use crate::error::SchedulerError;
use crate::events::{ReviewListener, ReviewRecorded};
use crate::persistence::{FallbackChain, LoadSource};
use crate::srs::{select_practice_items, PracticeSelection, PracticeSource, Scheduler};

pub struct LearnerSession {
  learner_id: String,
  scheduler: Scheduler,
  chain: Arc<FallbackChain>,
  listeners: Vec<Arc<dyn ReviewListener>>,
  source: LoadSource,
  /// Warnings from the most recent load or write
  warnings: Vec<SchedulerError>,
  /// The most recent change reached no backend
  unsaved: bool,
}

impl LearnerSession {
  /// Restore the learner's table from the first backend that has one
  pub fn open(learner_id: &str, chain: Arc<FallbackChain>) -> Self {
    let outcome = chain.load(learner_id);
    Self {
      learner_id: learner_id.to_string(),
      scheduler: Scheduler::from_states(outcome.states),
      chain,
      listeners: Vec::new(),
      source: outcome.source,
      warnings: outcome.warnings,
      unsaved: false,
    }
  }

  pub fn with_listener(mut self, listener: impl ReviewListener + 'static) -> Self {
    self.listeners.push(Arc::new(listener));
    self
  }

  pub fn add_listener(&mut self, listener: Arc<dyn ReviewListener>) {
    self.listeners.push(listener);
  }

  pub fn learner_id(&self) -> &str {
    &self.learner_id
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  /// Which backend the table was restored from
  pub fn loaded_from(&self) -> &LoadSource {
    &self.source
  }

  /// True when the last load or write hit an unavailable backend
  pub fn persistence_degraded(&self) -> bool {
    !self.warnings.is_empty()
  }

  pub fn persistence_warnings(&self) -> &[SchedulerError] {
    &self.warnings
  }

  /// True when the latest change exists only in memory
  pub fn has_unsaved_changes(&self) -> bool {
    self.unsaved
  }

  /// Start tracking an item. No-op (and no write) if it is already tracked.
  pub fn initialize(&mut self, item_id: &str, now: DateTime<Utc>) -> bool {
    let created = self.scheduler.initialize(item_id, now);
    if created {
      tracing::debug!("{} started learning {}", self.learner_id, item_id);
      self.persist(now);
    }
    created
  }

  /// Record a review, notify listeners, then persist.
  ///
  /// Validation errors leave the table, listeners and storage untouched.
  pub fn record_review(
    &mut self,
    item_id: &str,
    quality: i64,
    time_spent_seconds: u32,
    now: DateTime<Utc>,
  ) -> Result<ScheduleState, SchedulerError> {
    let state = self
      .scheduler
      .record_review(item_id, quality, time_spent_seconds, now)?;

    let correct = state
      .history
      .last()
      .is_some_and(|event| event.quality.is_correct());
    let event = ReviewRecorded {
      item_id: item_id.to_string(),
      correct,
    };
    for listener in &self.listeners {
      listener.review_recorded(&event);
    }

    self.persist(now);
    Ok(state)
  }

  pub fn due(&self, as_of: DateTime<Utc>) -> Vec<&ScheduleState> {
    self.scheduler.due(as_of)
  }

  /// Due states resolved against the catalog, skipping ids it no longer has
  pub fn due_items<'c>(&self, catalog: &'c Catalog, as_of: DateTime<Utc>) -> Vec<&'c VocabularyItem> {
    self
      .scheduler
      .due(as_of)
      .into_iter()
      .filter_map(|state| catalog.get(&state.item_id))
      .collect()
  }

  /// Practice drill over tracked items, optionally limited to one learning mode
  pub fn practice_items<R: Rng + ?Sized>(
    &self,
    catalog: &Catalog,
    mode: Option<LearningMode>,
    source: PracticeSource,
    now: DateTime<Utc>,
    rng: &mut R,
  ) -> PracticeSelection {
    select_practice_items(&self.scheduler, catalog, mode, source, now, rng)
  }

  pub fn state(&self, item_id: &str) -> Option<&ScheduleState> {
    self.scheduler.get(item_id)
  }

  pub fn stage(&self, item_id: &str) -> MemoryStage {
    self.scheduler.stage(item_id)
  }

  pub fn average_quality(&self, item_id: &str) -> f64 {
    self.scheduler.average_quality(item_id)
  }

  /// Forget all progress, in memory and in every backend
  pub fn reset(&mut self) {
    self.scheduler.reset();
    self.warnings = self.chain.clear(&self.learner_id);
    self.unsaved = self.none_accepted();
    tracing::info!("Reset progress for {}", self.learner_id);
  }

  fn persist(&mut self, now: DateTime<Utc>) {
    self.warnings = self
      .chain
      .save(&self.learner_id, &self.scheduler.snapshot(), now);
    self.unsaved = self.none_accepted();
    for warning in &self.warnings {
      tracing::warn!("Schedule for {} not fully persisted: {}", self.learner_id, warning);
    }
  }

  fn none_accepted(&self) -> bool {
    self.warnings.len() >= self.chain.backend_names().len()
  }
}
