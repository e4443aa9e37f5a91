//! Per-learner scheduling endpoints.
//!
//! Every handler runs against the learner's `LearnerSession` on the blocking
//! pool. Writes open and cache the session; reads of a learner with nothing
//! stored see an empty schedule without caching anything. Persistence
//! warnings are reported in the body and never change the status code.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LearningMode, MemoryStage, ScheduleState, VocabularyItem};
use crate::srs::PracticeSource;
use crate::state::AppState;

use super::{blocking, warning_messages, ApiError};

// ============================================================================
// Initialize
// ============================================================================

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    /// False when the item was already being tracked
    pub created: bool,
    pub state: ScheduleState,
    pub warnings: Vec<String>,
}

/// POST /learners/{learner}/items/{item}/initialize
pub async fn initialize_item(
    State(state): State<AppState>,
    Path((learner, item)): Path<(String, String)>,
) -> Result<Json<InitializeResponse>, ApiError> {
    if !state.catalog.contains(&item) {
        return Err(ApiError::UnknownItem(item));
    }

    blocking(move || {
        state.with_session(&learner, |session| -> Result<_, ApiError> {
            let created = session.initialize(&item, Utc::now());
            let current = session
                .state(&item)
                .cloned()
                .ok_or_else(|| ApiError::UnknownItem(item.clone()))?;
            Ok(Json(InitializeResponse {
                created,
                state: current,
                warnings: warning_messages(session.persistence_warnings()),
            }))
        })
    })
    .await?
}

// ============================================================================
// Review
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// 0-5; anything else is rejected with 422
    pub quality: i64,
    #[serde(default)]
    pub time_spent_seconds: u32,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub state: ScheduleState,
    pub stage: MemoryStage,
    pub warnings: Vec<String>,
}

/// POST /learners/{learner}/items/{item}/review
pub async fn record_review(
    State(state): State<AppState>,
    Path((learner, item)): Path<(String, String)>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    blocking(move || {
        state.with_session(&learner, |session| -> Result<_, ApiError> {
            // Taken under the session lock so concurrent reviews stay ordered
            let now = Utc::now();
            let updated =
                session.record_review(&item, request.quality, request.time_spent_seconds, now)?;
            tracing::debug!(
                "{} reviewed {} (q={}), next due {}",
                learner,
                item,
                request.quality,
                updated.next_review_due
            );
            Ok(Json(ReviewResponse {
                stage: updated.stage(),
                state: updated,
                warnings: warning_messages(session.persistence_warnings()),
            }))
        })
    })
    .await?
}

// ============================================================================
// Item detail
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ItemDetail {
    pub item_id: String,
    pub stage: MemoryStage,
    pub average_quality: f64,
    pub state: Option<ScheduleState>,
    pub vocabulary: Option<VocabularyItem>,
}

/// GET /learners/{learner}/items/{item}
pub async fn item_detail(
    State(state): State<AppState>,
    Path((learner, item)): Path<(String, String)>,
) -> Result<Json<ItemDetail>, ApiError> {
    let vocabulary = state.catalog.get(&item).cloned();
    let item_id = item.clone();
    let (schedule, stage, average_quality) = blocking(move || {
        state.read_session(&learner, |session| {
            (
                session.state(&item).cloned(),
                session.stage(&item),
                session.average_quality(&item),
            )
        })
    })
    .await?;

    if vocabulary.is_none() && schedule.is_none() {
        return Err(ApiError::UnknownItem(item_id));
    }

    Ok(Json(ItemDetail {
        item_id,
        stage,
        average_quality,
        state: schedule,
        vocabulary,
    }))
}

// ============================================================================
// Due
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DueQuery {
    /// RFC 3339; defaults to now
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DueItem {
    pub item_id: String,
    pub next_review_due: DateTime<Utc>,
    pub stage: MemoryStage,
    /// Absent when the catalog no longer carries the item
    pub vocabulary: Option<VocabularyItem>,
}

#[derive(Debug, Serialize)]
pub struct DueResponse {
    pub as_of: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<DueItem>,
    /// Earliest upcoming review when nothing else is due
    pub next_due_at: Option<DateTime<Utc>>,
}

/// GET /learners/{learner}/due?as_of=
pub async fn due(
    State(state): State<AppState>,
    Path(learner): Path<String>,
    Query(query): Query<DueQuery>,
) -> Result<Json<DueResponse>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(Utc::now);

    let (items, next_due_at) = blocking(move || {
        let catalog = &state.catalog;
        state.read_session(&learner, |session| {
            let items: Vec<DueItem> = session
                .due(as_of)
                .into_iter()
                .map(|s| DueItem {
                    item_id: s.item_id.clone(),
                    next_review_due: s.next_review_due,
                    stage: s.stage(),
                    vocabulary: catalog.get(&s.item_id).cloned(),
                })
                .collect();
            (items, session.scheduler().next_due_after(as_of))
        })
    })
    .await?;

    Ok(Json(DueResponse {
        as_of,
        count: items.len(),
        items,
        next_due_at,
    }))
}

// ============================================================================
// Practice
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PracticeQuery {
    /// "all", "category", "weakest" or "recent"
    pub source: Option<String>,
    /// "tech" or "life"; both when absent
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PracticeResponse {
    pub source: &'static str,
    pub mode: Option<&'static str>,
    /// The category drawn for the "category" source
    pub category: Option<String>,
    pub item_ids: Vec<String>,
}

/// GET /learners/{learner}/practice?source=&mode=
pub async fn practice(
    State(state): State<AppState>,
    Path(learner): Path<String>,
    Query(query): Query<PracticeQuery>,
) -> Result<Json<PracticeResponse>, ApiError> {
    let source = match query.source.as_deref() {
        Some(raw) => PracticeSource::from_str(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown practice source '{}'", raw)))?,
        None => PracticeSource::default(),
    };
    let mode = match query.mode.as_deref() {
        Some(raw) => Some(
            LearningMode::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown mode '{}'", raw)))?,
        ),
        None => None,
    };

    let selection = blocking(move || {
        state.read_session(&learner, |session| {
            let mut rng = rand::rng();
            session.practice_items(&state.catalog, mode, source, Utc::now(), &mut rng)
        })
    })
    .await?;

    Ok(Json(PracticeResponse {
        source: source.as_str(),
        mode: mode.map(|m| m.as_str()),
        category: selection.category,
        item_ids: selection.item_ids,
    }))
}

// ============================================================================
// Reset
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
    pub warnings: Vec<String>,
}

/// POST /learners/{learner}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(learner): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let warnings = blocking(move || {
        state.with_session(&learner, |session| {
            session.reset();
            warning_messages(session.persistence_warnings())
        })
    })
    .await?;

    Ok(Json(ResetResponse {
        reset: true,
        warnings,
    }))
}
