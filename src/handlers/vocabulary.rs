//! Vocabulary catalog browsing.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::domain::{LearningMode, VocabularyItem};
use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct VocabularyQuery {
    /// "tech" or "life"
    pub mode: Option<String>,
    pub category: Option<String>,
}

/// GET /vocabulary?mode=&category=
pub async fn list_vocabulary(
    State(state): State<AppState>,
    Query(query): Query<VocabularyQuery>,
) -> Result<Json<Vec<VocabularyItem>>, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(raw) => Some(
            LearningMode::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown mode '{}'", raw)))?,
        ),
        None => None,
    };

    let catalog = &state.catalog;
    let matches: Vec<&VocabularyItem> = match (mode, query.category.as_deref()) {
        (Some(mode), Some(category)) => catalog
            .by_category(category)
            .into_iter()
            .filter(|item| item.mode == mode)
            .collect(),
        (Some(mode), None) => catalog.by_mode(mode),
        (None, Some(category)) => catalog.by_category(category),
        (None, None) => catalog.items().iter().collect(),
    };
    let items = matches.into_iter().cloned().collect();

    Ok(Json(items))
}
