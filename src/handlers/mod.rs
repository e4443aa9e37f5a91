//! JSON API over learner sessions.

pub mod learners;
pub mod vocabulary;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};

use crate::error::SchedulerError;
use crate::state::AppState;

pub use learners::{due, initialize_item, item_detail, practice, record_review, reset};
pub use vocabulary::list_vocabulary;

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/vocabulary", get(list_vocabulary))
    .route("/learners/{learner}/items/{item}", get(item_detail))
    .route("/learners/{learner}/items/{item}/initialize", post(initialize_item))
    .route("/learners/{learner}/items/{item}/review", post(record_review))
    .route("/learners/{learner}/due", get(due))
    .route("/learners/{learner}/practice", get(practice))
    .route("/learners/{learner}/reset", post(reset))
    .with_state(state)
}

/// Handler failure, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
  Scheduler(SchedulerError),
  UnknownItem(String),
  BadRequest(String),
  /// Session work panicked or was cancelled
  Internal(String),
}

impl From<SchedulerError> for ApiError {
  fn from(err: SchedulerError) -> Self {
    Self::Scheduler(err)
  }
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::Scheduler(SchedulerError::InvalidQuality { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Scheduler(SchedulerError::NotInitialized { .. }) => StatusCode::NOT_FOUND,
      Self::Scheduler(SchedulerError::PersistenceUnavailable { .. }) => {
        StatusCode::SERVICE_UNAVAILABLE
      }
      Self::UnknownItem(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn message(&self) -> String {
    match self {
      Self::Scheduler(err) => err.to_string(),
      Self::UnknownItem(id) => format!("unknown vocabulary item '{}'", id),
      Self::BadRequest(msg) | Self::Internal(msg) => msg.clone(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("{}", self.message());
    } else {
      tracing::warn!("Rejected request: {}", self.message());
    }
    (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
  }
}

/// Run session work on the blocking pool.
///
/// Session access takes std mutexes and writes to SQLite and disk.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
  F: FnOnce() -> T + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(work)
    .await
    .map_err(|e| ApiError::Internal(format!("session task failed: {}", e)))
}

/// Persistence warnings as plain strings for response bodies
pub(crate) fn warning_messages(warnings: &[SchedulerError]) -> Vec<String> {
  warnings.iter().map(ToString::to_string).collect()
}
