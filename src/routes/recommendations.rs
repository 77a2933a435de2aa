use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::recommendations::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

use super::AppState;

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Query parameters of the recommendations endpoint
///
/// `countOnly=true` swaps the full page for its `{"count": n}` projection.
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default, rename = "countOnly")]
    pub count_only: bool,
}

/// Handler for GET /api/v1/users/:user_id/recommendations
///
/// An out-of-range `limit` is the only client error here; everything that
/// goes wrong deeper in the pipeline surfaces as a 200 whose body carries
/// an `error` field.
pub async fn recommendations_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Response> {
    if query.limit == 0 || query.limit > MAX_PAGE_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }

    if query.count_only {
        let count = state
            .engine
            .count_recommendations(&user_id, query.page, query.limit)
            .await;
        return Ok(Json(count).into_response());
    }

    let result = state
        .engine
        .get_recommendations(&user_id, query.page, query.limit)
        .await;
    Ok(Json(result).into_response())
}
