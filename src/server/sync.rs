//! Change-log sync endpoints.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{auth::AuthUser, error::ApiError, AppState};
use crate::sync::SyncPage;

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    #[serde(default)]
    pub since: i64,
    /// Missing or out-of-range values use the configured default
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestResponse {
    pub latest_id: i64,
}

pub async fn get_changes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<SyncPage>, ApiError> {
    let page = state
        .sync
        .get_changes(&user.user_id, query.since, query.limit)
        .await?;
    Ok(Json(page))
}

pub async fn get_latest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LatestResponse>, ApiError> {
    let latest_id = state.sync.latest_id(&user.user_id).await?;
    Ok(Json(LatestResponse { latest_id }))
}
