use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{auth::AuthUser, error::ApiError, AppState};
use crate::db::StorageError;
use crate::models::{normalize_tags, Item, SearchParams};

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Client provenance recorded on the change log entry
    #[serde(default)]
    pub metadata: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Comma-separated metadata for the change log entry
    pub metadata: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    /// Comma-separated tags; an item matches if it has any of them
    pub tags: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<Item>,
    pub total_count: i64,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| normalize_tags(&v.split(',').collect::<Vec<_>>()))
        .unwrap_or_default()
}

fn optional(result: Result<String, StorageError>) -> Result<Option<String>, StorageError> {
    match result {
        Ok(date) => Ok(Some(date)),
        Err(StorageError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn with_navigation(
    state: &AppState,
    user_id: &str,
    item: Item,
) -> Result<ItemResponse, ApiError> {
    let items = state.storage.items();
    let previous_date = optional(items.previous_date(user_id, &item.date).await)?;
    let next_date = optional(items.next_date(user_id, &item.date).await)?;
    Ok(ItemResponse {
        item,
        previous_date,
        next_date,
    })
}

/// Returns the item for a date, or an empty placeholder when there is none.
pub async fn get_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ItemResponse>, ApiError> {
    tracing::info!(user_id = %user.user_id, date = %query.date, "Getting item");

    let item = match state.storage.items().get(&user.user_id, &query.date).await {
        Ok(item) => item,
        Err(StorageError::NotFound) => Item::empty(&query.date),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(with_navigation(&state, &user.user_id, item).await?))
}

pub async fn put_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    if request.date.trim().is_empty() {
        return Err(ApiError::BadRequest("date is required".to_string()));
    }

    tracing::info!(user_id = %user.user_id, date = %request.date, "Saving item");

    let item = Item::new(request.date, request.title)
        .with_body(request.body)
        .with_tags(normalize_tags(&request.tags));

    state
        .storage
        .put_item(&user.user_id, &item, &request.metadata)
        .await?;

    Ok(Json(with_navigation(&state, &user.user_id, item).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(user_id = %user.user_id, date = %date, "Deleting item");

    let metadata = split_list(query.metadata.as_deref());
    state
        .storage
        .delete_item(&user.user_id, &date, &metadata)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = SearchParams {
        date: query.date,
        search_text: query.search,
        tags: split_list(query.tags.as_deref()),
    };

    let (items, total_count) = state.storage.items().list(&user.user_id, &params).await?;

    Ok(Json(SearchResponse { items, total_count }))
}
