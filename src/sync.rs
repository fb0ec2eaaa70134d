//! Cursor-based reads over the change log.
//!
//! A client keeps the id of the last change it applied and asks for
//! everything after it. New changes always get larger ids, so chaining
//! `next_id` visits each record once, in order.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::db::{ChangeRepository, StorageError};
use crate::models::ItemChange;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Page size bounds for sync reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl SyncLimits {
    /// Non-positive or oversized limits fall back to the default.
    pub fn clamp(&self, limit: i64) -> i64 {
        if limit <= 0 || limit > self.max_limit {
            self.default_limit
        } else {
            limit
        }
    }
}

/// One page of changes.
///
/// `has_more` is set whenever the page came back full, so a history whose
/// length is an exact multiple of the limit ends with one empty page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPage {
    pub changes: Vec<ItemChange>,
    pub has_more: bool,
    /// Cursor for the next request; 0 when `has_more` is false.
    pub next_id: i64,
}

#[derive(Debug, Clone)]
pub struct SyncReader {
    changes: ChangeRepository,
    limits: SyncLimits,
}

impl SyncReader {
    pub fn new(changes: ChangeRepository, limits: SyncLimits) -> Self {
        Self { changes, limits }
    }

    pub fn limits(&self) -> SyncLimits {
        self.limits
    }

    /// Returns the user's changes with id greater than `since_id`.
    pub async fn get_changes(
        &self,
        user_id: &str,
        since_id: i64,
        limit: i64,
    ) -> Result<SyncPage, StorageError> {
        let start = Instant::now();
        tracing::info!(user_id, since = since_id, limit, "Sync request received");

        let limit = self.limits.clamp(limit);
        let since_id = since_id.max(0);

        let changes = match self.changes.since(user_id, since_id, limit).await {
            Ok(changes) => changes,
            Err(e) => {
                tracing::error!(
                    user_id,
                    since = since_id,
                    limit,
                    error = %e,
                    duration = ?start.elapsed(),
                    "Sync operation failed"
                );
                return Err(e);
            }
        };

        let has_more = changes.len() as i64 == limit;
        let next_id = if has_more {
            changes.last().map(|c| c.id).unwrap_or(0)
        } else {
            0
        };

        tracing::info!(
            user_id,
            since = since_id,
            limit,
            items = changes.len(),
            has_more,
            next_id,
            duration = ?start.elapsed(),
            "Sync completed"
        );

        Ok(SyncPage {
            changes,
            has_more,
            next_id,
        })
    }

    /// Id of the user's most recent change, 0 without history.
    pub async fn latest_id(&self, user_id: &str) -> Result<i64, StorageError> {
        self.changes.latest_id(user_id).await
    }
}
