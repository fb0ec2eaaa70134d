//! Append-only change log for diary items.
//!
//! Record ids come from SQLite's `AUTOINCREMENT`, so they are strictly
//! increasing across the whole log and never reused, even after restarts.
//! Id 0 is never assigned and serves as the "no history" cursor.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use super::StorageError;
use crate::models::{Item, ItemChange, NewItemChange, OperationType};

#[derive(sqlx::FromRow)]
struct ChangeRow {
    id: i64,
    user_id: String,
    date: String,
    operation: String,
    timestamp: String,
    item_date: Option<String>,
    item_title: Option<String>,
    item_body: Option<String>,
    item_tags: Option<String>,
    metadata: String,
}

impl TryFrom<ChangeRow> for ItemChange {
    type Error = StorageError;

    fn try_from(row: ChangeRow) -> Result<Self, Self::Error> {
        let operation_type = row
            .operation
            .parse::<OperationType>()
            .map_err(StorageError::InvalidData)?;

        let item_snapshot = match row.item_date {
            Some(date) => Some(Item {
                date,
                title: row.item_title.unwrap_or_default(),
                body: row.item_body.unwrap_or_default(),
                tags: match row.item_tags {
                    Some(tags) => serde_json::from_str(&tags)?,
                    None => Vec::new(),
                },
            }),
            None => None,
        };

        Ok(ItemChange {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            operation_type,
            timestamp: DateTime::parse_from_rfc3339(&row.timestamp)?.with_timezone(&Utc),
            item_snapshot,
            metadata: serde_json::from_str(&row.metadata)?,
        })
    }
}

/// Appends a change record and returns its assigned id.
///
/// Must run on the same transaction as the item write it describes.
pub async fn append<'e, E>(executor: E, change: &NewItemChange<'_>) -> Result<i64, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let metadata = serde_json::to_string(change.metadata)?;
    let snapshot_tags = change
        .item_snapshot
        .map(|item| serde_json::to_string(&item.tags))
        .transpose()?;

    let result = sqlx::query(
        r#"
        INSERT INTO item_changes
            (user_id, date, operation, timestamp, item_date, item_title, item_body, item_tags, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(change.user_id)
    .bind(change.date)
    .bind(change.operation_type.as_str())
    .bind(&timestamp)
    .bind(change.item_snapshot.map(|item| item.date.as_str()))
    .bind(change.item_snapshot.map(|item| item.title.as_str()))
    .bind(change.item_snapshot.map(|item| item.body.as_str()))
    .bind(snapshot_tags)
    .bind(&metadata)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

#[derive(Debug, Clone)]
pub struct ChangeRepository {
    pool: SqlitePool,
}

impl ChangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Highest change id recorded for the user, or 0 without history.
    pub async fn latest_id(&self, user_id: &str) -> Result<i64, StorageError> {
        let latest: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM item_changes WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    /// Up to `limit` of the user's changes with id greater than `since_id`,
    /// in ascending id order.
    pub async fn since(
        &self,
        user_id: &str,
        since_id: i64,
        limit: i64,
    ) -> Result<Vec<ItemChange>, StorageError> {
        let rows: Vec<ChangeRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, date, operation, timestamp,
                   item_date, item_title, item_body, item_tags, metadata
            FROM item_changes
            WHERE user_id = ? AND id > ?
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(since_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ItemChange::try_from).collect()
    }
}
