//! Entity store for diary items, keyed by (user_id, date).
//!
//! The free functions take any SQLite executor so they can run inside a
//! caller's transaction; [`ItemRepository`] serves reads from the pool.

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::StorageError;
use crate::models::{Item, SearchParams};

#[derive(sqlx::FromRow)]
struct ItemRow {
    date: String,
    title: String,
    body: String,
    tags: String,
}

impl TryFrom<ItemRow> for Item {
    type Error = StorageError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            date: row.date,
            title: row.title,
            body: row.body,
            tags: serde_json::from_str(&row.tags)?,
        })
    }
}

/// Fetches the item at (user_id, date), if any.
pub async fn find<'e, E>(executor: E, user_id: &str, date: &str) -> Result<Option<Item>, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<ItemRow> =
        sqlx::query_as("SELECT date, title, body, tags FROM items WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(date)
            .fetch_optional(executor)
            .await?;

    row.map(Item::try_from).transpose()
}

/// Inserts the item or overwrites title, body and tags of the existing row.
pub async fn put<'e, E>(executor: E, user_id: &str, item: &Item) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let tags = serde_json::to_string(&item.tags)?;

    sqlx::query(
        r#"
        INSERT INTO items (user_id, date, title, body, tags)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE
        SET title = excluded.title, body = excluded.body, tags = excluded.tags
        "#,
    )
    .bind(user_id)
    .bind(&item.date)
    .bind(&item.title)
    .bind(&item.body)
    .bind(&tags)
    .execute(executor)
    .await?;

    Ok(())
}

/// Removes the item and returns its last state.
pub async fn delete<'e, E>(executor: E, user_id: &str, date: &str) -> Result<Item, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<ItemRow> = sqlx::query_as(
        "DELETE FROM items WHERE user_id = ? AND date = ? RETURNING date, title, body, tags",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(executor)
    .await?;

    row.ok_or(StorageError::NotFound)?.try_into()
}

/// Escapes LIKE wildcards so the search text matches literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn filtered_query<'a>(
    select: &str,
    user_id: &'a str,
    params: &'a SearchParams,
) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(date) = params.date.as_deref().filter(|d| !d.is_empty()) {
        builder.push(" AND date = ").push_bind(date);
    }

    if let Some(text) = params.search_text.as_deref().filter(|t| !t.is_empty()) {
        // SQLite LIKE is case-insensitive for ASCII
        let pattern = like_pattern(text);
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR body LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if !params.tags.is_empty() {
        builder.push(" AND EXISTS (SELECT 1 FROM json_each(items.tags) WHERE json_each.value IN (");
        let mut values = builder.separated(", ");
        for tag in &params.tags {
            values.push_bind(tag.as_str());
        }
        values.push_unseparated("))");
    }

    builder
}

#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str, date: &str) -> Result<Item, StorageError> {
        find(&self.pool, user_id, date)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Lists the user's items matching `params`, newest date first, together
    /// with the number of matching items.
    pub async fn list(
        &self,
        user_id: &str,
        params: &SearchParams,
    ) -> Result<(Vec<Item>, i64), StorageError> {
        // Count and rows come from one read snapshot
        let mut tx = self.pool.begin().await?;

        let total: i64 = filtered_query("SELECT COUNT(*) FROM items", user_id, params)
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await?;

        let mut query = filtered_query("SELECT date, title, body, tags FROM items", user_id, params);
        query.push(" ORDER BY date DESC");
        let rows: Vec<ItemRow> = query.build_query_as().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(Item::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    /// Latest date strictly before `date` that has an item.
    pub async fn previous_date(&self, user_id: &str, date: &str) -> Result<String, StorageError> {
        sqlx::query_scalar(
            "SELECT date FROM items WHERE user_id = ? AND date < ? ORDER BY date DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }

    /// Earliest date strictly after `date` that has an item.
    pub async fn next_date(&self, user_id: &str, date: &str) -> Result<String, StorageError> {
        sqlx::query_scalar(
            "SELECT date FROM items WHERE user_id = ? AND date > ? ORDER BY date ASC LIMIT 1",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }
}
