//! Transactional item store.
//!
//! Every item mutation and the change record describing it are written in a
//! single SQLite transaction, so readers see both or neither. Write
//! transactions start with `BEGIN IMMEDIATE`: concurrent writers queue on the
//! database write lock (bounded by the connection busy timeout) instead of
//! failing when a read lock is upgraded.

use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;

use crate::db::{
    self, change_repo, item_repo, ChangeRepository, ItemRepository, StorageError, UserRepository,
};
use crate::models::{Item, NewItemChange, OperationType};

/// Outcome of a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeReceipt {
    /// Id of the change record written with the mutation.
    pub change_id: i64,
    pub operation: OperationType,
}

#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
    items: ItemRepository,
    changes: ChangeRepository,
    users: UserRepository,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            items: ItemRepository::new(pool.clone()),
            changes: ChangeRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Opens (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        tracing::info!("Opening database {}", path.display());
        let pool = db::init_db(path).await?;
        Ok(Self::new(pool))
    }

    pub fn items(&self) -> &ItemRepository {
        &self.items
    }

    pub fn changes(&self) -> &ChangeRepository {
        &self.changes
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Inserts or overwrites the item at (user_id, item.date) and records a
    /// `created` or `updated` change carrying the written state.
    pub async fn put_item(
        &self,
        user_id: &str,
        item: &Item,
        metadata: &[String],
    ) -> Result<ChangeReceipt, StorageError> {
        let mut tx = self.begin_write().await?;

        let existed = item_repo::find(&mut *tx, user_id, &item.date)
            .await?
            .is_some();
        item_repo::put(&mut *tx, user_id, item).await?;

        let operation = if existed {
            OperationType::Updated
        } else {
            OperationType::Created
        };
        let change_id = change_repo::append(
            &mut *tx,
            &NewItemChange {
                user_id,
                date: &item.date,
                operation_type: operation,
                item_snapshot: Some(item),
                metadata,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id,
            date = %item.date,
            change_id,
            %operation,
            "item saved"
        );

        Ok(ChangeReceipt {
            change_id,
            operation,
        })
    }

    /// Removes the item at (user_id, date) and records a `deleted` change
    /// carrying its last state.
    ///
    /// Returns [`StorageError::NotFound`] without writing anything when no
    /// such item exists.
    pub async fn delete_item(
        &self,
        user_id: &str,
        date: &str,
        metadata: &[String],
    ) -> Result<ChangeReceipt, StorageError> {
        let mut tx = self.begin_write().await?;

        // Dropping the transaction on NotFound rolls it back
        let snapshot = item_repo::find(&mut *tx, user_id, date)
            .await?
            .ok_or(StorageError::NotFound)?;
        item_repo::delete(&mut *tx, user_id, date).await?;

        let change_id = change_repo::append(
            &mut *tx,
            &NewItemChange {
                user_id,
                date,
                operation_type: OperationType::Deleted,
                item_snapshot: Some(&snapshot),
                metadata,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::debug!(user_id, date, change_id, "item deleted");

        Ok(ChangeReceipt {
            change_id,
            operation: OperationType::Deleted,
        })
    }

    /// Appends a change record on its own, without touching items.
    pub async fn create_change_record(
        &self,
        user_id: &str,
        date: &str,
        operation: OperationType,
        snapshot: Option<&Item>,
        metadata: &[String],
    ) -> Result<i64, StorageError> {
        let mut tx = self.begin_write().await?;
        let change_id = change_repo::append(
            &mut *tx,
            &NewItemChange {
                user_id,
                date,
                operation_type: operation,
                item_snapshot: snapshot,
                metadata,
            },
        )
        .await?;
        tx.commit().await?;
        Ok(change_id)
    }
}
