use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::StorageError;
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    login: String,
    hashed_password: String,
    start_date: String,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| StorageError::InvalidData(format!("user id {}: {}", row.id, e)))?,
            login: row.login,
            hashed_password: row.hashed_password,
            start_date: DateTime::parse_from_rfc3339(&row.start_date)?.with_timezone(&Utc),
        })
    }
}

/// Login identities. Credentials are stored opaquely; verifying them is the
/// auth layer's concern.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        login: &str,
        hashed_password: &str,
    ) -> Result<User, StorageError> {
        match self.get_user_id(login).await {
            Ok(_) => return Err(StorageError::AlreadyExists(login.to_string())),
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let user = User::new(login, hashed_password);

        sqlx::query(
            "INSERT INTO users (id, login, hashed_password, start_date) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.login)
        .bind(&user.hashed_password)
        .bind(user.start_date.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(StorageError::NotFound)?.try_into()
    }

    /// Resolves a login to the user identifier that owns items.
    pub async fn get_user_id(&self, login: &str) -> Result<String, StorageError> {
        sqlx::query_scalar("SELECT id FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Saves changes to an existing user. The login must still belong to the
    /// same id.
    pub async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let existing_id = self.get_user_id(&user.login).await?;
        let expected = user.id.to_string();
        if existing_id != expected {
            tracing::error!(
                expected = %expected,
                actual = %existing_id,
                "user ID mismatch"
            );
            return Err(StorageError::UserIdMismatch {
                expected,
                actual: existing_id,
            });
        }

        sqlx::query("UPDATE users SET hashed_password = ?, start_date = ? WHERE id = ?")
            .bind(&user.hashed_password)
            .bind(user.start_date.to_rfc3339_opts(SecondsFormat::Micros, true))
            .bind(&expected)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Creates the user, or replaces the password of an existing one.
    pub async fn upsert_user(
        &self,
        login: &str,
        hashed_password: &str,
    ) -> Result<User, StorageError> {
        match self.get_user_id(login).await {
            Ok(user_id) => {
                tracing::info!("Updating password for user {:?}", login);
                let mut user = self.get_user(&user_id).await?;
                user.hashed_password = hashed_password.to_string();
                self.put_user(&user).await?;
                Ok(user)
            }
            Err(StorageError::NotFound) => {
                tracing::info!("Creating user {:?}", login);
                let user = self.create_user(login, hashed_password).await?;
                tracing::info!("User {:?} created with ID {}", login, user.id);
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY login")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
