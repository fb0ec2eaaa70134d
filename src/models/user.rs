use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A login identity. Its id, in string form, is the user identifier that
/// owns items and change records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    /// Opaque to the store; produced and checked by the auth layer.
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub start_date: DateTime<Utc>,
}

impl User {
    pub fn new(login: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            login: login.into(),
            hashed_password: hashed_password.into(),
            start_date: Utc::now(),
        }
    }
}
