mod changes;
mod config_cmd;
mod item;
mod user;

pub use changes::ChangesCommand;
pub use config_cmd::ConfigCommand;
pub use item::ItemCommand;
pub use user::UserCommand;

use clap::ValueEnum;
use diary::{Storage, StorageError};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Resolves a login to the user identifier the store is keyed by.
async fn resolve_user(
    storage: &Storage,
    login: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    match storage.users().get_user_id(login).await {
        Ok(user_id) => Ok(user_id),
        Err(StorageError::NotFound) => Err(format!("User not found: {}", login).into()),
        Err(e) => Err(e.into()),
    }
}
