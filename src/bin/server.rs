//! Diary Server
//!
//! Serves dated diary items and their change log over HTTP.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DIARY_CONFIG`: Path to config file (default: ~/.config/diary/config.yaml)
//! - `DIARY_PORT`: Port to listen on (default: 8080)
//! - `DIARY_DATABASE_PATH`: SQLite database (default: ~/.local/share/diary/diary.db)
//! - `DIARY_USERS`: Users to seed, as `login:hash,login:hash`
//!
//! # Config File Format
//!
//! ```yaml
//! users:
//!   - login: "alice"
//!     hashed_password: "$2y$..."
//! api_keys:
//!   - key: "your-secret-key-here"
//!     login: "alice"
//! sync:
//!   default_limit: 100
//!   max_limit: 1000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diary::server::{self, ApiKeyStore, AppState};
use diary::{Config, Storage, SyncReader};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diary=info,diary_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(std::env::var("DIARY_CONFIG").ok().map(PathBuf::from))?;

    match &config.config_file {
        Some(path) => tracing::info!("Config file: {}", path.display()),
        None => tracing::info!("No config file found, using defaults"),
    }
    tracing::info!(
        "Database: {} ({})",
        config.database_path.value.display(),
        config.database_path.source
    );

    let storage = Storage::open(&config.database_path.value).await?;

    for seed in &config.users {
        storage
            .users()
            .upsert_user(&seed.login, &seed.hashed_password)
            .await?;
    }

    let api_keys = ApiKeyStore::new(&config.api_keys);
    let sync = SyncReader::new(storage.changes().clone(), config.sync);
    let app = server::router(AppState::new(storage, sync, api_keys));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port.value));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
