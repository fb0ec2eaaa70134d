use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sync::SyncLimits;

const DEFAULT_PORT: u16 = 8080;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// A user created or updated when the server starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSeed {
    pub login: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
}

/// Maps a bearer API key to a login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    #[serde(skip_serializing)]
    pub key: String,
    pub login: String,
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// HTTP port for the server
    pub port: ConfigValue<u16>,
    /// Page size bounds for sync reads
    pub sync: SyncLimits,
    pub users: Vec<UserSeed>,
    pub api_keys: Vec<ApiKeyEntry>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    port: Option<u16>,
    sync: Option<SyncLimits>,
    users: Vec<UserSeed>,
    api_keys: Vec<ApiKeyEntry>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("diary.db"),
            ConfigSource::Default,
        );
        let mut port = ConfigValue::new(DEFAULT_PORT, ConfigSource::Default);
        let mut sync = SyncLimits::default();
        let mut users = Vec::new();
        let mut api_keys = Vec::new();
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(p) = file_config.port {
                port = ConfigValue::new(p, ConfigSource::File);
            }
            if let Some(limits) = file_config.sync {
                sync = limits;
            }
            users = file_config.users;
            api_keys = file_config.api_keys;
        }

        if let Some(db_path) = env("DIARY_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(p) = env("DIARY_PORT") {
            let parsed = p
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue("DIARY_PORT", p.clone()))?;
            port = ConfigValue::new(parsed, ConfigSource::Environment);
        }
        if let Some(list) = env("DIARY_USERS") {
            users.extend(parse_user_list(&list)?);
        }

        if sync.default_limit <= 0 || sync.default_limit > sync.max_limit {
            return Err(ConfigError::InvalidValue(
                "sync.default_limit",
                sync.default_limit.to_string(),
            ));
        }

        Ok(Self {
            database_path,
            port,
            sync,
            users,
            api_keys,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/diary/
    /// - macOS: ~/Library/Application Support/diary/
    /// - Windows: %APPDATA%/diary/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diary")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/diary/
    /// - macOS: ~/Library/Application Support/diary/
    /// - Windows: %APPDATA%/diary/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diary")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Parses `login:hash,login:hash`.
fn parse_user_list(list: &str) -> Result<Vec<UserSeed>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((login, hash)) if !login.is_empty() && !hash.is_empty() && !hash.contains(':') => {
                Ok(UserSeed {
                    login: login.to_string(),
                    hashed_password: hash.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidValue("DIARY_USERS", entry.to_string())),
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("diary.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.port.value, 8080);
        assert_eq!(config.sync, SyncLimits::default());
        assert!(config.users.is_empty());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "port: 9000").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  default_limit: 50").unwrap();
        writeln!(file, "users:").unwrap();
        writeln!(file, "  - login: alice").unwrap();
        writeln!(file, "    hashed_password: secret-hash").unwrap();
        writeln!(file, "api_keys:").unwrap();
        writeln!(file, "  - key: k1").unwrap();
        writeln!(file, "    login: alice").unwrap();

        let config = Config::load_with_env(Some(config_path.clone()), no_env).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.port.value, 9000);
        assert_eq!(config.sync.default_limit, 50);
        assert_eq!(config.sync.max_limit, 1000);
        assert_eq!(config.users[0].login, "alice");
        assert_eq!(config.api_keys[0].key, "k1");
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_database_path_resolves_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: data/diary.db\n").unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/diary.db")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "port: 9000\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("DIARY_PORT", "7000"),
            ("DIARY_DATABASE_PATH", "/env/diary.db"),
            ("DIARY_USERS", "alice:h1, bob:h2"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::load_with_env(Some(config_path), |k| env.get(k).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.port.value, 7000);
        assert_eq!(config.port.source, ConfigSource::Environment);
        assert_eq!(config.database_path.value, PathBuf::from("/env/diary.db"));
        let logins: Vec<&str> = config.users.iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["alice", "bob"]);
        assert_eq!(config.users[1].hashed_password, "h2");
    }

    #[test]
    fn test_invalid_env_values() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("none.yaml");

        let result = Config::load_with_env(Some(config_path.clone()), |k| {
            (k == "DIARY_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue("DIARY_PORT", _))));

        let result = Config::load_with_env(Some(config_path), |k| {
            (k == "DIARY_USERS").then(|| "alice".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue("DIARY_USERS", _))));
    }

    #[test]
    fn test_invalid_sync_limits() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "sync:\n  default_limit: 5000\n").unwrap();

        let result = Config::load_with_env(Some(config_path), no_env);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("sync.default_limit", _))
        ));
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load_with_env(Some(config_path), no_env);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "users:\n  - login: alice\n    hashed_password: topsecret\napi_keys:\n  - key: k1\n    login: alice\n",
        )
        .unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("topsecret"));
        assert!(!json.contains("k1"));
        assert!(json.contains("alice"));
    }
}
