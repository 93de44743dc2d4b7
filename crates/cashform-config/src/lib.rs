//! Configuration management for cashform
//!
//! Loads and validates the YAML server configuration, and owns the
//! easy-button shortcut file.

pub mod error;
pub mod easy_buttons;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use easy_buttons::{validate_easy_buttons, EasyButton, EasyButtonStore, EasyButtons};
pub use error::{ConfigError, ConfigErrorSeverity, ConfigResult};

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Single-user login. Without it every route is open.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Login credentials for the single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    /// Argon2 PHC string, as printed by `cashform --hash-password`
    pub password_hash: String,
}

/// Ledger location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the ledger (and the git checkout when syncing with git)
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// Ledger file name inside `path`
    #[serde(default = "default_book_file")]
    pub book_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            book_file: default_book_file(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_book_file() -> String {
    "book.beancount".to_string()
}

/// Easy-button file location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EasyButtonsConfig {
    /// Defaults to `easy-buttons.yml` next to the ledger
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Where the ledger file is mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Local,
    Git,
    ObjectStorage,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Local => write!(f, "local"),
            SyncMode::Git => write!(f, "git"),
            SyncMode::ObjectStorage => write!(f, "object_storage"),
        }
    }
}

/// Git sync settings. The data directory is the working tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote to clone from when the data directory is not a checkout yet
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_git_remote")]
    pub remote: String,
    #[serde(default = "default_git_branch")]
    pub branch: String,
    #[serde(default = "default_git_user_name")]
    pub user_name: String,
    #[serde(default = "default_git_user_email")]
    pub user_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote: default_git_remote(),
            branch: default_git_branch(),
            user_name: default_git_user_name(),
            user_email: default_git_user_email(),
        }
    }
}

fn default_git_remote() -> String {
    "origin".to_string()
}

fn default_git_branch() -> String {
    "main".to_string()
}

fn default_git_user_name() -> String {
    "cashform".to_string()
}

fn default_git_user_email() -> String {
    "cashform@localhost".to_string()
}

/// S3-compatible object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    #[serde(default)]
    pub bucket: String,
    /// Object key, defaults to the book file name
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Delete the local copy after a successful upload
    #[serde(default = "default_true")]
    pub cleanup_local: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key: None,
            endpoint: None,
            region: None,
            cleanup_local: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub object_storage: ObjectStorageConfig,
}

/// Transaction listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsConfig {
    /// Number of recent transactions to list, 0 lists all
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
        }
    }
}

fn default_list_limit() -> usize {
    50
}

/// Currency used for new transactions and display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    #[serde(default = "default_currency_code")]
    pub code: String,
    #[serde(default = "default_currency_symbol")]
    pub symbol: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: default_currency_code(),
            symbol: default_currency_symbol(),
        }
    }
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub easy_buttons: EasyButtonsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub transactions: TransactionsConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and validate
    pub fn load(path: PathBuf) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::from_io(e, &path))?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without touching the environment or validating
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })
    }

    /// Apply `CASHFORM_*` environment variables on top of the file values
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CASHFORM_DATA_DIR") {
            self.data.path = PathBuf::from(dir);
        }
        if let Some(file) = lookup("CASHFORM_BOOK_FILE") {
            self.data.book_file = file;
        }
        if let Some(path) = lookup("CASHFORM_EASY_BUTTONS") {
            self.easy_buttons.path = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("CASHFORM_NUM_TRANSACTIONS") {
            self.transactions.list_limit = limit.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "CASHFORM_NUM_TRANSACTIONS".to_string(),
                reason: format!("'{}' is not a non-negative integer", limit),
            })?;
        }
        if let Some(level) = lookup("CASHFORM_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if let Some(auth) = &self.server.auth {
            if auth.username.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "server.auth.username".to_string(),
                });
            }
            if auth.password_hash.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "server.auth.password_hash".to_string(),
                });
            }
            if !auth.password_hash.starts_with("$argon2") {
                return Err(ConfigError::InvalidValue {
                    field: "server.auth.password_hash".to_string(),
                    reason: "Expected an argon2 hash, generate one with `cashform --hash-password`".to_string(),
                });
            }
        }

        if self.data.book_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "data.book_file".to_string(),
            });
        }

        if self.currency.code.trim().is_empty() || self.currency.code.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "currency.code".to_string(),
                reason: "Currency code must be a single word such as USD".to_string(),
            });
        }

        if self.sync.mode == SyncMode::ObjectStorage && self.sync.object_storage.bucket.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "sync.object_storage.bucket".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Log level must be one of {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// The default configuration file shipped with the binary
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Full path to the ledger file
    pub fn ledger_path(&self) -> PathBuf {
        self.data.path.join(&self.data.book_file)
    }

    /// Full path to the easy-button file
    pub fn easy_buttons_path(&self) -> PathBuf {
        match &self.easy_buttons.path {
            Some(path) => path.clone(),
            None => self.data.path.join("easy-buttons.yml"),
        }
    }

    /// Object key for the ledger when syncing with object storage
    pub fn object_key(&self) -> String {
        self.sync
            .object_storage
            .key
            .clone()
            .unwrap_or_else(|| self.data.book_file.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data.path
    }
}
