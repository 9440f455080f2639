//! Configuration module for sharegate.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SharegateError};

/// Minimum number of random bytes in a share token (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Password attempts allowed per share token per minute.
    #[serde(default = "default_password_attempts")]
    pub password_attempts_per_minute: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_password_attempts() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            password_attempts_per_minute: default_password_attempts(),
        }
    }
}

/// Owner authentication configuration.
///
/// Bearer tokens are issued elsewhere; sharegate only verifies them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to verify owner bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/sharegate.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Upload and share constraint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Allowed file extensions (lowercase, without the dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Expiration applied when the uploader does not pick one.
    #[serde(default = "default_expiration_hours")]
    pub default_expiration_hours: u32,
    /// Longest expiration an uploader may request.
    #[serde(default = "default_max_expiration_hours")]
    pub max_expiration_hours: u32,
    /// Largest download limit an uploader may request.
    #[serde(default = "default_max_download_limit")]
    pub max_download_limit: i64,
}

fn default_storage_path() -> String {
    "data/blobs".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        "zip", "rar", "7z", "mp4", "mp3", "avi", "mov", "wmv", "csv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_expiration_hours() -> u32 {
    24
}

fn default_max_expiration_hours() -> u32 {
    720 // 30 days
}

fn default_max_download_limit() -> i64 {
    10000
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            allowed_extensions: default_allowed_extensions(),
            default_expiration_hours: default_expiration_hours(),
            max_expiration_hours: default_max_expiration_hours(),
            max_download_limit: default_max_download_limit(),
        }
    }
}

/// Share token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Number of random bytes per share token.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

fn default_token_bytes() -> usize {
    32
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            token_bytes: default_token_bytes(),
        }
    }
}

/// Lifecycle sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background sweeper runs.
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    /// Interval between sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// Maximum records examined per sweep phase.
    #[serde(default = "default_sweep_batch_size")]
    pub batch_size: i64,
    /// Delete blobs of inactive records.
    #[serde(default = "default_reclaim_blobs")]
    pub reclaim_blobs: bool,
    /// Seconds a record must have been inactive before its blob is deleted.
    #[serde(default = "default_reclaim_grace")]
    pub reclaim_grace_secs: u64,
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_sweep_batch_size() -> i64 {
    500
}

fn default_reclaim_blobs() -> bool {
    true
}

fn default_reclaim_grace() -> u64 {
    3600 // 1 hour
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_secs: default_sweep_interval(),
            batch_size: default_sweep_batch_size(),
            reclaim_blobs: default_reclaim_blobs(),
            reclaim_grace_secs: default_reclaim_grace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/sharegate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Owner authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload and share constraint configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Share token configuration.
    #[serde(default)]
    pub share: ShareConfig,
    /// Lifecycle sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SharegateError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SharegateError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SHAREGATE_JWT_SECRET`: Override the owner token secret
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("SHAREGATE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(SharegateError::Validation(
                "jwt_secret is not set. \
                 Set it in config.toml or via SHAREGATE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.share.token_bytes < MIN_TOKEN_BYTES {
            return Err(SharegateError::Validation(format!(
                "share.token_bytes must be at least {MIN_TOKEN_BYTES}"
            )));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(SharegateError::Validation(
                "sweeper.interval_secs must be positive".to_string(),
            ));
        }
        if self.files.max_expiration_hours < self.files.default_expiration_hours {
            return Err(SharegateError::Validation(
                "files.max_expiration_hours is below files.default_expiration_hours".to_string(),
            ));
        }
        if self.files.max_download_limit < 1 {
            return Err(SharegateError::Validation(
                "files.max_download_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.server.password_attempts_per_minute, 10);

        assert!(config.auth.jwt_secret.is_empty());

        assert_eq!(config.database.path, "data/sharegate.db");

        assert_eq!(config.files.storage_path, "data/blobs");
        assert_eq!(config.files.max_upload_size_mb, 100);
        assert_eq!(config.files.max_upload_bytes(), 100 * 1024 * 1024);
        assert!(config.files.allowed_extensions.contains(&"pdf".to_string()));
        assert_eq!(config.files.allowed_extensions.len(), 21);
        assert_eq!(config.files.default_expiration_hours, 24);
        assert_eq!(config.files.max_expiration_hours, 720);
        assert_eq!(config.files.max_download_limit, 10000);

        assert_eq!(config.share.token_bytes, 32);

        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_secs, 300);
        assert_eq!(config.sweeper.batch_size, 500);
        assert!(config.sweeper.reclaim_blobs);
        assert_eq!(config.sweeper.reclaim_grace_secs, 3600);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/sharegate.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
cors_origins = ["http://localhost:3000"]
password_attempts_per_minute = 3

[auth]
jwt_secret = "test-secret-key"

[database]
path = "custom/db.sqlite"

[files]
storage_path = "custom/blobs"
max_upload_size_mb = 20
allowed_extensions = ["txt", "bin"]
default_expiration_hours = 12
max_expiration_hours = 48
max_download_limit = 50

[share]
token_bytes = 24

[sweeper]
enabled = false
interval_secs = 60
batch_size = 10
reclaim_blobs = false
reclaim_grace_secs = 120

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.server.password_attempts_per_minute, 3);

        assert_eq!(config.auth.jwt_secret, "test-secret-key");
        assert_eq!(config.database.path, "custom/db.sqlite");

        assert_eq!(config.files.storage_path, "custom/blobs");
        assert_eq!(config.files.max_upload_size_mb, 20);
        assert_eq!(config.files.allowed_extensions, vec!["txt", "bin"]);
        assert_eq!(config.files.default_expiration_hours, 12);
        assert_eq!(config.files.max_expiration_hours, 48);
        assert_eq!(config.files.max_download_limit, 50);

        assert_eq!(config.share.token_bytes, 24);

        assert!(!config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_secs, 60);
        assert_eq!(config.sweeper.batch_size, 10);
        assert!(!config.sweeper.reclaim_blobs);
        assert_eq!(config.sweeper.reclaim_grace_secs, 120);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000

[sweeper]
interval_secs = 30
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.sweeper.interval_secs, 30);

        // Defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/sharegate.db");
        assert_eq!(config.share.token_bytes, 32);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.files.default_expiration_hours, 24);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(SharegateError::Validation(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(SharegateError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides_jwt_secret() {
        let original = std::env::var("SHAREGATE_JWT_SECRET").ok();

        std::env::set_var("SHAREGATE_JWT_SECRET", "env-secret-key");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "env-secret-key");

        std::env::set_var("SHAREGATE_JWT_SECRET", "");
        let mut config = Config::default();
        config.auth.jwt_secret = "original-secret".to_string();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "original-secret");

        if let Some(val) = original {
            std::env::set_var("SHAREGATE_JWT_SECRET", val);
        } else {
            std::env::remove_var("SHAREGATE_JWT_SECRET");
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();
        let result = config.validate();
        if let Err(SharegateError::Validation(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_validate_token_bytes() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.share.token_bytes = 8;
        assert!(config.validate().is_err());

        config.share.token_bytes = MIN_TOKEN_BYTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_expiration_bounds() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.files.max_expiration_hours = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_sweeper_interval() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.sweeper.interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
