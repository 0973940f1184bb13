//! Configuration management
//!
//! Configuration is loaded from `config.yml` and can be overridden with
//! `E_ELECTION_*` environment variables. Missing optional values are filled
//! with defaults so a bare checkout boots against a local SQLite file.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub election: ElectionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub vote_log: VoteLogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the frontend, cookies are sent cross-site)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DatabaseDriver,
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/e-election.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (local runs and tests)
    #[default]
    Sqlite,
    /// PostgreSQL (production)
    Postgres,
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime, also sent as the cookie Max-Age
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,
    /// Mark the cookie `Secure`
    #[serde(default)]
    pub secure: bool,
    /// SameSite attribute (`Lax`, `Strict` or `None`)
    #[serde(default = "default_same_site")]
    pub same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age_secs(),
            secure: false,
            same_site: default_same_site(),
        }
    }
}

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_max_age_secs() -> i64 {
    2 * 60 * 60
}

fn default_same_site() -> String {
    "Lax".to_string()
}

/// Election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Active voting period (the election year)
    #[serde(default = "default_period")]
    pub period: i32,
    /// Key used to hash NIMs before they are stored with a ballot
    #[serde(default = "default_nim_hash_secret")]
    pub nim_hash_secret: String,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            nim_hash_secret: default_nim_hash_secret(),
        }
    }
}

fn default_period() -> i32 {
    chrono::Utc::now().year()
}

fn default_nim_hash_secret() -> String {
    "change-me".to_string()
}

/// S3-compatible object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    /// Path-style (`endpoint/bucket/key`) instead of virtual-hosted addressing
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
    /// Key prefix for uploaded vote logs
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Key prefix for candidate photos
    #[serde(default = "default_candidate_prefix")]
    pub candidate_prefix: String,
    /// How often changed vote logs are pushed to the bucket
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            region: default_region(),
            bucket: default_bucket(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            path_style: default_path_style(),
            presign_expiry_secs: default_presign_expiry_secs(),
            log_prefix: default_log_prefix(),
            candidate_prefix: default_candidate_prefix(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

fn default_storage_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_bucket() -> String {
    "e-election".to_string()
}

fn default_path_style() -> bool {
    true
}

fn default_presign_expiry_secs() -> u64 {
    15 * 60
}

fn default_log_prefix() -> String {
    "logs/vote".to_string()
}

fn default_candidate_prefix() -> String {
    "candidates".to_string()
}

fn default_sync_interval_secs() -> u64 {
    60
}

impl StorageConfig {
    /// Whether credentials were configured at all
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

/// Vote log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteLogConfig {
    #[serde(default = "default_vote_log_dir")]
    pub dir: PathBuf,
}

impl Default for VoteLogConfig {
    fn default() -> Self {
        Self {
            dir: default_vote_log_dir(),
        }
    }
}

fn default_vote_log_dir() -> PathBuf {
    PathBuf::from("logs/vote")
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an
    /// error carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// Recognised variables:
    /// - E_ELECTION_SERVER_HOST, E_ELECTION_SERVER_PORT, E_ELECTION_SERVER_CORS_ORIGIN
    /// - E_ELECTION_DATABASE_DRIVER, E_ELECTION_DATABASE_URL
    /// - E_ELECTION_SESSION_MAX_AGE_SECS, E_ELECTION_SESSION_SECURE
    /// - E_ELECTION_ELECTION_PERIOD, E_ELECTION_NIM_HASH_SECRET
    /// - E_ELECTION_STORAGE_ENDPOINT, E_ELECTION_STORAGE_REGION, E_ELECTION_STORAGE_BUCKET
    /// - E_ELECTION_STORAGE_ACCESS_KEY_ID, E_ELECTION_STORAGE_SECRET_ACCESS_KEY
    /// - E_ELECTION_VOTE_LOG_DIR
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(format!("E_ELECTION_{}", name)).ok();

        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origin) = var("SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        if let Some(driver) = var("DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "postgres" | "postgresql" => self.database.driver = DatabaseDriver::Postgres,
                _ => {}
            }
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(max_age) = var("SESSION_MAX_AGE_SECS").and_then(|v| v.parse().ok()) {
            self.session.max_age_secs = max_age;
        }
        if let Some(secure) = var("SESSION_SECURE").and_then(|v| v.parse().ok()) {
            self.session.secure = secure;
        }

        if let Some(period) = var("ELECTION_PERIOD").and_then(|v| v.parse().ok()) {
            self.election.period = period;
        }
        if let Some(secret) = var("NIM_HASH_SECRET") {
            self.election.nim_hash_secret = secret;
        }

        if let Some(endpoint) = var("STORAGE_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Some(region) = var("STORAGE_REGION") {
            self.storage.region = region;
        }
        if let Some(bucket) = var("STORAGE_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(key) = var("STORAGE_ACCESS_KEY_ID") {
            self.storage.access_key_id = key;
        }
        if let Some(secret) = var("STORAGE_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = secret;
        }

        if let Some(dir) = var("VOTE_LOG_DIR") {
            self.vote_log.dir = PathBuf::from(dir);
        }
    }
}

fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
