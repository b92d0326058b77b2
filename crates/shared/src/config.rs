//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Object storage configuration; uploads are disabled when absent.
    #[serde(default)]
    pub storage: Option<StorageSettings>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    86_400 // 1 day
}

/// SMTP configuration for outbound notification email.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether notification emails are sent at all.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP server host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Frontend base URL used in links.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_email() -> String {
    "noreply@opsledger.local".to_string()
}

fn default_from_name() -> String {
    "Opsledger".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

/// Object storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible bucket (AWS S3, Cloudflare R2, MinIO).
    S3,
    /// Local filesystem directory, for development.
    LocalFs,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend to use.
    pub provider: StorageProvider,
    /// Bucket name (S3) or root directory (local filesystem).
    pub bucket: String,
    /// Custom endpoint for S3-compatible providers.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region for S3.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key id for S3.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key for S3.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Base URL objects are served from when signing is unavailable.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Lifetime of signed download URLs in seconds.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_signed_url_ttl() -> u64 {
    3600
}

impl AppConfig {
    /// Loads configuration from `.env`, config files, and `OPSLEDGER__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("OPSLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("OPSLEDGER__DATABASE__URL", Some("postgres://localhost/test")),
                ("OPSLEDGER__JWT__SECRET", Some("secret")),
                ("OPSLEDGER__SERVER__PORT", Some("9090")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/test");
                assert_eq!(config.jwt.secret, "secret");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.jwt.access_token_expiry_secs, 86_400);
                assert!(!config.email.enabled);
                assert!(config.storage.is_none());
            },
        );
    }

    #[test]
    fn test_storage_section() {
        temp_env::with_vars(
            [
                ("OPSLEDGER__DATABASE__URL", Some("postgres://localhost/test")),
                ("OPSLEDGER__JWT__SECRET", Some("secret")),
                ("OPSLEDGER__STORAGE__PROVIDER", Some("local_fs")),
                ("OPSLEDGER__STORAGE__BUCKET", Some("/tmp/opsledger")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                let storage = config.storage.unwrap();
                assert_eq!(storage.provider, StorageProvider::LocalFs);
                assert_eq!(storage.bucket, "/tmp/opsledger");
                assert_eq!(storage.max_file_size, 10 * 1024 * 1024);
                assert_eq!(storage.signed_url_ttl_secs, 3600);
            },
        );
    }

    #[test]
    fn test_email_config_default() {
        let config = EmailConfig::default();
        assert_eq!(config.smtp_host, "localhost");
        assert_eq!(config.smtp_port, 1025);
        assert!(!config.enabled);
    }
}
