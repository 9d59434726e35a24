use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Administrator account ensured at startup. Registration only ever
/// creates members, so this is how the first admin comes to exist.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdminConfig {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the certificate byte store.
    pub root: PathBuf,
    /// Maximum accepted certificate payload in bytes.
    pub max_blob_size: u64,
}

/// How certificate payloads are kept relative to the workout record.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Bytes live inside the workout record itself.
    Embedded,
    /// The record holds a key into the external byte store.
    Referenced,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CertificateConfig {
    pub mode: StorageMode,
    /// When true, `create` treats a missing certificate as a missing
    /// required field.
    pub required: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub certificate: CertificateConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://gymlog.db?mode=rwc")?
            .set_default("storage.root", "./data/certificates")?
            .set_default("storage.max_blob_size", 16 * 1024 * 1024)?
            .set_default("certificate.mode", "referenced")?
            .set_default("certificate.required", false)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., GYMLOG__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("GYMLOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
