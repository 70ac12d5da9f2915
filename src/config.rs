use anyhow::ensure;
use config::{Config as ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use mealsync_mealplan::SyncOptions;
use serde::Deserialize;
use std::{env, path::Path};

type Builder = config::ConfigBuilder<DefaultState>;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub sync: SyncOptions,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON in production, pretty everywhere else.
    pub fn from_environment() -> Self {
        match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// Unset means decided by `ENVIRONMENT`.
    pub format: Option<LogFormat>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_days: u64,
    pub issuer: String,
    pub audience: String,
}

fn with_defaults(builder: Builder) -> Result<Builder, ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("database.url", "sqlite:mealsync.db")?
        .set_default("database.max_connections", 5)?
        .set_default("jwt.expiration_days", 7)?
        .set_default("jwt.issuer", "mealsync")?
        .set_default("jwt.audience", "mealsync")?
        .set_default("observability.log_level", "info")
}

impl Config {
    /// Layers, last one wins: built-in defaults, the TOML file (`path`, then
    /// `CONFIG_PATH`, then `config/default.toml`, skipped when absent),
    /// `MEALSYNC__SECTION__KEY` variables, then `DATABASE_URL` and `JWT_SECRET`.
    pub fn load(path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(ConfigBuilder::builder())?;

        let file = path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
        if Path::new(&file).exists() {
            builder = builder.add_source(File::with_name(&file));
        }

        builder = builder.add_source(
            Environment::with_prefix("MEALSYNC")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in [("DATABASE_URL", "database.url"), ("JWT_SECRET", "jwt.secret")] {
            if let Ok(value) = env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.jwt.secret.len() >= 32,
            "jwt.secret needs at least 32 characters"
        );
        ensure!(
            self.database.max_connections > 0,
            "database.max_connections must be positive"
        );
        ensure!(self.server.port > 0, "server.port must be positive");
        ensure!(
            self.sync.retry.min_delay <= self.sync.retry.max_delay,
            "sync.retry.min_delay exceeds sync.retry.max_delay"
        );

        Ok(())
    }
}
