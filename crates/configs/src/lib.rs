//! # configs
//!
//! Layered settings for the idea board server.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/default.toml` and `config/local.toml` (both optional)
//! 3. environment variables `IDEA_BOARD__<SECTION>__<KEY>`
//!
//! A `.env` file is loaded into the environment first; its path is kept in
//! [`Settings::env_file`] so the caller can log it once tracing is up.
//! `DATABASE_URL` is honoured when `store.database_url` is not set.

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub realtime: RealtimeSettings,
    pub log: LogSettings,
    /// The `.env` file that was loaded, if any.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Prefix for every API route, e.g. `/api`. Empty mounts at the root.
    pub base_path: String,
    pub cors_permissive: bool,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub database_url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// Events a subscriber may fall behind before it starts missing them.
    pub channel_capacity: usize,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads settings from `.env`, config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = dotenvy::dotenv().ok();
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("IDEA_BOARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_sources(builder, env_file)
    }

    /// Builds, fills in `DATABASE_URL` and validates.
    pub fn from_sources(
        builder: ConfigBuilder<DefaultState>,
        env_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::build(builder)?;
        if settings.store.database_url.is_none() {
            settings.store.database_url = std::env::var("DATABASE_URL").ok().map(SecretString::from);
        }
        settings.env_file = env_file;
        settings.validate()?;
        Ok(settings)
    }

    /// The built-in defaults, ready for more sources to be layered on top.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.base_path", "/api")?
            .set_default("server.cors_permissive", true)?
            .set_default("store.backend", "memory")?
            .set_default("store.max_connections", 5)?
            .set_default("realtime.channel_capacity", 256)?
            .set_default("realtime.keep_alive_secs", 15)?
            .set_default("log.filter", "info")?
            .set_default("log.format", "pretty")?)
    }

    pub fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.server.base_path;
        if !base.is_empty() && (!base.starts_with('/') || base == "/" || base.ends_with('/')) {
            return Err(ConfigError::Invalid(format!(
                "server.base_path must be empty or look like `/api`, got `{base}`"
            )));
        }
        if self.store.backend == StoreBackend::Postgres && self.store.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "store.backend = postgres requires store.database_url or DATABASE_URL".into(),
            ));
        }
        if self.realtime.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "realtime.channel_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_describe_a_local_memory_board() {
        let settings = Settings::build(Settings::defaults().unwrap()).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.server.base_path, "/api");
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert_eq!(settings.realtime.channel_capacity, 256);
    }

    #[test]
    fn loaded_env_file_is_handed_to_the_caller() {
        let path = PathBuf::from("/srv/idea-board/.env");
        let settings = Settings::from_sources(Settings::defaults().unwrap(), Some(path.clone()))
            .unwrap();
        assert_eq!(settings.env_file, Some(path));

        let settings = Settings::build(Settings::defaults().unwrap()).unwrap();
        assert!(settings.env_file.is_none());
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("store.backend", "postgres")
            .unwrap();
        let settings = Settings::build(builder).unwrap();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn database_url_stays_secret() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("store.backend", "postgres")
            .unwrap()
            .set_override("store.database_url", "postgres://board:hunter2@db/board")
            .unwrap();
        let settings = Settings::build(builder).unwrap();
        settings.validate().unwrap();

        let url = settings.store.database_url.as_ref().unwrap();
        assert_eq!(url.expose_secret(), "postgres://board:hunter2@db/board");
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[test]
    fn base_path_shape_is_checked() {
        for bad in ["api", "/", "/api/"] {
            let builder = Settings::defaults()
                .unwrap()
                .set_override("server.base_path", bad)
                .unwrap();
            let settings = Settings::build(builder).unwrap();
            assert!(settings.validate().is_err(), "{bad} should be rejected");
        }
    }
}
