use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::books_repository::PostgresBooksRepositoryConfig;

/// Process settings, read from environment variables (`APP_PORT`, `DB_TYPE`, `DB_HOST`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app_port: u16,
    pub db_type: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// 0 disables the per request deadline
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("app_port", 8080)?
            .set_default("db_type", "postgres")?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("db_name", "postgres")?
            .set_default("request_timeout_secs", 30)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn postgres_config(&self) -> PostgresBooksRepositoryConfig {
        PostgresBooksRepositoryConfig {
            hostname: self.db_host.clone(),
            port: self.db_port,
            username: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
