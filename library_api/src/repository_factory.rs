use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;

use crate::books_repository::{BookRepository, InMemoryBooksRepository, PostgresBooksRepository};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DbType {
    Postgres,
    InMemory,
}

#[derive(thiserror::Error, Debug)]
#[error("unsupported database type: {0}. Supported types: postgres, inmemory")]
pub struct UnsupportedDbType(pub String);

impl FromStr for DbType {
    type Err = UnsupportedDbType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(DbType::Postgres),
            "inmemory" => Ok(DbType::InMemory),
            other => Err(UnsupportedDbType(other.to_string())),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbType::Postgres => f.write_str("postgres"),
            DbType::InMemory => f.write_str("inmemory"),
        }
    }
}

/// Picks the books storage from `db_type`. Any error here should stop the process.
pub async fn create_books_repository(
    settings: &Settings,
) -> anyhow::Result<Arc<dyn BookRepository>> {
    let db_type = if settings.db_type.is_empty() {
        tracing::warn!("DB_TYPE is empty, defaulting to {}", DbType::Postgres);
        DbType::Postgres
    } else {
        settings.db_type.parse()?
    };

    tracing::info!("Creating books repository for database type: {}", db_type);

    let repository: Arc<dyn BookRepository> = match db_type {
        DbType::Postgres => Arc::new(
            PostgresBooksRepository::init(settings.postgres_config())
                .await
                .context("Failed to init postgres books repository")?,
        ),
        DbType::InMemory => {
            tracing::info!("Using in-memory books repository, nothing survives a restart");
            Arc::new(InMemoryBooksRepository::default())
        }
    };
    Ok(repository)
}
