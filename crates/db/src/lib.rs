//! Persistence for pollcast on `PostgreSQL`.
//!
//! The schema is three tables, created in order by [`migrations::Migrator`]:
//!
//! - `poll`: question, owner, share-link short code and the voting window
//! - `poll_option`: a poll's choices, unique per `(poll_id, position)`
//! - `vote`: the append-only ledger. One row per voter per poll, enforced by a
//!   unique `(poll_id, voter_key)` index; a composite foreign key keeps every
//!   vote's option inside the voted poll.
//!
//! Deleting a poll cascades to its options and votes.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use pollcast_common::{AppError, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, log::LevelFilter};

/// Pool options derived from configuration.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .sqlx_logging(config.log_sql)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &DatabaseConfig) -> Result<DatabaseConnection, AppError> {
    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply any of the poll, option and vote migrations not yet run.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("Database schema up to date");
    Ok(())
}
