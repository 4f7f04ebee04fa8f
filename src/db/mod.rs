use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};

pub mod models;
pub mod queries;

/// An open store transaction. All row locks taken through it are released at
/// commit or rollback.
pub type StoreTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(50)
        .connect(&config.database_url)
        .await
}
