use std::time::Duration;

use log::{debug, info};
use sqlx::{any::AnyPoolOptions, Any, Pool};

use crate::{config::DatabaseUrl, error::RecipeError};

const POSTGRES_SCHEMA: &str = include_str!("sql/postgres.sql");
const SQLITE_SCHEMA: &str = include_str!("sql/sqlite.sql");

/// Opens a pool for `url` and makes sure every table exists.
pub async fn connect(url: &DatabaseUrl, max_connections: u32) -> Result<Pool<Any>, RecipeError> {
    sqlx::any::install_default_drivers();

    let options = AnyPoolOptions::new();
    // Every connection to `sqlite::memory:` is a separate database, so the
    // pool must hold exactly one and never recycle it.
    let options = if url.is_memory() {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        options.max_connections(max_connections)
    };

    debug!("Connecting to {} store", url.kind());
    let pool = options.connect(&url.to_connection_string()).await?;

    setup(url, &pool).await?;

    Ok(pool)
}

pub async fn setup(url: &DatabaseUrl, pool: &Pool<Any>) -> Result<(), RecipeError> {
    let schema = if url.is_postgresql() {
        POSTGRES_SCHEMA
    } else {
        SQLITE_SCHEMA
    };

    let mut tr = pool.begin().await?;
    for statement in schema
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
    {
        sqlx::query(statement).execute(&mut *tr).await?;
    }
    tr.commit().await?;

    info!("Schema ready");
    Ok(())
}
