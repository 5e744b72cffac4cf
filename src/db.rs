use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

/// Opens the pool at process start. Every store shares it.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Waits for checked-out connections to return, then closes the pool.
pub async fn close_db(pool: &MySqlPool) {
    pool.close().await;
    info!("Database pool closed");
}
