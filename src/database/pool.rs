use crate::config::get_config;
use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Pool sizing comes from config so a monitoring-heavy deployment (many
/// staff dashboards polling session state) can widen it without a rebuild.
pub async fn create_pool() -> Result<PgPool> {
    let config = get_config();
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_seconds))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}
