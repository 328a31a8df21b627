use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    // One row per built dataset
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            name TEXT PRIMARY KEY,
            corpus TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            window_size INTEGER NOT NULL,
            dialogue_only INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Windows in dataset order; line_indices is a JSON array
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS windows (
            dataset TEXT NOT NULL,
            position INTEGER NOT NULL,
            line_indices TEXT NOT NULL,
            text TEXT NOT NULL,
            speaker TEXT NOT NULL,
            season TEXT NOT NULL,
            episode TEXT NOT NULL,
            episode_id INTEGER NOT NULL,
            embedding BLOB,
            PRIMARY KEY (dataset, position),
            FOREIGN KEY (dataset) REFERENCES datasets(name) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one build per dataset name at a time
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS build_locks (
            dataset TEXT PRIMARY KEY,
            acquired_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_windows_episode ON windows(dataset, episode_id)")
        .execute(pool)
        .await?;

    Ok(())
}
