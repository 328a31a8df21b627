//! SQLite-backed [`DatasetStore`] implementation.
//!
//! A dataset is one row in `datasets` plus one row per window in `windows`,
//! with embeddings stored as little-endian f32 BLOBs. Saves run in a single
//! transaction so readers never observe a half-written dataset.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use quote_search_core::embedding::{blob_to_vec, vec_to_blob};
use quote_search_core::models::{Dataset, DatasetSummary, Window};
use quote_search_core::store::DatasetStore;

/// SQLite implementation of the [`DatasetStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Claim the build lock for a dataset name.
    ///
    /// Returns `false` if another build already holds it.
    pub async fn try_lock_build(&self, dataset: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO build_locks (dataset, acquired_at) VALUES (?, ?) \
             ON CONFLICT(dataset) DO NOTHING",
        )
        .bind(dataset)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        let acquired = result.rows_affected() == 1;
        tracing::debug!(dataset, acquired, "build lock");
        Ok(acquired)
    }

    /// Release a build lock taken with [`try_lock_build`](Self::try_lock_build).
    pub async fn unlock_build(&self, dataset: &str) -> Result<()> {
        sqlx::query("DELETE FROM build_locks WHERE dataset = ?")
            .bind(dataset)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_window(row: &SqliteRow) -> Result<Window> {
    let indices_json: String = row.get("line_indices");
    let blob: Option<Vec<u8>> = row.get("embedding");
    Ok(Window {
        line_indices: serde_json::from_str(&indices_json)
            .with_context(|| format!("corrupt line_indices: {}", indices_json))?,
        text: row.get("text"),
        speaker: row.get("speaker"),
        season: row.get("season"),
        episode: row.get("episode"),
        episode_id: row.get("episode_id"),
        embedding: blob.as_deref().map(blob_to_vec),
    })
}

#[async_trait]
impl DatasetStore for SqliteStore {
    async fn save_dataset(&self, dataset: &Dataset) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM windows WHERE dataset = ?")
            .bind(&dataset.name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM datasets WHERE name = ?")
            .bind(&dataset.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO datasets (name, corpus, metadata_json, model, dims,
                                  window_size, dialogue_only, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&dataset.name)
        .bind(&dataset.corpus)
        .bind(serde_json::to_string(&dataset.metadata)?)
        .bind(&dataset.model)
        .bind(dataset.dims as i64)
        .bind(dataset.window_size as i64)
        .bind(dataset.dialogue_only)
        .bind(dataset.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, w) in dataset.targets.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO windows (dataset, position, line_indices, text, speaker,
                                     season, episode, episode_id, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&dataset.name)
            .bind(position as i64)
            .bind(serde_json::to_string(&w.line_indices)?)
            .bind(&w.text)
            .bind(&w.speaker)
            .bind(&w.season)
            .bind(&w.episode)
            .bind(w.episode_id)
            .bind(w.embedding.as_deref().map(vec_to_blob))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            dataset = %dataset.name,
            windows = dataset.targets.len(),
            "saved dataset"
        );
        Ok(())
    }

    async fn load_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        let row = sqlx::query(
            "SELECT name, corpus, metadata_json, model, dims, window_size, \
                    dialogue_only, created_at \
             FROM datasets WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let window_rows = sqlx::query(
            "SELECT line_indices, text, speaker, season, episode, episode_id, embedding \
             FROM windows WHERE dataset = ? ORDER BY position",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let targets = window_rows
            .iter()
            .map(row_to_window)
            .collect::<Result<Vec<_>>>()?;

        let metadata_json: String = row.get("metadata_json");
        let metadata = serde_json::from_str(&metadata_json)
            .with_context(|| format!("corrupt metadata_json for dataset '{}'", name))?;
        Ok(Some(Dataset {
            name: row.get("name"),
            corpus: row.get("corpus"),
            metadata,
            model: row.get("model"),
            dims: row.get::<i64, _>("dims") as usize,
            window_size: row.get::<i64, _>("window_size") as usize,
            dialogue_only: row.get("dialogue_only"),
            created_at: row.get("created_at"),
            targets,
        }))
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT d.name, d.corpus, d.model, d.dims, d.window_size, d.dialogue_only,
                   d.created_at,
                   (SELECT COUNT(*) FROM windows w WHERE w.dataset = d.name) AS windows
            FROM datasets d
            ORDER BY d.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DatasetSummary {
                name: row.get("name"),
                corpus: row.get("corpus"),
                model: row.get("model"),
                dims: row.get::<i64, _>("dims") as usize,
                window_size: row.get::<i64, _>("window_size") as usize,
                dialogue_only: row.get("dialogue_only"),
                created_at: row.get("created_at"),
                windows: row.get::<i64, _>("windows") as usize,
            })
            .collect())
    }

    async fn delete_dataset(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM windows WHERE dataset = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM datasets WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
