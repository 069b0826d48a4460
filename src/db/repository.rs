//! Database repository for cache generations and local storage.
//!
//! Writes to the same key are last-write-wins (`INSERT OR REPLACE`).

use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::shell::{headers_to_pairs, pairs_to_headers, FetchResponse, ResponseKind};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== CACHE GENERATIONS ====================

    /// Create the generation if it does not exist yet.
    pub async fn open_cache(&self, name: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Names of all existing generations, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT name FROM cache_generations ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("name")).collect())
    }

    /// Delete a generation and every entry it owns. Returns whether it existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cache_entries WHERE generation = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM cache_generations WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Look up a stored response by URL within one generation.
    pub async fn match_cache(
        &self,
        name: &str,
        url: &str,
    ) -> Result<Option<FetchResponse>, AppError> {
        let row = sqlx::query(
            "SELECT status, kind, headers, body FROM cache_entries WHERE generation = ? AND url = ?",
        )
        .bind(name)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(response_from_row).transpose()
    }

    /// Store one response, creating the generation when needed.
    pub async fn put_cache(
        &self,
        name: &str,
        url: &str,
        response: &FetchResponse,
    ) -> Result<(), AppError> {
        let entry = [(url.to_string(), response.clone())];
        self.put_all_cache(name, &entry).await
    }

    /// Store a batch of responses in a single transaction: all or nothing.
    pub async fn put_all_cache(
        &self,
        name: &str,
        entries: &[(String, FetchResponse)],
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        for (url, response) in entries {
            let headers_json = serde_json::to_string(&headers_to_pairs(&response.headers))?;

            sqlx::query(
                "INSERT OR REPLACE INTO cache_entries (generation, url, status, kind, headers, body, stored_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
            )
            .bind(name)
            .bind(url)
            .bind(response.status.as_u16() as i64)
            .bind(response.kind.as_str())
            .bind(&headers_json)
            .bind(response.body.as_ref())
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Number of entries held by a generation.
    pub async fn cache_len(&self, name: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM cache_entries WHERE generation = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== LOCAL STORAGE ====================

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT OR REPLACE INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn response_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FetchResponse, AppError> {
    let status: i64 = row.get("status");
    let kind: String = row.get("kind");
    let headers_json: String = row.get("headers");
    let body: Vec<u8> = row.get("body");

    let status = u16::try_from(status)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| AppError::Database(format!("Invalid cached status {}", status)))?;
    let pairs: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

    Ok(FetchResponse {
        status,
        headers: pairs_to_headers(&pairs),
        body: Bytes::from(body),
        kind: ResponseKind::parse(&kind),
    })
}
