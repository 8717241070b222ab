//! System Log Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::{LogLevel, SystemLogRow};
use crate::domain::repositories::{RepoResult, SystemLogRepository};
use crate::infrastructure::database::models::SystemLogDbRow;

pub struct PgSystemLogRepository {
    pool: PgPool,
}

impl PgSystemLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_log(r: SystemLogDbRow) -> SystemLogRow {
        SystemLogRow::from_db(r.id, r.level, r.target, r.message, r.ts)
    }
}

#[async_trait]
impl SystemLogRepository for PgSystemLogRepository {
    async fn append(&self, row: &SystemLogRow) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_logs (id, level, target, message, ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id())
        .bind(row.level())
        .bind(row.target())
        .bind(row.message())
        .bind(row.ts())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, level: Option<LogLevel>, limit: i64) -> RepoResult<Vec<SystemLogRow>> {
        let rows: Vec<SystemLogDbRow> = sqlx::query_as(
            r#"
            SELECT id, level, target, message, ts
            FROM system_logs
            WHERE $1::log_level IS NULL OR level = $1
            ORDER BY ts DESC
            LIMIT $2
            "#,
        )
        .bind(level)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_log).collect())
    }
}
