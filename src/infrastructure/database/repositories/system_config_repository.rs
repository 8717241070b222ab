//! System Config Repository Implementation (single-row, JSON blob)

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::SystemConfigRow;
use crate::domain::repositories::{RepoResult, RepositoryError, SystemConfigRepository};

pub struct PgSystemConfigRepository {
    pool: PgPool,
}

impl PgSystemConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SystemConfigRepository for PgSystemConfigRepository {
    async fn get(&self) -> RepoResult<SystemConfigRow> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(r#"SELECT config FROM system_config WHERE id = 1"#)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((config,)) => {
                let config: SystemConfigRow = serde_json::from_value(config).unwrap_or_default();
                Ok(config)
            }
            None => Ok(SystemConfigRow::default()),
        }
    }

    async fn save(&self, config: &SystemConfigRow) -> RepoResult<()> {
        let json = serde_json::to_value(config).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO system_config (id, config, updated_at)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET config = $1, updated_at = $2
            "#,
        )
        .bind(json)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
