//! API Key Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::ApiKey;
use crate::domain::repositories::{ApiKeyRepository, RepoResult, RepositoryError};
use crate::infrastructure::database::models::ApiKeyRow;

pub struct PgApiKeyRepository {
    pool: PgPool,
}

impl PgApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_key(r: ApiKeyRow) -> ApiKey {
        ApiKey::from_db(r.id, r.name, r.key_hash, r.permissions, r.created_at, r.expires_at, r.revoked)
    }
}

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn find_by_hash(&self, key_hash: &str) -> RepoResult<Option<ApiKey>> {
        let row: Option<ApiKeyRow> = sqlx::query_as(
            r#"
            SELECT id, name, key_hash, permissions, created_at, expires_at, revoked
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_key))
    }

    async fn save(&self, key: &ApiKey) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, name, key_hash, permissions, created_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(key.id())
        .bind(key.name())
        .bind(key.key_hash())
        .bind(key.permissions())
        .bind(key.created_at())
        .bind(key.expires_at())
        .bind(key.revoked())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query(r#"UPDATE api_keys SET revoked = TRUE WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("API key {}", id)));
        }

        Ok(())
    }
}
