//! Detection Event Repository Implementation (append-only audit log)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entities::DetectionEvent;
use crate::domain::repositories::{DetectionEventRepository, RepoResult};
use crate::infrastructure::database::models::DetectionEventRow;

pub struct PgDetectionEventRepository {
    pool: PgPool,
}

impl PgDetectionEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(r: DetectionEventRow) -> DetectionEvent {
        DetectionEvent::from_db(r.id, r.person_id, r.person_name, r.ts, r.confidence, r.source, r.attendance_id, r.metadata)
    }
}

#[async_trait]
impl DetectionEventRepository for PgDetectionEventRepository {
    async fn save(&self, event: &DetectionEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO detection_events (id, person_id, person_name, confidence, source, attendance_id, ts, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id())
        .bind(event.person_id())
        .bind(event.person_name())
        .bind(event.confidence())
        .bind(event.source())
        .bind(event.attendance_id())
        .bind(event.ts())
        .bind(event.metadata())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        person_id: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> RepoResult<Vec<DetectionEvent>> {
        let rows: Vec<DetectionEventRow> = sqlx::query_as(
            r#"
            SELECT id, person_id, person_name, confidence, source, attendance_id, ts, metadata
            FROM detection_events
            WHERE ($1::text IS NULL OR person_id = $1)
              AND ($2::timestamptz IS NULL OR ts >= $2)
              AND ($3::timestamptz IS NULL OR ts <= $3)
            ORDER BY ts DESC
            LIMIT $4
            "#,
        )
        .bind(person_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_event).collect())
    }
}
