//! Attendance Repository Implementation
//!
//! `mark_auto` suppresses duplicates with a single `INSERT ... WHERE NOT
//! EXISTS` statement rather than a separate existence check, so two
//! concurrent detections for the same person within the duplicate window
//! cannot both slip through.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::AttendanceRow;
use crate::domain::repositories::{AttendanceRepository, RepoResult, RepositoryError};
use crate::infrastructure::database::models::AttendanceDbRow;

pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_attendance(r: AttendanceDbRow) -> AttendanceRow {
        AttendanceRow::from_db(
            r.id,
            r.person_id,
            r.person_name,
            r.check_in,
            r.check_out,
            r.date,
            r.duration_minutes,
            r.source,
            r.confidence,
            r.marked_by,
            r.status,
            r.metadata,
        )
    }

    const SELECT_COLUMNS: &'static str = r#"
        id, person_id, person_name, check_in, check_out, date,
        duration_minutes, source, confidence, marked_by, status, metadata
    "#;
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<AttendanceRow>> {
        let row: Option<AttendanceDbRow> = sqlx::query_as(&format!(
            "SELECT {} FROM attendance WHERE id = $1",
            Self::SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_attendance))
    }

    async fn list(
        &self,
        person_id: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> RepoResult<Vec<AttendanceRow>> {
        let rows: Vec<AttendanceDbRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM attendance
            WHERE ($1::text IS NULL OR person_id = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY check_in DESC
            LIMIT $4
            "#,
            Self::SELECT_COLUMNS
        ))
        .bind(person_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_attendance).collect())
    }

    async fn today(&self) -> RepoResult<Vec<AttendanceRow>> {
        let rows: Vec<AttendanceDbRow> = sqlx::query_as(&format!(
            "SELECT {} FROM attendance WHERE date = CURRENT_DATE ORDER BY check_in DESC",
            Self::SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_attendance).collect())
    }

    async fn for_person(&self, person_id: &str, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<AttendanceRow>> {
        let rows: Vec<AttendanceDbRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM attendance
            WHERE person_id = $1 AND date >= $2 AND date <= $3
            ORDER BY check_in DESC
            "#,
            Self::SELECT_COLUMNS
        ))
        .bind(person_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_attendance).collect())
    }

    async fn mark_auto(&self, row: &AttendanceRow, duplicate_window_minutes: i64) -> RepoResult<Option<AttendanceRow>> {
        let inserted: Option<AttendanceDbRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO attendance (id, person_id, person_name, check_in, check_out, date,
                                     duration_minutes, source, confidence, marked_by, status, metadata)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            WHERE NOT EXISTS (
                SELECT 1 FROM attendance
                WHERE person_id = $2
                  AND check_in > now() - make_interval(mins => $13::int)
            )
            RETURNING {}
            "#,
            Self::SELECT_COLUMNS
        ))
        .bind(row.id())
        .bind(row.person_id())
        .bind(row.person_name())
        .bind(row.check_in())
        .bind(row.check_out())
        .bind(row.date())
        .bind(row.duration_minutes())
        .bind(row.source())
        .bind(row.confidence())
        .bind(row.marked_by())
        .bind(row.status())
        .bind(row.metadata())
        .bind(duplicate_window_minutes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.map(Self::row_to_attendance))
    }

    async fn mark_manual(&self, row: &AttendanceRow) -> RepoResult<AttendanceRow> {
        let inserted: AttendanceDbRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO attendance (id, person_id, person_name, check_in, check_out, date,
                                     duration_minutes, source, confidence, marked_by, status, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            Self::SELECT_COLUMNS
        ))
        .bind(row.id())
        .bind(row.person_id())
        .bind(row.person_name())
        .bind(row.check_in())
        .bind(row.check_out())
        .bind(row.date())
        .bind(row.duration_minutes())
        .bind(row.source())
        .bind(row.confidence())
        .bind(row.marked_by())
        .bind(row.status())
        .bind(row.metadata())
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::row_to_attendance(inserted))
    }

    async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<AttendanceRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Attendance {}", id)))?;

        let mut updated = existing;
        updated.check_out_at(at);

        let persisted: AttendanceDbRow = sqlx::query_as(&format!(
            r#"
            UPDATE attendance SET check_out = $2, duration_minutes = $3, status = $4
            WHERE id = $1
            RETURNING {}
            "#,
            Self::SELECT_COLUMNS
        ))
        .bind(updated.id())
        .bind(updated.check_out())
        .bind(updated.duration_minutes())
        .bind(updated.status())
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::row_to_attendance(persisted))
    }
}
