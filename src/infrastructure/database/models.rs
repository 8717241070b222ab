//! Database row models
//!
//! One `FromRow` struct per table, mirroring column layout exactly. Kept
//! separate from the domain entities so a schema change never forces a
//! ripple through `domain::entities` - repositories translate at the edge.
//! Postgres enum columns map straight onto the domain's own `sqlx::Type`
//! enums; there is no separate row-level enum to keep in sync.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::entities::{AttendanceStatus, LogLevel, MarkedBy, PersonStatus};

#[derive(Debug, FromRow)]
pub struct PersonRow {
    pub person_id: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub status: PersonStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct AttendanceDbRow {
    pub id: Uuid,
    pub person_id: String,
    pub person_name: String,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub source: String,
    pub confidence: f32,
    pub marked_by: MarkedBy,
    pub status: AttendanceStatus,
    pub metadata: serde_json::Value,
}

#[derive(Debug, FromRow)]
pub struct DetectionEventRow {
    pub id: Uuid,
    pub person_id: Option<String>,
    pub person_name: String,
    pub confidence: f32,
    pub source: String,
    pub attendance_id: Option<Uuid>,
    pub ts: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, FromRow)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

#[derive(Debug, FromRow)]
pub struct SystemConfigDbRow {
    pub id: i32,
    pub config: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct SystemLogDbRow {
    pub id: Uuid,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct RunStateRow {
    pub id: i32,
    pub active: bool,
    pub source: Option<String>,
    pub source_type: Option<String>,
}
