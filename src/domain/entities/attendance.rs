//! Attendance Row Entity
//!
//! A single check-in/check-out record committed by the Orchestrator (auto)
//! or the Facade (manual).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

/// Who marked an attendance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "marked_by", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MarkedBy {
    Auto,
    Manual,
    System,
}

/// Attendance row status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Left,
}

impl Default for AttendanceStatus {
    fn default() -> Self {
        Self::Present
    }
}

/// A single attendance record for a person on a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRow {
    id: Uuid,
    person_id: String,
    person_name: String,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    date: NaiveDate,
    duration_minutes: Option<i64>,
    source: String,
    confidence: f32,
    marked_by: MarkedBy,
    status: AttendanceStatus,
    metadata: Json,
}

impl AttendanceRow {
    /// Creates a new attendance row at check-in time.
    pub fn new(
        person_id: String,
        person_name: String,
        source: String,
        confidence: f32,
        marked_by: MarkedBy,
    ) -> Self {
        let check_in = Utc::now();
        Self {
            id: Uuid::new_v4(),
            person_id,
            person_name,
            check_in,
            check_out: None,
            date: check_in.date_naive(),
            duration_minutes: None,
            source,
            confidence,
            marked_by,
            status: AttendanceStatus::default(),
            metadata: Json::Object(Default::default()),
        }
    }

    /// Reconstructs an attendance row from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: Uuid,
        person_id: String,
        person_name: String,
        check_in: DateTime<Utc>,
        check_out: Option<DateTime<Utc>>,
        date: NaiveDate,
        duration_minutes: Option<i64>,
        source: String,
        confidence: f32,
        marked_by: MarkedBy,
        status: AttendanceStatus,
        metadata: Json,
    ) -> Self {
        Self {
            id,
            person_id,
            person_name,
            check_in,
            check_out,
            date,
            duration_minutes,
            source,
            confidence,
            marked_by,
            status,
            metadata,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }

    pub fn person_name(&self) -> &str {
        &self.person_name
    }

    pub fn check_in(&self) -> DateTime<Utc> {
        self.check_in
    }

    pub fn check_out(&self) -> Option<DateTime<Utc>> {
        self.check_out
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration_minutes
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn marked_by(&self) -> MarkedBy {
        self.marked_by
    }

    pub fn status(&self) -> AttendanceStatus {
        self.status
    }

    pub fn metadata(&self) -> &Json {
        &self.metadata
    }

    /// Sets check-out time. `checkout` must be `>= check_in`; the caller is
    /// responsible for that invariant (enforced at the repository boundary).
    pub fn check_out_at(&mut self, checkout: DateTime<Utc>) {
        let minutes = (checkout - self.check_in).num_seconds() / 60;
        self.check_out = Some(checkout);
        self.duration_minutes = Some(minutes.max(0));
        self.status = AttendanceStatus::Left;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_out_computes_duration_in_minutes() {
        let mut row = AttendanceRow::new(
            "A1".into(),
            "Alice".into(),
            "cam-1".into(),
            0.9,
            MarkedBy::Auto,
        );
        let checkout = row.check_in() + chrono::Duration::seconds(180);
        row.check_out_at(checkout);
        assert_eq!(row.duration_minutes(), Some(3));
        assert_eq!(row.status(), AttendanceStatus::Left);
    }
}
