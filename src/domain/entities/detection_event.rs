//! Detection Event Entity
//!
//! Append-only audit record emitted for every observed track, regardless of
//! recognition status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

/// Append-only audit row for an observed track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    id: Uuid,
    person_id: Option<String>,
    person_name: String,
    ts: DateTime<Utc>,
    confidence: f32,
    source: String,
    attendance_id: Option<Uuid>,
    metadata: Json,
}

impl DetectionEvent {
    /// Creates a new detection event for the current instant.
    pub fn new(
        person_id: Option<String>,
        person_name: String,
        confidence: f32,
        source: String,
        attendance_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            person_id,
            person_name,
            ts: Utc::now(),
            confidence,
            source,
            attendance_id,
            metadata: Json::Object(Default::default()),
        }
    }

    /// Reconstructs a detection event from database fields.
    pub fn from_db(
        id: Uuid,
        person_id: Option<String>,
        person_name: String,
        ts: DateTime<Utc>,
        confidence: f32,
        source: String,
        attendance_id: Option<Uuid>,
        metadata: Json,
    ) -> Self {
        Self {
            id,
            person_id,
            person_name,
            ts,
            confidence,
            source,
            attendance_id,
            metadata,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn person_id(&self) -> Option<&str> {
        self.person_id.as_deref()
    }

    pub fn person_name(&self) -> &str {
        &self.person_name
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn attendance_id(&self) -> Option<Uuid> {
        self.attendance_id
    }

    pub fn metadata(&self) -> &Json {
        &self.metadata
    }
}
