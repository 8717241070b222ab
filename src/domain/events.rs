//! Domain Events
//!
//! Events broadcast by the Orchestrator as it sequences a frame through the
//! pipeline. Consumed internally by the Facade (`background_status`,
//! `stream`) rather than by an external transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{AttendanceRow, Track};

/// A domain event broadcast on the orchestrator's event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A track was observed during a B→C→D pass (interactive or background).
    TrackObserved(TrackObservedEvent),
    /// An auto attendance row was committed (duplicate suppression passed).
    AttendanceCommitted(AttendanceCommittedEvent),
    /// An auto attendance insert was suppressed as a duplicate.
    DuplicateSuppressed(DuplicateSuppressedEvent),
    /// The active source changed.
    SourceChanged(SourceChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObservedEvent {
    pub track: Track,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceCommittedEvent {
    pub attendance: AttendanceRow,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSuppressedEvent {
    pub person_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChangedEvent {
    pub source: Option<String>,
    pub active: bool,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TrackObserved(_) => "track_observed",
            DomainEvent::AttendanceCommitted(_) => "attendance_committed",
            DomainEvent::DuplicateSuppressed(_) => "duplicate_suppressed",
            DomainEvent::SourceChanged(_) => "source_changed",
        }
    }
}
