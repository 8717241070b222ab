//! Track Entity
//!
//! A live identity held by the Tracker across consecutive frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::BoundingBox;

/// Recognition status of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// No face has matched yet; default on creation.
    Tracking,
    /// A face was matched against the face store.
    Known,
    /// A face was detected but no match was found.
    Unknown,
}

impl Default for TrackStatus {
    fn default() -> Self {
        Self::Tracking
    }
}

/// Advisory overlay color for a consuming renderer. Not a protocol value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackColor {
    Green,
    Red,
    Yellow,
}

impl TrackStatus {
    pub fn advisory_color(&self) -> TrackColor {
        match self {
            TrackStatus::Known => TrackColor::Green,
            TrackStatus::Unknown => TrackColor::Red,
            TrackStatus::Tracking => TrackColor::Yellow,
        }
    }
}

/// A person identity tracked across frames, with optional face memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    track_id: u64,
    bbox: BoundingBox,
    detection_confidence: f32,
    face_bbox: Option<BoundingBox>,
    name: Option<String>,
    person_id: Option<String>,
    face_confidence: f32,
    status: TrackStatus,
    frames_tracked: u32,
    frames_lost: u32,
    first_seen_ts: DateTime<Utc>,
    last_seen_ts: DateTime<Utc>,
    face_last_seen_ts: Option<DateTime<Utc>>,
}

impl Track {
    /// Creates a new track from an initial detection.
    pub fn new(track_id: u64, bbox: BoundingBox, detection_confidence: f32) -> Self {
        let now = Utc::now();
        Self {
            track_id,
            bbox,
            detection_confidence,
            face_bbox: None,
            name: None,
            person_id: None,
            face_confidence: 0.0,
            status: TrackStatus::default(),
            frames_tracked: 1,
            frames_lost: 0,
            first_seen_ts: now,
            last_seen_ts: now,
            face_last_seen_ts: None,
        }
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn detection_confidence(&self) -> f32 {
        self.detection_confidence
    }

    pub fn face_bbox(&self) -> Option<&BoundingBox> {
        self.face_bbox.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn person_id(&self) -> Option<&str> {
        self.person_id.as_deref()
    }

    pub fn face_confidence(&self) -> f32 {
        self.face_confidence
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    pub fn frames_tracked(&self) -> u32 {
        self.frames_tracked
    }

    pub fn frames_lost(&self) -> u32 {
        self.frames_lost
    }

    pub fn first_seen_ts(&self) -> DateTime<Utc> {
        self.first_seen_ts
    }

    pub fn last_seen_ts(&self) -> DateTime<Utc> {
        self.last_seen_ts
    }

    pub fn face_last_seen_ts(&self) -> Option<DateTime<Utc>> {
        self.face_last_seen_ts
    }

    /// Applies a matched detection to this track for the current frame.
    pub fn observe(&mut self, bbox: BoundingBox, detection_confidence: f32) {
        self.bbox = bbox;
        self.detection_confidence = detection_confidence;
        self.frames_tracked += 1;
        self.frames_lost = 0;
        self.last_seen_ts = Utc::now();
    }

    /// Marks this track as unmatched for the current frame.
    pub fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }

    /// Records a known-face match. Transitions `Tracking`/`Unknown → Known`.
    pub fn set_known(
        &mut self,
        name: String,
        person_id: String,
        face_bbox: BoundingBox,
        face_confidence: f32,
    ) {
        self.name = Some(name);
        self.person_id = Some(person_id);
        self.face_bbox = Some(face_bbox);
        self.face_confidence = face_confidence;
        self.status = TrackStatus::Known;
        self.face_last_seen_ts = Some(Utc::now());
    }

    /// Records a detected-but-unmatched face. Leaves an already-`Known` track
    /// unchanged: a track never regresses from Known back to Unknown.
    pub fn set_unknown(&mut self, face_bbox: BoundingBox, face_confidence: f32) {
        if self.status == TrackStatus::Known {
            return;
        }
        self.face_bbox = Some(face_bbox);
        self.face_confidence = face_confidence;
        self.status = TrackStatus::Unknown;
        self.face_last_seen_ts = Some(Utc::now());
    }

    /// Decays stale face memory older than `face_memory_time` seconds,
    /// leaving `track_id` and tracking status untouched.
    pub fn decay_face_memory(&mut self, face_memory_time_secs: f64) {
        let Some(last_seen) = self.face_last_seen_ts else {
            return;
        };
        let age = (Utc::now() - last_seen).num_milliseconds() as f64 / 1000.0;
        if age > face_memory_time_secs && self.status != TrackStatus::Known {
            self.face_bbox = None;
            self.face_confidence = 0.0;
        }
    }

    /// True once `frames_lost` exceeds `max_age`.
    pub fn should_remove(&self, max_age: u32) -> bool {
        self.frames_lost > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0, 0, 100, 200)
    }

    #[test]
    fn new_track_defaults_to_tracking_status() {
        let track = Track::new(1, bbox(), 0.9);
        assert_eq!(track.status(), TrackStatus::Tracking);
        assert_eq!(track.frames_lost(), 0);
    }

    #[test]
    fn set_known_transitions_status_and_fills_identity() {
        let mut track = Track::new(1, bbox(), 0.9);
        track.set_known("Alice".into(), "A1".into(), bbox(), 0.8);
        assert_eq!(track.status(), TrackStatus::Known);
        assert_eq!(track.name(), Some("Alice"));
        assert_eq!(track.person_id(), Some("A1"));
    }

    #[test]
    fn known_track_does_not_regress_to_unknown() {
        let mut track = Track::new(1, bbox(), 0.9);
        track.set_known("Alice".into(), "A1".into(), bbox(), 0.8);
        track.set_unknown(bbox(), 0.2);
        assert_eq!(track.status(), TrackStatus::Known);
    }

    #[test]
    fn should_remove_respects_max_age() {
        let mut track = Track::new(1, bbox(), 0.9);
        for _ in 0..3 {
            track.mark_lost();
        }
        assert!(!track.should_remove(3));
        track.mark_lost();
        assert!(track.should_remove(3));
    }

    #[test]
    fn advisory_color_matches_status() {
        assert_eq!(TrackStatus::Known.advisory_color(), TrackColor::Green);
        assert_eq!(TrackStatus::Unknown.advisory_color(), TrackColor::Red);
        assert_eq!(TrackStatus::Tracking.advisory_color(), TrackColor::Yellow);
    }
}
