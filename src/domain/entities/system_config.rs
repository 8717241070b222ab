//! System Config Entity
//!
//! The single-row runtime-overridable configuration blob backing
//! `config:get|set`. Seeded from `AppConfig`'s compiled defaults and mutable
//! from there on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime-overridable numeric/string tunables for the detection, tracking,
/// and matching pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfigRow {
    pub detector_min_confidence: f32,
    pub detector_min_area: i32,
    pub detector_max_aspect_ratio: f32,
    pub tracker_iou_threshold: f32,
    pub tracker_max_age: u32,
    pub face_memory_time_secs: f64,
    pub face_match_base_tolerance: f32,
    pub face_quality_threshold: f32,
    pub tracking_ttl_secs: f64,
    pub duplicate_window_minutes: i64,
    pub max_width: u32,
    pub max_height: u32,
    pub reconnect_backoff_secs: u64,
    /// Execution provider the embedding backend should prefer: `"cpu"` or
    /// `"accelerator"`. Falls back to CPU if the accelerator is unavailable.
    pub detector_device: String,
    /// Depth of the in-memory latest-frame buffer each ingest source holds.
    pub frame_buffer_depth: u32,
    pub debug: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for SystemConfigRow {
    fn default() -> Self {
        Self {
            detector_min_confidence: 0.65,
            detector_min_area: 3000,
            detector_max_aspect_ratio: 4.0,
            tracker_iou_threshold: 0.3,
            tracker_max_age: 3,
            face_memory_time_secs: 3.0,
            face_match_base_tolerance: 0.65,
            face_quality_threshold: 0.25,
            tracking_ttl_secs: 2.0,
            duplicate_window_minutes: 5,
            max_width: 1280,
            max_height: 720,
            reconnect_backoff_secs: 5,
            detector_device: "cpu".to_string(),
            frame_buffer_depth: 1,
            debug: false,
            updated_at: Utc::now(),
        }
    }
}

impl SystemConfigRow {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
