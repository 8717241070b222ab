//! Tracker Service
//!
//! Assigns stable integer identities to person detections across frames via
//! IoU-based greedy association, and holds per-track face memory.

use tokio::sync::Mutex;

use crate::domain::entities::{Track, TrackStatus};
use crate::domain::value_objects::BoundingBox;

struct TrackerState {
    tracks: Vec<Track>,
    next_track_id: u64,
}

/// Multi-person tracker. Guarded by a single mutex: held for the
/// duration of one `update`, never across a detector or recognizer call.
pub struct Tracker {
    state: Mutex<TrackerState>,
    iou_threshold: f32,
    max_age: u32,
}

impl Tracker {
    pub fn new(iou_threshold: f32, max_age: u32) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                tracks: Vec::new(),
                next_track_id: 1,
            }),
            iou_threshold,
            max_age,
        }
    }

    /// Associates this frame's detections with existing tracks, creates new
    /// tracks for unmatched detections, ages out unmatched tracks, and
    /// returns the resulting live set.
    pub async fn update(&self, detections: &[(BoundingBox, f32)]) -> Vec<Track> {
        let mut state = self.state.lock().await;

        let mut candidates: Vec<(usize, usize, f32)> = Vec::new();
        for (track_idx, track) in state.tracks.iter().enumerate() {
            for (det_idx, (bbox, _)) in detections.iter().enumerate() {
                let iou = track.bbox().iou(bbox);
                if iou >= self.iou_threshold {
                    candidates.push((track_idx, det_idx, iou));
                }
            }
        }
        candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut matched_tracks = vec![false; state.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];
        let mut assignments: Vec<(usize, usize)> = Vec::new();

        for (track_idx, det_idx, _) in candidates {
            if matched_tracks[track_idx] || matched_dets[det_idx] {
                continue;
            }
            matched_tracks[track_idx] = true;
            matched_dets[det_idx] = true;
            assignments.push((track_idx, det_idx));
        }

        for (track_idx, det_idx) in assignments {
            let (bbox, confidence) = &detections[det_idx];
            state.tracks[track_idx].observe(bbox.clone(), *confidence);
        }

        for (track_idx, was_matched) in matched_tracks.iter().enumerate() {
            if !was_matched {
                state.tracks[track_idx].mark_lost();
            }
        }

        for (det_idx, (bbox, confidence)) in detections.iter().enumerate() {
            if !matched_dets[det_idx] {
                let track_id = state.next_track_id;
                state.next_track_id += 1;
                state.tracks.push(Track::new(track_id, bbox.clone(), *confidence));
            }
        }

        let max_age = self.max_age;
        state.tracks.retain(|t| !t.should_remove(max_age));

        state.tracks.clone()
    }

    /// Records a known-face match for `track_id`, if it still exists.
    pub async fn report_known_face(
        &self,
        track_id: u64,
        name: String,
        person_id: String,
        face_bbox: BoundingBox,
        face_confidence: f32,
    ) {
        let mut state = self.state.lock().await;
        if let Some(track) = state.tracks.iter_mut().find(|t| t.track_id() == track_id) {
            track.set_known(name, person_id, face_bbox, face_confidence);
        }
    }

    /// Records a detected-but-unmatched face for `track_id`, if it still exists.
    pub async fn report_unknown_face(&self, track_id: u64, face_bbox: BoundingBox, face_confidence: f32) {
        let mut state = self.state.lock().await;
        if let Some(track) = state.tracks.iter_mut().find(|t| t.track_id() == track_id) {
            track.set_unknown(face_bbox, face_confidence);
        }
    }

    /// Decays stale face memory across all live tracks.
    pub async fn decay_face_memory(&self, face_memory_time_secs: f64) {
        let mut state = self.state.lock().await;
        for track in state.tracks.iter_mut() {
            track.decay_face_memory(face_memory_time_secs);
        }
    }

    /// Returns the current live set without mutating it.
    pub async fn live_tracks(&self) -> Vec<Track> {
        self.state.lock().await.tracks.clone()
    }

    /// Returns only tracks in a given status, e.g. for the Recognizer's
    /// per-track rate limiting.
    pub async fn tracks_with_status(&self, status: TrackStatus) -> Vec<Track> {
        self.state
            .lock()
            .await
            .tracks
            .iter()
            .filter(|t| t.status() == status)
            .cloned()
            .collect()
    }

    /// Clears all tracks, e.g. on source change.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: i32, y: i32) -> BoundingBox {
        BoundingBox::new(x, y, 100, 100)
    }

    #[tokio::test]
    async fn unmatched_detection_creates_new_track() {
        let tracker = Tracker::new(0.3, 3);
        let tracks = tracker.update(&[(bbox(0, 0), 0.9)]).await;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 1);
    }

    #[tokio::test]
    async fn overlapping_detection_reuses_track_id() {
        let tracker = Tracker::new(0.3, 3);
        tracker.update(&[(bbox(0, 0), 0.9)]).await;
        let tracks = tracker.update(&[(bbox(5, 5), 0.9)]).await;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 1);
    }

    #[tokio::test]
    async fn track_ids_are_never_reused_after_removal() {
        let tracker = Tracker::new(0.3, 3);
        tracker.update(&[(bbox(0, 0), 0.9)]).await;
        for _ in 0..5 {
            tracker.update(&[]).await;
        }
        let tracks = tracker.update(&[(bbox(500, 500), 0.9)]).await;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 2);
    }

    #[tokio::test]
    async fn track_decays_after_max_age_missed_frames() {
        let tracker = Tracker::new(0.3, 3);
        tracker.update(&[(bbox(0, 0), 0.9)]).await;
        for _ in 0..3 {
            let tracks = tracker.update(&[]).await;
            assert_eq!(tracks.len(), 1);
        }
        let tracks = tracker.update(&[]).await;
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn non_overlapping_detections_create_distinct_tracks() {
        let tracker = Tracker::new(0.3, 3);
        let tracks = tracker.update(&[(bbox(0, 0), 0.9), (bbox(500, 500), 0.8)]).await;
        assert_eq!(tracks.len(), 2);
    }
}
