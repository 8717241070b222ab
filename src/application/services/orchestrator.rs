//! Orchestrator
//!
//! Runs the interactive (on-demand) and background (continuous) B→C→D loops
//! over a shared ingestor, detector, tracker, and recognizer, and persists
//! run-state on every source transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::services::attendance_service::{AttendanceService, AutoMarkOutcome};
use crate::application::services::detector::Detector;
use crate::application::services::event_bus::EventBus;
use crate::application::services::ports::FrameSource;
use crate::application::services::recognizer::{RecognitionOutcome, Recognizer};
use crate::application::services::tracker::Tracker;
use crate::domain::entities::{DetectionEvent, RunState, SourceType, Track, TrackStatus};
use crate::domain::events::{AttendanceCommittedEvent, DomainEvent, DuplicateSuppressedEvent, SourceChangedEvent, TrackObservedEvent};
use crate::domain::repositories::{DetectionEventRepository, RunStateRepository};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub background_cadence_ms: u64,
    pub no_frame_sleep_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            background_cadence_ms: 500,
            no_frame_sleep_ms: 500,
        }
    }
}

/// Result of a synchronous interactive recognition pass.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    pub tracks: Vec<Track>,
    pub active_tracks: usize,
}

struct ActiveSource {
    ingestor: Arc<dyn FrameSource>,
    tag: String,
    source_type: SourceType,
}

pub struct Orchestrator {
    active: RwLock<Option<ActiveSource>>,
    detector: Arc<Detector>,
    tracker: Arc<Tracker>,
    recognizer: Arc<Recognizer>,
    attendance: Arc<AttendanceService>,
    detection_events: Arc<dyn DetectionEventRepository>,
    run_state_repo: Arc<dyn RunStateRepository>,
    event_bus: Arc<EventBus>,
    config: OrchestratorConfig,
    background_running: Arc<AtomicBool>,
    background_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Arc<Detector>,
        tracker: Arc<Tracker>,
        recognizer: Arc<Recognizer>,
        attendance: Arc<AttendanceService>,
        detection_events: Arc<dyn DetectionEventRepository>,
        run_state_repo: Arc<dyn RunStateRepository>,
        event_bus: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            active: RwLock::new(None),
            detector,
            tracker,
            recognizer,
            attendance,
            detection_events,
            run_state_repo,
            event_bus,
            config,
            background_running: Arc::new(AtomicBool::new(false)),
            background_handle: Mutex::new(None),
        }
    }

    /// Resumes the background loop on process start if `RunState.active`.
    /// The caller supplies the reconstructed ingestor for the persisted
    /// source; this method does not know how to open sources itself.
    pub async fn resume_from_run_state(self: &Arc<Self>, ingestor: Arc<dyn FrameSource>) -> anyhow::Result<()> {
        let state = self.run_state_repo.load().await?;
        if !state.is_active() {
            return Ok(());
        }
        let (Some(source), Some(source_type)) = (state.source(), state.source_type()) else {
            return Ok(());
        };
        self.swap_source(ingestor, source.to_string(), source_type).await?;
        self.start_background().await;
        Ok(())
    }

    /// Atomically stops the current ingestor, persists the new run state,
    /// installs the new ingestor, and clears the tracker.
    pub async fn change_source(&self, ingestor: Arc<dyn FrameSource>, source: String, source_type: SourceType) -> anyhow::Result<()> {
        self.swap_source(ingestor, source, source_type).await
    }

    async fn swap_source(&self, ingestor: Arc<dyn FrameSource>, source: String, source_type: SourceType) -> anyhow::Result<()> {
        let mut active = self.active.write().await;

        if let Some(previous) = active.take() {
            previous.ingestor.close().await;
        }

        let state = RunState::active(source.clone(), source_type);
        self.run_state_repo.save(&state).await?;

        *active = Some(ActiveSource { ingestor, tag: source.clone(), source_type });
        drop(active);

        self.tracker.clear().await;

        self.event_bus.publish(DomainEvent::SourceChanged(SourceChangedEvent {
            source: Some(source),
            active: true,
            timestamp: Utc::now(),
        }));

        Ok(())
    }

    pub async fn clear_source(&self) -> anyhow::Result<()> {
        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            previous.ingestor.close().await;
        }
        self.run_state_repo.save(&RunState::inactive()).await?;
        drop(active);
        self.tracker.clear().await;

        self.event_bus.publish(DomainEvent::SourceChanged(SourceChangedEvent {
            source: None,
            active: false,
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    pub async fn current_source(&self) -> Option<(String, SourceType)> {
        self.active.read().await.as_ref().map(|a| (a.tag.clone(), a.source_type))
    }

    /// Pulls the latest frame (or uses a caller-supplied image) and runs
    /// B→C→D synchronously. Never commits attendance.
    pub async fn recognize_now(&self, image: Option<DynamicImage>) -> anyhow::Result<InteractiveResult> {
        let decoded = match image {
            Some(img) => Some(img),
            None => self.pull_frame().await,
        };

        let Some(image) = decoded else {
            return Ok(InteractiveResult { tracks: Vec::new(), active_tracks: 0 });
        };

        let tracks = self.run_pipeline(&image, None).await?;
        let active_tracks = tracks.len();
        Ok(InteractiveResult { tracks, active_tracks })
    }

    async fn pull_frame(&self) -> Option<DynamicImage> {
        let active = self.active.read().await;
        let source = active.as_ref()?;
        let frame = source.ingestor.latest_frame().await?;
        frame.to_dynamic_image()
    }

    /// Runs detection, tracking, and recognition for one decoded frame. If
    /// `source_tag` is provided, observed tracks are published on the event
    /// bus (used by the background loop; the interactive loop passes `None`).
    async fn run_pipeline(&self, image: &DynamicImage, source_tag: Option<&str>) -> anyhow::Result<Vec<Track>> {
        let detections = self.detector.detect(image).await?;
        let tracks = self.tracker.update(&detections).await;

        for track in &tracks {
            let person_crop = crop_person(image, &tracks, track.track_id());
            let Some(person_crop) = person_crop else {
                continue;
            };

            match self.recognizer.recognize(&person_crop, track).await? {
                RecognitionOutcome::Skipped | RecognitionOutcome::NoFace => {}
                RecognitionOutcome::Known { face_bbox, name, person_id, face_confidence } => {
                    self.tracker.report_known_face(track.track_id(), name, person_id, face_bbox, face_confidence).await;
                }
                RecognitionOutcome::Unknown { face_bbox, face_confidence } => {
                    self.tracker.report_unknown_face(track.track_id(), face_bbox, face_confidence).await;
                }
            }
        }

        self.tracker.decay_face_memory(3.0).await;
        let updated = self.tracker.live_tracks().await;

        if let Some(tag) = source_tag {
            for track in &updated {
                self.event_bus.publish(DomainEvent::TrackObserved(TrackObservedEvent {
                    track: track.clone(),
                    source: tag.to_string(),
                    timestamp: Utc::now(),
                }));
            }
        }

        Ok(updated)
    }

    /// Spawns the background task. Must be called on an `Arc<Orchestrator>`
    /// since the task outlives the calling stack frame.
    pub async fn start_background(self: &Arc<Self>) {
        if self.background_running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("background recognition loop starting");

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            this.background_loop().await;
        });

        *self.background_handle.lock().await = Some(handle);
    }

    pub async fn stop_background(&self) {
        self.background_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.background_handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    pub fn is_background_running(&self) -> bool {
        self.background_running.load(Ordering::SeqCst)
    }

    async fn background_loop(&self) {
        while self.background_running.load(Ordering::SeqCst) {
            let Some(image) = self.pull_frame().await else {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.no_frame_sleep_ms)).await;
                continue;
            };

            let source_tag = self.current_source().await.map(|(tag, _)| tag);
            let tracks = match self.run_pipeline(&image, source_tag.as_deref()).await {
                Ok(tracks) => tracks,
                Err(err) => {
                    warn!("background pipeline error: {}", err);
                    tokio::time::sleep(std::time::Duration::from_millis(self.config.background_cadence_ms)).await;
                    continue;
                }
            };

            let tag = source_tag.unwrap_or_else(|| "unknown".to_string());
            for track in &tracks {
                self.commit_and_audit(track, &tag).await;
            }

            tokio::time::sleep(std::time::Duration::from_millis(self.config.background_cadence_ms)).await;
        }
        info!("background recognition loop stopped");
    }

    async fn commit_and_audit(&self, track: &Track, source_tag: &str) {
        let mut attendance_id = None;

        if track.status() == TrackStatus::Known {
            if let (Some(person_id), Some(name)) = (track.person_id(), track.name()) {
                match self.attendance.mark_auto(person_id, name, track.face_confidence(), source_tag).await {
                    Ok(AutoMarkOutcome::Committed(row)) => {
                        attendance_id = Some(row.id());
                        self.event_bus.publish(DomainEvent::AttendanceCommitted(AttendanceCommittedEvent {
                            attendance: row,
                            timestamp: Utc::now(),
                        }));
                    }
                    Ok(AutoMarkOutcome::Suppressed) => {
                        debug!("attendance auto-mark suppressed for {}", person_id);
                        self.event_bus.publish(DomainEvent::DuplicateSuppressed(DuplicateSuppressedEvent {
                            person_id: person_id.to_string(),
                            timestamp: Utc::now(),
                        }));
                    }
                    Err(err) => warn!("attendance auto-mark failed: {}", err),
                }
            }
        }

        let event = DetectionEvent::new(
            track.person_id().map(String::from),
            track.name().unwrap_or("unknown").to_string(),
            track.face_confidence(),
            source_tag.to_string(),
            attendance_id,
        );
        if let Err(err) = self.detection_events.save(&event).await {
            warn!("failed to save detection event: {}", err);
        }
    }
}

/// Crops the person region for a track out of the full frame. Tracks with
/// the given `track_id` are assumed unique within `tracks`.
fn crop_person(image: &DynamicImage, tracks: &[Track], track_id: u64) -> Option<DynamicImage> {
    use image::GenericImageView;

    let track = tracks.iter().find(|t| t.track_id() == track_id)?;
    let bbox = track.bbox().clamp_to(image.width() as i32, image.height() as i32);
    if bbox.width() <= 0 || bbox.height() <= 0 {
        return None;
    }
    Some(image.crop_imm(bbox.x() as u32, bbox.y() as u32, bbox.width() as u32, bbox.height() as u32))
}
