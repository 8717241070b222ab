//! Recognition Pipeline
//!
//! A real-time person-and-face recognition pipeline with attendance
//! tracking, built with Rust.
//!
//! # Architecture
//!
//! This application follows Clean Architecture principles:
//! - **Domain**: Core business entities and rules
//! - **Application**: Use cases and application services
//! - **Infrastructure**: External interfaces (DB, ingest transports, vision
//!   model backends)
//!
//! # References
//!
//! - Clean Architecture: https://blog.cleancoder.com/uncle-bob/2012/08/13/the-clean-architecture.html
//! - SOLID Principles: https://en.wikipedia.org/wiki/SOLID

mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::services::{
    AttendanceConfig, AttendanceService, Detector, EventBus, FaceMatcher, Orchestrator, OrchestratorConfig,
    PersonDetectorConfig, Recognizer, RecognizerConfig, Tracker,
};
use application::services::ports::SourceFactory;
use application::use_cases::RecognitionFacade;
use domain::entities::FaceEntry;
use domain::repositories::FaceStoreRepository;
use infrastructure::config::AppConfig;
use infrastructure::database::{create_pool, repositories::*, run_migrations};
use infrastructure::ingest::IngestSourceFactory;
use infrastructure::vision::face_detector::{DetectorConfig as BackendDetectorConfig, FaceDetector};
use infrastructure::vision::{Embedder, EmbedderConfig};
use infrastructure::{JsonFaceStore, JsonRunStateStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    info!("starting recognition pipeline v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let person_repo = Arc::new(PgPersonRepository::new(pool.clone()));
    let attendance_repo = Arc::new(PgAttendanceRepository::new(pool.clone()));
    let detection_event_repo = Arc::new(PgDetectionEventRepository::new(pool.clone()));
    let api_key_repo = Arc::new(PgApiKeyRepository::new(pool.clone()));
    let system_config_repo = Arc::new(PgSystemConfigRepository::new(pool.clone()));
    let system_log_repo = Arc::new(PgSystemLogRepository::new(pool));

    let run_state_store = Arc::new(JsonRunStateStore::new(config.run_state_path()));
    let face_store = Arc::new(JsonFaceStore::new(config.face_store_path()));

    let defaults = system_config_repo.get().await.unwrap_or_else(|_| config.defaults.clone());

    // Two independently configured detector-backend instances: a looser one
    // for person-scale localization, a stricter one for the face-recognition
    // step inside a person crop. Each owns its own dedicated thread.
    let person_detector_backend = Arc::new(FaceDetector::new(BackendDetectorConfig {
        min_face_size: 40,
        confidence_threshold: defaults.detector_min_confidence,
        ..Default::default()
    })?);
    let face_detector_backend = Arc::new(FaceDetector::new(BackendDetectorConfig::default())?);
    let embedder = Arc::new(Embedder::new(EmbedderConfig {
        device: defaults.detector_device.clone(),
        ..Default::default()
    })?);

    let detector = Arc::new(Detector::new(
        person_detector_backend,
        PersonDetectorConfig {
            min_confidence: defaults.detector_min_confidence,
            min_area: defaults.detector_min_area,
            max_aspect_ratio: defaults.detector_max_aspect_ratio,
            ..Default::default()
        },
    ));
    let tracker = Arc::new(Tracker::new(defaults.tracker_iou_threshold, defaults.tracker_max_age));

    let face_matcher = Arc::new(FaceMatcher::new(defaults.face_match_base_tolerance));
    load_face_matcher_cache(&face_matcher, face_store.as_ref()).await?;

    let recognizer = Arc::new(Recognizer::new(
        face_detector_backend.clone(),
        embedder.clone(),
        face_matcher.clone(),
        RecognizerConfig {
            quality_threshold: defaults.face_quality_threshold,
            ..Default::default()
        },
    ));

    let attendance = Arc::new(AttendanceService::new(
        attendance_repo,
        AttendanceConfig { duplicate_window_minutes: defaults.duplicate_window_minutes },
    ));

    let event_bus = Arc::new(EventBus::new());

    let orchestrator = Arc::new(Orchestrator::new(
        detector,
        tracker,
        recognizer,
        attendance.clone(),
        detection_event_repo.clone(),
        run_state_store.clone(),
        event_bus,
        OrchestratorConfig::default(),
    ));

    let source_factory: Arc<dyn SourceFactory> = Arc::new(IngestSourceFactory::new(defaults.frame_buffer_depth));

    // The facade is the process's embedding point for the control surface;
    // no transport consumes it here since there is no HTTP layer in this
    // binary. Kept alive for the process lifetime so other in-process
    // callers (tests, future transports) can reach it.
    let _facade = Arc::new(RecognitionFacade::new(
        orchestrator.clone(),
        source_factory.clone(),
        face_detector_backend,
        embedder,
        face_matcher,
        face_store,
        person_repo,
        attendance,
        detection_event_repo,
        system_config_repo,
        system_log_repo,
        api_key_repo,
    ));

    let run_state_existed = tokio::fs::try_exists(config.run_state_path()).await.unwrap_or(false);
    resume_background_loop(
        &orchestrator,
        run_state_store.as_ref(),
        source_factory.as_ref(),
        run_state_existed,
        config.default_source.as_deref(),
    )
    .await;

    info!("recognition pipeline running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    orchestrator.stop_background().await;

    Ok(())
}

/// Populates the in-memory matching mirror from the durable face store on
/// boot (matching always reads memory; the store is the durable copy).
async fn load_face_matcher_cache(matcher: &FaceMatcher, face_store: &dyn FaceStoreRepository) -> Result<()> {
    let entries: Vec<(String, String, domain::value_objects::FaceEncoding)> = face_store
        .list()
        .await?
        .into_iter()
        .map(|e: FaceEntry| (e.name().to_string(), e.person_id().to_string(), e.encoding().clone()))
        .collect();
    matcher.replace_cache(entries).await;
    Ok(())
}

/// Reopens the persisted source (if any) and resumes the background loop.
/// If no run-state record exists yet (first boot) and a default source is
/// configured, opens that instead. Failure to reopen is logged, not fatal -
/// the process starts up inactive rather than crashing.
async fn resume_background_loop(
    orchestrator: &Arc<Orchestrator>,
    run_state_store: &dyn domain::repositories::RunStateRepository,
    source_factory: &dyn SourceFactory,
    run_state_existed: bool,
    default_source: Option<&str>,
) {
    let state = match run_state_store.load().await {
        Ok(state) => state,
        Err(err) => {
            warn!("failed to load run state: {}", err);
            return;
        }
    };

    let source = if state.is_active() {
        match state.source().map(str::to_string) {
            Some(source) => source,
            None => return,
        }
    } else if !run_state_existed {
        let Some(default_source) = default_source else {
            return;
        };
        info!("no prior run state, opening configured default source {}", default_source);
        default_source.to_string()
    } else {
        return;
    };

    match source_factory.open(&source).await {
        Ok((ingestor, _source_type)) => {
            if let Err(err) = orchestrator.resume_from_run_state(ingestor).await {
                warn!("failed to resume background loop for {}: {}", source, err);
            }
        }
        Err(err) => warn!("failed to reopen persisted source {}: {}", source, err),
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
