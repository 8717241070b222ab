pub mod attendance_service;
pub mod detector;
pub mod event_bus;
pub mod face_matcher;
pub mod orchestrator;
pub mod ports;
pub mod recognizer;
pub mod tracker;

pub use attendance_service::{AttendanceConfig, AttendanceService, AutoMarkOutcome};
pub use detector::{Detector, DetectorConfig as PersonDetectorConfig};
pub use event_bus::{EventBus, EventSubscriber};
pub use face_matcher::{adaptive_tolerance, FaceMatcher, MatchResult};
pub use orchestrator::{InteractiveResult, Orchestrator, OrchestratorConfig};
pub use ports::{DetectionBackend, EmbeddingBackend};
pub use recognizer::{Recognizer, RecognizerConfig, RecognitionOutcome};
pub use tracker::Tracker;
