pub mod api_key;
pub mod attendance;
pub mod detection_event;
pub mod face_entry;
pub mod person;
pub mod run_state;
pub mod system_config;
pub mod system_log;
pub mod track;

pub use api_key::ApiKey;
pub use attendance::{AttendanceRow, AttendanceStatus, MarkedBy};
pub use detection_event::DetectionEvent;
pub use face_entry::FaceEntry;
pub use person::{Person, PersonStatus};
pub use run_state::{RunState, SourceType};
pub use system_config::SystemConfigRow;
pub use system_log::{LogLevel, SystemLogRow};
pub use track::{Track, TrackColor, TrackStatus};
