mod api_key_repository;
mod attendance_repository;
mod detection_event_repository;
mod person_repository;
mod system_config_repository;
mod system_log_repository;

pub use api_key_repository::PgApiKeyRepository;
pub use attendance_repository::PgAttendanceRepository;
pub use detection_event_repository::PgDetectionEventRepository;
pub use person_repository::PgPersonRepository;
pub use system_config_repository::PgSystemConfigRepository;
pub use system_log_repository::PgSystemLogRepository;
