//! Repository Traits
//!
//! Abstractions for data persistence (Dependency Inversion Principle).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    ApiKey, AttendanceRow, DetectionEvent, FaceEntry, Person, RunState, SystemConfigRow, SystemLogRow,
};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Person repository interface.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    async fn find_by_id(&self, person_id: &str) -> RepoResult<Option<Person>>;
    async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<Person>>;
    async fn save(&self, person: &Person) -> RepoResult<()>;
    async fn update(&self, person: &Person) -> RepoResult<()>;
    async fn delete(&self, person_id: &str) -> RepoResult<()>;
    async fn count(&self) -> RepoResult<i64>;
}

/// Attendance repository interface. Duplicate suppression is
/// implemented by `mark_auto` as a single statement, not as a
/// check-then-insert pair, to avoid TOCTOU races between concurrent callers.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<AttendanceRow>>;

    async fn list(
        &self,
        person_id: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> RepoResult<Vec<AttendanceRow>>;

    async fn today(&self) -> RepoResult<Vec<AttendanceRow>>;

    async fn for_person(&self, person_id: &str, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<AttendanceRow>>;

    /// Inserts an auto attendance row unless suppressed by the duplicate
    /// window. Returns `Ok(None)` on suppression (not an error).
    async fn mark_auto(
        &self,
        row: &AttendanceRow,
        duplicate_window_minutes: i64,
    ) -> RepoResult<Option<AttendanceRow>>;

    /// Inserts a manual attendance row; bypasses duplicate suppression.
    async fn mark_manual(&self, row: &AttendanceRow) -> RepoResult<AttendanceRow>;

    async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<AttendanceRow>;
}

/// Detection-event repository interface (append-only audit).
#[async_trait]
pub trait DetectionEventRepository: Send + Sync {
    async fn save(&self, event: &DetectionEvent) -> RepoResult<()>;
    async fn list(
        &self,
        person_id: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> RepoResult<Vec<DetectionEvent>>;
}

/// API-key repository interface.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn find_by_hash(&self, key_hash: &str) -> RepoResult<Option<ApiKey>>;
    async fn save(&self, key: &ApiKey) -> RepoResult<()>;
    async fn revoke(&self, id: Uuid) -> RepoResult<()>;
}

/// System-config repository interface; single-row persistence.
#[async_trait]
pub trait SystemConfigRepository: Send + Sync {
    async fn get(&self) -> RepoResult<SystemConfigRow>;
    async fn save(&self, config: &SystemConfigRow) -> RepoResult<()>;
}

/// System-log repository interface.
#[async_trait]
pub trait SystemLogRepository: Send + Sync {
    async fn append(&self, row: &SystemLogRow) -> RepoResult<()>;
    async fn list(
        &self,
        level: Option<crate::domain::entities::LogLevel>,
        limit: i64,
    ) -> RepoResult<Vec<SystemLogRow>>;
}

/// Face Store interface: an append-only, process-lock-guarded blob of face
/// exemplars. Implementations persist to a single file with
/// write-to-temp-then-rename atomicity.
#[async_trait]
pub trait FaceStoreRepository: Send + Sync {
    async fn add(&self, entry: FaceEntry) -> RepoResult<FaceEntry>;
    async fn list(&self) -> RepoResult<Vec<FaceEntry>>;
    async fn clear(&self) -> RepoResult<()>;
    async fn count(&self) -> RepoResult<usize>;
}

/// Run-State Store interface: a single durable record at a fixed path,
/// atomically replaced.
#[async_trait]
pub trait RunStateRepository: Send + Sync {
    async fn load(&self) -> RepoResult<RunState>;
    async fn save(&self, state: &RunState) -> RepoResult<()>;
}
