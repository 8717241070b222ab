//! Recognition Service Facade
//!
//! Typed async methods for every named control-surface operation. The
//! HTTP transport that would expose these over a network is out of scope;
//! this is the contract the transport would call into.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use image::{DynamicImage, GenericImageView};
use uuid::Uuid;

use crate::application::services::attendance_service::{AttendanceService, AutoMarkOutcome};
use crate::application::services::orchestrator::{InteractiveResult, Orchestrator};
use crate::application::services::ports::{DetectionBackend, EmbeddingBackend, SourceFactory};
use crate::application::services::face_matcher::FaceMatcher;
use crate::domain::entities::{ApiKey, AttendanceRow, FaceEntry, Person, PersonStatus, SystemConfigRow, SystemLogRow};
use crate::domain::repositories::{
    ApiKeyRepository, DetectionEventRepository, FaceStoreRepository, PersonRepository, RepoResult, RepositoryError,
    SystemConfigRepository, SystemLogRepository,
};

/// Error taxonomy surfaced to Facade callers. `DuplicateSuppressed`
/// deliberately has no variant here: it is internal and never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error("failed to open source: {0}")]
    SourceOpenFailed(String),
    #[error("no frame available")]
    FrameUnavailable,
    #[error("no face detected")]
    NoFace,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("person not found")]
    PersonNotFound,
    #[error("person already exists")]
    PersonAlreadyExists,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for FacadeError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => FacadeError::Internal(msg),
            other => FacadeError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for FacadeError {
    fn from(err: anyhow::Error) -> Self {
        FacadeError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CurrentSourceView {
    pub uri: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct BackgroundStatusView {
    pub active: bool,
    pub source: Option<String>,
    pub background_running: bool,
}

#[derive(Debug, Clone)]
pub struct AttendanceMarkRequest {
    pub person_id: String,
    pub person_name: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_present: usize,
    pub total_checked_out: usize,
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub ok: bool,
    pub background_running: bool,
    pub face_store_count: usize,
}

/// Result of issuing a new API key: the stored record plus the plaintext
/// secret, which is returned exactly once and never persisted.
#[derive(Debug, Clone)]
pub struct CreatedApiKey {
    pub api_key: ApiKey,
    pub secret: String,
}

/// The full control surface, implemented as typed async methods.
/// A `None` permission check is performed when `key` is `None` (unauthenticated
/// callers are rejected up front by `authorize`).
pub struct RecognitionFacade {
    orchestrator: Arc<Orchestrator>,
    source_factory: Arc<dyn SourceFactory>,
    registration_detector: Arc<dyn DetectionBackend>,
    embedder: Arc<dyn EmbeddingBackend>,
    face_matcher: Arc<FaceMatcher>,
    face_store: Arc<dyn FaceStoreRepository>,
    person_repo: Arc<dyn PersonRepository>,
    attendance: Arc<AttendanceService>,
    detection_events: Arc<dyn DetectionEventRepository>,
    system_config: Arc<dyn SystemConfigRepository>,
    system_logs: Arc<dyn SystemLogRepository>,
    api_keys: Arc<dyn ApiKeyRepository>,
}

impl RecognitionFacade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        source_factory: Arc<dyn SourceFactory>,
        registration_detector: Arc<dyn DetectionBackend>,
        embedder: Arc<dyn EmbeddingBackend>,
        face_matcher: Arc<FaceMatcher>,
        face_store: Arc<dyn FaceStoreRepository>,
        person_repo: Arc<dyn PersonRepository>,
        attendance: Arc<AttendanceService>,
        detection_events: Arc<dyn DetectionEventRepository>,
        system_config: Arc<dyn SystemConfigRepository>,
        system_logs: Arc<dyn SystemLogRepository>,
        api_keys: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        Self {
            orchestrator,
            source_factory,
            registration_detector,
            embedder,
            face_matcher,
            face_store,
            person_repo,
            attendance,
            detection_events,
            system_config,
            system_logs,
            api_keys,
        }
    }

    fn authorize(&self, key: Option<&ApiKey>, permission: &str) -> Result<(), FacadeError> {
        let Some(key) = key else {
            return Err(FacadeError::Unauthenticated);
        };
        if !key.is_valid() {
            return Err(FacadeError::Unauthenticated);
        }
        if !key.grants(permission) {
            return Err(FacadeError::PermissionDenied);
        }
        Ok(())
    }

    // --- Core recognition & sources -----------------------------------

    /// Fast-path registration: upsample=0 only, since the subject is close.
    pub async fn register(&self, key: Option<&ApiKey>, name: &str, person_id: &str, image_bytes: &[u8]) -> Result<FaceEntry, FacadeError> {
        self.authorize(key, "person:*")?;
        let image = decode_image(image_bytes)?;
        let (encoding, _bbox) = self.best_single_face_encoding(&image).await?;

        let entry = FaceEntry::new(name.to_string(), person_id.to_string(), encoding.clone(), String::new());
        let saved = self.face_store.add(entry).await?;
        self.face_matcher.add_to_cache(name.to_string(), person_id.to_string(), encoding).await;

        self.upsert_person(person_id, name).await?;
        Ok(saved)
    }

    pub async fn register_face_for_existing_person(&self, key: Option<&ApiKey>, person_id: &str, image_bytes: &[u8]) -> Result<FaceEntry, FacadeError> {
        self.authorize(key, "person:*")?;
        let person = self.person_repo.find_by_id(person_id).await?;
        let Some(person) = person else {
            return Err(FacadeError::PersonNotFound);
        };

        let image = decode_image(image_bytes)?;
        let (encoding, _bbox) = self.best_single_face_encoding(&image).await?;

        let entry = FaceEntry::new(person.name().to_string(), person_id.to_string(), encoding.clone(), String::new());
        let saved = self.face_store.add(entry).await?;
        self.face_matcher.add_to_cache(person.name().to_string(), person_id.to_string(), encoding).await;
        Ok(saved)
    }

    async fn best_single_face_encoding(&self, image: &DynamicImage) -> Result<(crate::domain::value_objects::FaceEncoding, crate::domain::value_objects::BoundingBox), FacadeError> {
        let faces = self
            .registration_detector
            .detect(image)
            .await
            .map_err(|e| FacadeError::InvalidImage(e.to_string()))?;

        let best = faces
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let Some((bbox, _confidence)) = best else {
            return Err(FacadeError::NoFace);
        };

        let clamped = bbox.clamp_to(image.width() as i32, image.height() as i32);
        if clamped.width() <= 0 || clamped.height() <= 0 {
            return Err(FacadeError::NoFace);
        }

        let crop = image.crop_imm(clamped.x() as u32, clamped.y() as u32, clamped.width() as u32, clamped.height() as u32);
        let encoding = self.embedder.encode(&crop).await.map_err(|e| FacadeError::Internal(e.to_string()))?;
        Ok((encoding, clamped))
    }

    async fn upsert_person(&self, person_id: &str, name: &str) -> RepoResult<()> {
        match self.person_repo.find_by_id(person_id).await? {
            Some(mut person) => {
                person.set_name(name.to_string());
                self.person_repo.update(&person).await
            }
            None => {
                let person = Person::new(person_id.to_string(), name.to_string());
                self.person_repo.save(&person).await
            }
        }
    }

    pub async fn recognize_now(&self, key: Option<&ApiKey>, image_bytes: Option<&[u8]>) -> Result<InteractiveResult, FacadeError> {
        self.authorize(key, "*")?;
        let decoded = match image_bytes {
            Some(bytes) => Some(decode_image(bytes)?),
            None => None,
        };
        self.orchestrator.recognize_now(decoded).await.map_err(FacadeError::from)
    }

    pub async fn list_faces(&self, key: Option<&ApiKey>) -> Result<Vec<FaceEntry>, FacadeError> {
        self.authorize(key, "person:*")?;
        Ok(self.face_store.list().await?)
    }

    pub async fn clear_faces(&self, key: Option<&ApiKey>) -> Result<(), FacadeError> {
        self.authorize(key, "admin")?;
        self.face_store.clear().await?;
        self.face_matcher.clear_cache().await;
        Ok(())
    }

    pub async fn change_source(&self, key: Option<&ApiKey>, uri: &str) -> Result<(), FacadeError> {
        self.authorize(key, "system:*")?;
        let (ingestor, source_type) = self
            .source_factory
            .open(uri)
            .await
            .map_err(|e| FacadeError::SourceOpenFailed(e.to_string()))?;
        self.orchestrator.change_source(ingestor, uri.to_string(), source_type).await?;
        Ok(())
    }

    pub async fn validate_source(&self, key: Option<&ApiKey>, uri: &str) -> Result<(), FacadeError> {
        self.authorize(key, "system:*")?;
        self.source_factory.validate(uri).await.map_err(|e| FacadeError::SourceOpenFailed(e.to_string()))
    }

    pub async fn current_source(&self, key: Option<&ApiKey>) -> Result<CurrentSourceView, FacadeError> {
        self.authorize(key, "system:*")?;
        let current = self.orchestrator.current_source().await;
        Ok(CurrentSourceView {
            uri: current.as_ref().map(|(uri, _)| uri.clone()),
            active: current.is_some(),
        })
    }

    pub async fn background_status(&self, key: Option<&ApiKey>) -> Result<BackgroundStatusView, FacadeError> {
        self.authorize(key, "system:*")?;
        let current = self.orchestrator.current_source().await;
        Ok(BackgroundStatusView {
            active: current.is_some(),
            source: current.map(|(uri, _)| uri),
            background_running: self.orchestrator.is_background_running(),
        })
    }

    // --- Attendance & people ---------------------------------------------

    pub async fn person_create(&self, key: Option<&ApiKey>, person_id: &str, name: &str) -> Result<Person, FacadeError> {
        self.authorize(key, "person:*")?;
        if self.person_repo.find_by_id(person_id).await?.is_some() {
            return Err(FacadeError::PersonAlreadyExists);
        }
        let person = Person::new(person_id.to_string(), name.to_string());
        self.person_repo.save(&person).await?;
        Ok(person)
    }

    pub async fn person_read(&self, key: Option<&ApiKey>, person_id: &str) -> Result<Person, FacadeError> {
        self.authorize(key, "person:*")?;
        self.person_repo.find_by_id(person_id).await?.ok_or(FacadeError::PersonNotFound)
    }

    pub async fn person_update(&self, key: Option<&ApiKey>, person_id: &str, name: Option<String>, department: Option<String>) -> Result<Person, FacadeError> {
        self.authorize(key, "person:*")?;
        let mut person = self.person_repo.find_by_id(person_id).await?.ok_or(FacadeError::PersonNotFound)?;
        if let Some(name) = name {
            person.set_name(name);
        }
        if let Some(department) = department {
            person.set_department(Some(department));
        }
        self.person_repo.update(&person).await?;
        Ok(person)
    }

    pub async fn person_delete(&self, key: Option<&ApiKey>, person_id: &str) -> Result<(), FacadeError> {
        self.authorize(key, "person:*")?;
        let mut person = self.person_repo.find_by_id(person_id).await?.ok_or(FacadeError::PersonNotFound)?;
        person.set_status(PersonStatus::Deleted);
        self.person_repo.update(&person).await?;
        Ok(())
    }

    pub async fn person_list(&self, key: Option<&ApiKey>, limit: i64, offset: i64) -> Result<Vec<Person>, FacadeError> {
        self.authorize(key, "person:*")?;
        Ok(self.person_repo.find_all(limit, offset).await?)
    }

    pub async fn attendance_mark(&self, key: Option<&ApiKey>, request: AttendanceMarkRequest) -> Result<AttendanceRow, FacadeError> {
        self.authorize(key, "attendance:*")?;
        Ok(self.attendance.mark_manual(&request.person_id, &request.person_name, &request.source).await?)
    }

    pub async fn attendance_checkout(&self, key: Option<&ApiKey>, id: Uuid) -> Result<AttendanceRow, FacadeError> {
        self.authorize(key, "attendance:*")?;
        Ok(self.attendance.check_out(id, Utc::now()).await?)
    }

    pub async fn attendance_get(&self, key: Option<&ApiKey>, id: Uuid) -> Result<AttendanceRow, FacadeError> {
        self.authorize(key, "attendance:*")?;
        self.attendance.get(id).await?.ok_or(FacadeError::Internal("attendance row not found".into()))
    }

    pub async fn attendance_list(&self, key: Option<&ApiKey>, person_id: Option<&str>, start: Option<NaiveDate>, end: Option<NaiveDate>, limit: i64) -> Result<Vec<AttendanceRow>, FacadeError> {
        self.authorize(key, "attendance:*")?;
        Ok(self.attendance.list(person_id, start, end, limit).await?)
    }

    pub async fn attendance_today(&self, key: Option<&ApiKey>) -> Result<Vec<AttendanceRow>, FacadeError> {
        self.authorize(key, "attendance:*")?;
        Ok(self.attendance.today().await?)
    }

    pub async fn attendance_for_person(&self, key: Option<&ApiKey>, person_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<AttendanceRow>, FacadeError> {
        self.authorize(key, "attendance:*")?;
        Ok(self.attendance.for_person(person_id, start, end).await?)
    }

    // --- Reports ----------------------------------------------------------

    pub async fn report(&self, key: Option<&ApiKey>, start: NaiveDate, end: NaiveDate, person_id: Option<&str>) -> Result<Vec<AttendanceRow>, FacadeError> {
        self.authorize(key, "reports:*")?;
        Ok(self.attendance.list(person_id, Some(start), Some(end), i64::MAX).await?)
    }

    pub async fn daily_summary(&self, key: Option<&ApiKey>, date: NaiveDate) -> Result<DailySummary, FacadeError> {
        self.authorize(key, "reports:*")?;
        let rows = self.attendance.list(None, Some(date), Some(date), i64::MAX).await?;
        let total_checked_out = rows.iter().filter(|r| r.check_out().is_some()).count();
        Ok(DailySummary { date, total_present: rows.len(), total_checked_out })
    }

    pub async fn export(&self, key: Option<&ApiKey>, start: NaiveDate, end: NaiveDate, format: ExportFormat) -> Result<String, FacadeError> {
        self.authorize(key, "reports:*")?;
        let rows = self.attendance.list(None, Some(start), Some(end), i64::MAX).await?;
        Ok(match format {
            ExportFormat::Json => serde_json::to_string(&rows).map_err(|e| FacadeError::Internal(e.to_string()))?,
            ExportFormat::Csv => export_csv(&rows),
        })
    }

    // --- Config, logs, health, auth ----------------------------------------

    pub async fn config_get(&self, key: Option<&ApiKey>) -> Result<SystemConfigRow, FacadeError> {
        self.authorize(key, "config:*")?;
        Ok(self.system_config.get().await?)
    }

    pub async fn config_set(&self, key: Option<&ApiKey>, config: SystemConfigRow) -> Result<(), FacadeError> {
        self.authorize(key, "config:*")?;
        Ok(self.system_config.save(&config).await?)
    }

    pub async fn logs_list(&self, key: Option<&ApiKey>, level: Option<crate::domain::entities::LogLevel>, limit: i64) -> Result<Vec<SystemLogRow>, FacadeError> {
        self.authorize(key, "logs:read")?;
        Ok(self.system_logs.list(level, limit).await?)
    }

    pub async fn health(&self) -> Result<HealthReport, FacadeError> {
        let background_running = self.orchestrator.is_background_running();
        let face_store_count = self.face_store.count().await?;
        Ok(HealthReport { ok: true, background_running, face_store_count })
    }

    pub async fn auth_create_key(&self, key: Option<&ApiKey>, name: &str, permissions: Vec<String>, expires_days: Option<i64>) -> Result<CreatedApiKey, FacadeError> {
        self.authorize(key, "admin")?;
        let expires_at = expires_days.map(|days| Utc::now() + chrono::Duration::days(days));
        let secret = generate_api_secret();
        let key_hash = hash_api_secret(&secret);
        let created = ApiKey::new(name.to_string(), key_hash, permissions, expires_at);
        self.api_keys.save(&created).await?;
        Ok(CreatedApiKey { api_key: created, secret })
    }
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FacadeError> {
    image::load_from_memory(bytes).map_err(|e| FacadeError::InvalidImage(e.to_string()))
}

fn export_csv(rows: &[AttendanceRow]) -> String {
    let mut out = String::from("id,person_id,person_name,check_in,check_out,date,duration_minutes,source,confidence,status\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{:?}\n",
            row.id(),
            row.person_id(),
            row.person_name(),
            row.check_in(),
            row.check_out().map(|c| c.to_rfc3339()).unwrap_or_default(),
            row.date(),
            row.duration_minutes().map(|d| d.to_string()).unwrap_or_default(),
            row.source(),
            row.confidence(),
            row.status(),
        ));
    }
    out
}

/// Generates a 32-byte random secret, hex-encoded, returned to the caller
/// exactly once. Only its hash is ever persisted.
fn generate_api_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_api_secret(secret: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_error_display_is_stable() {
        let err = FacadeError::NoFace;
        assert_eq!(err.to_string(), "no face detected");
    }
}
