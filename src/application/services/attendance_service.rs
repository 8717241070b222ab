//! Attendance Service
//!
//! Thin wrapper over `AttendanceRepository`. Duplicate suppression is
//! delegated entirely to the repository's single-statement SQL; this
//! service holds no in-process cooldown state.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::entities::{AttendanceRow, MarkedBy};
use crate::domain::repositories::{AttendanceRepository, RepoResult};

#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    pub duplicate_window_minutes: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self { duplicate_window_minutes: 5 }
    }
}

/// Outcome of an automatic attendance commit attempt.
#[derive(Debug, Clone)]
pub enum AutoMarkOutcome {
    Committed(AttendanceRow),
    Suppressed,
}

pub struct AttendanceService {
    repo: Arc<dyn AttendanceRepository>,
    config: AttendanceConfig,
}

impl AttendanceService {
    pub fn new(repo: Arc<dyn AttendanceRepository>, config: AttendanceConfig) -> Self {
        Self { repo, config }
    }

    /// Commits an automatic (recognizer-driven) sighting as attendance,
    /// subject to the duplicate-suppression window.
    pub async fn mark_auto(&self, person_id: &str, person_name: &str, confidence: f32, source: &str) -> RepoResult<AutoMarkOutcome> {
        let row = AttendanceRow::new(person_id.to_string(), person_name.to_string(), source.to_string(), confidence, MarkedBy::Auto);
        match self.repo.mark_auto(&row, self.config.duplicate_window_minutes).await? {
            Some(committed) => Ok(AutoMarkOutcome::Committed(committed)),
            None => Ok(AutoMarkOutcome::Suppressed),
        }
    }

    /// Commits a manual attendance mark, bypassing duplicate suppression.
    pub async fn mark_manual(&self, person_id: &str, person_name: &str, source: &str) -> RepoResult<AttendanceRow> {
        let row = AttendanceRow::new(person_id.to_string(), person_name.to_string(), source.to_string(), 1.0, MarkedBy::Manual);
        self.repo.mark_manual(&row).await
    }

    pub async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<AttendanceRow> {
        self.repo.check_out(id, at).await
    }

    pub async fn get(&self, id: Uuid) -> RepoResult<Option<AttendanceRow>> {
        self.repo.find_by_id(id).await
    }

    pub async fn list(&self, person_id: Option<&str>, start: Option<NaiveDate>, end: Option<NaiveDate>, limit: i64) -> RepoResult<Vec<AttendanceRow>> {
        self.repo.list(person_id, start, end, limit).await
    }

    pub async fn today(&self) -> RepoResult<Vec<AttendanceRow>> {
        self.repo.today().await
    }

    pub async fn for_person(&self, person_id: &str, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<AttendanceRow>> {
        self.repo.for_person(person_id, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Repo {}

        #[async_trait]
        impl AttendanceRepository for Repo {
            async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<AttendanceRow>>;
            async fn list(&self, person_id: Option<&str>, start: Option<NaiveDate>, end: Option<NaiveDate>, limit: i64) -> RepoResult<Vec<AttendanceRow>>;
            async fn today(&self) -> RepoResult<Vec<AttendanceRow>>;
            async fn for_person(&self, person_id: &str, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<AttendanceRow>>;
            async fn mark_auto(&self, row: &AttendanceRow, duplicate_window_minutes: i64) -> RepoResult<Option<AttendanceRow>>;
            async fn mark_manual(&self, row: &AttendanceRow) -> RepoResult<AttendanceRow>;
            async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<AttendanceRow>;
        }
    }

    #[tokio::test]
    async fn mark_auto_reports_suppression_as_non_error() {
        let mut repo = MockRepo::new();
        repo.expect_mark_auto().returning(|_, _| Ok(None));

        let service = AttendanceService::new(Arc::new(repo), AttendanceConfig::default());
        let outcome = service.mark_auto("p1", "Alice", 0.9, "device:0").await.unwrap();
        assert!(matches!(outcome, AutoMarkOutcome::Suppressed));
    }

    #[tokio::test]
    async fn mark_auto_returns_committed_row() {
        let mut repo = MockRepo::new();
        repo.expect_mark_auto().returning(|row, _| Ok(Some(row.clone())));

        let service = AttendanceService::new(Arc::new(repo), AttendanceConfig::default());
        let outcome = service.mark_auto("p1", "Alice", 0.9, "device:0").await.unwrap();
        assert!(matches!(outcome, AutoMarkOutcome::Committed(_)));
    }
}
