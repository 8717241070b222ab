//! Run-State Store Implementation
//!
//! A single durable record at a fixed path, consulted once at process start
//! to resume (or not) the background loop, and replaced atomically on every
//! source/active transition. Same write-to-temp-then-rename discipline
//! as the Face Store.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::entities::RunState;
use crate::domain::repositories::{RepoResult, RepositoryError, RunStateRepository};

pub struct JsonRunStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonRunStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }
}

#[async_trait]
impl RunStateRepository for JsonRunStateStore {
    async fn load(&self) -> RepoResult<RunState> {
        let _guard = self.lock.lock().await;

        match tokio::fs::read(&self.path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Serialization(e.to_string()))
            }
            Ok(_) => Ok(RunState::inactive()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RunState::inactive()),
            Err(err) => Err(RepositoryError::Serialization(err.to_string())),
        }
    }

    async fn save(&self, state: &RunState) -> RepoResult<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        }

        let json = serde_json::to_vec_pretty(state).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SourceType;

    #[tokio::test]
    async fn load_with_no_file_yet_is_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStateStore::new(dir.path().join("run_state.json"));

        let state = store.load().await.unwrap();
        assert!(!state.is_active());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStateStore::new(dir.path().join("run_state.json"));

        let state = RunState::active("rtsp://cam.local/stream".into(), SourceType::Rtsp);
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.is_active());
        assert_eq!(loaded.source(), Some("rtsp://cam.local/stream"));
        assert_eq!(loaded.source_type(), Some(SourceType::Rtsp));
    }
}
