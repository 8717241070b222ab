//! Face Store Implementation
//!
//! An append-only list of registered face exemplars persisted to a single
//! JSON file, replaced atomically (write to a sibling temp file, then
//! rename) so a crash mid-write never leaves a truncated store behind. A
//! process-wide lock serializes concurrent registrations; matching itself
//! happens in-memory via `FaceMatcher` against the same exemplars (a
//! dual-mirror design) - this repository is the durable copy, not the hot
//! path.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::entities::FaceEntry;
use crate::domain::repositories::{FaceStoreRepository, RepoResult, RepositoryError};

pub struct JsonFaceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFaceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    async fn read_all(&self) -> RepoResult<Vec<FaceEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Serialization(e.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(RepositoryError::Serialization(err.to_string())),
        }
    }

    async fn write_all(&self, entries: &[FaceEntry]) -> RepoResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

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

#[async_trait]
impl FaceStoreRepository for JsonFaceStore {
    async fn add(&self, entry: FaceEntry) -> RepoResult<FaceEntry> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read_all().await?;
        entries.push(entry.clone());
        self.write_all(&entries).await?;

        Ok(entry)
    }

    async fn list(&self) -> RepoResult<Vec<FaceEntry>> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    async fn clear(&self) -> RepoResult<()> {
        let _guard = self.lock.lock().await;
        self.write_all(&[]).await
    }

    async fn count(&self) -> RepoResult<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::FaceEncoding;

    fn encoding() -> FaceEncoding {
        FaceEncoding::new(vec![0.0; crate::domain::value_objects::EMBEDDING_DIMENSION])
    }

    #[tokio::test]
    async fn add_then_list_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFaceStore::new(dir.path().join("faces.json"));

        store
            .add(FaceEntry::new("alice".into(), "P1".into(), encoding(), String::new()))
            .await
            .unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "alice");
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFaceStore::new(dir.path().join("faces.json"));

        store
            .add(FaceEntry::new("bob".into(), "P2".into(), encoding(), String::new()))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_on_missing_file_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFaceStore::new(dir.path().join("nope.json"));

        assert_eq!(store.list().await.unwrap().len(), 0);
    }
}
