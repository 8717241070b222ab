//! Face Entry Entity
//!
//! A single registered exemplar in the Face Store. `(name, person_id)` is
//! not unique — repeated registrations for the same person are additional
//! exemplars, not replacements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::FaceEncoding;

/// A registered face exemplar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEntry {
    name: String,
    person_id: String,
    encoding: FaceEncoding,
    image_blob_path: String,
    created_at: DateTime<Utc>,
}

impl FaceEntry {
    /// Creates a new face entry for registration.
    pub fn new(name: String, person_id: String, encoding: FaceEncoding, image_blob_path: String) -> Self {
        Self {
            name,
            person_id,
            encoding,
            image_blob_path,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a face entry from stored fields.
    pub fn from_record(
        name: String,
        person_id: String,
        encoding: FaceEncoding,
        image_blob_path: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            person_id,
            encoding,
            image_blob_path,
            created_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }

    pub fn encoding(&self) -> &FaceEncoding {
        &self.encoding
    }

    pub fn image_blob_path(&self) -> &str {
        &self.image_blob_path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
