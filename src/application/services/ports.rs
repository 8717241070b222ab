//! Backend Ports
//!
//! Narrow trait seams behind which the detector and embedding backends sit
//! as opaque model engines. Infrastructure provides the implementations;
//! application services only depend on these traits.

use async_trait::async_trait;
use image::DynamicImage;

use crate::domain::value_objects::{BoundingBox, FaceEncoding, Frame};

/// An active video source. `latest_frame` must never block the caller
/// longer than a bounded poll; it returns `None` when the stream is not
/// currently producing.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn latest_frame(&self) -> Option<Frame>;

    /// Releases OS handles and joins the reader thread. Idempotent.
    async fn close(&self);
}

/// Opens ingestors for a URI, dispatching on scheme/extension. Used
/// by the Facade for `change_source`/`validate_source`; `validate` must open
/// and close without installing anything as the active source.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    async fn open(&self, uri: &str) -> anyhow::Result<(std::sync::Arc<dyn FrameSource>, crate::domain::entities::SourceType)>;
    async fn validate(&self, uri: &str) -> anyhow::Result<()>;
}

/// An object-detection backend emitting `(bbox, confidence)` pairs for
/// whatever class it was configured to find (person or face, depending on
/// the instance's construction-time thresholds).
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    async fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<(BoundingBox, f32)>>;
}

/// A face-encoding backend producing a fixed-length encoding for a cropped
/// face image. Determinism-for-same-input is the only behavioral contract.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn encode(&self, face_image: &DynamicImage) -> anyhow::Result<FaceEncoding>;
}
