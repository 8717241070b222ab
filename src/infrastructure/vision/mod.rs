pub mod embedder;
pub mod face_detector;

pub use embedder::{Embedder, EmbedderConfig};
pub use face_detector::{DetectorConfig, FaceDetector};
