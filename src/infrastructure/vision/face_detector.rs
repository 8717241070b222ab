//! Rustface-backed Detection Backend
//!
//! Runs detection in a dedicated thread since rustface's `Detector` is not
//! Send. One instance is constructed for the Person Detector (4.B) and a
//! second, separately configured instance for the Face Recognizer's
//! face-detection step (4.D) — the backend only knows how to localize
//! faces, so the person-detection call site tolerates looser geometry
//! filters applied downstream by `application::services::detector::Detector`.
//!
//! References:
//! - rustface: https://github.com/nickelc/rustface

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender};
use image::{DynamicImage, GenericImageView};
use rustface::{FaceInfo, ImageData};
use tracing::{debug, error, info, warn};

use crate::application::services::ports::DetectionBackend;
use crate::domain::value_objects::BoundingBox;

/// Detector backend configuration. A given `FaceDetector` instance is
/// configured once, at construction, for its call site.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_face_size: u32,
    pub confidence_threshold: f32,
    pub scale_factor: f32,
    pub model_path: PathBuf,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 40,
            confidence_threshold: 0.7,
            scale_factor: 0.8,
            model_path: PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
        }
    }
}

struct DetectionRequest {
    gray: Vec<u8>,
    width: u32,
    height: u32,
    response_tx: tokio::sync::oneshot::Sender<Vec<(BoundingBox, f32)>>,
}

/// Dedicated-thread bridge to a non-Send rustface detector.
pub struct FaceDetector {
    request_tx: Sender<DetectionRequest>,
    detection_count: Arc<AtomicU64>,
    config: DetectorConfig,
}

// Holds only channels and atomics, so Send/Sync is sound despite rustface's
// own detector never leaving its owning thread.
unsafe impl Send for FaceDetector {}
unsafe impl Sync for FaceDetector {}

impl FaceDetector {
    pub fn new(config: DetectorConfig) -> anyhow::Result<Self> {
        info!("initializing detector with model: {:?}", config.model_path);

        if !config.model_path.exists() {
            return Err(anyhow::anyhow!(
                "detection model not found at {:?}. Download it from: \
                https://github.com/nickelc/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin",
                config.model_path
            ));
        }

        let (request_tx, request_rx): (Sender<DetectionRequest>, Receiver<DetectionRequest>) = bounded(32);
        let detection_count = Arc::new(AtomicU64::new(0));
        let detection_count_clone = detection_count.clone();
        let config_clone = config.clone();

        thread::Builder::new()
            .name("face-detector".to_string())
            .spawn(move || {
                Self::detector_thread(request_rx, config_clone, detection_count_clone);
            })?;

        Ok(Self {
            request_tx,
            detection_count,
            config,
        })
    }

    fn detector_thread(request_rx: Receiver<DetectionRequest>, config: DetectorConfig, detection_count: Arc<AtomicU64>) {
        info!("detector thread starting");

        let model_path_str = config.model_path.to_string_lossy();
        let mut detector = match rustface::create_detector(&model_path_str) {
            Ok(d) => d,
            Err(e) => {
                error!("failed to create detector: {}", e);
                return;
            }
        };

        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.confidence_threshold as f64);
        detector.set_pyramid_scale_factor(config.scale_factor);
        detector.set_slide_window_step(4, 4);

        info!("detector thread ready");

        while let Ok(request) = request_rx.recv() {
            if request.gray.is_empty() {
                let _ = request.response_tx.send(Vec::new());
                continue;
            }

            let image = ImageData::new(&request.gray, request.width, request.height);
            let faces = detector.detect(&image);
            let detections = Self::convert_faces(faces, config.confidence_threshold);

            if !detections.is_empty() {
                detection_count.fetch_add(detections.len() as u64, Ordering::Relaxed);
            }

            let _ = request.response_tx.send(detections);
        }

        info!("detector thread stopping");
    }

    fn convert_faces(faces: Vec<FaceInfo>, threshold: f32) -> Vec<(BoundingBox, f32)> {
        faces
            .into_iter()
            .filter(|face| face.score() >= threshold as f64)
            .map(|face| {
                let bbox = face.bbox();
                let bounding_box = BoundingBox::new(
                    bbox.x() as i32,
                    bbox.y() as i32,
                    bbox.width() as i32,
                    bbox.height() as i32,
                );
                (bounding_box, face.score() as f32)
            })
            .collect()
    }

    pub async fn detection_count(&self) -> u64 {
        self.detection_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DetectionBackend for FaceDetector {
    async fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<(BoundingBox, f32)>> {
        let (width, height) = image.dimensions();
        let gray = image.to_luma8().into_raw();

        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        let request = DetectionRequest {
            gray,
            width,
            height,
            response_tx,
        };

        if self.request_tx.send(request).is_err() {
            warn!("detector thread unavailable, dropping request");
            return Ok(Vec::new());
        }

        match response_rx.await {
            Ok(detections) => Ok(detections),
            Err(_) => {
                warn!("detector response channel closed");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_reasonable_values() {
        let config = DetectorConfig::default();
        assert!(config.min_face_size >= 20);
        assert!(config.confidence_threshold >= 0.5);
        assert!(config.scale_factor > 0.0 && config.scale_factor < 1.0);
    }
}
