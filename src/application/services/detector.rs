//! Person Detector Service
//!
//! Wraps a `DetectionBackend` with a confidence/geometry filter chain.
//! Stateless: every call is independent of prior calls.

use std::sync::Arc;

use image::DynamicImage;

use crate::application::services::ports::DetectionBackend;
use crate::domain::value_objects::BoundingBox;

/// Filter thresholds applied strictly after the backend and before emission.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_confidence: f32,
    pub min_area: i32,
    pub max_aspect_ratio: f32,
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.65,
            min_area: 3000,
            max_aspect_ratio: 4.0,
            min_width: 20,
            max_width: 800,
            min_height: 40,
            max_height: 1200,
        }
    }
}

/// Person detector: locates bounding boxes and filters them down.
pub struct Detector {
    backend: Arc<dyn DetectionBackend>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(backend: Arc<dyn DetectionBackend>, config: DetectorConfig) -> Self {
        Self { backend, config }
    }

    /// Runs the backend on a single frame and applies the four-stage filter
    /// chain in order (confidence, area, aspect ratio, absolute dimensions).
    pub async fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<(BoundingBox, f32)>> {
        let raw = self.backend.detect(image).await?;
        Ok(raw.into_iter().filter(|(bbox, confidence)| self.passes_filters(bbox, *confidence)).collect())
    }

    /// Runs detection over a batch of frames, preserving input/output
    /// ordering position-for-position.
    pub async fn detect_batch(&self, images: &[DynamicImage]) -> anyhow::Result<Vec<Vec<(BoundingBox, f32)>>> {
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            results.push(self.detect(image).await?);
        }
        Ok(results)
    }

    fn passes_filters(&self, bbox: &BoundingBox, confidence: f32) -> bool {
        if confidence < self.config.min_confidence {
            return false;
        }
        if bbox.area() < self.config.min_area {
            return false;
        }
        let aspect = bbox.aspect_ratio();
        if !(0.3..=self.config.max_aspect_ratio).contains(&aspect) {
            return false;
        }
        if !(self.config.min_width..=self.config.max_width).contains(&bbox.width()) {
            return false;
        }
        if !(self.config.min_height..=self.config.max_height).contains(&bbox.height()) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rstest::rstest;

    struct StubBackend {
        detections: Vec<(BoundingBox, f32)>,
    }

    #[async_trait]
    impl DetectionBackend for StubBackend {
        async fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<(BoundingBox, f32)>> {
            Ok(self.detections.clone())
        }
    }

    fn blank_image() -> DynamicImage {
        DynamicImage::new_rgb8(10, 10)
    }

    #[tokio::test]
    async fn rejects_low_confidence() {
        let backend = Arc::new(StubBackend {
            detections: vec![(BoundingBox::new(0, 0, 100, 100), 0.5)],
        });
        let detector = Detector::new(backend, DetectorConfig::default());
        let result = detector.detect(&blank_image()).await.unwrap();
        assert!(result.is_empty());
    }

    #[rstest]
    #[case(BoundingBox::new(0, 0, 20, 400), false)] // aspect ratio too extreme
    #[case(BoundingBox::new(0, 0, 100, 150), true)] // passes all filters
    #[case(BoundingBox::new(0, 0, 10, 10), false)] // below absolute min
    #[tokio::test]
    async fn geometry_filters_reject_malformed_boxes(#[case] bbox: BoundingBox, #[case] expected: bool) {
        let backend = Arc::new(StubBackend {
            detections: vec![(bbox, 0.9)],
        });
        let detector = Detector::new(backend, DetectorConfig::default());
        let result = detector.detect(&blank_image()).await.unwrap();
        assert_eq!(!result.is_empty(), expected);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let backend = Arc::new(StubBackend {
            detections: vec![(BoundingBox::new(0, 0, 100, 150), 0.9)],
        });
        let detector = Detector::new(backend, DetectorConfig::default());
        let images = vec![blank_image(), blank_image(), blank_image()];
        let results = detector.detect_batch(&images).await.unwrap();
        assert_eq!(results.len(), 3);
        for r in results {
            assert_eq!(r.len(), 1);
        }
    }
}
