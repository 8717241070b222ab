//! Face Recognizer Service
//!
//! For each track's person crop: multi-scale face detection, quality
//! scoring, preprocessing, encoding, and adaptive matching against the
//! face store mirror.

use std::sync::Arc;

use image::{imageops, DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};

use crate::application::services::face_matcher::FaceMatcher;
use crate::application::services::ports::{DetectionBackend, EmbeddingBackend};
use crate::domain::entities::{Track, TrackStatus};
use crate::domain::value_objects::BoundingBox;

/// Outcome of attempting recognition for one track on one frame.
#[derive(Debug, Clone)]
pub enum RecognitionOutcome {
    /// The track's cached `Known` match is still within `tracking_ttl`;
    /// redetection was skipped.
    Skipped,
    /// No face cleared `quality_threshold`; the track stays/becomes `Tracking`.
    NoFace,
    /// A face was found and encoded but matched no stored entry.
    Unknown { face_bbox: BoundingBox, face_confidence: f32 },
    /// A face matched a stored entry.
    Known {
        face_bbox: BoundingBox,
        name: String,
        person_id: String,
        face_confidence: f32,
    },
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub max_upsample: u32,
    pub early_stop_quality: f32,
    pub dedup_iou: f32,
    pub quality_threshold: f32,
    pub tracking_ttl_secs: f64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            max_upsample: 2,
            early_stop_quality: 0.6,
            dedup_iou: 0.5,
            quality_threshold: 0.25,
            tracking_ttl_secs: 2.0,
        }
    }
}

struct Candidate {
    bbox: BoundingBox,
    quality: f32,
    crop: DynamicImage,
}

/// Combines a face-localization backend and an encoding backend behind the
/// adaptive-tolerance face store mirror.
pub struct Recognizer {
    detector: Arc<dyn DetectionBackend>,
    embedder: Arc<dyn EmbeddingBackend>,
    matcher: Arc<FaceMatcher>,
    config: RecognizerConfig,
}

impl Recognizer {
    pub fn new(
        detector: Arc<dyn DetectionBackend>,
        embedder: Arc<dyn EmbeddingBackend>,
        matcher: Arc<FaceMatcher>,
        config: RecognizerConfig,
    ) -> Self {
        Self { detector, embedder, matcher, config }
    }

    /// Runs the full recognition pipeline for one track's person crop.
    pub async fn recognize(&self, person_crop: &DynamicImage, track: &Track) -> anyhow::Result<RecognitionOutcome> {
        if self.should_skip(track) {
            return Ok(RecognitionOutcome::Skipped);
        }

        let best = self.detect_best_face(person_crop).await?;
        let Some(candidate) = best else {
            return Ok(RecognitionOutcome::NoFace);
        };

        if candidate.quality < self.config.quality_threshold {
            return Ok(RecognitionOutcome::NoFace);
        }

        let preprocessed = preprocess_face(&candidate.crop);
        let encoding = self.embedder.encode(&preprocessed).await?;
        let matched = self.matcher.find_match(&encoding, candidate.quality).await;

        Ok(match matched {
            Some(m) => RecognitionOutcome::Known {
                face_bbox: candidate.bbox,
                name: m.name,
                person_id: m.person_id,
                face_confidence: m.confidence,
            },
            None => RecognitionOutcome::Unknown {
                face_bbox: candidate.bbox,
                face_confidence: candidate.quality,
            },
        })
    }

    fn should_skip(&self, track: &Track) -> bool {
        if track.status() != TrackStatus::Known {
            return false;
        }
        let Some(last_seen) = track.face_last_seen_ts() else {
            return false;
        };
        let age = (chrono::Utc::now() - last_seen).num_milliseconds() as f64 / 1000.0;
        age < self.config.tracking_ttl_secs
    }

    /// Attempts detection at upsample levels `[0, 1, 2]` up to `max_upsample`,
    /// stopping early once a candidate clears `early_stop_quality`, then
    /// dedupes the collected candidates by IoU and keeps the best quality.
    async fn detect_best_face(&self, person_crop: &DynamicImage) -> anyhow::Result<Option<Candidate>> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let levels = [0u32, 1, 2];

        for &level in levels.iter().filter(|&&l| l <= self.config.max_upsample) {
            let upsampled = upsample(person_crop, level);
            let faces = self.detector.detect(&upsampled).await?;
            let scale = 1.0 / 2f32.powi(level as i32);

            for (bbox, _confidence) in faces {
                let original_bbox = bbox.scale(1.0).clamp_to(upsampled.width() as i32, upsampled.height() as i32);
                let rescaled = scale_bbox(&original_bbox, scale).clamp_to(person_crop.width() as i32, person_crop.height() as i32);
                if rescaled.width() <= 0 || rescaled.height() <= 0 {
                    continue;
                }
                let crop = crop_to_dynamic(person_crop, &rescaled);
                let quality = face_quality(person_crop, &rescaled, &crop);
                candidates.push(Candidate { bbox: rescaled, quality, crop });
            }

            if candidates.iter().any(|c| c.quality >= self.config.early_stop_quality) {
                break;
            }
        }

        Ok(dedup_best(candidates, self.config.dedup_iou))
    }
}

fn upsample(image: &DynamicImage, level: u32) -> DynamicImage {
    if level == 0 {
        return image.clone();
    }
    let factor = 2u32.pow(level);
    image.resize(image.width() * factor, image.height() * factor, imageops::FilterType::Triangle)
}

fn scale_bbox(bbox: &BoundingBox, factor: f32) -> BoundingBox {
    let x = (bbox.x() as f32 * factor) as i32;
    let y = (bbox.y() as f32 * factor) as i32;
    let width = (bbox.width() as f32 * factor) as i32;
    let height = (bbox.height() as f32 * factor) as i32;
    BoundingBox::new(x, y, width, height)
}

fn crop_to_dynamic(image: &DynamicImage, bbox: &BoundingBox) -> DynamicImage {
    image.crop_imm(bbox.x() as u32, bbox.y() as u32, bbox.width() as u32, bbox.height() as u32)
}

/// Keeps, for each cluster of candidates whose IoU exceeds `dedup_iou`, only
/// the one with the highest quality; returns the overall best remaining.
fn dedup_best(mut candidates: Vec<Candidate>, dedup_iou: f32) -> Option<Candidate> {
    let mut kept: Vec<Candidate> = Vec::new();
    candidates.sort_by(|a, b| a.quality.partial_cmp(&b.quality).unwrap_or(std::cmp::Ordering::Equal));

    'outer: while let Some(candidate) = candidates.pop() {
        for existing in kept.iter() {
            if existing.bbox.iou(&candidate.bbox) > dedup_iou {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept.into_iter().max_by(|a, b| a.quality.partial_cmp(&b.quality).unwrap_or(std::cmp::Ordering::Equal))
}

/// Quality score: 0.4 face-area ratio + 0.4 sharpness + 0.2 brightness closeness.
fn face_quality(person_crop: &DynamicImage, face_bbox: &BoundingBox, face_crop: &DynamicImage) -> f32 {
    let person_area = (person_crop.width() * person_crop.height()).max(1) as f32;
    let area_ratio = (face_bbox.area() as f32 / person_area).clamp(0.0, 1.0);

    let gray = face_crop.to_luma8();
    let sharpness = laplacian_variance(&gray) / CALIBRATION_SHARPNESS;
    let sharpness = sharpness.clamp(0.0, 1.0);

    let mean_brightness: f32 = gray.pixels().map(|p| p.0[0] as f32).sum::<f32>() / gray.pixels().len().max(1) as f32;
    let brightness_closeness = 1.0 - (mean_brightness - 128.0).abs() / 128.0;

    (0.4 * area_ratio + 0.4 * sharpness + 0.2 * brightness_closeness).clamp(0.0, 1.0)
}

/// Calibration constant normalizing Laplacian variance into a roughly 0..1 range.
const CALIBRATION_SHARPNESS: f32 = 500.0;

fn laplacian_variance(gray: &GrayImage) -> f32 {
    let kernel: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];
    let filtered = imageproc::filter::filter3x3::<_, f32, f32>(gray, &kernel);
    let values: Vec<f32> = filtered.pixels().map(|p| p.0[0]).collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
}

/// Tile-based contrast equalization blended 70/30 with a light sharpen.
fn preprocess_face(image: &DynamicImage) -> DynamicImage {
    let rgb = image.to_rgb8();
    let equalized = equalize_tiles(&rgb, 16);
    let sharpened = sharpen_blend(&equalized);
    DynamicImage::ImageRgb8(sharpened)
}

fn equalize_tiles(image: &RgbImage, tile_size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();

    let mut y = 0;
    while y < height {
        let h = tile_size.min(height - y);
        let mut x = 0;
        while x < width {
            let w = tile_size.min(width - x);
            let tile = imageops::crop_imm(image, x, y, w, h).to_image();
            let equalized = equalize_channels(&tile);
            imageops::replace(&mut out, &equalized, x as i64, y as i64);
            x += tile_size;
        }
        y += tile_size;
    }
    out
}

fn equalize_channels(tile: &RgbImage) -> RgbImage {
    let (w, h) = tile.dimensions();
    let mut channels: [GrayImage; 3] = [GrayImage::new(w, h), GrayImage::new(w, h), GrayImage::new(w, h)];
    for (x, y, px) in tile.enumerate_pixels() {
        channels[0].put_pixel(x, y, Luma([px[0]]));
        channels[1].put_pixel(x, y, Luma([px[1]]));
        channels[2].put_pixel(x, y, Luma([px[2]]));
    }
    let equalized: Vec<GrayImage> = channels.iter().map(imageproc::contrast::equalize_histogram).collect();

    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(
                x,
                y,
                Rgb([equalized[0].get_pixel(x, y).0[0], equalized[1].get_pixel(x, y).0[0], equalized[2].get_pixel(x, y).0[0]]),
            );
        }
    }
    out
}

fn sharpen_blend(image: &RgbImage) -> RgbImage {
    let blurred = imageproc::filter::gaussian_blur_f32(image, 1.0);
    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let b = blurred.get_pixel(x, y);
        let mut blended = [0u8; 3];
        for c in 0..3 {
            let detail = px.0[c] as f32 - b.0[c] as f32;
            let sharp = (px.0[c] as f32 + detail).clamp(0.0, 255.0);
            blended[c] = (0.7 * sharp + 0.3 * px.0[c] as f32).clamp(0.0, 255.0) as u8;
        }
        out.put_pixel(x, y, Rgb(blended));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{FaceEncoding, EMBEDDING_DIMENSION};
    use async_trait::async_trait;

    struct StubDetector {
        faces: Vec<(BoundingBox, f32)>,
    }

    #[async_trait]
    impl DetectionBackend for StubDetector {
        async fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<(BoundingBox, f32)>> {
            Ok(self.faces.clone())
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingBackend for StubEmbedder {
        async fn encode(&self, _face_image: &DynamicImage) -> anyhow::Result<FaceEncoding> {
            Ok(FaceEncoding::new(vec![0.1; EMBEDDING_DIMENSION]))
        }
    }

    fn person_crop() -> DynamicImage {
        DynamicImage::new_rgb8(200, 300)
    }

    fn track() -> Track {
        Track::new(1, BoundingBox::new(0, 0, 200, 300), 0.9)
    }

    #[tokio::test]
    async fn no_face_yields_no_face_outcome() {
        let detector = Arc::new(StubDetector { faces: vec![] });
        let embedder = Arc::new(StubEmbedder);
        let matcher = Arc::new(FaceMatcher::new(0.65));
        let recognizer = Recognizer::new(detector, embedder, matcher, RecognizerConfig::default());

        let outcome = recognizer.recognize(&person_crop(), &track()).await.unwrap();
        assert!(matches!(outcome, RecognitionOutcome::NoFace));
    }

    #[tokio::test]
    async fn low_quality_face_yields_no_face_outcome() {
        // a 4x4 face in a 200x300 crop has negligible area ratio, so quality
        // stays below quality_threshold regardless of sharpness/brightness.
        let detector = Arc::new(StubDetector {
            faces: vec![(BoundingBox::new(10, 10, 4, 4), 0.9)],
        });
        let embedder = Arc::new(StubEmbedder);
        let matcher = Arc::new(FaceMatcher::new(0.65));
        let recognizer = Recognizer::new(detector, embedder, matcher, RecognizerConfig::default());

        let outcome = recognizer.recognize(&person_crop(), &track()).await.unwrap();
        assert!(matches!(outcome, RecognitionOutcome::NoFace));
    }

    #[tokio::test]
    async fn known_track_within_ttl_is_skipped() {
        let detector = Arc::new(StubDetector { faces: vec![] });
        let embedder = Arc::new(StubEmbedder);
        let matcher = Arc::new(FaceMatcher::new(0.65));
        let recognizer = Recognizer::new(detector, embedder, matcher, RecognizerConfig::default());

        let mut known_track = track();
        known_track.set_known("Alice".into(), "A1".into(), BoundingBox::new(0, 0, 50, 50), 0.8);

        let outcome = recognizer.recognize(&person_crop(), &known_track).await.unwrap();
        assert!(matches!(outcome, RecognitionOutcome::Skipped));
    }

    #[test]
    fn dedup_keeps_only_the_highest_quality_overlapping_candidate() {
        let candidates = vec![
            Candidate { bbox: BoundingBox::new(0, 0, 100, 100), quality: 0.4, crop: DynamicImage::new_rgb8(1, 1) },
            Candidate { bbox: BoundingBox::new(5, 5, 100, 100), quality: 0.8, crop: DynamicImage::new_rgb8(1, 1) },
        ];
        let best = dedup_best(candidates, 0.5).unwrap();
        assert!((best.quality - 0.8).abs() < f32::EPSILON);
    }
}
