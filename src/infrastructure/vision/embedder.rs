//! ONNX-backed Embedding Backend
//!
//! Runs a face-encoding model through ONNX Runtime: resize to the model's
//! input size, normalize, run inference, L2-normalize the output vector.

use std::path::PathBuf;

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::services::ports::EmbeddingBackend;
use crate::domain::value_objects::{FaceEncoding, EMBEDDING_DIMENSION};

/// Embedding backend configuration.
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub model_path: PathBuf,
    /// Square input size the model expects (e.g. 160 for a FaceNet-style model).
    pub input_size: u32,
    /// `"cpu"` or `"accelerator"`, mirrors `SystemConfigRow::detector_device`.
    pub device: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/face_encoder.onnx"),
            input_size: 160,
            device: "cpu".to_string(),
        }
    }
}

/// Face-encoding backend over an ONNX Runtime session.
pub struct Embedder {
    session: Mutex<Session>,
    input_size: u32,
}

impl Embedder {
    pub fn new(config: EmbedderConfig) -> anyhow::Result<Self> {
        if !config.model_path.exists() {
            return Err(anyhow::anyhow!(
                "face encoding model not found at {:?}",
                config.model_path
            ));
        }

        let session = Self::build_session(&config)?;

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
        })
    }

    fn build_session(config: &EmbedderConfig) -> anyhow::Result<Session> {
        if config.device.eq_ignore_ascii_case("accelerator") {
            let result = Session::builder()?
                .with_execution_providers([CUDAExecutionProvider::default().build(), CPUExecutionProvider::default().build()])?
                .commit_from_file(&config.model_path);

            match result {
                Ok(session) => {
                    info!("embedding backend running on accelerator execution provider");
                    return Ok(session);
                }
                Err(err) => {
                    warn!("accelerator execution provider unavailable ({}), falling back to cpu", err);
                }
            }
        }

        Ok(Session::builder()?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .commit_from_file(&config.model_path)?)
    }

    /// Resizes and normalizes a face crop into the model's expected
    /// NCHW float tensor, channel values in `[-1, 1]`.
    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let resized = image.resize_exact(self.input_size, self.input_size, FilterType::Triangle);
        let rgb = resized.to_rgb8();

        let mut tensor = Array4::<f32>::zeros((1, 3, self.input_size as usize, self.input_size as usize));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            tensor[[0, 0, y as usize, x as usize]] = (r as f32 - 127.5) / 128.0;
            tensor[[0, 1, y as usize, x as usize]] = (g as f32 - 127.5) / 128.0;
            tensor[[0, 2, y as usize, x as usize]] = (b as f32 - 127.5) / 128.0;
        }
        tensor
    }
}

#[async_trait]
impl EmbeddingBackend for Embedder {
    async fn encode(&self, face_image: &DynamicImage) -> anyhow::Result<FaceEncoding> {
        let tensor = self.preprocess(face_image);
        let mut session = self.session.lock().await;

        let outputs = tokio::task::block_in_place(|| {
            let inputs = ort::inputs![tensor]?;
            session.run(inputs)
        })?;

        let (_, raw) = outputs[0].try_extract_raw_tensor::<f32>()?;
        let mut values: Vec<f32> = raw.to_vec();

        if values.len() != EMBEDDING_DIMENSION {
            values.resize(EMBEDDING_DIMENSION, 0.0);
        }

        let encoding = FaceEncoding::new(values);
        Ok(encoding.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_160_input() {
        let config = EmbedderConfig::default();
        assert_eq!(config.input_size, 160);
    }
}
