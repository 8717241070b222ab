//! Local Camera Device Source
//!
//! Captures from a local device via nokhwa. Grounded in the camera capture
//! loop's background-thread-plus-shared-state shape, adapted to the
//! `FrameSource` poll contract instead of a broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{error, info, warn};

use crate::application::services::ports::FrameSource;
use crate::domain::value_objects::{Frame, PixelFormat};
use crate::infrastructure::ingest::ffmpeg_decode::downscale;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub device_index: u32,
    pub fps: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { device_index: 0, fps: 30 }
    }
}

/// A running local capture device. One background `std::thread` owns the
/// `nokhwa::Camera` handle (not `Send` across an await point in practice,
/// so it never leaves its thread) and publishes decoded frames into a
/// shared slot the async side polls.
pub struct DeviceSource {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    source_tag: String,
}

// Holds only an Arc<Mutex<..>> slot, an atomic flag, and a join handle; the
// camera handle itself stays on the capture thread.
unsafe impl Send for DeviceSource {}
unsafe impl Sync for DeviceSource {}

impl DeviceSource {
    pub fn open(config: DeviceConfig) -> anyhow::Result<Self> {
        let source_tag = format!("device:{}", config.device_index);
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let latest_clone = latest.clone();
        let running_clone = running.clone();
        let tag_clone = source_tag.clone();

        let handle = thread::Builder::new()
            .name("device-capture".to_string())
            .spawn(move || Self::capture_loop(config, latest_clone, running_clone, tag_clone))?;

        Ok(Self {
            latest,
            running,
            handle: Mutex::new(Some(handle)),
            source_tag,
        })
    }

    fn capture_loop(config: DeviceConfig, latest: Arc<Mutex<Option<Frame>>>, running: Arc<AtomicBool>, source_tag: String) {
        let index = CameraIndex::Index(config.device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = match Camera::new(index, requested) {
            Ok(cam) => cam,
            Err(err) => {
                error!("failed to open device {}: {}", config.device_index, err);
                return;
            }
        };

        if let Err(err) = camera.open_stream() {
            error!("failed to open device stream: {}", err);
            return;
        }

        info!("device capture running for {}", source_tag);
        let frame_interval = std::time::Duration::from_millis(1000 / config.fps.max(1) as u64);

        while running.load(Ordering::SeqCst) {
            match camera.frame() {
                Ok(buffer) => match buffer.decode_image::<RgbFormat>() {
                    Ok(decoded) => {
                        let image = downscale(image::DynamicImage::ImageRgb8(decoded));
                        let rgb = image.to_rgb8();
                        let (width, height) = (rgb.width(), rgb.height());
                        let frame = Frame::new(width, height, PixelFormat::Rgb8, rgb.into_raw(), source_tag.clone());
                        *latest.lock().unwrap() = Some(frame);
                    }
                    Err(err) => warn!("frame decode error: {}", err),
                },
                Err(err) => warn!("frame capture error: {}", err),
            }
            thread::sleep(frame_interval);
        }

        info!("device capture stopping for {}", source_tag);
    }
}

#[async_trait]
impl FrameSource for DeviceSource {
    async fn latest_frame(&self) -> Option<Frame> {
        self.latest.lock().unwrap().clone()
    }

    async fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_first_device_at_30fps() {
        let config = DeviceConfig::default();
        assert_eq!(config.device_index, 0);
        assert_eq!(config.fps, 30);
    }
}
