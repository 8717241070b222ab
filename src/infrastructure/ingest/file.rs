//! Local Video File Source
//!
//! Decodes a local file and loops: on EOF, seeks back to the start rather
//! than stopping, so a short clip can stand in for a continuous feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::application::services::ports::FrameSource;
use crate::domain::value_objects::{Frame, PixelFormat};
use crate::infrastructure::ingest::ffmpeg_decode;

const READ_INTERVAL: Duration = Duration::from_millis(10);

pub struct FileSource {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

unsafe impl Send for FileSource {}
unsafe impl Sync for FileSource {}

impl FileSource {
    /// `flush_grabs` bounds how many decoder-buffered frames are discarded
    /// per read, sourced from `SystemConfigRow::frame_buffer_depth`.
    pub fn open(path: &str, flush_grabs: u32) -> anyhow::Result<Self> {
        // Fails fast if the file cannot be opened at all, before spawning
        // the decode thread, so `change_source` can surface the error.
        ffmpeg_decode::open_file(path)?;

        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let path = path.to_string();
        let latest_clone = latest.clone();
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("file-ingest".to_string())
            .spawn(move || Self::decode_loop(path, flush_grabs, latest_clone, running_clone))?;

        Ok(Self { latest, running, handle: Mutex::new(Some(handle)) })
    }

    fn decode_loop(path: String, flush_grabs: u32, latest: Arc<Mutex<Option<Frame>>>, running: Arc<AtomicBool>) {
        let mut stream = match ffmpeg_decode::open_file(&path) {
            Ok(stream) => stream,
            Err(err) => {
                error!("failed to open file {}: {}", path, err);
                return;
            }
        };

        info!("looping file source for {}", path);

        while running.load(Ordering::SeqCst) {
            stream.flush_stale(flush_grabs);

            match stream.next_frame() {
                Ok(Some(image)) => {
                    let rgb = image.to_rgb8();
                    let (width, height) = (rgb.width(), rgb.height());
                    let frame = Frame::new(width, height, PixelFormat::Rgb8, rgb.into_raw(), path.clone());
                    *latest.lock().unwrap() = Some(frame);
                }
                Ok(None) => {
                    if let Err(err) = stream.seek_to_start() {
                        warn!("failed to loop file {}: {}", path, err);
                        break;
                    }
                }
                Err(err) => {
                    error!("decode error on file {}: {}", path, err);
                    break;
                }
            }

            thread::sleep(READ_INTERVAL);
        }

        info!("file source stopping for {}", path);
    }
}

#[async_trait]
impl FrameSource for FileSource {
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
    fn open_rejects_a_missing_path() {
        let result = FileSource::open("/nonexistent/does-not-exist.mp4", 3);
        assert!(result.is_err());
    }
}
