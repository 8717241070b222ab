//! Network Stream Source (RTSP / HTTP / RTMP)
//!
//! One dedicated decode thread per open source (ffmpeg-next types are not
//! `Send`, same discipline as the rustface bridge in
//! `infrastructure::vision::face_detector`). Reconnects with a fixed 5s
//! backoff on any decode or connect error, forcing TCP transport for RTSP
//! and bounding every read with a 3-5s socket timeout so a stalled camera
//! cannot wedge the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::application::services::ports::FrameSource;
use crate::domain::value_objects::{Frame, PixelFormat};
use crate::infrastructure::ingest::ffmpeg_decode::{self, DEFAULT_READ_TIMEOUT_SECS};

const RECONNECT_BACKOFF_SECS: u64 = 5;
const RTSP_READ_INTERVAL: Duration = Duration::from_millis(1);
const DEFAULT_READ_INTERVAL: Duration = Duration::from_millis(10);

pub struct NetworkSource {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

unsafe impl Send for NetworkSource {}
unsafe impl Sync for NetworkSource {}

impl NetworkSource {
    /// `flush_grabs` bounds how many decoder-buffered frames are discarded
    /// per read, sourced from `SystemConfigRow::frame_buffer_depth`.
    pub fn open(uri: &str, flush_grabs: u32) -> anyhow::Result<Self> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let uri = uri.to_string();
        let latest_clone = latest.clone();
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("network-ingest".to_string())
            .spawn(move || Self::decode_loop(uri, flush_grabs, latest_clone, running_clone))?;

        Ok(Self { latest, running, handle: Mutex::new(Some(handle)) })
    }

    /// Opens once, synchronously, to validate reachability without
    /// installing anything. Used by `validate_source`.
    pub fn probe(uri: &str) -> anyhow::Result<()> {
        ffmpeg_decode::open(uri, Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)).map(|_| ())
    }

    fn decode_loop(uri: String, flush_grabs: u32, latest: Arc<Mutex<Option<Frame>>>, running: Arc<AtomicBool>) {
        let read_interval = if uri.to_lowercase().starts_with("rtsp://") {
            RTSP_READ_INTERVAL
        } else {
            DEFAULT_READ_INTERVAL
        };

        while running.load(Ordering::SeqCst) {
            let mut stream = match ffmpeg_decode::open(&uri, Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)) {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("failed to open {}: {}, retrying in {}s", uri, err, RECONNECT_BACKOFF_SECS);
                    thread::sleep(Duration::from_secs(RECONNECT_BACKOFF_SECS));
                    continue;
                }
            };

            info!("connected to {}", uri);

            loop {
                if !running.load(Ordering::SeqCst) {
                    return;
                }

                // Discard frames the decoder already buffered before every
                // read, so a loop that runs behind the source never serves a
                // stale frame.
                stream.flush_stale(flush_grabs);

                match stream.next_frame() {
                    Ok(Some(image)) => {
                        let rgb = image.to_rgb8();
                        let (width, height) = (rgb.width(), rgb.height());
                        let frame = Frame::new(width, height, PixelFormat::Rgb8, rgb.into_raw(), uri.clone());
                        *latest.lock().unwrap() = Some(frame);
                    }
                    Ok(None) => {
                        warn!("stream {} ended, reconnecting", uri);
                        break;
                    }
                    Err(err) => {
                        error!("decode error on {}: {}, reconnecting", uri, err);
                        break;
                    }
                }

                thread::sleep(read_interval);
            }

            if running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_secs(RECONNECT_BACKOFF_SECS));
            }
        }
    }
}

#[async_trait]
impl FrameSource for NetworkSource {
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
    fn probe_rejects_an_unreachable_host() {
        let result = NetworkSource::probe("rtsp://127.0.0.1:1/nonexistent");
        assert!(result.is_err());
    }
}
