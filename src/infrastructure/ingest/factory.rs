//! Source Factory
//!
//! Dispatches a URI to the matching ingestor by scheme/shape: a bare integer
//! (or `device:<index>`) for local cameras, `rtsp://`/`rtmp://`/`http(s)://`
//! (matched case-insensitively) for network streams, anything else is
//! treated as a local file path.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::services::ports::{FrameSource, SourceFactory};
use crate::domain::entities::SourceType;
use crate::infrastructure::ingest::device::{DeviceConfig, DeviceSource};
use crate::infrastructure::ingest::file::FileSource;
use crate::infrastructure::ingest::network::NetworkSource;

pub struct IngestSourceFactory {
    /// Frames to flush from the decoder's internal buffer on each read,
    /// sourced from `SystemConfigRow::frame_buffer_depth`.
    buffer_depth: u32,
}

impl IngestSourceFactory {
    pub fn new(buffer_depth: u32) -> Self {
        Self { buffer_depth }
    }

    fn classify(uri: &str) -> SourceType {
        if uri.starts_with("device:") || uri.parse::<u32>().is_ok() {
            return SourceType::Device;
        }
        let lower = uri.to_lowercase();
        if lower.starts_with("rtsp://") {
            SourceType::Rtsp
        } else if lower.starts_with("rtmp://") {
            SourceType::Rtmp
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceType::Http
        } else {
            SourceType::File
        }
    }

    /// Extracts the device index from either a bare integer or a
    /// `device:<index>` URI.
    fn device_index(uri: &str) -> u32 {
        uri.strip_prefix("device:").unwrap_or(uri).parse().unwrap_or(0)
    }
}

impl Default for IngestSourceFactory {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl SourceFactory for IngestSourceFactory {
    async fn open(&self, uri: &str) -> anyhow::Result<(Arc<dyn FrameSource>, SourceType)> {
        let source_type = Self::classify(uri);

        let ingestor: Arc<dyn FrameSource> = match source_type {
            SourceType::Device => {
                let index = Self::device_index(uri);
                let opened = tokio::task::spawn_blocking(move || DeviceSource::open(DeviceConfig { device_index: index, ..Default::default() })).await??;
                Arc::new(opened)
            }
            SourceType::Rtsp | SourceType::Rtmp | SourceType::Http => {
                let uri = uri.to_string();
                let depth = self.buffer_depth;
                let opened = tokio::task::spawn_blocking(move || NetworkSource::open(&uri, depth)).await??;
                Arc::new(opened)
            }
            SourceType::File => {
                let uri = uri.to_string();
                let depth = self.buffer_depth;
                let opened = tokio::task::spawn_blocking(move || FileSource::open(&uri, depth)).await??;
                Arc::new(opened)
            }
        };

        Ok((ingestor, source_type))
    }

    async fn validate(&self, uri: &str) -> anyhow::Result<()> {
        let source_type = Self::classify(uri);
        match source_type {
            SourceType::Device => {
                let index = Self::device_index(uri);
                let opened = tokio::task::spawn_blocking(move || DeviceSource::open(DeviceConfig { device_index: index, ..Default::default() })).await??;
                opened.close().await;
                Ok(())
            }
            SourceType::Rtsp | SourceType::Rtmp | SourceType::Http => {
                let uri = uri.to_string();
                tokio::task::spawn_blocking(move || NetworkSource::probe(&uri)).await?
            }
            SourceType::File => {
                let uri = uri.to_string();
                let depth = self.buffer_depth;
                let opened = tokio::task::spawn_blocking(move || FileSource::open(&uri, depth)).await??;
                opened.close().await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("device:0", SourceType::Device)]
    #[case("0", SourceType::Device)]
    #[case("2", SourceType::Device)]
    #[case("rtsp://camera.local/stream", SourceType::Rtsp)]
    #[case("RTSP://camera.local/stream", SourceType::Rtsp)]
    #[case("rtmp://live.example.com/app", SourceType::Rtmp)]
    #[case("http://camera.local/mjpeg", SourceType::Http)]
    #[case("HTTPS://camera.local/mjpeg", SourceType::Http)]
    #[case("/var/video/clip.mp4", SourceType::File)]
    fn classifies_uri_by_scheme(#[case] uri: &str, #[case] expected: SourceType) {
        assert_eq!(IngestSourceFactory::classify(uri), expected);
    }

    #[rstest]
    #[case("device:3", 3)]
    #[case("2", 2)]
    #[case("not-a-number", 0)]
    fn extracts_device_index(#[case] uri: &str, #[case] expected: u32) {
        assert_eq!(IngestSourceFactory::device_index(uri), expected);
    }
}
