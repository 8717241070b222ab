//! Ingest Sources
//!
//! Concrete `FrameSource`/`SourceFactory` implementations for the four
//! supported transports: local device, RTSP, HTTP, and RTMP/file.

mod ffmpeg_decode;

pub mod device;
pub mod factory;
pub mod file;
pub mod network;

pub use device::DeviceSource;
pub use factory::IngestSourceFactory;
pub use file::FileSource;
pub use network::NetworkSource;
