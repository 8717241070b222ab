//! Shared ffmpeg-next decode plumbing for the network and file ingestors.
//!
//! Not `Send`: every `ffmpeg_next` type here is built and dropped on the
//! dedicated decode thread that owns it, same discipline as the
//! rustface bridge.

use ffmpeg_next as ffmpeg;
use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb};

pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;
pub const MAX_WIDTH: u32 = 1280;
pub const MAX_HEIGHT: u32 = 720;

/// An open input plus the decoder for its best video stream.
pub struct OpenStream {
    pub input: ffmpeg::format::context::Input,
    pub decoder: ffmpeg::codec::decoder::Video,
    pub stream_index: usize,
    scaler: ffmpeg::software::scaling::Context,
}

/// Opens `url`, forcing TCP transport when it is an `rtsp://` URI and
/// applying the given read-timeout (microseconds, per ffmpeg's `stimeout`/
/// `timeout` option convention) to bound how long a stalled socket blocks
/// the decode thread.
pub fn open(url: &str, read_timeout: std::time::Duration) -> anyhow::Result<OpenStream> {
    let mut options = ffmpeg::Dictionary::new();
    if url.starts_with("rtsp://") {
        options.set("rtsp_transport", "tcp");
        options.set("stimeout", &read_timeout.as_micros().to_string());
    } else if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("rtmp://") {
        options.set("timeout", &read_timeout.as_micros().to_string());
    }

    let input = ffmpeg::format::input_with_dictionary(&url.to_string(), options)?;
    build_stream(input)
}

/// Opens a local file path for looped playback. No transport timeouts are
/// applied since local reads do not stall on network I/O.
pub fn open_file(path: &str) -> anyhow::Result<OpenStream> {
    let input = ffmpeg::format::input(&path.to_string())?;
    build_stream(input)
}

fn build_stream(input: ffmpeg::format::context::Input) -> anyhow::Result<OpenStream> {
    let stream = input
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| anyhow::anyhow!("no video stream found"))?;
    let stream_index = stream.index();

    let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = context_decoder.decoder().video()?;

    let scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::Flags::BILINEAR,
    )?;

    Ok(OpenStream { input, decoder, stream_index, scaler })
}

impl OpenStream {
    /// Reads and decodes the next video frame, skipping packets from other
    /// streams. Returns `Ok(None)` on end of stream.
    pub fn next_frame(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet)?;
            if let Some(image) = self.receive_decoded()? {
                return Ok(Some(image));
            }
        }
        Ok(None)
    }

    /// Drains any frame(s) the decoder already has buffered without reading
    /// new packets. Used to discard stale frames immediately after a
    /// (re)connect, before the first frame handed to the pipeline.
    pub fn flush_stale(&mut self, grabs: u32) {
        let mut decoded = ffmpeg::util::frame::Video::empty();
        for _ in 0..grabs {
            if self.decoder.receive_frame(&mut decoded).is_err() {
                break;
            }
        }
    }

    /// Seeks back to the start of the stream. Used by the looped file
    /// source on EOF.
    pub fn seek_to_start(&mut self) -> anyhow::Result<()> {
        self.input.seek(0, ..0)?;
        self.decoder.flush();
        Ok(())
    }

    fn receive_decoded(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        let mut decoded = ffmpeg::util::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg::util::frame::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let width = rgb_frame.width();
        let height = rgb_frame.height();
        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data(0);

        // ffmpeg rows may be padded to `stride`; copy row-by-row into a
        // tightly packed buffer so `ImageBuffer::from_raw` can take it.
        let mut packed = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height as usize {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + width as usize * 3]);
        }

        let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, packed)
            .ok_or_else(|| anyhow::anyhow!("decoded frame buffer size mismatch"))?;
        let image = DynamicImage::ImageRgb8(buffer);
        Ok(Some(downscale(image)))
    }
}

/// Downscales a frame to at most `MAX_WIDTH x MAX_HEIGHT`, preserving
/// aspect ratio. Frames already within bounds pass through unchanged.
pub fn downscale(image: DynamicImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return image;
    }
    let scale = (MAX_WIDTH as f32 / width as f32).min(MAX_HEIGHT as f32 / height as f32);
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);
    image.resize(new_width, new_height, FilterType::Triangle)
}
