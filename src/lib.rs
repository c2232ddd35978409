//! Baseline and progressive JPEG (ITU-T T.81) decoder.
//!
//! ```no_run
//! use jpegdec_rs::{ImageBuffer, Jpeg1Decoder};
//!
//! let data = std::fs::read("photo.jpg").unwrap();
//! let mut image = ImageBuffer::<[u8; 4]>::new();
//! Jpeg1Decoder::new(&data[..]).decode(&mut image, false).unwrap();
//! println!("{}x{}", image.width(), image.height());
//! ```

use std::io::Read;

pub mod byte_reader;
pub mod constants;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod pixel_sink;

pub use error::{FormatError, JpegError, Result};
pub use jpeg1::{ColorModel, Jpeg1Decoder};
pub use pixel_sink::{FromRgba, ImageBuffer, PixelSink};

/// Frame parameters, as described by the frame header and the application segments read
/// before the first scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: i32,
    pub component_count: i32,
    pub is_progressive: bool,
    /// `None` for a 4-component frame without an Adobe segment.
    pub color_model: Option<ColorModel>,
    pub restart_interval: u16,
}

/// Decodes a complete JPEG stream from `source` into `sink`.
pub fn decode<R: Read, S: PixelSink>(source: R, sink: &mut S, config_only: bool) -> Result<()> {
    Jpeg1Decoder::new(source).decode(sink, config_only)
}

/// Decodes `data` into an RGBA image.
pub fn decode_to_rgba(data: &[u8]) -> Result<ImageBuffer<[u8; 4]>> {
    let mut image = ImageBuffer::new();
    decode(data, &mut image, false)?;
    Ok(image)
}

/// Reads the header of `data` up to its first scan.
pub fn read_info(data: &[u8]) -> Result<FrameInfo> {
    Jpeg1Decoder::new(data).read_info()
}
