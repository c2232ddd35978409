//! JPEG 1 (ISO/IEC 10918-1 / ITU-T T.81) decoding.
//!
//! Supports 8-bit Huffman-coded frames:
//! - baseline and extended sequential (SOF0, SOF1),
//! - progressive with spectral selection and successive approximation (SOF2),
//! - restart intervals, chroma subsampling up to 4x4,
//! - grayscale, YCbCr, RGB, CMYK and YCCK color.

pub mod bit_reader;
pub mod coefficients;
pub mod color;
pub mod dct;
pub mod decoder;
pub mod huffman;
pub mod planes;
pub mod quantization;
pub mod scan_decoder;

pub use color::ColorModel;
pub use decoder::Jpeg1Decoder;
