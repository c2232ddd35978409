pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

pub const MAXIMUM_COMPONENT_COUNT: usize = 4;
pub const MAXIMUM_SAMPLING_FACTOR: u8 = 4;

// Table B.2 / B.4 / B.5 destination limits.
pub const MAXIMUM_TC: u8 = 1;
pub const MAXIMUM_TH: u8 = 3;
pub const MAXIMUM_TQ: u8 = 3;
pub const MAXIMUM_BASELINE_TH: u8 = 1;

pub const MAXIMUM_CODE_LENGTH: usize = 16;
pub const MAXIMUM_HUFFMAN_VALUES: usize = 256;
pub const LUT_BITS: u32 = 8;

// Section B.2.3: sum of Hi*Vi over the components of an interleaved scan.
pub const MAXIMUM_BLOCKS_IN_MCU: usize = 10;

pub const MAXIMUM_SUCCESSIVE_APPROXIMATION: u8 = 13;

pub const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";
pub const EXIF_IDENTIFIER: &[u8; 6] = b"Exif\0\0";
pub const ADOBE_IDENTIFIER: &[u8; 5] = b"Adobe";

/// Maps a zig-zag scan index to the natural (row-major) coefficient index.
#[rustfmt::skip]
pub const UNZIG: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];
