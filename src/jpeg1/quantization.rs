//! Quantization tables and the dequantization of DCT coefficients.

use crate::constants::{BLOCK_DIM, UNZIG};

/// DCT coefficients of one 8x8 block in natural (row-major) order.
pub type Block = [i32; BLOCK_DIM];

/// Bound on a dequantized coefficient. Valid 8-bit data stays well below it, and clamping
/// keeps the integer IDCT free of overflow on corrupt input.
const MAXIMUM_DEQUANTIZED: i32 = 4096;

/// A DQT table, stored in zig-zag order as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationTable {
    values: [u16; BLOCK_DIM],
}

impl QuantizationTable {
    pub fn from_zigzag(values: [u16; BLOCK_DIM]) -> Self {
        Self { values }
    }

    /// Reads a table with 8-bit elements (Pq = 0).
    pub fn from_bytes(bytes: &[u8; BLOCK_DIM]) -> Self {
        Self {
            values: bytes.map(u16::from),
        }
    }

    /// Reads a table with big-endian 16-bit elements (Pq = 1).
    pub fn from_words(bytes: &[u8; 2 * BLOCK_DIM]) -> Self {
        let mut values = [0u16; BLOCK_DIM];
        for (value, pair) in values.iter_mut().zip(bytes.chunks_exact(2)) {
            *value = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Self { values }
    }

    pub fn zigzag_values(&self) -> &[u16; BLOCK_DIM] {
        &self.values
    }

    /// Multiplies each coefficient by its quantizer.
    pub fn dequantize(&self, block: &mut Block) {
        for (zig, &q) in self.values.iter().enumerate() {
            let index = UNZIG[zig];
            block[index] = block[index]
                .saturating_mul(i32::from(q))
                .clamp(-MAXIMUM_DEQUANTIZED, MAXIMUM_DEQUANTIZED);
        }
    }
}
