//! Inverse Discrete Cosine Transform (DCT) implementation for JPEG 1.
//!
//! The production path is a separable integer IDCT after Chen-Wang with 11 bits of
//! fixed-point precision. It stays within ±1 of the exact transform for conforming input.

use std::f32::consts::PI;

use crate::constants::{BLOCK_DIM, BLOCK_SIZE};
use crate::jpeg1::quantization::{Block, QuantizationTable};

const W1: i32 = 2841; // 2048 * sqrt(2) * cos(1 * pi / 16)
const W2: i32 = 2676; // 2048 * sqrt(2) * cos(2 * pi / 16)
const W3: i32 = 2408; // 2048 * sqrt(2) * cos(3 * pi / 16)
const W5: i32 = 1609; // 2048 * sqrt(2) * cos(5 * pi / 16)
const W6: i32 = 1108; // 2048 * sqrt(2) * cos(6 * pi / 16)
const W7: i32 = 565; // 2048 * sqrt(2) * cos(7 * pi / 16)

const W1PW7: i32 = W1 + W7;
const W1MW7: i32 = W1 - W7;
const W2PW6: i32 = W2 + W6;
const W2MW6: i32 = W2 - W6;
const W3PW5: i32 = W3 + W5;
const W3MW5: i32 = W3 - W5;

const R2: i32 = 181; // 256 / sqrt(2)

/// Transforms dequantized coefficients into spatial samples centred on zero, in place.
pub fn idct_8x8(block: &mut Block) {
    // Horizontal 1-D IDCT.
    for row in block.chunks_exact_mut(BLOCK_SIZE) {
        if row[1..].iter().all(|&c| c == 0) {
            let dc = row[0] << 3;
            row.fill(dc);
            continue;
        }

        let mut x0 = (row[0] << 11) + 128;
        let mut x1 = row[4] << 11;
        let mut x2 = row[6];
        let mut x3 = row[2];
        let mut x4 = row[1];
        let mut x5 = row[7];
        let mut x6 = row[5];
        let mut x7 = row[3];

        // Stage 1.
        let mut x8 = W7 * (x4 + x5);
        x4 = x8 + W1MW7 * x4;
        x5 = x8 - W1PW7 * x5;
        x8 = W3 * (x6 + x7);
        x6 = x8 - W3MW5 * x6;
        x7 = x8 - W3PW5 * x7;

        // Stage 2.
        x8 = x0 + x1;
        x0 -= x1;
        x1 = W6 * (x3 + x2);
        x2 = x1 - W2PW6 * x2;
        x3 = x1 + W2MW6 * x3;
        x1 = x4 + x6;
        x4 -= x6;
        x6 = x5 + x7;
        x5 -= x7;

        // Stage 3.
        x7 = x8 + x3;
        x8 -= x3;
        x3 = x0 + x2;
        x0 -= x2;
        x2 = (R2 * (x4 + x5) + 128) >> 8;
        x4 = (R2 * (x4 - x5) + 128) >> 8;

        // Stage 4.
        row[0] = (x7 + x1) >> 8;
        row[1] = (x3 + x2) >> 8;
        row[2] = (x0 + x4) >> 8;
        row[3] = (x8 + x6) >> 8;
        row[4] = (x8 - x6) >> 8;
        row[5] = (x0 - x4) >> 8;
        row[6] = (x3 - x2) >> 8;
        row[7] = (x7 - x1) >> 8;
    }

    // Vertical 1-D IDCT.
    for x in 0..BLOCK_SIZE {
        let column = |k: usize| block[x + BLOCK_SIZE * k];

        let mut y0 = (column(0) << 8) + 8192;
        let mut y1 = column(4) << 8;
        let mut y2 = column(6);
        let mut y3 = column(2);
        let mut y4 = column(1);
        let mut y5 = column(7);
        let mut y6 = column(5);
        let mut y7 = column(3);

        let mut y8 = W7 * (y4 + y5) + 4;
        y4 = (y8 + W1MW7 * y4) >> 3;
        y5 = (y8 - W1PW7 * y5) >> 3;
        y8 = W3 * (y6 + y7) + 4;
        y6 = (y8 - W3MW5 * y6) >> 3;
        y7 = (y8 - W3PW5 * y7) >> 3;

        y8 = y0 + y1;
        y0 -= y1;
        y1 = W6 * (y3 + y2) + 4;
        y2 = (y1 - W2PW6 * y2) >> 3;
        y3 = (y1 + W2MW6 * y3) >> 3;
        y1 = y4 + y6;
        y4 -= y6;
        y6 = y5 + y7;
        y5 -= y7;

        y7 = y8 + y3;
        y8 -= y3;
        y3 = y0 + y2;
        y0 -= y2;
        y2 = (R2 * (y4 + y5) + 128) >> 8;
        y4 = (R2 * (y4 - y5) + 128) >> 8;

        let output = [
            (y7 + y1) >> 14,
            (y3 + y2) >> 14,
            (y0 + y4) >> 14,
            (y8 + y6) >> 14,
            (y8 - y6) >> 14,
            (y0 - y4) >> 14,
            (y3 - y2) >> 14,
            (y7 - y1) >> 14,
        ];
        for (k, value) in output.into_iter().enumerate() {
            block[x + BLOCK_SIZE * k] = value;
        }
    }
}

/// Direct evaluation of the 2-D IDCT (A.3.3), used to validate [`idct_8x8`].
pub fn idct_8x8_baseline(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    for x in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0f32;
            for u in 0..8 {
                for v in 0..8 {
                    let cu = if u == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                    let cv = if v == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                    let cos_x = (((2 * x + 1) * u) as f32 * PI) / 16.0;
                    let cos_y = (((2 * y + 1) * v) as f32 * PI) / 16.0;
                    sum += cu * cv * input[u * 8 + v] * cos_x.cos() * cos_y.cos();
                }
            }
            output[x * 8 + y] = 0.25 * sum;
        }
    }
}

/// Adds the 128 level shift and clips to the 8-bit sample range.
#[inline]
pub fn level_shift(value: i32) -> u8 {
    (value + 128).clamp(0, 255) as u8
}

/// Dequantizes, inverse transforms and level shifts a block into `destination`, whose rows
/// are `stride` bytes apart.
pub fn reconstruct_block(
    block: &mut Block,
    table: &QuantizationTable,
    destination: &mut [u8],
    stride: usize,
) {
    table.dequantize(block);
    idct_8x8(block);
    for (row, samples) in block.chunks_exact(BLOCK_SIZE).enumerate() {
        let offset = row * stride;
        for (dst, &value) in destination[offset..offset + BLOCK_SIZE]
            .iter_mut()
            .zip(samples)
        {
            *dst = level_shift(value);
        }
    }
}
