//! Per-component sample planes that reconstructed blocks are written into.

use crate::constants::BLOCK_SIZE;
use crate::jpeg_stream_reader::Frame;

/// Samples of one component, padded to whole MCUs.
#[derive(Debug, Clone)]
pub struct SamplePlane {
    data: Vec<u8>,
    stride: usize,
    rows: usize,
    h_samp_factor: usize,
    v_samp_factor: usize,
}

impl SamplePlane {
    pub fn new(stride: usize, rows: usize, h_samp_factor: usize, v_samp_factor: usize) -> Self {
        Self {
            data: vec![0; stride * rows],
            stride,
            rows,
            h_samp_factor,
            v_samp_factor,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..(y + 1) * self.stride]
    }

    pub fn fill(&mut self, level: u8) {
        self.data.fill(level);
    }

    /// The destination of block (`bx`, `by`), to be written with a row stride of
    /// [`SamplePlane::stride`].
    pub fn block_mut(&mut self, bx: usize, by: usize) -> &mut [u8] {
        let offset = by * BLOCK_SIZE * self.stride + bx * BLOCK_SIZE;
        &mut self.data[offset..]
    }
}

/// The sample planes of all components of a frame.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    planes: Vec<SamplePlane>,
    h_max: usize,
    v_max: usize,
}

impl PlaneSet {
    /// Allocates one plane per frame component covering the whole MCU grid.
    pub fn new(frame: &Frame) -> Self {
        let planes = frame
            .components
            .iter()
            .enumerate()
            .map(|(index, component)| {
                SamplePlane::new(
                    frame.blocks_per_line(index) * BLOCK_SIZE,
                    frame.block_rows(index) * BLOCK_SIZE,
                    usize::from(component.h_samp_factor),
                    usize::from(component.v_samp_factor),
                )
            })
            .collect();
        Self {
            planes,
            h_max: frame.h_max,
            v_max: frame.v_max,
        }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane(&self, component: usize) -> &SamplePlane {
        &self.planes[component]
    }

    pub fn plane_mut(&mut self, component: usize) -> &mut SamplePlane {
        &mut self.planes[component]
    }

    /// The plane row holding image row `y` of `component`, after vertical upsampling.
    pub fn upsampled_row(&self, component: usize, y: usize) -> &[u8] {
        let plane = &self.planes[component];
        plane.row(y * plane.v_samp_factor / self.v_max)
    }

    /// Maps image column `x` to a column of `component`'s plane.
    #[inline]
    pub fn upsampled_column(&self, component: usize, x: usize) -> usize {
        x * self.planes[component].h_samp_factor / self.h_max
    }
}
