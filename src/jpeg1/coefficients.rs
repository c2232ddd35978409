//! Coefficient storage for progressive frames.

use log::warn;

use crate::constants::BLOCK_DIM;
use crate::error::{FormatError, Result};
use crate::jpeg1::dct::reconstruct_block;
use crate::jpeg1::planes::PlaneSet;
use crate::jpeg1::quantization::{Block, QuantizationTable};
use crate::jpeg_stream_reader::Frame;

#[derive(Debug, Clone)]
struct ComponentCoefficients {
    blocks: Vec<Block>,
    blocks_per_line: usize,
    block_rows: usize,
}

/// Quantized coefficients of every block, refined scan by scan until the end of the image.
/// A component's storage is allocated when a scan first references it.
#[derive(Debug, Clone)]
pub struct CoefficientStore {
    components: Vec<Option<ComponentCoefficients>>,
}

impl CoefficientStore {
    pub fn new(frame: &Frame) -> Self {
        Self {
            components: vec![None; frame.components.len()],
        }
    }

    pub fn block(&self, component: usize, bx: usize, by: usize) -> Option<&Block> {
        let coefficients = self.components.get(component)?.as_ref()?;
        coefficients.blocks.get(by * coefficients.blocks_per_line + bx)
    }

    pub fn block_mut(&mut self, frame: &Frame, component: usize, bx: usize, by: usize) -> &mut Block {
        let coefficients = self.components[component].get_or_insert_with(|| {
            let blocks_per_line = frame.blocks_per_line(component);
            let block_rows = frame.block_rows(component);
            ComponentCoefficients {
                blocks: vec![[0; BLOCK_DIM]; blocks_per_line * block_rows],
                blocks_per_line,
                block_rows,
            }
        });
        &mut coefficients.blocks[by * coefficients.blocks_per_line + bx]
    }

    /// Reconstructs every stored block into `planes`. Consuming the store guarantees that each
    /// block is transformed exactly once.
    pub fn finalize(
        self,
        frame: &Frame,
        quantization_tables: &[Option<QuantizationTable>],
        planes: &mut PlaneSet,
    ) -> Result<()> {
        for (index, coefficients) in self.components.into_iter().enumerate() {
            let Some(mut coefficients) = coefficients else {
                warn!("component {index} was not present in any scan");
                // All-zero coefficients reconstruct to the mid level.
                planes.plane_mut(index).fill(128);
                continue;
            };
            let destination = usize::from(frame.components[index].quant_table_dest);
            let table = quantization_tables
                .get(destination)
                .and_then(Option::as_ref)
                .ok_or(FormatError::MissingQuantizationTable)?;

            let plane = planes.plane_mut(index);
            let stride = plane.stride();
            for by in 0..coefficients.block_rows {
                for bx in 0..coefficients.blocks_per_line {
                    let block = &mut coefficients.blocks[by * coefficients.blocks_per_line + bx];
                    reconstruct_block(block, table, plane.block_mut(bx, by), stride);
                }
            }
        }
        Ok(())
    }
}
