//! Entropy decoding of one scan (ITU T.81 Annex F and G.2).

use std::io::Read;

use log::trace;

use crate::byte_reader::ByteReader;
use crate::constants::{MAXIMUM_COMPONENT_COUNT, UNZIG};
use crate::error::{FormatError, JpegError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JPEG_RESTART_MARKER_BASE, JPEG_RESTART_MARKER_RANGE};
use crate::jpeg_stream_reader::{Frame, ScanHeader};
use crate::jpeg1::bit_reader::JpegBitReader;
use crate::jpeg1::coefficients::CoefficientStore;
use crate::jpeg1::dct::reconstruct_block;
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTables, TableClass};
use crate::jpeg1::planes::PlaneSet;
use crate::jpeg1::quantization::{Block, QuantizationTable};

/// Where decoded blocks go.
pub enum ScanOutput<'a> {
    /// Sequential frames reconstruct every block as soon as it is decoded.
    Sequential {
        planes: &'a mut PlaneSet,
        quantization_tables: &'a [Option<QuantizationTable>],
    },
    /// Progressive frames refine stored coefficients and reconstruct them at the end.
    Progressive(&'a mut CoefficientStore),
}

pub struct ScanDecoder<'a, R> {
    bits: JpegBitReader<'a, R>,
    frame: &'a Frame,
    scan: &'a ScanHeader,
    dc_tables: Vec<Option<&'a HuffmanTable>>,
    ac_tables: Vec<Option<&'a HuffmanTable>>,
    restart_interval: usize,
    dc_predictors: [i32; MAXIMUM_COMPONENT_COUNT],
    eob_run: u32,
    next_restart: u8,
}

impl<'a, R: Read> ScanDecoder<'a, R> {
    /// Prepares decoding of `scan`, failing if a Huffman table it needs is undefined.
    pub fn new(
        reader: &'a mut ByteReader<R>,
        frame: &'a Frame,
        scan: &'a ScanHeader,
        tables: &'a HuffmanTables,
        restart_interval: u16,
    ) -> Result<Self> {
        let needs_dc = scan.spectral_start == 0 && scan.approx_high == 0;
        let needs_ac = scan.spectral_end > 0;

        let mut dc_tables = Vec::with_capacity(scan.components.len());
        let mut ac_tables = Vec::with_capacity(scan.components.len());
        for component in &scan.components {
            let dc = tables.get(TableClass::Dc, component.dc_table_dest);
            let ac = tables.get(TableClass::Ac, component.ac_table_dest);
            if (needs_dc && dc.is_none()) || (needs_ac && ac.is_none()) {
                return Err(FormatError::MissingHuffmanTable.into());
            }
            dc_tables.push(dc);
            ac_tables.push(ac);
        }

        Ok(Self {
            bits: JpegBitReader::new(reader),
            frame,
            scan,
            dc_tables,
            ac_tables,
            restart_interval: usize::from(restart_interval),
            dc_predictors: [0; MAXIMUM_COMPONENT_COUNT],
            eob_run: 0,
            next_restart: 0,
        })
    }

    /// Decodes every MCU of the scan. The byte source is left at the marker that follows the
    /// entropy-coded data.
    pub fn decode(mut self, output: &mut ScanOutput<'_>) -> Result<()> {
        let frame = self.frame;
        let scan = self.scan;

        if scan.components.len() == 1 {
            // Non-interleaved: one block per MCU, covering only the component's own area.
            let (blocks_x, blocks_y) = frame.visible_blocks(scan.components[0].component_index);
            let total = blocks_x * blocks_y;
            let mut mcu = 0;
            for by in 0..blocks_y {
                for bx in 0..blocks_x {
                    self.process_block(0, bx, by, output)?;
                    mcu += 1;
                    self.process_restart(mcu, total)?;
                }
            }
        } else {
            let total = frame.mcus_x * frame.mcus_y;
            let mut mcu = 0;
            for my in 0..frame.mcus_y {
                for mx in 0..frame.mcus_x {
                    for (i, scan_component) in scan.components.iter().enumerate() {
                        let component = &frame.components[scan_component.component_index];
                        let h = usize::from(component.h_samp_factor);
                        let v = usize::from(component.v_samp_factor);
                        for j in 0..h * v {
                            self.process_block(i, mx * h + j % h, my * v + j / h, output)?;
                        }
                    }
                    mcu += 1;
                    self.process_restart(mcu, total)?;
                }
            }
        }

        if self.bits.marker_hit() {
            trace!("scan ended at a marker with {} bits left over", self.bits.bits_in_buffer());
        }
        Ok(())
    }

    fn process_block(
        &mut self,
        scan_index: usize,
        bx: usize,
        by: usize,
        output: &mut ScanOutput<'_>,
    ) -> Result<()> {
        let component_index = self.scan.components[scan_index].component_index;
        match output {
            ScanOutput::Sequential {
                planes,
                quantization_tables,
            } => {
                let mut block = [0i32; 64];
                self.decode_block(scan_index, &mut block)?;
                let destination = self.frame.components[component_index].quant_table_dest;
                let table = quantization_tables
                    .get(usize::from(destination))
                    .and_then(Option::as_ref)
                    .ok_or(FormatError::MissingQuantizationTable)?;
                let plane = planes.plane_mut(component_index);
                let stride = plane.stride();
                reconstruct_block(&mut block, table, plane.block_mut(bx, by), stride);
            }
            ScanOutput::Progressive(store) => {
                let block = store.block_mut(self.frame, component_index, bx, by);
                self.decode_block(scan_index, block)?;
            }
        }
        Ok(())
    }

    /// Expects RSTn after every `restart_interval` MCUs, except after the last one.
    fn process_restart(&mut self, mcu: usize, total: usize) -> Result<()> {
        if self.restart_interval == 0 || mcu % self.restart_interval != 0 || mcu >= total {
            return Ok(());
        }

        self.bits.reset();
        let reader = self.bits.byte_reader();
        let first = reader.read_byte()?;
        let mut marker = first;
        if first == JPEG_MARKER_START_BYTE {
            marker = reader.read_byte()?;
            while marker == JPEG_MARKER_START_BYTE {
                marker = reader.read_byte()?;
            }
        }
        if first != JPEG_MARKER_START_BYTE || marker != JPEG_RESTART_MARKER_BASE + self.next_restart {
            return Err(JpegError::BadRestartMarker {
                expected: self.next_restart,
                found: marker,
            });
        }

        trace!("RST{} after MCU {mcu}", self.next_restart);
        self.next_restart = (self.next_restart + 1) % JPEG_RESTART_MARKER_RANGE;
        self.dc_predictors = [0; MAXIMUM_COMPONENT_COUNT];
        self.eob_run = 0;
        Ok(())
    }

    fn decode_block(&mut self, scan_index: usize, block: &mut Block) -> Result<()> {
        if self.scan.approx_high != 0 {
            return self.refine(scan_index, block);
        }

        let spectral_end = usize::from(self.scan.spectral_end);
        let approx_low = u32::from(self.scan.approx_low);
        let mut zig = usize::from(self.scan.spectral_start);

        if zig == 0 {
            zig = 1;
            // Figure F.12 and G.1.2.1.
            let table = self.dc_tables[scan_index].ok_or(FormatError::MissingHuffmanTable)?;
            let size = table.decode(&mut self.bits)?;
            if size > 16 {
                return Err(FormatError::ExcessiveDcComponent.into());
            }
            let difference = self.bits.receive_extend(size)?;
            let component_index = self.scan.components[scan_index].component_index;
            let predictor = &mut self.dc_predictors[component_index];
            *predictor = predictor.wrapping_add(difference);
            block[0] = predictor.wrapping_shl(approx_low);
        }

        if zig > spectral_end {
            return Ok(());
        }
        if self.eob_run > 0 {
            self.eob_run -= 1;
            return Ok(());
        }

        // Figure F.13 and G.1.2.2.
        let table = self.ac_tables[scan_index].ok_or(FormatError::MissingHuffmanTable)?;
        while zig <= spectral_end {
            let symbol = table.decode(&mut self.bits)?;
            let run = usize::from(symbol >> 4);
            let size = symbol & 0x0F;
            if size != 0 {
                zig += run;
                if zig > spectral_end {
                    break;
                }
                let coefficient = self.bits.receive_extend(size)?;
                block[UNZIG[zig]] = coefficient.wrapping_shl(approx_low);
            } else if run != 15 {
                self.eob_run = self.read_eob_run(run as u32)? - 1;
                break;
            } else {
                zig += 15;
            }
            zig += 1;
        }
        Ok(())
    }

    /// EOBn: 2^n plus n further bits.
    fn read_eob_run(&mut self, run: u32) -> Result<u32> {
        Ok((1 << run) | self.bits.decode_bits(run)?)
    }

    /// Successive-approximation refinement (G.1.2.3).
    fn refine(&mut self, scan_index: usize, block: &mut Block) -> Result<()> {
        let delta = 1i32 << self.scan.approx_low;
        let spectral_end = usize::from(self.scan.spectral_end);

        if self.scan.spectral_start == 0 {
            if self.bits.decode_bit()? {
                block[0] |= delta;
            }
            return Ok(());
        }

        let mut zig = usize::from(self.scan.spectral_start);
        if self.eob_run == 0 {
            let table = self.ac_tables[scan_index].ok_or(FormatError::MissingHuffmanTable)?;
            while zig <= spectral_end {
                let symbol = table.decode(&mut self.bits)?;
                let run = i32::from(symbol >> 4);
                let size = symbol & 0x0F;

                let mut value = 0;
                match size {
                    0 => {
                        if run != 15 {
                            self.eob_run = self.read_eob_run(run as u32)?;
                            break;
                        }
                    }
                    1 => {
                        value = if self.bits.decode_bit()? { delta } else { -delta };
                    }
                    _ => return Err(FormatError::UnexpectedHuffmanCode.into()),
                }

                zig = self.refine_non_zeroes(block, zig, spectral_end, run, delta)?;
                if zig > spectral_end {
                    return Err(FormatError::TooManyCoefficients.into());
                }
                if value != 0 {
                    block[UNZIG[zig]] = value;
                }
                zig += 1;
            }
        }

        if self.eob_run > 0 {
            self.eob_run -= 1;
            self.refine_non_zeroes(block, zig, spectral_end, -1, delta)?;
        }
        Ok(())
    }

    /// Appends a correction bit to every already non-zero coefficient from `zig` on, skipping
    /// `zeroes_left` zero coefficients. Returns the index of the zero coefficient the walk
    /// stopped at, or one past `spectral_end`.
    fn refine_non_zeroes(
        &mut self,
        block: &mut Block,
        mut zig: usize,
        spectral_end: usize,
        mut zeroes_left: i32,
        delta: i32,
    ) -> Result<usize> {
        while zig <= spectral_end {
            let index = UNZIG[zig];
            if block[index] == 0 {
                if zeroes_left == 0 {
                    break;
                }
                zeroes_left -= 1;
            } else if self.bits.decode_bit()? && block[index] & delta == 0 {
                if block[index] >= 0 {
                    block[index] += delta;
                } else {
                    block[index] -= delta;
                }
            }
            zig += 1;
        }
        Ok(zig)
    }
}
