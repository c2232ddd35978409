//! A small JPEG writer for building test streams from quantized coefficients.
#![allow(dead_code)]

use jpegdec_rs::constants::UNZIG;
use jpegdec_rs::jpeg1::huffman::{
    HuffmanTable, STD_CHROMINANCE_AC_LENGTHS, STD_CHROMINANCE_AC_VALUES, STD_CHROMINANCE_DC_LENGTHS,
    STD_DC_VALUES, STD_LUMINANCE_AC_LENGTHS, STD_LUMINANCE_AC_VALUES, STD_LUMINANCE_DC_LENGTHS,
};
use jpegdec_rs::{ImageBuffer, JpegError, Result};

pub type Block = [i32; 64];

#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub id: u8,
    pub h: u8,
    pub v: u8,
    pub tq: u8,
}

impl Component {
    pub fn new(id: u8, h: u8, v: u8, tq: u8) -> Self {
        Self { id, h, v, tq }
    }
}

/// Quantized coefficients in natural (row-major) order, covering every block of the MCU grid.
#[derive(Debug, Clone)]
pub struct CoefficientImage {
    pub width: u16,
    pub height: u16,
    pub components: Vec<Component>,
    pub blocks: Vec<Vec<Block>>,
}

impl CoefficientImage {
    pub fn new(width: u16, height: u16, components: Vec<Component>) -> Self {
        let mut image = Self {
            width,
            height,
            components,
            blocks: Vec::new(),
        };
        image.blocks = (0..image.components.len())
            .map(|c| vec![[0; 64]; image.blocks_per_line(c) * image.block_rows(c)])
            .collect();
        image
    }

    pub fn h_max(&self) -> usize {
        self.components.iter().map(|c| usize::from(c.h)).max().unwrap_or(1)
    }

    pub fn v_max(&self) -> usize {
        self.components.iter().map(|c| usize::from(c.v)).max().unwrap_or(1)
    }

    pub fn mcus_x(&self) -> usize {
        usize::from(self.width).div_ceil(8 * self.h_max())
    }

    pub fn mcus_y(&self) -> usize {
        usize::from(self.height).div_ceil(8 * self.v_max())
    }

    pub fn blocks_per_line(&self, c: usize) -> usize {
        self.mcus_x() * usize::from(self.components[c].h)
    }

    pub fn block_rows(&self, c: usize) -> usize {
        self.mcus_y() * usize::from(self.components[c].v)
    }

    pub fn visible_blocks(&self, c: usize) -> (usize, usize) {
        let component = self.components[c];
        let width = (usize::from(self.width) * usize::from(component.h)).div_ceil(self.h_max());
        let height = (usize::from(self.height) * usize::from(component.v)).div_ceil(self.v_max());
        (width.div_ceil(8), height.div_ceil(8))
    }

    pub fn block(&self, c: usize, bx: usize, by: usize) -> &Block {
        &self.blocks[c][by * self.blocks_per_line(c) + bx]
    }

    pub fn block_mut(&mut self, c: usize, bx: usize, by: usize) -> &mut Block {
        let index = by * self.blocks_per_line(c) + bx;
        &mut self.blocks[c][index]
    }

    /// Sets the DC coefficient of every block of component `c`.
    pub fn fill_dc(&mut self, c: usize, dc: i32) {
        for block in &mut self.blocks[c] {
            block[0] = dc;
        }
    }

    /// Fills every block with coefficients resembling a photograph: energy concentrated at low
    /// frequencies, occasional isolated high-frequency terms, long zero runs.
    pub fn randomize(&mut self, rng: &mut fastrand::Rng) {
        for block in self.blocks.iter_mut().flatten() {
            *block = [0; 64];
            block[0] = rng.i32(-120..=120);
            for &natural in &UNZIG[1..10] {
                if rng.u8(..) < 160 {
                    block[natural] = rng.i32(-40..=40);
                }
            }
            for _ in 0..rng.usize(0..4) {
                block[UNZIG[rng.usize(10..64)]] = rng.i32(-6..=6);
            }
        }
    }
}

/// Code and length of each symbol of a Huffman table.
#[derive(Clone)]
pub struct HuffmanCodes {
    codes: Vec<Option<(u16, u8)>>,
}

impl HuffmanCodes {
    pub fn new(table: &HuffmanTable) -> Self {
        let mut codes = vec![None; 256];
        for (length, code, value) in table.codes() {
            codes[usize::from(value)] = Some((code, length));
        }
        Self { codes }
    }

    fn emit(&self, writer: &mut BitWriter, symbol: u8) {
        let (code, length) = self.codes[usize::from(symbol)]
            .unwrap_or_else(|| panic!("symbol {symbol:#04x} has no code"));
        writer.write(u32::from(code), u32::from(length));
    }
}

/// A DHT definition: class, destination, code-length counts and values.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub class: u8,
    pub destination: u8,
    pub lengths: [u8; 16],
    pub values: Vec<u8>,
}

impl TableSpec {
    pub fn new(class: u8, destination: u8, lengths: [u8; 16], values: &[u8]) -> Self {
        Self {
            class,
            destination,
            lengths,
            values: values.to_vec(),
        }
    }

    /// The four Annex K tables: luminance at destination 0, chrominance at 1.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new(0, 0, STD_LUMINANCE_DC_LENGTHS, &STD_DC_VALUES),
            Self::new(1, 0, STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES),
            Self::new(0, 1, STD_CHROMINANCE_DC_LENGTHS, &STD_DC_VALUES),
            Self::new(1, 1, STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES),
        ]
    }

    /// A table coding every byte value, as progressive AC scans need EOBn symbols.
    pub fn universal(class: u8, destination: u8) -> Self {
        let mut lengths = [0; 16];
        lengths[7] = 255;
        lengths[8] = 1;
        let values: Vec<u8> = (0..=255).collect();
        Self::new(class, destination, lengths, &values)
    }

    fn codes(&self) -> HuffmanCodes {
        HuffmanCodes::new(&HuffmanTable::build(&self.lengths, &self.values).expect("valid table"))
    }
}

pub struct BitWriter {
    bytes: Vec<u8>,
    accumulator: u32,
    bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            accumulator: 0,
            bits: 0,
        }
    }

    pub fn write(&mut self, value: u32, count: u32) {
        if count == 0 {
            return;
        }
        self.accumulator = (self.accumulator << count) | (value & ((1 << count) - 1));
        self.bits += count;
        while self.bits >= 8 {
            let byte = (self.accumulator >> (self.bits - 8)) as u8;
            self.bytes.push(byte);
            if byte == 0xFF {
                self.bytes.push(0x00);
            }
            self.bits -= 8;
        }
        self.accumulator &= (1 << self.bits) - 1;
    }

    /// Pads the last byte with one bits.
    pub fn flush(&mut self) {
        if self.bits > 0 {
            let padding = 8 - self.bits;
            self.write((1 << padding) - 1, padding);
        }
    }

    pub fn restart(&mut self, index: u8) {
        self.flush();
        self.bytes.extend_from_slice(&[0xFF, 0xD0 + index]);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }
}

fn category(value: u32) -> u32 {
    32 - value.leading_zeros()
}

fn magnitude_bits(value: i32) -> (u32, u32) {
    let size = category(value.unsigned_abs());
    let bits = if value < 0 { (value - 1) as u32 } else { value as u32 };
    (bits & ((1 << size) - 1), size)
}

#[derive(Debug, Clone)]
pub struct ScanSpec {
    /// Frame component index with its DC and AC table destinations.
    pub components: Vec<(usize, u8, u8)>,
    pub ss: u8,
    pub se: u8,
    pub ah: u8,
    pub al: u8,
}

impl ScanSpec {
    pub fn sequential(components: Vec<(usize, u8, u8)>) -> Self {
        Self {
            components,
            ss: 0,
            se: 63,
            ah: 0,
            al: 0,
        }
    }

    pub fn progressive(components: Vec<(usize, u8, u8)>, ss: u8, se: u8, ah: u8, al: u8) -> Self {
        Self {
            components,
            ss,
            se,
            ah,
            al,
        }
    }
}

struct ScanEncoder<'a> {
    writer: BitWriter,
    scan: &'a ScanSpec,
    dc: Vec<HuffmanCodes>,
    ac: Vec<HuffmanCodes>,
    predictors: Vec<i32>,
    eob_run: u32,
    // Correction bits owed by the pending EOB run.
    eob_corrections: Vec<u32>,
}

impl ScanEncoder<'_> {
    fn encode_block(&mut self, i: usize, block: &Block) {
        let scan = self.scan;
        if scan.ss == 0 {
            if scan.ah == 0 {
                let value = block[0] >> scan.al;
                let diff = value - self.predictors[i];
                self.predictors[i] = value;
                let (bits, size) = magnitude_bits(diff);
                let td = usize::from(scan.components[i].1);
                self.dc[td].emit(&mut self.writer, size as u8);
                self.writer.write(bits, size);
            } else {
                self.writer.write(((block[0] >> scan.al) & 1) as u32, 1);
            }
            if scan.se == 0 {
                return;
            }
        }

        let ss = usize::from(scan.ss.max(1));
        let se = usize::from(scan.se);
        let ta = usize::from(scan.components[i].2);
        if scan.ah == 0 {
            self.encode_ac_first(ta, block, ss, se);
        } else {
            self.encode_ac_refine(ta, block, ss, se);
        }
    }

    fn emit_eob_run(&mut self, ta: usize) {
        if self.eob_run == 0 {
            return;
        }
        let size = category(self.eob_run) - 1;
        self.ac[ta].emit(&mut self.writer, (size << 4) as u8);
        self.writer.write(self.eob_run, size);
        self.eob_run = 0;
        for bit in std::mem::take(&mut self.eob_corrections) {
            self.writer.write(bit, 1);
        }
    }

    fn encode_ac_first(&mut self, ta: usize, block: &Block, ss: usize, se: usize) {
        let al = u32::from(self.scan.al);
        let sequential = self.scan.ss == 0;
        let mut run = 0;
        for k in ss..=se {
            let coefficient = block[UNZIG[k]];
            let magnitude = coefficient.unsigned_abs() >> al;
            if magnitude == 0 {
                run += 1;
                continue;
            }
            self.emit_eob_run(ta);
            while run > 15 {
                self.ac[ta].emit(&mut self.writer, 0xF0);
                run -= 16;
            }
            let signed = if coefficient < 0 { -(magnitude as i32) } else { magnitude as i32 };
            let (bits, size) = magnitude_bits(signed);
            self.ac[ta].emit(&mut self.writer, ((run << 4) | size) as u8);
            self.writer.write(bits, size);
            run = 0;
        }
        if run > 0 {
            if sequential {
                self.ac[ta].emit(&mut self.writer, 0x00);
            } else {
                self.eob_run += 1;
                if self.eob_run == 0x7FFF {
                    self.emit_eob_run(ta);
                }
            }
        }
    }

    fn encode_ac_refine(&mut self, ta: usize, block: &Block, ss: usize, se: usize) {
        let al = u32::from(self.scan.al);
        let magnitudes: Vec<u32> = (0..64).map(|k| block[UNZIG[k]].unsigned_abs() >> al).collect();
        let last_new = (ss..=se).rev().find(|&k| magnitudes[k] == 1).unwrap_or(0);

        let mut run = 0;
        let mut corrections = Vec::new();
        for k in ss..=se {
            let magnitude = magnitudes[k];
            if magnitude == 0 {
                run += 1;
                continue;
            }
            while run > 15 && k <= last_new {
                self.emit_eob_run(ta);
                self.ac[ta].emit(&mut self.writer, 0xF0);
                run -= 16;
                for bit in std::mem::take(&mut corrections) {
                    self.writer.write(bit, 1);
                }
            }
            if magnitude > 1 {
                corrections.push(magnitude & 1);
                continue;
            }
            self.emit_eob_run(ta);
            self.ac[ta].emit(&mut self.writer, ((run << 4) | 1) as u8);
            self.writer.write(u32::from(block[UNZIG[k]] >= 0), 1);
            for bit in std::mem::take(&mut corrections) {
                self.writer.write(bit, 1);
            }
            run = 0;
        }
        if run > 0 || !corrections.is_empty() {
            self.eob_run += 1;
            self.eob_corrections.append(&mut corrections);
            if self.eob_run == 0x7FFF || self.eob_corrections.len() > 900 {
                self.emit_eob_run(ta);
            }
        }
    }

    fn restart(&mut self, index: u8) {
        let ta = usize::from(self.scan.components[0].2);
        self.emit_eob_run(ta);
        self.writer.restart(index);
        self.predictors.iter_mut().for_each(|p| *p = 0);
    }
}

/// Entropy codes one scan of `image`.
pub fn encode_scan(
    image: &CoefficientImage,
    scan: &ScanSpec,
    tables: &[TableSpec],
    restart_interval: u16,
) -> Vec<u8> {
    let mut dc = vec![TableSpec::universal(0, 0).codes(); 4];
    let mut ac = dc.clone();
    for table in tables {
        let codes = table.codes();
        if table.class == 0 {
            dc[usize::from(table.destination)] = codes;
        } else {
            ac[usize::from(table.destination)] = codes;
        }
    }

    let mut encoder = ScanEncoder {
        writer: BitWriter::new(),
        scan,
        dc,
        ac,
        predictors: vec![0; scan.components.len()],
        eob_run: 0,
        eob_corrections: Vec::new(),
    };

    let interval = usize::from(restart_interval);
    let mut units = Vec::new();
    if scan.components.len() == 1 {
        let c = scan.components[0].0;
        let (blocks_x, blocks_y) = image.visible_blocks(c);
        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                units.push(vec![(0, bx, by)]);
            }
        }
    } else {
        for my in 0..image.mcus_y() {
            for mx in 0..image.mcus_x() {
                let mut unit = Vec::new();
                for (i, &(c, _, _)) in scan.components.iter().enumerate() {
                    let component = image.components[c];
                    let (h, v) = (usize::from(component.h), usize::from(component.v));
                    for j in 0..h * v {
                        unit.push((i, mx * h + j % h, my * v + j / h));
                    }
                }
                units.push(unit);
            }
        }
    }

    let total = units.len();
    let mut restarts = 0u8;
    for (n, unit) in units.into_iter().enumerate() {
        for (i, bx, by) in unit {
            let block = *image.block(scan.components[i].0, bx, by);
            encoder.encode_block(i, &block);
        }
        if interval > 0 && (n + 1) % interval == 0 && n + 1 < total {
            encoder.restart(restarts);
            restarts = (restarts + 1) % 8;
        }
    }
    let ta = usize::from(scan.components[0].2);
    encoder.emit_eob_run(ta);
    encoder.writer.finish()
}

/// Assembles a JPEG stream segment by segment.
pub struct JpegBuilder {
    bytes: Vec<u8>,
}

impl JpegBuilder {
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF, 0xD8],
        }
    }

    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0xFF, marker]);
        self.bytes
            .extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn jfif(self, unit: u8, x_density: u16, y_density: u16) -> Self {
        let mut payload = b"JFIF\0\x01\x02".to_vec();
        payload.push(unit);
        payload.extend_from_slice(&x_density.to_be_bytes());
        payload.extend_from_slice(&y_density.to_be_bytes());
        payload.extend_from_slice(&[0, 0]);
        self.segment(0xE0, &payload)
    }

    pub fn adobe(self, transform: u8) -> Self {
        let mut payload = b"Adobe".to_vec();
        payload.extend_from_slice(&[0, 100, 0, 0, 0, 0, transform]);
        self.segment(0xEE, &payload)
    }

    pub fn exif(self, tiff: &[u8]) -> Self {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff);
        self.segment(0xE1, &payload)
    }

    pub fn comment(self, text: &str) -> Self {
        self.segment(0xFE, text.as_bytes())
    }

    /// An 8-bit quantization table given in zigzag order.
    pub fn dqt(self, tq: u8, values: [u8; 64]) -> Self {
        let mut payload = vec![tq];
        payload.extend_from_slice(&values);
        self.segment(0xDB, &payload)
    }

    pub fn dht(self, tables: &[TableSpec]) -> Self {
        let mut payload = Vec::new();
        for table in tables {
            payload.push((table.class << 4) | table.destination);
            payload.extend_from_slice(&table.lengths);
            payload.extend_from_slice(&table.values);
        }
        self.segment(0xC4, &payload)
    }

    pub fn dri(self, interval: u16) -> Self {
        self.segment(0xDD, &interval.to_be_bytes())
    }

    pub fn sof(self, marker: u8, image: &CoefficientImage) -> Self {
        let mut payload = vec![8];
        payload.extend_from_slice(&image.height.to_be_bytes());
        payload.extend_from_slice(&image.width.to_be_bytes());
        payload.push(image.components.len() as u8);
        for component in &image.components {
            payload.extend_from_slice(&[component.id, (component.h << 4) | component.v, component.tq]);
        }
        self.segment(marker, &payload)
    }

    pub fn sos(self, image: &CoefficientImage, scan: &ScanSpec, entropy: &[u8]) -> Self {
        let mut payload = vec![scan.components.len() as u8];
        for &(c, td, ta) in &scan.components {
            payload.extend_from_slice(&[image.components[c].id, (td << 4) | ta]);
        }
        payload.extend_from_slice(&[scan.ss, scan.se, (scan.ah << 4) | scan.al]);
        self.segment(0xDA, &payload).raw(entropy)
    }

    pub fn eoi(self) -> Vec<u8> {
        self.raw(&[0xFF, 0xD9]).bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Table destinations for a component: luminance tables for the first, chrominance otherwise.
pub fn table_destinations(image: &CoefficientImage) -> Vec<(usize, u8, u8)> {
    (0..image.components.len())
        .map(|c| if c == 0 { (c, 0, 0) } else { (c, 1, 1) })
        .collect()
}

/// Starts a stream with flat quantization tables of `q` at destinations 0 and 1.
pub fn builder_with_tables(q: u8) -> JpegBuilder {
    JpegBuilder::new().dqt(0, [q; 64]).dqt(1, [q; 64])
}

/// A complete baseline stream with the standard Huffman tables and one interleaved scan.
pub fn baseline_jpeg(image: &CoefficientImage, q: u8, restart_interval: u16) -> Vec<u8> {
    baseline_with(JpegBuilder::new(), image, q, restart_interval).eoi()
}

/// Appends the tables, frame and scan of a baseline image to `builder`.
pub fn baseline_with(builder: JpegBuilder, image: &CoefficientImage, q: u8, restart_interval: u16) -> JpegBuilder {
    let tables = TableSpec::standard();
    let scan = ScanSpec::sequential(table_destinations(image));
    let entropy = encode_scan(image, &scan, &tables, restart_interval);
    let mut builder = builder.dqt(0, [q; 64]).dqt(1, [q; 64]).dht(&tables);
    if restart_interval > 0 {
        builder = builder.dri(restart_interval);
    }
    builder.sof(0xC0, image).sos(image, &scan, &entropy)
}

/// A progressive script with spectral selection and two successive approximation passes.
pub fn progressive_script(image: &CoefficientImage) -> Vec<ScanSpec> {
    let all: Vec<(usize, u8, u8)> = (0..image.components.len()).map(|c| (c, 0, 0)).collect();
    let mut scans = vec![ScanSpec::progressive(all.clone(), 0, 0, 0, 1)];
    for c in 0..image.components.len() {
        scans.push(ScanSpec::progressive(vec![(c, 0, 0)], 1, 5, 0, 2));
    }
    for c in 0..image.components.len() {
        scans.push(ScanSpec::progressive(vec![(c, 0, 0)], 6, 63, 0, 2));
    }
    for c in 0..image.components.len() {
        scans.push(ScanSpec::progressive(vec![(c, 0, 0)], 1, 63, 2, 1));
    }
    scans.push(ScanSpec::progressive(all, 0, 0, 1, 0));
    for c in (0..image.components.len()).rev() {
        scans.push(ScanSpec::progressive(vec![(c, 0, 0)], 1, 63, 1, 0));
    }
    scans
}

/// A complete progressive stream using `universal` tables at destination 0.
pub fn progressive_jpeg(image: &CoefficientImage, q: u8, restart_interval: u16) -> Vec<u8> {
    let tables = vec![TableSpec::universal(0, 0), TableSpec::universal(1, 0)];
    let mut builder = JpegBuilder::new().dqt(0, [q; 64]).dqt(1, [q; 64]).dht(&tables);
    if restart_interval > 0 {
        builder = builder.dri(restart_interval);
    }
    builder = builder.sof(0xC2, image);
    for scan in progressive_script(image) {
        let entropy = encode_scan(image, &scan, &tables, restart_interval);
        builder = builder.sos(image, &scan, &entropy);
    }
    builder.eoi()
}

pub fn decode_rgba(data: &[u8]) -> Result<ImageBuffer<[u8; 4]>> {
    jpegdec_rs::decode_to_rgba(data)
}

pub fn decode_gray(data: &[u8]) -> Result<ImageBuffer<u8>> {
    let mut image = ImageBuffer::new();
    jpegdec_rs::decode(data, &mut image, false)?;
    Ok(image)
}

pub fn format_error(result: Result<impl Sized>) -> jpegdec_rs::FormatError {
    match result {
        Err(JpegError::Format(error)) => error,
        Err(other) => panic!("expected a format error, got {other:?}"),
        Ok(_) => panic!("expected a format error, decoding succeeded"),
    }
}
