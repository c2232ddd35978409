use std::io::Read;

use log::{debug, warn};
use num_enum::TryFromPrimitive;

use crate::FrameInfo;
use crate::byte_reader::ByteReader;
use crate::constants::{
    ADOBE_IDENTIFIER, BLOCK_DIM, BLOCK_SIZE, EXIF_IDENTIFIER, JFIF_IDENTIFIER, MAXIMUM_BASELINE_TH,
    MAXIMUM_BLOCKS_IN_MCU, MAXIMUM_CODE_LENGTH, MAXIMUM_COMPONENT_COUNT, MAXIMUM_HUFFMAN_VALUES,
    MAXIMUM_SAMPLING_FACTOR, MAXIMUM_SUCCESSIVE_APPROXIMATION, MAXIMUM_TC, MAXIMUM_TH, MAXIMUM_TQ,
};
use crate::error::{FormatError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg1::color::ColorModel;
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTables, TableClass};
use crate::jpeg1::quantization::QuantizationTable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegComponent {
    pub id: u8,
    pub h_samp_factor: u8,
    pub v_samp_factor: u8,
    pub quant_table_dest: u8,
}

impl JpegComponent {
    pub fn new(id: u8, h_samp_factor: u8, v_samp_factor: u8, quant_table_dest: u8) -> Self {
        Self {
            id,
            h_samp_factor,
            v_samp_factor,
            quant_table_dest,
        }
    }
}

/// Frame header (SOFn) together with the MCU geometry derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub is_baseline: bool,
    pub is_progressive: bool,
    pub components: Vec<JpegComponent>,
    pub h_max: usize,
    pub v_max: usize,
    pub mcus_x: usize,
    pub mcus_y: usize,
}

impl Frame {
    pub fn new(
        width: usize,
        height: usize,
        is_baseline: bool,
        is_progressive: bool,
        components: Vec<JpegComponent>,
    ) -> Self {
        let h_max = components
            .iter()
            .map(|c| usize::from(c.h_samp_factor))
            .max()
            .unwrap_or(1)
            .max(1);
        let v_max = components
            .iter()
            .map(|c| usize::from(c.v_samp_factor))
            .max()
            .unwrap_or(1)
            .max(1);
        Self {
            width,
            height,
            is_baseline,
            is_progressive,
            components,
            h_max,
            v_max,
            mcus_x: width.div_ceil(BLOCK_SIZE * h_max),
            mcus_y: height.div_ceil(BLOCK_SIZE * v_max),
        }
    }

    /// Blocks per row of `component` in the MCU-padded block grid.
    pub fn blocks_per_line(&self, component: usize) -> usize {
        self.mcus_x * usize::from(self.components[component].h_samp_factor)
    }

    pub fn block_rows(&self, component: usize) -> usize {
        self.mcus_y * usize::from(self.components[component].v_samp_factor)
    }

    /// Blocks covering the component's own sample area (A.2.2). Non-interleaved scans visit
    /// only these.
    pub fn visible_blocks(&self, component: usize) -> (usize, usize) {
        let c = &self.components[component];
        let width = (self.width * usize::from(c.h_samp_factor)).div_ceil(self.h_max);
        let height = (self.height * usize::from(c.v_samp_factor)).div_ceil(self.v_max);
        (width.div_ceil(BLOCK_SIZE), height.div_ceil(BLOCK_SIZE))
    }

    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into [`Frame::components`].
    pub component_index: usize,
    pub dc_table_dest: u8,
    pub ac_table_dest: u8,
}

/// Scan header (SOS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approx_high: u8,
    pub approx_low: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum DensityUnit {
    /// Only the pixel aspect ratio is known.
    None = 0,
    DotsPerInch = 1,
    DotsPerCentimeter = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifHeader {
    pub major_version: u8,
    pub minor_version: u8,
    pub density_unit: DensityUnit,
    pub x_density: u16,
    pub y_density: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegStreamReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

pub struct JpegStreamReader<R> {
    reader: ByteReader<R>,
    state: JpegStreamReaderState,
    frame: Option<Frame>,
    quantization_tables: [Option<QuantizationTable>; MAXIMUM_TQ as usize + 1],
    huffman_tables: HuffmanTables,
    restart_interval: u16,
    is_jfif: bool,
    jfif_header: Option<JfifHeader>,
    adobe_transform: Option<u8>,
    exif: Option<Vec<u8>>,
}

impl<R: Read> JpegStreamReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: ByteReader::new(source),
            state: JpegStreamReaderState::BeforeStartOfImage,
            frame: None,
            quantization_tables: [None; MAXIMUM_TQ as usize + 1],
            huffman_tables: HuffmanTables::default(),
            restart_interval: 0,
            is_jfif: false,
            jfif_header: None,
            adobe_transform: None,
            exif: None,
        }
    }

    pub fn state(&self) -> JpegStreamReaderState {
        self.state
    }

    pub fn set_state(&mut self, state: JpegStreamReaderState) {
        self.state = state;
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        let frame = self.frame.as_ref()?;
        Some(FrameInfo {
            width: frame.width as u32,
            height: frame.height as u32,
            bits_per_sample: 8,
            component_count: frame.components.len() as i32,
            is_progressive: frame.is_progressive,
            color_model: self.color_model(),
            restart_interval: self.restart_interval,
        })
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    pub fn is_jfif(&self) -> bool {
        self.is_jfif
    }

    pub fn jfif_header(&self) -> Option<JfifHeader> {
        self.jfif_header
    }

    pub fn adobe_transform(&self) -> Option<u8> {
        self.adobe_transform
    }

    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    pub fn take_exif(&mut self) -> Option<Vec<u8>> {
        self.exif.take()
    }

    pub fn quantization_table(&self, destination: u8) -> Option<&QuantizationTable> {
        self.quantization_tables
            .get(usize::from(destination))
            .and_then(Option::as_ref)
    }

    pub fn huffman_tables(&self) -> &HuffmanTables {
        &self.huffman_tables
    }

    pub fn huffman_tables_mut(&mut self) -> &mut HuffmanTables {
        &mut self.huffman_tables
    }

    /// Borrows the byte source alongside the tables an entropy-coded segment is decoded with.
    pub fn scan_context(
        &mut self,
    ) -> (
        &mut ByteReader<R>,
        Option<&Frame>,
        &HuffmanTables,
        &[Option<QuantizationTable>; MAXIMUM_TQ as usize + 1],
    ) {
        (
            &mut self.reader,
            self.frame.as_ref(),
            &self.huffman_tables,
            &self.quantization_tables,
        )
    }

    /// Horizontal and vertical resolution in dots per inch, when the JFIF header has one.
    pub fn resolution(&self) -> Option<(f64, f64)> {
        let header = self.jfif_header?;
        let (x, y) = (f64::from(header.x_density), f64::from(header.y_density));
        match header.density_unit {
            DensityUnit::None => None,
            DensityUnit::DotsPerInch => Some((x, y)),
            DensityUnit::DotsPerCentimeter => Some((x * 2.54, y * 2.54)),
        }
    }

    /// Interprets the frame's components. `None` when a 4-component frame lacks the Adobe
    /// segment telling CMYK from YCCK.
    pub fn color_model(&self) -> Option<ColorModel> {
        let frame = self.frame.as_ref()?;
        match frame.components.len() {
            1 => Some(ColorModel::Grayscale),
            3 if self.is_rgb(frame) => Some(ColorModel::Rgb),
            3 => Some(ColorModel::YCbCr),
            4 => match self.adobe_transform? {
                0 => Some(ColorModel::Cmyk),
                _ => Some(ColorModel::Ycck),
            },
            _ => None,
        }
    }

    fn is_rgb(&self, frame: &Frame) -> bool {
        if self.is_jfif {
            return false;
        }
        // Transform 0 means "unknown", which is RGB in practice.
        if self.adobe_transform == Some(0) {
            return true;
        }
        let ids: Vec<u8> = frame.components.iter().map(|c| c.id).collect();
        ids == b"RGB"
    }

    pub fn read_start_of_image(&mut self) -> Result<()> {
        let mut marker = [0u8; 2];
        self.reader
            .read_full(&mut marker)
            .map_err(|_| FormatError::MissingStartOfImage)?;
        if marker != [JPEG_MARKER_START_BYTE, u8::from(JpegMarkerCode::StartOfImage)] {
            return Err(FormatError::MissingStartOfImage.into());
        }
        self.state = JpegStreamReaderState::HeaderSection;
        Ok(())
    }

    /// Reads up to the next marker and returns its code byte.
    ///
    /// Bytes that do not form a marker are skipped with a warning, as are `FF00` pairs and
    /// fill bytes (B.1.1.2).
    pub fn read_marker(&mut self) -> Result<u8> {
        let mut extraneous = 0usize;
        loop {
            if self.reader.read_byte()? != JPEG_MARKER_START_BYTE {
                extraneous += 1;
                continue;
            }
            let mut marker = self.reader.read_byte()?;
            while marker == JPEG_MARKER_START_BYTE {
                marker = self.reader.read_byte()?;
            }
            if marker == 0x00 {
                extraneous += 2;
                continue;
            }
            if extraneous > 0 {
                warn!("skipped {extraneous} extraneous bytes before marker 0xFF{marker:02X}");
            }
            return Ok(marker);
        }
    }

    /// Reads the length field of a marker segment and returns the length of its payload.
    pub fn read_segment_length(&mut self) -> Result<usize> {
        let length = usize::from(self.reader.read_u16()?);
        length
            .checked_sub(2)
            .ok_or_else(|| FormatError::ShortSegmentLength.into())
    }

    pub fn skip_segment(&mut self, length: usize) -> Result<()> {
        self.reader.skip(length)
    }

    pub fn read_start_of_frame(&mut self, marker: JpegMarkerCode, length: usize) -> Result<()> {
        if self.frame.is_some() {
            return Err(FormatError::MultipleFrames.into());
        }

        let component_count = match length {
            9 => 1,
            15 => 3,
            18 => 4,
            _ => return Err(FormatError::UnsupportedComponentCount.into()),
        };

        let mut header = [0u8; 6];
        self.reader.read_full(&mut header)?;
        if header[0] != 8 {
            return Err(FormatError::UnsupportedPrecision(header[0]).into());
        }
        let height = usize::from(u16::from_be_bytes([header[1], header[2]]));
        let width = usize::from(u16::from_be_bytes([header[3], header[4]]));
        if usize::from(header[5]) != component_count {
            return Err(FormatError::WrongSegmentLength("SOF").into());
        }
        if height == 0 {
            return Err(FormatError::DnlUnsupported.into());
        }
        if width == 0 {
            return Err(FormatError::EmptyImage.into());
        }

        let mut components: Vec<JpegComponent> = Vec::with_capacity(component_count);
        for i in 0..component_count {
            let mut parameters = [0u8; 3];
            self.reader.read_full(&mut parameters)?;
            let [id, sampling, tq] = parameters;

            if components.iter().any(|c| c.id == id) {
                return Err(FormatError::RepeatedComponentIdentifier.into());
            }
            if tq > MAXIMUM_TQ {
                return Err(FormatError::BadTq.into());
            }

            let (mut h, mut v) = (sampling >> 4, sampling & 0x0F);
            if !(1..=MAXIMUM_SAMPLING_FACTOR).contains(&h) || !(1..=MAXIMUM_SAMPLING_FACTOR).contains(&v) {
                return Err(FormatError::BadSamplingFactor.into());
            }
            if h == 3 || v == 3 {
                return Err(FormatError::UnsupportedSubsampling.into());
            }

            let supported = match (component_count, i) {
                // A single component is never interleaved (A.2), so its factors do not matter.
                (1, _) => {
                    h = 1;
                    v = 1;
                    true
                }
                // YCbCr: 4:4:4, 4:4:0, 4:2:2, 4:2:0, 4:1:1 or 4:1:0, with equal chroma.
                (3, 0) => v != 4,
                (3, 1) => {
                    components[0].h_samp_factor % h == 0 && components[0].v_samp_factor % v == 0
                }
                (3, _) => components[1].h_samp_factor == h && components[1].v_samp_factor == v,
                // CMYK / YCCK: K matches the first component, the middle two are full size.
                (4, 0) => sampling == 0x11 || sampling == 0x22,
                (4, 3) => components[0].h_samp_factor == h && components[0].v_samp_factor == v,
                (4, _) => sampling == 0x11,
                _ => false,
            };
            if !supported {
                return Err(FormatError::UnsupportedSubsampling.into());
            }

            components.push(JpegComponent::new(id, h, v, tq));
        }

        let is_baseline = marker == JpegMarkerCode::StartOfFrameBaseline;
        let is_progressive = marker == JpegMarkerCode::StartOfFrameProgressive;
        let frame = Frame::new(width, height, is_baseline, is_progressive, components);
        debug!(
            "SOF{}: {}x{}, {} components, {}x{} MCUs",
            u8::from(marker) - 0xC0,
            frame.width,
            frame.height,
            frame.components.len(),
            frame.mcus_x,
            frame.mcus_y
        );
        self.frame = Some(frame);
        Ok(())
    }

    pub fn read_define_huffman_table(&mut self, mut length: usize) -> Result<()> {
        let is_baseline = self.frame.as_ref().is_some_and(|f| f.is_baseline);
        while length > 0 {
            if length < 1 + MAXIMUM_CODE_LENGTH {
                return Err(FormatError::WrongSegmentLength("DHT").into());
            }
            let mut header = [0u8; 1 + MAXIMUM_CODE_LENGTH];
            self.reader.read_full(&mut header)?;
            length -= header.len();

            let class = header[0] >> 4;
            if class > MAXIMUM_TC {
                return Err(FormatError::BadTc.into());
            }
            let destination = header[0] & 0x0F;
            let maximum_th = if is_baseline { MAXIMUM_BASELINE_TH } else { MAXIMUM_TH };
            if destination > maximum_th {
                return Err(FormatError::BadTh.into());
            }

            let mut lengths = [0u8; MAXIMUM_CODE_LENGTH];
            lengths.copy_from_slice(&header[1..]);
            let total: usize = lengths.iter().map(|&n| usize::from(n)).sum();
            if total == 0 || total > MAXIMUM_HUFFMAN_VALUES {
                return Err(FormatError::HuffmanTableInvalid.into());
            }
            if length < total {
                return Err(FormatError::WrongSegmentLength("DHT").into());
            }
            let values = self.reader.read_vec(total)?;
            length -= total;

            let table = HuffmanTable::build(&lengths, &values)?;
            let class = if class == 0 { TableClass::Dc } else { TableClass::Ac };
            debug!("DHT: {class:?} table {destination} with {total} codes");
            self.huffman_tables.set(class, destination, table);
        }
        Ok(())
    }

    pub fn read_define_quantization_table(&mut self, mut length: usize) -> Result<()> {
        while length > 0 {
            length -= 1;
            let pq_tq = self.reader.read_byte()?;
            let destination = pq_tq & 0x0F;
            if destination > MAXIMUM_TQ {
                return Err(FormatError::BadTq.into());
            }
            let table = match pq_tq >> 4 {
                0 => {
                    if length < BLOCK_DIM {
                        break;
                    }
                    length -= BLOCK_DIM;
                    let mut bytes = [0u8; BLOCK_DIM];
                    self.reader.read_full(&mut bytes)?;
                    QuantizationTable::from_bytes(&bytes)
                }
                1 => {
                    if length < 2 * BLOCK_DIM {
                        break;
                    }
                    length -= 2 * BLOCK_DIM;
                    let mut bytes = [0u8; 2 * BLOCK_DIM];
                    self.reader.read_full(&mut bytes)?;
                    QuantizationTable::from_words(&bytes)
                }
                _ => return Err(FormatError::BadPq.into()),
            };
            debug!("DQT: table {destination}, {}-bit", if pq_tq >> 4 == 0 { 8 } else { 16 });
            self.quantization_tables[usize::from(destination)] = Some(table);
        }
        if length != 0 {
            return Err(FormatError::WrongSegmentLength("DQT").into());
        }
        Ok(())
    }

    pub fn read_define_restart_interval(&mut self, length: usize) -> Result<()> {
        if length != 2 {
            return Err(FormatError::WrongSegmentLength("DRI").into());
        }
        self.restart_interval = self.reader.read_u16()?;
        debug!("DRI: restart interval {}", self.restart_interval);
        Ok(())
    }

    pub fn read_start_of_scan(&mut self, length: usize) -> Result<ScanHeader> {
        let Some(frame) = self.frame.as_ref() else {
            return Err(FormatError::MissingStartOfFrame.into());
        };
        if length < 6 || length > 4 + 2 * MAXIMUM_COMPONENT_COUNT || length % 2 != 0 {
            return Err(FormatError::WrongSegmentLength("SOS").into());
        }
        let mut segment = [0u8; 4 + 2 * MAXIMUM_COMPONENT_COUNT];
        self.reader.read_full(&mut segment[..length])?;

        let component_count = usize::from(segment[0]);
        if length != 4 + 2 * component_count {
            return Err(FormatError::WrongSegmentLength("SOS").into());
        }

        let maximum_th = if frame.is_baseline { MAXIMUM_BASELINE_TH } else { MAXIMUM_TH };
        let mut components: Vec<ScanComponent> = Vec::with_capacity(component_count);
        let mut total_hv = 0usize;
        for i in 0..component_count {
            let selector = segment[1 + 2 * i];
            let tables = segment[2 + 2 * i];
            let component_index = frame
                .component_index(selector)
                .ok_or(FormatError::UnknownComponentSelector)?;
            if components.iter().any(|c| c.component_index == component_index) {
                return Err(FormatError::RepeatedComponentSelector.into());
            }
            let component = &frame.components[component_index];
            total_hv += usize::from(component.h_samp_factor) * usize::from(component.v_samp_factor);

            let dc_table_dest = tables >> 4;
            if dc_table_dest > maximum_th {
                return Err(FormatError::BadTd.into());
            }
            let ac_table_dest = tables & 0x0F;
            if ac_table_dest > maximum_th {
                return Err(FormatError::BadTa.into());
            }
            components.push(ScanComponent {
                component_index,
                dc_table_dest,
                ac_table_dest,
            });
        }
        // B.2.3: an interleaved MCU holds at most 10 blocks.
        if component_count > 1 && total_hv > MAXIMUM_BLOCKS_IN_MCU {
            return Err(FormatError::SamplingFactorsTooLarge.into());
        }

        let scan = if frame.is_progressive {
            let tail = &segment[1 + 2 * component_count..];
            let (spectral_start, spectral_end) = (tail[0], tail[1]);
            let (approx_high, approx_low) = (tail[2] >> 4, tail[2] & 0x0F);
            if (spectral_start == 0 && spectral_end != 0)
                || spectral_start > spectral_end
                || usize::from(spectral_end) >= BLOCK_DIM
            {
                return Err(FormatError::BadSpectralSelection.into());
            }
            if spectral_start != 0 && component_count != 1 {
                return Err(FormatError::ProgressiveAcInterleaved.into());
            }
            if (approx_high != 0 && approx_high != approx_low + 1)
                || approx_low > MAXIMUM_SUCCESSIVE_APPROXIMATION
            {
                return Err(FormatError::BadSuccessiveApproximation.into());
            }
            ScanHeader {
                components,
                spectral_start,
                spectral_end,
                approx_high,
                approx_low,
            }
        } else {
            // Sequential scans always carry the whole band at full precision.
            ScanHeader {
                components,
                spectral_start: 0,
                spectral_end: (BLOCK_DIM - 1) as u8,
                approx_high: 0,
                approx_low: 0,
            }
        };

        debug!(
            "SOS: {} components, Ss={} Se={} Ah={} Al={}",
            scan.components.len(),
            scan.spectral_start,
            scan.spectral_end,
            scan.approx_high,
            scan.approx_low
        );
        Ok(scan)
    }

    /// APP0: JFIF header.
    pub fn read_application_data0(&mut self, mut length: usize) -> Result<()> {
        if length < JFIF_IDENTIFIER.len() {
            return self.skip_segment(length);
        }
        let mut identifier = [0u8; 5];
        self.reader.read_full(&mut identifier)?;
        length -= identifier.len();
        // A JFXX extension segment follows JFIF without replacing it.
        let is_jfif = &identifier == JFIF_IDENTIFIER;
        self.is_jfif |= is_jfif;

        if is_jfif && length >= 7 {
            let mut fields = [0u8; 7];
            self.reader.read_full(&mut fields)?;
            length -= fields.len();
            match DensityUnit::try_from(fields[2]) {
                Ok(density_unit) => {
                    self.jfif_header = Some(JfifHeader {
                        major_version: fields[0],
                        minor_version: fields[1],
                        density_unit,
                        x_density: u16::from_be_bytes([fields[3], fields[4]]),
                        y_density: u16::from_be_bytes([fields[5], fields[6]]),
                    });
                }
                Err(_) => warn!("ignoring JFIF density with unknown unit {}", fields[2]),
            }
        }
        self.skip_segment(length)
    }

    /// APP1: an Exif profile is kept for the pixel sink, XMP and others are skipped.
    pub fn read_application_data1(&mut self, mut length: usize) -> Result<()> {
        if length < EXIF_IDENTIFIER.len() {
            return self.skip_segment(length);
        }
        let mut identifier = [0u8; 6];
        self.reader.read_full(&mut identifier)?;
        length -= identifier.len();
        if &identifier != EXIF_IDENTIFIER {
            return self.skip_segment(length);
        }
        if self.exif.is_some() {
            warn!("ignoring repeated Exif segment");
            return self.skip_segment(length);
        }
        self.exif = Some(self.reader.read_vec(length)?);
        Ok(())
    }

    /// APP14: Adobe segment carrying the color transform.
    pub fn read_application_data14(&mut self, mut length: usize) -> Result<()> {
        if length < 12 {
            return self.skip_segment(length);
        }
        let mut segment = [0u8; 12];
        self.reader.read_full(&mut segment)?;
        length -= segment.len();
        if &segment[..ADOBE_IDENTIFIER.len()] == ADOBE_IDENTIFIER {
            self.adobe_transform = Some(segment[11]);
            debug!("APP14: Adobe transform {}", segment[11]);
        }
        self.skip_segment(length)
    }
}
