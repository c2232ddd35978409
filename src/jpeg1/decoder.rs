//! JPEG 1 decoder for baseline, extended sequential (8-bit) and progressive Huffman frames.

use std::io::Read;

use log::{debug, warn};

use crate::FrameInfo;
use crate::error::{FormatError, JpegError, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::{JpegStreamReader, JpegStreamReaderState};
use crate::jpeg1::coefficients::CoefficientStore;
use crate::jpeg1::color::convert_planes;
use crate::jpeg1::planes::PlaneSet;
use crate::jpeg1::scan_decoder::{ScanDecoder, ScanOutput};
use crate::pixel_sink::PixelSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    /// Decode every scan up to EOI.
    Image,
    /// Parse all segments up to the first scan, which is left pending.
    Header,
    /// Like `Header`, but a JFIF frame header ends the pass.
    ConfigOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    HeaderRead,
    EndOfImage,
}

pub struct Jpeg1Decoder<R> {
    reader: JpegStreamReader<R>,
    planes: Option<PlaneSet>,
    coefficients: Option<CoefficientStore>,
    // Payload length of an SOS segment whose header has not been read yet.
    pending_scan: Option<usize>,
    scans_decoded: usize,
}

impl<R: Read> Jpeg1Decoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            planes: None,
            coefficients: None,
            pending_scan: None,
            scans_decoded: 0,
        }
    }

    /// The frame parameters, once the frame header has been read.
    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.reader.frame_info()
    }

    /// Reads the stream up to its first scan and describes the frame. A subsequent
    /// [`Jpeg1Decoder::decode`] continues from there.
    pub fn read_info(&mut self) -> Result<FrameInfo> {
        self.read_segments(ReadMode::Header)?;
        self.reader
            .frame_info()
            .ok_or_else(|| FormatError::MissingStartOfFrame.into())
    }

    /// Decodes the image into `sink`.
    ///
    /// With `config_only` only the metadata is delivered: the pass stops at the frame header of
    /// a JFIF stream or at the first scan otherwise, and no pixels are produced.
    pub fn decode<S: PixelSink>(&mut self, sink: &mut S, config_only: bool) -> Result<()> {
        let mode = if config_only { ReadMode::ConfigOnly } else { ReadMode::Image };
        let progress = self.read_segments(mode)?;
        self.apply_metadata(sink);
        if config_only {
            return Ok(());
        }
        debug_assert_eq!(progress, Progress::EndOfImage);

        if self.scans_decoded == 0 {
            return Err(FormatError::MissingStartOfScan.into());
        }
        let (_, frame, _, quantization_tables) = self.reader.scan_context();
        let frame = frame.ok_or(FormatError::MissingStartOfFrame)?;
        let mut planes = self.planes.take().ok_or(FormatError::MissingStartOfScan)?;

        // Progressive coefficients are complete only now; each block is reconstructed once.
        if let Some(store) = self.coefficients.take() {
            store.finalize(frame, quantization_tables, &mut planes)?;
        }

        let (width, height) = (frame.width, frame.height);
        let model = self
            .reader
            .color_model()
            .ok_or(FormatError::UnknownColorModel)?;
        debug!("converting {width}x{height} {model:?} image");
        sink.init_pixels(width, height);
        convert_planes(model, &planes, width, sink.pixels_mut());
        Ok(())
    }

    fn apply_metadata<S: PixelSink>(&mut self, sink: &mut S) {
        if let Some((horizontal, vertical)) = self.reader.resolution() {
            sink.set_resolution(horizontal, vertical);
        }
        if let Some(exif) = self.reader.take_exif() {
            sink.set_exif_profile(exif);
        }
    }

    fn read_segments(&mut self, mode: ReadMode) -> Result<Progress> {
        self.read_segments_until(mode).map_err(|e| match e {
            JpegError::UnexpectedEof => match self.reader.state() {
                JpegStreamReaderState::BeforeStartOfImage => FormatError::MissingStartOfImage.into(),
                JpegStreamReaderState::HeaderSection => FormatError::MissingStartOfScan.into(),
                _ => FormatError::MissingEndOfImage.into(),
            },
            e => e,
        })
    }

    fn read_segments_until(&mut self, mode: ReadMode) -> Result<Progress> {
        match self.reader.state() {
            JpegStreamReaderState::BeforeStartOfImage => self.reader.read_start_of_image()?,
            JpegStreamReaderState::EndOfImage => return Ok(Progress::EndOfImage),
            _ => {}
        }

        loop {
            if let Some(length) = self.pending_scan {
                if mode != ReadMode::Image {
                    return Ok(Progress::HeaderRead);
                }
                self.pending_scan = None;
                self.decode_scan(length)?;
                continue;
            }

            let code = self.reader.read_marker()?;
            let marker = match JpegMarkerCode::try_from(code) {
                Ok(marker) => marker,
                Err(_) if code < u8::from(JpegMarkerCode::StartOfFrameBaseline) => {
                    return Err(FormatError::UnknownMarker(code).into());
                }
                Err(_) => return Err(FormatError::UnsupportedMarker(code).into()),
            };

            if marker == JpegMarkerCode::EndOfImage {
                self.reader.set_state(JpegStreamReaderState::EndOfImage);
                return Ok(Progress::EndOfImage);
            }
            if let Some(index) = marker.restart_index() {
                warn!("ignoring RST{index} marker outside of entropy-coded data");
                continue;
            }
            if marker.is_standalone() {
                return Err(FormatError::UnsupportedMarker(code).into());
            }

            let length = self.reader.read_segment_length()?;
            match marker {
                JpegMarkerCode::StartOfFrameBaseline
                | JpegMarkerCode::StartOfFrameExtendedSequential
                | JpegMarkerCode::StartOfFrameProgressive => {
                    self.reader.read_start_of_frame(marker, length)?;
                    if mode == ReadMode::ConfigOnly && self.reader.is_jfif() {
                        return Ok(Progress::HeaderRead);
                    }
                }
                JpegMarkerCode::DefineHuffmanTable => self.reader.read_define_huffman_table(length)?,
                JpegMarkerCode::DefineQuantizationTable => {
                    self.reader.read_define_quantization_table(length)?
                }
                JpegMarkerCode::DefineRestartInterval => {
                    self.reader.read_define_restart_interval(length)?
                }
                JpegMarkerCode::StartOfScan => {
                    self.pending_scan = Some(length);
                }
                JpegMarkerCode::ApplicationData0 => self.reader.read_application_data0(length)?,
                JpegMarkerCode::ApplicationData1 => self.reader.read_application_data1(length)?,
                JpegMarkerCode::ApplicationData14 => self.reader.read_application_data14(length)?,
                JpegMarkerCode::DefineNumberOfLines => return Err(FormatError::DnlUnsupported.into()),
                _ if marker.is_application_data() || marker == JpegMarkerCode::Comment => {
                    self.reader.skip_segment(length)?;
                }
                _ => {
                    return Err(match marker.start_of_frame_number() {
                        Some(n) => FormatError::UnsupportedCodingProcess(n),
                        None => FormatError::UnsupportedMarker(code),
                    }
                    .into());
                }
            }
        }
    }

    fn decode_scan(&mut self, length: usize) -> Result<()> {
        let scan = self.reader.read_start_of_scan(length)?;
        self.reader.set_state(JpegStreamReaderState::ScanSection);

        if self.reader.huffman_tables().is_empty() {
            debug!("no DHT segment, using the standard Huffman tables");
            self.reader.huffman_tables_mut().install_standard_tables()?;
        }
        let restart_interval = self.reader.restart_interval();

        let (bytes, frame, tables, quantization_tables) = self.reader.scan_context();
        let frame = frame.ok_or(FormatError::MissingStartOfFrame)?;
        let planes = self.planes.get_or_insert_with(|| PlaneSet::new(frame));

        let mut output = if frame.is_progressive {
            ScanOutput::Progressive(
                self.coefficients
                    .get_or_insert_with(|| CoefficientStore::new(frame)),
            )
        } else {
            for component in &scan.components {
                let destination = frame.components[component.component_index].quant_table_dest;
                if quantization_tables[usize::from(destination)].is_none() {
                    return Err(FormatError::MissingQuantizationTable.into());
                }
            }
            ScanOutput::Sequential {
                planes,
                quantization_tables,
            }
        };

        ScanDecoder::new(bytes, frame, &scan, tables, restart_interval)?.decode(&mut output)?;
        self.scans_decoded += 1;
        Ok(())
    }
}
