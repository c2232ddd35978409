use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;

/// Marker codes of ITU T.81 Table B.1, identified by the byte following `0xFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// TEM: For temporary private use in arithmetic coding.
    Temporary = 0x01,

    /// SOF0: Baseline DCT, Huffman coding.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Extended sequential DCT, Huffman coding.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF2: Progressive DCT, Huffman coding.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Lossless (sequential), Huffman coding.
    StartOfFrameLossless = 0xC3,
    /// DHT: Define Huffman table(s).
    DefineHuffmanTable = 0xC4,
    /// SOF5: Differential sequential DCT.
    StartOfFrameDifferentialSequential = 0xC5,
    /// SOF6: Differential progressive DCT.
    StartOfFrameDifferentialProgressive = 0xC6,
    /// SOF7: Differential lossless.
    StartOfFrameDifferentialLossless = 0xC7,
    /// JPG: Reserved for JPEG extensions.
    JpegExtension = 0xC8,
    /// SOF9: Extended sequential DCT, arithmetic coding.
    StartOfFrameArithmeticSequential = 0xC9,
    /// SOF10: Progressive DCT, arithmetic coding.
    StartOfFrameArithmeticProgressive = 0xCA,
    /// SOF11: Lossless, arithmetic coding.
    StartOfFrameArithmeticLossless = 0xCB,
    /// DAC: Define arithmetic coding conditioning(s).
    DefineArithmeticConditioning = 0xCC,
    /// SOF13: Differential sequential DCT, arithmetic coding.
    StartOfFrameArithmeticDifferentialSequential = 0xCD,
    /// SOF14: Differential progressive DCT, arithmetic coding.
    StartOfFrameArithmeticDifferentialProgressive = 0xCE,
    /// SOF15: Differential lossless, arithmetic coding.
    StartOfFrameArithmeticDifferentialLossless = 0xCF,

    /// RST0..RST7: Restart markers inside entropy-coded data.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,
    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,
    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,
    /// DQT: Define quantization table(s).
    DefineQuantizationTable = 0xDB,
    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,
    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,
    /// DHP: Define hierarchical progression.
    DefineHierarchicalProgression = 0xDE,
    /// EXP: Expand reference component(s).
    ExpandReferenceComponents = 0xDF,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13: used by PhotoShop IRB
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// Returns `Some(n)` for the restart markers RSTn.
    pub fn restart_index(self) -> Option<u8> {
        let byte = u8::from(self);
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&byte)
            .then(|| byte - JPEG_RESTART_MARKER_BASE)
    }

    pub fn is_application_data(self) -> bool {
        (0xE0..=0xEF).contains(&u8::from(self))
    }

    /// Returns the frame type number `n` of an SOFn marker.
    pub fn start_of_frame_number(self) -> Option<u8> {
        match self {
            Self::DefineHuffmanTable | Self::JpegExtension | Self::DefineArithmeticConditioning => {
                None
            }
            _ => {
                let byte = u8::from(self);
                (0xC0..=0xCF).contains(&byte).then(|| byte - 0xC0)
            }
        }
    }

    /// Markers that stand alone, without a length-prefixed segment.
    pub fn is_standalone(self) -> bool {
        self == Self::Temporary
            || self == Self::StartOfImage
            || self == Self::EndOfImage
            || self.restart_index().is_some()
    }
}
