use thiserror::Error;

/// Reasons a JPEG stream is rejected as malformed or outside the supported subset.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing SOI marker")]
    MissingStartOfImage,
    #[error("missing SOF marker")]
    MissingStartOfFrame,
    #[error("missing SOS marker")]
    MissingStartOfScan,
    #[error("missing EOI marker")]
    MissingEndOfImage,
    #[error("multiple SOF markers")]
    MultipleFrames,
    #[error("unknown marker 0xFF{0:02X}")]
    UnknownMarker(u8),
    #[error("unsupported marker 0xFF{0:02X}")]
    UnsupportedMarker(u8),
    #[error("short segment length")]
    ShortSegmentLength,
    #[error("{0} segment has wrong length")]
    WrongSegmentLength(&'static str),

    #[error("unsupported sample precision {0}")]
    UnsupportedPrecision(u8),
    #[error("unsupported number of components")]
    UnsupportedComponentCount,
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("bad sampling factor")]
    BadSamplingFactor,
    #[error("unsupported luma/chroma subsampling ratio")]
    UnsupportedSubsampling,
    #[error("repeated component identifier")]
    RepeatedComponentIdentifier,
    #[error("unsupported coding process (SOF{0})")]
    UnsupportedCodingProcess(u8),
    #[error("DNL marker is not supported")]
    DnlUnsupported,

    #[error("bad Pq value")]
    BadPq,
    #[error("bad Tq value")]
    BadTq,
    #[error("bad Tc value")]
    BadTc,
    #[error("bad Th value")]
    BadTh,
    #[error("bad Td value")]
    BadTd,
    #[error("bad Ta value")]
    BadTa,

    #[error("Huffman table has zero or excessive length")]
    HuffmanTableInvalid,
    #[error("bad Huffman code")]
    BadHuffmanCode,
    #[error("unexpected Huffman code")]
    UnexpectedHuffmanCode,
    #[error("too many coefficients")]
    TooManyCoefficients,
    #[error("excessive DC component")]
    ExcessiveDcComponent,

    #[error("unknown component selector")]
    UnknownComponentSelector,
    #[error("repeated component selector")]
    RepeatedComponentSelector,
    #[error("total sampling factors too large")]
    SamplingFactorsTooLarge,
    #[error("bad spectral selection bounds")]
    BadSpectralSelection,
    #[error("progressive AC coefficients for more than one component")]
    ProgressiveAcInterleaved,
    #[error("bad successive approximation values")]
    BadSuccessiveApproximation,
    #[error("use of undefined quantization table")]
    MissingQuantizationTable,
    #[error("use of undefined Huffman table")]
    MissingHuffmanTable,

    #[error("unknown color model: 4-component image without Adobe APP14 marker")]
    UnknownColorModel,
}

#[derive(Error, Debug)]
pub enum JpegError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("bad restart marker: expected RST{expected}, found 0xFF{found:02X}")]
    BadRestartMarker { expected: u8, found: u8 },
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JpegError {
    /// Whether the error was caused by malformed stream content rather than I/O.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format(_) | Self::BadRestartMarker { .. })
    }
}

pub type Result<T, E = JpegError> = std::result::Result<T, E>;
