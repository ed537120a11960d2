use std::io;

use thiserror::Error;

use crate::marker::Marker;

/// Broad classification of a [JpegError]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Missing or misplaced marker, bad segment length, truncated segment
    Format,

    /// Well formed stream using a feature this codec does not implement
    Unsupported,

    /// Corrupt entropy-coded data
    Bitstream,

    /// Table or frame parameter out of range
    Validation,

    /// Invalid arguments passed to the encoder
    InvalidInput,

    /// Error of the underlying writer
    Io,
}

/// # The error type for encoding and decoding
#[derive(Debug, Error)]
pub enum JpegError {
    #[error("Data does not start with a SOI marker")]
    MissingSoi,

    #[error("Required {0:?} segment is missing")]
    MissingSegment(Marker),

    #[error("{0:?} segment encountered before the frame header")]
    SegmentBeforeFrame(Marker),

    #[error("Multiple frame headers found")]
    DuplicateFrame,

    #[error("Invalid length {length} for {marker:?} segment")]
    InvalidSegmentLength { marker: Marker, length: usize },

    #[error("{0:?} segment is truncated")]
    TruncatedSegment(Marker),

    #[error("Unsupported sample precision {0}, only 8 bit samples are supported")]
    UnsupportedPrecision(u8),

    #[error("Unsupported number of components: {0}")]
    UnsupportedComponentCount(u8),

    #[error("Unsupported frame type {0:?}")]
    UnsupportedFrameType(Marker),

    #[error("Unsupported successive approximation Ah={ah} Al={al}")]
    UnsupportedSuccessiveApproximation { ah: u8, al: u8 },

    #[error("Unsupported end-of-band run (symbol {0:#04x}) in progressive scan")]
    UnsupportedEobRun(u8),

    #[error("Unexpected end of entropy-coded data")]
    UnexpectedEndOfData,

    #[error("Unexpected marker 0xFF{0:02X} inside entropy-coded data")]
    UnexpectedMarker(u8),

    #[error("Invalid Huffman code")]
    InvalidHuffmanCode,

    #[error("Expected restart marker after {0} MCUs")]
    MissingRestartMarker(usize),

    #[error("Coefficient index {index} outside of spectral band {ss}..={se}")]
    CoefficientOutOfBand { index: usize, ss: u8, se: u8 },

    #[error("Coefficient magnitude category {0} out of range")]
    InvalidMagnitudeCategory(u8),

    #[error("Invalid {class} table id {id}")]
    InvalidTableId { class: &'static str, id: u8 },

    #[error("Reference to undefined {class} table {id}")]
    UndefinedTable { class: &'static str, id: u8 },

    #[error("Invalid Huffman table: {0}")]
    InvalidHuffmanTable(&'static str),

    #[error("Symbol {symbol:#04x} has no code in Huffman table")]
    MissingHuffmanCode { symbol: u8 },

    #[error("Invalid quantization value 0 at index {0}")]
    InvalidQuantizationValue(usize),

    #[error("Invalid sampling factors {h}x{v}")]
    InvalidSamplingFactor { h: u8, v: u8 },

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    #[error("Scan references unknown component {0}")]
    UnknownComponent(u8),

    #[error("Component {0} is defined more than once")]
    DuplicateComponent(u8),

    #[error("Scan components are not in frame order")]
    InvalidScanComponentOrder,

    #[error("Invalid spectral selection Ss={ss} Se={se}")]
    InvalidSpectralSelection { ss: u8, se: u8 },

    #[error("Invalid number of scan components: {0}")]
    InvalidScanComponentCount(u8),

    #[error("Image buffer too small: {length} bytes, {required} required")]
    BadImageData { length: usize, required: usize },

    #[error("Invalid quality {0}, must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid app segment number: {0}")]
    InvalidAppSegment(u8),

    #[error("App segment exceeds maximum allowed data length of 65533 bytes: {0}")]
    AppSegmentTooLarge(usize),

    #[error("Comment exceeds maximum allowed data length of 65533 bytes: {0}")]
    CommentTooLarge(usize),

    #[error("Coefficient data does not match frame geometry: {0}")]
    CoefficientMismatch(&'static str),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl JpegError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        use JpegError::*;

        match self {
            MissingSoi
            | MissingSegment(_)
            | SegmentBeforeFrame(_)
            | DuplicateFrame
            | InvalidSegmentLength { .. }
            | TruncatedSegment(_) => ErrorKind::Format,

            UnsupportedPrecision(_)
            | UnsupportedComponentCount(_)
            | UnsupportedFrameType(_)
            | UnsupportedSuccessiveApproximation { .. }
            | UnsupportedEobRun(_) => ErrorKind::Unsupported,

            UnexpectedEndOfData
            | UnexpectedMarker(_)
            | InvalidHuffmanCode
            | MissingRestartMarker(_)
            | CoefficientOutOfBand { .. }
            | InvalidMagnitudeCategory(_) => ErrorKind::Bitstream,

            InvalidTableId { .. }
            | UndefinedTable { .. }
            | InvalidHuffmanTable(_)
            | MissingHuffmanCode { .. }
            | InvalidQuantizationValue(_)
            | InvalidSamplingFactor { .. }
            | InvalidDimensions { .. }
            | UnknownComponent(_)
            | DuplicateComponent(_)
            | InvalidScanComponentOrder
            | InvalidSpectralSelection { .. }
            | InvalidScanComponentCount(_) => ErrorKind::Validation,

            BadImageData { .. }
            | InvalidQuality(_)
            | InvalidAppSegment(_)
            | AppSegmentTooLarge(_)
            | CommentTooLarge(_)
            | CoefficientMismatch(_) => ErrorKind::InvalidInput,

            IoError(_) => ErrorKind::Io,
        }
    }
}

pub type JpegResult<T> = Result<T, JpegError>;
