//! # JPEG encoder and decoder
//!
//! Baseline, extended sequential and progressive (spectral selection only)
//! Huffman coded JPEG with 8 bit samples and one or three components.
//!
//! ## Usage
//!
//! ```no_run
//! # use jpeg_codec::{Decoder, Encoder, ColorType, JpegResult};
//! # fn main() -> JpegResult<()> {
//! let data = vec![128u8; 32 * 32 * 3];
//!
//! let mut out = Vec::new();
//! let mut encoder = Encoder::new(&mut out, 85)?;
//! encoder.set_progressive(true);
//! encoder.encode(&data, 32, 32, ColorType::Rgb)?;
//!
//! let image = Decoder::new(&out)?.decode()?;
//! assert_eq!(image.pixels.len(), 32 * 32 * 4);
//! # Ok(())
//! # }
//! ```

mod bit_reader;
mod coefficients;
mod color_transform;
mod decoder;
mod encoder;
mod error;
mod fdct;
mod frame;
mod huffman;
mod idct;
mod image_buffer;
mod marker;
mod quantization;
mod segments;
mod upsampling;
mod writer;
mod zigzag;

#[cfg(test)]
mod tests;

pub use coefficients::{ComponentCoefficients, JpegCoefficients};
pub use decoder::{
    ComponentInfo, DecodedImage, Decoder, DecoderOptions, JfifInfo, Metadata,
};
pub use encoder::{ColorType, Encoder, JpegColorType, SamplingFactor};
pub use error::{ErrorKind, JpegError, JpegResult};
pub use fdct::DctMethod;
pub use frame::{FrameComponent, FrameHeader, ScanComponent, ScanHeader, ScanValidation};
pub use huffman::HuffmanDecodeMode;
pub use idct::{Dequantization, IdctMethod};
pub use image_buffer::{GrayImage, ImageBuffer, RgbImage, RgbaImage};
pub use marker::{Marker, SofType};
pub use quantization::{QuantizationTable, QuantizationTableType};
pub use segments::{Segment, Segments};
pub use writer::JfifWrite;

#[cfg(feature = "benchmark")]
pub use fdct::{forward_dct_fast, forward_dct_reference};
#[cfg(feature = "benchmark")]
pub use idct::{inverse_dct_fast, inverse_dct_reference, prescale_aan};

/// # Pixel density of an image
///
/// Written to and read from the JFIF APP0 segment.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Density {
    /// No pixel density is set, which means "1 pixel per pixel"
    #[default]
    None,

    /// Horizontal and vertical dots per inch (dpi)
    Inch { x: u16, y: u16 },

    /// Horizontal and vertical dots per centimeters
    Centimeter { x: u16, y: u16 },
}

/// Options of [encode]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EncodeOptions {
    /// Write a progressive (SOF2) stream instead of a baseline one
    pub progressive: bool,
}

/// Encode RGBA pixels with the default settings for `quality`
///
/// The alpha channel is ignored.
pub fn encode(
    rgba: &[u8],
    width: u16,
    height: u16,
    quality: u8,
    options: EncodeOptions,
) -> JpegResult<Vec<u8>> {
    let mut out = Vec::new();

    let mut encoder = Encoder::new(&mut out, quality)?;
    encoder.set_progressive(options.progressive);
    encoder.encode(rgba, width, height, ColorType::Rgba)?;

    Ok(out)
}

/// Decode a JPEG stream to RGBA pixels with default [DecoderOptions]
pub fn decode(data: &[u8]) -> JpegResult<DecodedImage> {
    Decoder::new(data)?.decode()
}
