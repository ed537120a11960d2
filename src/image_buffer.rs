use rgb::FromSlice;

use crate::color_transform::rgb_to_ycbcr;
use crate::encoder::JpegColorType;

/// # Buffer used as input value for image encoding
///
/// Image encoding with [Encoder::encode_image](crate::Encoder::encode_image)
/// needs an ImageBuffer as input for the image data. For convenience the
/// [Encoder::encode](crate::Encoder::encode) function contains implementations
/// for common byte based pixel formats. Users that needs other pixel formats
/// or don't have the data available as byte slices can create their own
/// buffer implementations.
pub trait ImageBuffer {
    /// The color type used in the image encoding
    fn get_jpeg_color_type(&self) -> JpegColorType;

    /// Width of the image
    fn width(&self) -> u16;

    /// Height of the image
    fn height(&self) -> u16;

    /// Add color values for the row to color component buffers
    ///
    /// Pushes `width` samples per component, already converted to the color
    /// space returned by [get_jpeg_color_type](ImageBuffer::get_jpeg_color_type).
    /// Only the first buffer is used for [JpegColorType::Luma].
    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 3]);
}

fn row<'a>(data: &'a [u8], y: u16, width: u16, bytes_per_pixel: usize) -> &'a [u8] {
    let stride = usize::from(width) * bytes_per_pixel;
    let start = usize::from(y) * stride;
    &data[start..start + stride]
}

pub struct GrayImage<'a>(pub &'a [u8], pub u16, pub u16);

impl<'a> ImageBuffer for GrayImage<'a> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        JpegColorType::Luma
    }

    fn width(&self) -> u16 {
        self.1
    }

    fn height(&self) -> u16 {
        self.2
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 3]) {
        buffers[0].extend_from_slice(row(self.0, y, self.1, 1));
    }
}

pub struct RgbImage<'a>(pub &'a [u8], pub u16, pub u16);

impl<'a> ImageBuffer for RgbImage<'a> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        JpegColorType::Ycbcr
    }

    fn width(&self) -> u16 {
        self.1
    }

    fn height(&self) -> u16 {
        self.2
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 3]) {
        for pixel in row(self.0, y, self.1, 3).as_rgb() {
            let (y, cb, cr) = rgb_to_ycbcr(pixel.r, pixel.g, pixel.b);
            buffers[0].push(y);
            buffers[1].push(cb);
            buffers[2].push(cr);
        }
    }
}

/// RGBA input, the alpha channel is ignored
pub struct RgbaImage<'a>(pub &'a [u8], pub u16, pub u16);

impl<'a> ImageBuffer for RgbaImage<'a> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        JpegColorType::Ycbcr
    }

    fn width(&self) -> u16 {
        self.1
    }

    fn height(&self) -> u16 {
        self.2
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 3]) {
        for pixel in row(self.0, y, self.1, 4).as_rgba() {
            let (y, cb, cr) = rgb_to_ycbcr(pixel.r, pixel.g, pixel.b);
            buffers[0].push(y);
            buffers[1].push(cb);
            buffers[2].push(cr);
        }
    }
}
