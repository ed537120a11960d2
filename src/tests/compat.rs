use std::io::Cursor;

use jpeg_decoder::{Decoder as ReferenceDecoder, PixelFormat};

use crate::tests::*;
use crate::{decode, ColorType, Encoder, QuantizationTableType, SamplingFactor};

/// Decode with jpeg-decoder, returning RGB or luma samples
fn reference_decode(data: &[u8], width: u16, height: u16) -> (Vec<u8>, PixelFormat) {
    let mut decoder = ReferenceDecoder::new(Cursor::new(data));
    let pixels = decoder.decode().unwrap();
    let info = decoder.info().unwrap();

    assert_eq!(info.width, width);
    assert_eq!(info.height, height);

    (pixels, info.pixel_format)
}

/// Decode `data` with jpeg-decoder and with this crate and compare
///
/// Both decoders are independent implementations of the same reconstruction,
/// so only rounding in the transforms, color conversion and chroma
/// upsampling may differ.
fn check_against_reference(data: &[u8], width: u16, height: u16, subsampled: bool) {
    let (expected, format) = reference_decode(data, width, height);

    let image = decode(data).unwrap();
    assert_eq!((image.width, image.height), (width, height));

    let actual = match format {
        PixelFormat::RGB24 => rgba_to_rgb(&image.pixels),
        PixelFormat::L8 => image.pixels.chunks_exact(4).map(|p| p[0]).collect(),
        other => panic!("Unexpected pixel format {:?}", other),
    };

    let (max, mean) = differences(&expected, &actual);

    if subsampled {
        assert!(mean <= 3.0, "mean difference {} (max {})", mean, max);
    } else {
        assert!(max <= 6, "max difference {} (mean {})", max, mean);
        assert!(mean <= 1.5, "mean difference {} (max {})", mean, max);
    }
}

fn encode_rgb<F>(width: u16, height: u16, quality: u8, configure: F) -> (Vec<u8>, Vec<u8>)
where
    F: FnOnce(&mut Encoder<&mut Vec<u8>>),
{
    let rgb = create_test_img_rgb(width, height);
    let mut data = Vec::new();

    let mut encoder = Encoder::new(&mut data, quality).unwrap();
    configure(&mut encoder);
    encoder.encode(&rgb, width, height, ColorType::Rgb).unwrap();

    (rgb, data)
}

#[test]
fn test_baseline_444() {
    let (rgb, data) = encode_rgb(37, 29, 95, |_| {});
    check_against_reference(&data, 37, 29, false);

    let (decoded, _) = reference_decode(&data, 37, 29);
    assert!(psnr(&rgb, &decoded) > 30.0);
}

#[test]
fn test_baseline_gray() {
    let gray = create_test_img_gray(23, 41);
    let mut data = Vec::new();
    Encoder::new(&mut data, 80)
        .unwrap()
        .encode(&gray, 23, 41, ColorType::Luma)
        .unwrap();

    check_against_reference(&data, 23, 41, false);
}

#[test]
fn test_subsampling() {
    for sampling in [
        SamplingFactor::R_4_2_0,
        SamplingFactor::R_4_2_2,
        SamplingFactor::R_4_4_0,
    ] {
        let (_, data) = encode_rgb(43, 35, 90, |encoder| encoder.set_sampling_factor(sampling));
        check_against_reference(&data, 43, 35, true);
    }
}

#[test]
fn test_progressive() {
    for sampling in [SamplingFactor::R_4_4_4, SamplingFactor::R_4_2_0] {
        let (_, data) = encode_rgb(50, 30, 90, |encoder| {
            encoder.set_progressive(true);
            encoder.set_sampling_factor(sampling);
        });
        check_against_reference(&data, 50, 30, sampling == SamplingFactor::R_4_2_0);
    }
}

#[test]
fn test_restart_interval() {
    for progressive in [false, true] {
        let (_, data) = encode_rgb(64, 48, 85, |encoder| {
            encoder.set_progressive(progressive);
            encoder.set_restart_interval(3);
        });
        check_against_reference(&data, 64, 48, true);
    }
}

#[test]
fn test_optimized_huffman_tables() {
    for progressive in [false, true] {
        let (_, data) = encode_rgb(45, 45, 75, |encoder| {
            encoder.set_progressive(progressive);
            encoder.set_optimized_huffman_tables(true);
            encoder.set_restart_interval(2);
        });
        check_against_reference(&data, 45, 45, true);
    }
}

#[test]
fn test_flat_and_extended_tables() {
    let (_, data) = encode_rgb(24, 24, 90, |encoder| {
        encoder.set_quantization_tables(QuantizationTableType::Flat, QuantizationTableType::Flat)
    });
    check_against_reference(&data, 24, 24, false);

    let mut coarse = [300u16; 64];
    coarse[0] = 8;
    let (_, data) = encode_rgb(24, 24, 90, |encoder| {
        encoder.set_quantization_tables(
            QuantizationTableType::Custom(Box::new(coarse)),
            QuantizationTableType::Default,
        )
    });
    assert!(data.windows(2).any(|w| w == [0xFF, 0xC1]));
    check_against_reference(&data, 24, 24, false);
}
