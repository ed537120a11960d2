use crate::tests::*;
use crate::{
    ColorType, Decoder, DecoderOptions, Encoder, JpegError, Marker, ScanValidation, Segments,
};

fn encoded(width: u16, height: u16, configure: impl FnOnce(&mut Encoder<&mut Vec<u8>>)) -> Vec<u8> {
    let rgb = create_test_img_rgb(width, height);
    let mut data = Vec::new();

    let mut encoder = Encoder::new(&mut data, 80).unwrap();
    configure(&mut encoder);
    encoder.encode(&rgb, width, height, ColorType::Rgb).unwrap();

    data
}

#[test]
fn test_coefficients_survive_reencoding() {
    let data = encoded(35, 21, |_| {});
    let coefficients = Decoder::new(&data).unwrap().read_coefficients().unwrap();

    for progressive in [false, true] {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, 80).unwrap();
        encoder.set_progressive(progressive);
        encoder.set_optimized_huffman_tables(progressive);
        encoder.encode_coefficients(&coefficients).unwrap();

        let decoder = Decoder::new(&out).unwrap();
        assert_eq!(decoder.metadata().progressive, progressive);

        let reread = decoder.read_coefficients().unwrap();
        assert_eq!(reread.checksum(), coefficients.checksum());
        assert_eq!(reread.components, coefficients.components);
    }
}

#[test]
fn test_modified_coefficients_are_written() {
    let data = encoded(16, 16, |_| {});
    let decoder = Decoder::new(&data).unwrap();

    let mut coefficients = decoder.read_coefficients().unwrap();
    let original = coefficients.checksum();
    let original_pixels = decoder.render(&coefficients).unwrap().pixels;

    // Flip the lowest bit of every non-zero AC coefficient of the luma blocks
    let mut changed = 0;
    for block in coefficients.components[0].blocks.iter_mut() {
        for value in block[1..].iter_mut().filter(|v| **v != 0) {
            *value ^= 1;
            changed += 1;
        }
    }
    assert!(changed > 0);
    assert_ne!(coefficients.checksum(), original);

    let rendered = decoder.render(&coefficients).unwrap();
    assert_ne!(rendered.pixels, original_pixels);

    let mut out = Vec::new();
    Encoder::new(&mut out, 80)
        .unwrap()
        .encode_coefficients(&coefficients)
        .unwrap();

    let reread = Decoder::new(&out).unwrap().read_coefficients().unwrap();
    assert_eq!(reread.checksum(), coefficients.checksum());
}

#[test]
fn test_block_order_is_component_by_component() {
    let data = encoded(16, 16, |encoder| {
        encoder.set_sampling_factor(crate::SamplingFactor::R_4_2_0)
    });
    let coefficients = Decoder::new(&data).unwrap().read_coefficients().unwrap();

    assert_eq!(coefficients.components[0].blocks.len(), 4);
    assert_eq!(coefficients.components[1].blocks.len(), 1);
    assert_eq!(coefficients.components[2].blocks.len(), 1);

    let blocks: Vec<&[i16; 64]> = coefficients.blocks().collect();
    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[4], &coefficients.components[1].blocks[0]);
}

/// Remove the first occurrence of the restart marker `n` from the stream
fn remove_restart_marker(data: &[u8], n: u8) -> Vec<u8> {
    let segments = Segments::parse(data).unwrap();
    let scan = segments.of_type(Marker::SOS).next().unwrap();
    let start = scan.offset;

    let position = data[start..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD0 + n])
        .unwrap()
        + start;

    let mut out = data[..position].to_vec();
    out.extend_from_slice(&data[position + 2..]);
    out
}

#[test]
fn test_missing_restart_marker() {
    let data = encoded(64, 16, |encoder| {
        encoder.set_sampling_factor(crate::SamplingFactor::R_4_4_4);
        encoder.set_restart_interval(1);
    });
    let expected = Decoder::new(&data).unwrap().decode().unwrap();

    let damaged = remove_restart_marker(&data, 1);
    assert_eq!(damaged.len(), data.len() - 2);

    let strict = Decoder::new(&damaged).unwrap().decode();
    assert!(matches!(strict, Err(JpegError::MissingRestartMarker(2))));

    let options = DecoderOptions {
        validation: ScanValidation::Lenient,
        ..Default::default()
    };
    let lenient = Decoder::with_options(&damaged, options)
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(lenient.pixels, expected.pixels);
}

#[test]
fn test_truncated_scan() {
    let data = encoded(32, 32, |_| {});
    let truncated = &data[..data.len() - 40];

    let error = Decoder::new(truncated).unwrap().decode().unwrap_err();
    assert_eq!(error.kind(), crate::ErrorKind::Bitstream);
}
