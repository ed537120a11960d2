use crate::tests::*;
use crate::{
    decode, encode, ColorType, Decoder, DecoderOptions, Dequantization, EncodeOptions, Encoder,
    HuffmanDecodeMode, IdctMethod, SamplingFactor,
};

fn luma(pixel: &[u8]) -> f32 {
    0.299 * f32::from(pixel[0]) + 0.587 * f32::from(pixel[1]) + 0.114 * f32::from(pixel[2])
}

#[test]
fn test_black_block() {
    let rgba = [0, 0, 0, 255].repeat(64);
    let data = encode(&rgba, 8, 8, 50, EncodeOptions::default()).unwrap();

    let image = decode(&data).unwrap();
    assert_eq!((image.width, image.height), (8, 8));

    for pixel in image.pixels.chunks_exact(4) {
        assert!(pixel[..3].iter().all(|&v| v <= 20), "{:?}", pixel);
        assert_eq!(pixel[3], 255);
    }
}

#[test]
fn test_gradient_is_monotonic() {
    let mut rgba = Vec::with_capacity(16 * 16 * 4);
    for _ in 0..16 {
        for x in 0..16u8 {
            let v = x * 16;
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
    }

    let data = encode(&rgba, 16, 16, 90, EncodeOptions::default()).unwrap();
    let image = decode(&data).unwrap();

    for row in image.pixels.chunks_exact(16 * 4) {
        let profile: Vec<f32> = row.chunks_exact(4).map(luma).collect();
        for pair in profile.windows(2) {
            assert!(pair[1] >= pair[0], "{:?}", profile);
        }
        assert!(profile[15] > profile[0] + 150.0);
    }
}

#[test]
fn test_psnr_at_quality_90() {
    let rgba = create_test_img_rgba(64, 64);

    for progressive in [false, true] {
        let data = encode(&rgba, 64, 64, 90, EncodeOptions { progressive }).unwrap();
        let image = decode(&data).unwrap();

        let quality = psnr(&rgba_to_rgb(&rgba), &rgba_to_rgb(&image.pixels));
        assert!(quality > 30.0, "progressive {}: {} dB", progressive, quality);
    }
}

#[test]
fn test_odd_size_is_cropped() {
    let rgba = create_test_img_rgba(9, 9);
    let data = encode(&rgba, 9, 9, 75, EncodeOptions::default()).unwrap();

    let image = decode(&data).unwrap();
    assert_eq!((image.width, image.height), (9, 9));
    assert_eq!(image.pixels.len(), 9 * 9 * 4);
}

#[test]
fn test_progressive_red() {
    let rgba = [255, 0, 0, 255].repeat(16 * 16);
    let data = encode(&rgba, 16, 16, 75, EncodeOptions { progressive: true }).unwrap();

    let image = decode(&data).unwrap();
    assert!(image.metadata.progressive);

    for pixel in image.pixels.chunks_exact(4) {
        assert!(pixel[0] > 200 && pixel[1] < 50 && pixel[2] < 50, "{:?}", pixel);
    }
}

#[test]
fn test_decoder_strategies_agree() {
    let rgb = create_test_img_rgb(40, 24);
    let mut data = Vec::new();
    let mut encoder = Encoder::new(&mut data, 85).unwrap();
    encoder.set_sampling_factor(SamplingFactor::R_4_2_2);
    encoder.encode(&rgb, 40, 24, ColorType::Rgb).unwrap();

    let reference = Decoder::new(&data).unwrap().decode().unwrap();

    for idct in [IdctMethod::Reference, IdctMethod::Fast] {
        for dequantization in [Dequantization::Separate, Dequantization::Fused] {
            for huffman in [HuffmanDecodeMode::BitSerial, HuffmanDecodeMode::Lookahead] {
                let options = DecoderOptions {
                    idct,
                    dequantization,
                    huffman,
                    ..Default::default()
                };
                let image = Decoder::with_options(&data, options)
                    .unwrap()
                    .decode()
                    .unwrap();

                let (max, _) = differences(&reference.pixels, &image.pixels);
                assert!(max <= 4, "{:?}: {}", options, max);
            }
        }
    }
}

#[test]
fn test_grayscale() {
    let gray = create_test_img_gray(33, 17);
    let mut data = Vec::new();
    Encoder::new(&mut data, 95)
        .unwrap()
        .encode(&gray, 33, 17, ColorType::Luma)
        .unwrap();

    let image = decode(&data).unwrap();
    assert_eq!(image.metadata.components.len(), 1);

    let decoded: Vec<u8> = image.pixels.chunks_exact(4).map(|p| p[0]).collect();
    assert!(image.pixels.chunks_exact(4).all(|p| p[0] == p[1] && p[1] == p[2]));
    assert!(psnr(&gray, &decoded) > 35.0);
}

#[test]
fn test_metadata_round_trip() {
    let rgb = create_test_img_rgb(16, 16);
    let mut data = Vec::new();

    let mut encoder = Encoder::new(&mut data, 80).unwrap();
    encoder.set_density(crate::Density::Centimeter { x: 118, y: 118 });
    encoder.set_restart_interval(2);
    encoder.add_app_segment(5, b"custom").unwrap();
    encoder.add_comment(b"a comment").unwrap();
    encoder.encode(&rgb, 16, 16, ColorType::Rgb).unwrap();

    let image = decode(&data).unwrap();
    let metadata = &image.metadata;

    let jfif = metadata.jfif.unwrap();
    assert_eq!(jfif.version, (1, 2));
    assert_eq!(jfif.density, crate::Density::Centimeter { x: 118, y: 118 });
    assert_eq!(metadata.restart_interval, Some(2));
    assert!(metadata.app_segments.contains(&(5, b"custom".to_vec())));
    assert_eq!(metadata.comments, vec![b"a comment".to_vec()]);
    assert_eq!(metadata.adobe_transform, None);
    assert!(!metadata.progressive);
    assert_eq!(metadata.components[0].horizontal_sampling_factor, 2);
    assert_eq!(metadata.components[1].horizontal_sampling_factor, 1);
}

#[test]
fn test_adobe_rgb_stream() {
    // A JFIF-less stream with an Adobe segment flagging untransformed RGB
    let rgb = [200u8, 30, 90].repeat(64);
    let mut data = Vec::new();

    let mut encoder = Encoder::new(&mut data, 90).unwrap();
    encoder.add_app_segment(14, b"Adobe\0\x64\0\0\0\0\0").unwrap();
    encoder.encode(&rgb, 8, 8, ColorType::Rgb).unwrap();

    let image = decode(&data).unwrap();
    assert_eq!(image.metadata.adobe_transform, Some(0));

    // The YCbCr samples are passed through as RGB
    let (y, cb, cr) = crate::color_transform::rgb_to_ycbcr(200, 30, 90);
    for pixel in image.pixels.chunks_exact(4) {
        assert!(pixel[0].abs_diff(y) <= 3, "{:?}", pixel);
        assert!(pixel[1].abs_diff(cb) <= 3, "{:?}", pixel);
        assert!(pixel[2].abs_diff(cr) <= 3, "{:?}", pixel);
    }
}
