use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jpeg_codec::{
    ColorType, Decoder, DecoderOptions, Dequantization, Encoder, HuffmanDecodeMode, IdctMethod,
};

fn create_jpeg(width: u16, height: u16, progressive: bool) -> Vec<u8> {
    let (w, h) = (usize::from(width), usize::from(height));
    let mut data = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        for x in 0..w {
            data.push((x * 255 / w) as u8);
            data.push((y * 255 / h) as u8);
            data.push(((x ^ y) & 0xFF) as u8);
        }
    }

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, 85).unwrap();
    encoder.set_progressive(progressive);
    encoder.encode(&data, width, height, ColorType::Rgb).unwrap();
    out
}

fn decode_benches(c: &mut Criterion) {
    let (width, height) = (512, 512);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(u64::from(width) * u64::from(height)));

    let configurations = [
        ("reference", DecoderOptions::default()),
        (
            "fast idct",
            DecoderOptions {
                idct: IdctMethod::Fast,
                ..Default::default()
            },
        ),
        (
            "fast idct fused",
            DecoderOptions {
                idct: IdctMethod::Fast,
                dequantization: Dequantization::Fused,
                ..Default::default()
            },
        ),
        (
            "bit serial huffman",
            DecoderOptions {
                huffman: HuffmanDecodeMode::BitSerial,
                ..Default::default()
            },
        ),
    ];

    for progressive in [false, true] {
        let data = create_jpeg(width, height, progressive);
        let mode = if progressive { "progressive" } else { "baseline" };

        for (name, options) in configurations {
            group.bench_with_input(BenchmarkId::new(mode, name), &data, |b, data| {
                b.iter(|| {
                    Decoder::with_options(black_box(data), options)
                        .unwrap()
                        .decode()
                        .unwrap()
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, decode_benches);
criterion_main!(benches);
