/*
 * The fast inverse transform is derived from jidctflt.c of the
 * Independent JPEG Group's software:
 * Copyright (C) 1994-1998, Thomas G. Lane.
 *
 * This software is copyright (C) 1991-2020, Thomas G. Lane, Guido Vollbeding.
 * All Rights Reserved except as specified in README.ijg, see fdct.rs.
 */

#![allow(clippy::excessive_precision)]

use core::f32::consts::SQRT_2;

use crate::fdct::{AAN_SCALE_FACTORS, DCT_BASIS};
use crate::quantization::QuantizationTable;

/// # Inverse DCT implementation used by the decoder
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum IdctMethod {
    /// Separable transform against the cosine basis
    #[default]
    Reference,

    /// Floating point AAN transform
    Fast,
}

/// # How quantized coefficients are scaled before the inverse DCT
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Dequantization {
    /// Multiply by the quantization table into a scratch block, then transform
    #[default]
    Separate,

    /// Fold the quantization table and the AAN prescale into one multiplier
    /// table. Only differs from `Separate` with [IdctMethod::Fast].
    Fused,
}

/// Reference 2D DCT-III, the exact inverse of
/// [forward_dct_reference](crate::fdct::forward_dct_reference)
pub fn inverse_dct_reference(coefficients: &[f32; 64], samples: &mut [f32; 64]) {
    let mut columns = [0f32; 64];

    // columns[y][u] = sum_v basis[v][y] * F(u, v)
    for u in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0;
            for v in 0..8 {
                sum += DCT_BASIS[v][y] * coefficients[v * 8 + u];
            }
            columns[y * 8 + u] = sum;
        }
    }

    for y in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for u in 0..8 {
                sum += DCT_BASIS[u][x] * columns[y * 8 + u];
            }
            samples[y * 8 + x] = sum;
        }
    }
}

/// Multiply every coefficient by its AAN scale factor
pub fn prescale_aan(block: &mut [f32; 64]) {
    for v in 0..8 {
        for u in 0..8 {
            block[v * 8 + u] *= AAN_SCALE_FACTORS[u] * AAN_SCALE_FACTORS[v];
        }
    }
}

#[inline(always)]
fn idct_1d(d: &mut [f32], stride: usize) {
    // Even part
    let tmp0 = d[0];
    let tmp1 = d[2 * stride];
    let tmp2 = d[4 * stride];
    let tmp3 = d[6 * stride];

    let tmp10 = tmp0 + tmp2;
    let tmp11 = tmp0 - tmp2;

    let tmp13 = tmp1 + tmp3;
    let tmp12 = (tmp1 - tmp3) * SQRT_2 - tmp13;

    let tmp0 = tmp10 + tmp13;
    let tmp3 = tmp10 - tmp13;
    let tmp1 = tmp11 + tmp12;
    let tmp2 = tmp11 - tmp12;

    // Odd part
    let tmp4 = d[stride];
    let tmp5 = d[3 * stride];
    let tmp6 = d[5 * stride];
    let tmp7 = d[7 * stride];

    let z13 = tmp6 + tmp5;
    let z10 = tmp6 - tmp5;
    let z11 = tmp4 + tmp7;
    let z12 = tmp4 - tmp7;

    let tmp7 = z11 + z13;
    let tmp11 = (z11 - z13) * SQRT_2;

    let z5 = (z10 + z12) * 1.847759065;
    let tmp10 = 1.082392200 * z12 - z5;
    let tmp12 = -2.613125930 * z10 + z5;

    let tmp6 = tmp12 - tmp7;
    let tmp5 = tmp11 - tmp6;
    let tmp4 = tmp10 + tmp5;

    d[0] = tmp0 + tmp7;
    d[7 * stride] = tmp0 - tmp7;
    d[stride] = tmp1 + tmp6;
    d[6 * stride] = tmp1 - tmp6;
    d[2 * stride] = tmp2 + tmp5;
    d[5 * stride] = tmp2 - tmp5;
    d[4 * stride] = tmp3 + tmp4;
    d[3 * stride] = tmp3 - tmp4;
}

/// Floating point AAN inverse DCT, in place
///
/// The input must already be prescaled with [prescale_aan] (or a fused
/// dequantization table). Mutates its input, so every block needs its own
/// buffer.
pub fn inverse_dct_fast(data: &mut [f32; 64]) {
    for column in 0..8 {
        idct_1d(&mut data[column..], 8);
    }

    for row in data.chunks_exact_mut(8) {
        idct_1d(row, 1);
    }

    for v in data.iter_mut() {
        *v /= 8.0;
    }
}

/// Dequantization and inverse transform for all blocks using one
/// quantization table
#[derive(Clone, Debug)]
pub(crate) struct BlockReconstructor {
    method: IdctMethod,
    table: QuantizationTable,

    /// Step sizes with the AAN prescale folded in, for fused dequantization
    fused: Option<[f32; 64]>,
}

impl BlockReconstructor {
    pub fn new(
        table: &QuantizationTable,
        method: IdctMethod,
        dequantization: Dequantization,
    ) -> BlockReconstructor {
        let fused = if method == IdctMethod::Fast && dequantization == Dequantization::Fused {
            let mut multipliers = [0f32; 64];
            for (i, m) in multipliers.iter_mut().enumerate() {
                *m = f32::from(table.get(i));
            }
            prescale_aan(&mut multipliers);
            Some(multipliers)
        } else {
            None
        };

        BlockReconstructor {
            method,
            table: table.clone(),
            fused,
        }
    }

    /// Turn quantized coefficients (natural order) into level shifted and
    /// clamped samples
    pub fn reconstruct(&self, block: &[i16; 64], out: &mut [u8; 64]) {
        let mut coefficients = [0f32; 64];
        match &self.fused {
            Some(multipliers) => {
                for i in 0..64 {
                    coefficients[i] = f32::from(block[i]) * multipliers[i];
                }
            }
            None => self.table.dequantize(block, &mut coefficients),
        }

        let mut samples = [0f32; 64];
        match self.method {
            IdctMethod::Reference => inverse_dct_reference(&coefficients, &mut samples),
            IdctMethod::Fast => {
                if self.fused.is_none() {
                    prescale_aan(&mut coefficients);
                }
                inverse_dct_fast(&mut coefficients);
                samples = coefficients;
            }
        }

        for (o, &s) in out.iter_mut().zip(samples.iter()) {
            *o = (s + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fdct::forward_dct_reference;
    use approx::assert_abs_diff_eq;

    /// Constant, checkerboard, gradient and random level shifted samples
    pub(crate) fn test_blocks() -> Vec<[f32; 64]> {
        let mut blocks = Vec::new();

        blocks.push([-37.0f32; 64]);

        let mut checkerboard = [0f32; 64];
        let mut gradient = [0f32; 64];
        for y in 0..8 {
            for x in 0..8 {
                checkerboard[y * 8 + x] = if (x + y) % 2 == 0 { 127.0 } else { -128.0 };
                gradient[y * 8 + x] = (x * 30) as f32 - 105.0 + y as f32;
            }
        }
        blocks.push(checkerboard);
        blocks.push(gradient);

        let mut state = 0x1234_5678u32;
        let mut random = [0f32; 64];
        for v in random.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *v = (state % 256) as f32 - 128.0;
        }
        blocks.push(random);

        blocks
    }

    #[test]
    fn test_reference_round_trip() {
        for samples in test_blocks() {
            let mut coefficients = [0f32; 64];
            let mut restored = [0f32; 64];
            forward_dct_reference(&samples, &mut coefficients);
            inverse_dct_reference(&coefficients, &mut restored);

            for i in 0..64 {
                assert_abs_diff_eq!(samples[i], restored[i], epsilon = 1e-2);
            }
        }
    }

    #[test]
    fn test_fast_round_trip() {
        for samples in test_blocks() {
            let mut coefficients = [0f32; 64];
            forward_dct_reference(&samples, &mut coefficients);

            prescale_aan(&mut coefficients);
            inverse_dct_fast(&mut coefficients);

            for i in 0..64 {
                assert_abs_diff_eq!(samples[i], coefficients[i], epsilon = 5e-2);
            }
        }
    }

    #[test]
    fn test_dc_only_block() {
        let mut coefficients = [0f32; 64];
        coefficients[0] = 80.0;

        let mut samples = [0f32; 64];
        inverse_dct_reference(&coefficients, &mut samples);
        for &s in samples.iter() {
            assert_abs_diff_eq!(s, 10.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_reconstructors_agree() {
        let table = QuantizationTable::flat(4);

        let mut block = [0i16; 64];
        block[0] = -20;
        block[1] = 7;
        block[8] = -3;
        block[9] = 2;
        block[63] = 1;

        let mut reference = [0u8; 64];
        BlockReconstructor::new(&table, IdctMethod::Reference, Dequantization::Separate)
            .reconstruct(&block, &mut reference);

        for dequantization in [Dequantization::Separate, Dequantization::Fused] {
            let mut fast = [0u8; 64];
            BlockReconstructor::new(&table, IdctMethod::Fast, dequantization)
                .reconstruct(&block, &mut fast);

            for i in 0..64 {
                let diff = (i16::from(reference[i]) - i16::from(fast[i])).abs();
                assert!(diff <= 1, "{:?} index {}", dequantization, i);
            }
        }
    }

    #[test]
    fn test_reconstruct_clamps() {
        let table = QuantizationTable::flat(16);

        let mut bright = [0i16; 64];
        bright[0] = 100;
        let mut dark = [0i16; 64];
        dark[0] = -100;

        let reconstructor =
            BlockReconstructor::new(&table, IdctMethod::Reference, Dequantization::Separate);

        let mut out = [0u8; 64];
        reconstructor.reconstruct(&bright, &mut out);
        assert!(out.iter().all(|&v| v == 255));

        reconstructor.reconstruct(&dark, &mut out);
        assert!(out.iter().all(|&v| v == 0));

        reconstructor.reconstruct(&[0; 64], &mut out);
        assert!(out.iter().all(|&v| v == 128));
    }
}
