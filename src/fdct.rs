/*
 * The fast forward transform is derived from jfdctflt.c of the
 * Independent JPEG Group's software:
 * Copyright (C) 1994-1996, Thomas G. Lane.
 *
 * This software is copyright (C) 1991-2020, Thomas G. Lane, Guido Vollbeding.
 * All Rights Reserved except as specified below.
 *
 * Permission is hereby granted to use, copy, modify, and distribute this
 * software (or portions thereof) for any purpose, without fee, subject to these
 * conditions:
 * (1) If any part of the source code for this software is distributed, then this
 * README file must be included, with this copyright and no-warranty notice
 * unaltered; and any additions, deletions, or changes to the original files
 * must be clearly indicated in accompanying documentation.
 * (2) If only executable code is distributed, then the accompanying
 * documentation must state that "this software is based in part on the work of
 * the Independent JPEG Group".
 * (3) Permission for use of this software is granted only if the user accepts
 * full responsibility for any undesirable consequences; the authors accept
 * NO LIABILITY for damages of any kind.
 *
 * This implementation is based on Arai, Agui, and Nakajima's algorithm for
 * scaled DCT.  Their original paper (Trans. IEICE E-71(11):1095) is in
 * Japanese, but the algorithm is described in the Pennebaker & Mitchell
 * JPEG textbook (see REFERENCES section in file README.ijg).  The following
 * code is based directly on figure 4-8 in P&M.
 * The primary disadvantage of this method is that with a fixed-point
 * implementation, accuracy is lost due to imprecise representation of the
 * scaled quantization values.  However, that problem does not arise if
 * we use floating point arithmetic.
 */

#![allow(clippy::excessive_precision)]

use core::f32::consts::FRAC_1_SQRT_2;

/// `DCT_BASIS[u][x] = C(u) / 2 * cos((2x + 1) * u * pi / 16)` with
/// `C(0) = 1 / sqrt(2)` and `C(u) = 1` otherwise
pub(crate) static DCT_BASIS: [[f32; 8]; 8] = [
    [
        0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391,
        0.353553391,
    ],
    [
        0.490392640, 0.415734806, 0.277785117, 0.097545161, -0.097545161, -0.277785117,
        -0.415734806, -0.490392640,
    ],
    [
        0.461939766, 0.191341716, -0.191341716, -0.461939766, -0.461939766, -0.191341716,
        0.191341716, 0.461939766,
    ],
    [
        0.415734806, -0.097545161, -0.490392640, -0.277785117, 0.277785117, 0.490392640,
        0.097545161, -0.415734806,
    ],
    [
        0.353553391, -0.353553391, -0.353553391, 0.353553391, 0.353553391, -0.353553391,
        -0.353553391, 0.353553391,
    ],
    [
        0.277785117, -0.490392640, 0.097545161, 0.415734806, -0.415734806, -0.097545161,
        0.490392640, -0.277785117,
    ],
    [
        0.191341716, -0.461939766, 0.461939766, -0.191341716, -0.191341716, 0.461939766,
        -0.461939766, 0.191341716,
    ],
    [
        0.097545161, -0.277785117, 0.415734806, -0.490392640, 0.490392640, -0.415734806,
        0.277785117, -0.097545161,
    ],
];

/// AAN scale factors: 1 for k = 0, `sqrt(2) * cos(k * pi / 16)` otherwise
pub(crate) static AAN_SCALE_FACTORS: [f32; 8] = [
    1.0,
    1.387039845,
    1.306562965,
    1.175875602,
    1.0,
    0.785694958,
    0.541196100,
    0.275899379,
];

/// # Forward DCT implementation used by the encoder
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DctMethod {
    /// Separable transform against the cosine basis
    #[default]
    Reference,

    /// Floating point AAN transform
    Fast,
}

impl DctMethod {
    /// Transform level shifted samples (natural order) into DCT coefficients
    pub fn forward(self, samples: &[f32; 64], coefficients: &mut [f32; 64]) {
        match self {
            DctMethod::Reference => forward_dct_reference(samples, coefficients),
            DctMethod::Fast => {
                coefficients.copy_from_slice(samples);
                forward_dct_fast(coefficients);
            }
        }
    }
}

/// Reference 2D DCT-II: `F(u,v) = C(u)C(v)/4 * sum f(x,y) cos(..) cos(..)`
///
/// A constant block of value `k` gives `F(0,0) = 8k` and zero AC terms.
/// The input is not modified.
pub fn forward_dct_reference(samples: &[f32; 64], coefficients: &mut [f32; 64]) {
    let mut rows = [0f32; 64];

    for y in 0..8 {
        let row = &samples[y * 8..y * 8 + 8];
        for u in 0..8 {
            rows[y * 8 + u] = DCT_BASIS[u]
                .iter()
                .zip(row.iter())
                .map(|(b, s)| b * s)
                .sum();
        }
    }

    for u in 0..8 {
        for v in 0..8 {
            let mut sum = 0.0;
            for y in 0..8 {
                sum += DCT_BASIS[v][y] * rows[y * 8 + u];
            }
            coefficients[v * 8 + u] = sum;
        }
    }
}

#[inline(always)]
fn fdct_1d(d: &mut [f32], stride: usize) {
    let tmp0 = d[0] + d[7 * stride];
    let tmp7 = d[0] - d[7 * stride];
    let tmp1 = d[stride] + d[6 * stride];
    let tmp6 = d[stride] - d[6 * stride];
    let tmp2 = d[2 * stride] + d[5 * stride];
    let tmp5 = d[2 * stride] - d[5 * stride];
    let tmp3 = d[3 * stride] + d[4 * stride];
    let tmp4 = d[3 * stride] - d[4 * stride];

    // Even part
    let tmp10 = tmp0 + tmp3;
    let tmp13 = tmp0 - tmp3;
    let tmp11 = tmp1 + tmp2;
    let tmp12 = tmp1 - tmp2;

    d[0] = tmp10 + tmp11;
    d[4 * stride] = tmp10 - tmp11;

    let z1 = (tmp12 + tmp13) * FRAC_1_SQRT_2;
    d[2 * stride] = tmp13 + z1;
    d[6 * stride] = tmp13 - z1;

    // Odd part
    let tmp10 = tmp4 + tmp5;
    let tmp11 = tmp5 + tmp6;
    let tmp12 = tmp6 + tmp7;

    let z5 = (tmp10 - tmp12) * 0.382683433;
    let z2 = 0.541196100 * tmp10 + z5;
    let z4 = 1.306562965 * tmp12 + z5;
    let z3 = tmp11 * FRAC_1_SQRT_2;

    let z11 = tmp7 + z3;
    let z13 = tmp7 - z3;

    d[5 * stride] = z13 + z2;
    d[3 * stride] = z13 - z2;
    d[stride] = z11 + z4;
    d[7 * stride] = z11 - z4;
}

/// Floating point AAN forward DCT, in place
///
/// The output is descaled so it matches [forward_dct_reference] up to
/// rounding error. The block is used as scratch space and must not be shared.
pub fn forward_dct_fast(data: &mut [f32; 64]) {
    for row in data.chunks_exact_mut(8) {
        fdct_1d(row, 1);
    }

    for column in 0..8 {
        fdct_1d(&mut data[column..], 8);
    }

    for v in 0..8 {
        for u in 0..8 {
            data[v * 8 + u] /= AAN_SCALE_FACTORS[u] * AAN_SCALE_FACTORS[v] * 8.0;
        }
    }
}
