/// Average `factor_x` x `factor_y` boxes of a full resolution plane
///
/// `width` and `height` must be multiples of the factors, which holds for
/// planes padded to the MCU grid.
pub(crate) fn downsample_box(
    input: &[f32],
    width: usize,
    height: usize,
    factor_x: usize,
    factor_y: usize,
) -> Vec<f32> {
    if factor_x == 1 && factor_y == 1 {
        return input[..width * height].to_vec();
    }

    let out_width = width / factor_x;
    let out_height = height / factor_y;
    let scale = 1.0 / (factor_x * factor_y) as f32;

    let mut output = vec![0f32; out_width * out_height];

    for (oy, row) in output.chunks_exact_mut(out_width).enumerate() {
        for (ox, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0;
            for y in oy * factor_y..(oy + 1) * factor_y {
                let line = &input[y * width + ox * factor_x..y * width + (ox + 1) * factor_x];
                sum += line.iter().sum::<f32>();
            }
            *out = sum * scale;
        }
    }

    output
}

/// Source coordinate and weight pairs for one axis of a centered bilinear
/// resize: `src = (dst + 0.5) * scale - 0.5`, clamped to the valid samples
fn axis_taps(output_len: usize, input_len: usize, scale: f32) -> Vec<(usize, usize, f32)> {
    let last = input_len.saturating_sub(1);

    (0..output_len)
        .map(|dst| {
            let src = ((dst as f32 + 0.5) * scale - 0.5).clamp(0.0, last as f32);
            let x0 = src.floor() as usize;
            let x1 = (x0 + 1).min(last);
            (x0, x1, src - x0 as f32)
        })
        .collect()
}

/// A component plane reconstructed from its blocks
#[derive(Clone, Debug)]
pub(crate) struct Plane {
    pub data: Vec<u8>,

    /// Row length of `data`, the component's block grid width in samples
    pub stride: usize,

    /// Samples that cover the image, the rest is MCU padding
    pub width: usize,
    pub height: usize,
}

impl Plane {
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..y * self.stride + self.width]
    }

    /// Resample to `width` x `height` with centered bilinear interpolation.
    ///
    /// `scale_x` and `scale_y` are the ratio of this plane's sampling factor
    /// to the largest one. Planes at full resolution are only cropped.
    pub fn upsample(&self, width: usize, height: usize, scale_x: f32, scale_y: f32) -> Plane {
        if scale_x == 1.0 && scale_y == 1.0 {
            let mut data = Vec::with_capacity(width * height);
            for y in 0..height {
                data.extend_from_slice(&self.row(y)[..width]);
            }
            return Plane {
                data,
                stride: width,
                width,
                height,
            };
        }

        let columns = axis_taps(width, self.width, scale_x);
        let rows = axis_taps(height, self.height, scale_y);

        let mut data = vec![0u8; width * height];

        for (out_row, &(y0, y1, fy)) in data.chunks_exact_mut(width).zip(rows.iter()) {
            let top = &self.data[y0 * self.stride..];
            let bottom = &self.data[y1 * self.stride..];

            for (out, &(x0, x1, fx)) in out_row.iter_mut().zip(columns.iter()) {
                let t = f32::from(top[x0]) * (1.0 - fx) + f32::from(top[x1]) * fx;
                let b = f32::from(bottom[x0]) * (1.0 - fx) + f32::from(bottom[x1]) * fx;
                *out = (t * (1.0 - fy) + b * fy).round().clamp(0.0, 255.0) as u8;
            }
        }

        Plane {
            data,
            stride: width,
            width,
            height,
        }
    }
}
