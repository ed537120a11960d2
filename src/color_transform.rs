// Full range BT.601 YCbCr as used by JFIF

#[inline(always)]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Unrounded YCbCr of an RGB triple
#[inline(always)]
pub(crate) fn rgb_to_ycbcr_f32(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.168736 * r - 0.331264 * g + 0.5 * b + 128.0;
    let cr = 0.5 * r - 0.418688 * g - 0.081312 * b + 128.0;
    (y, cb, cr)
}

/// Unrounded RGB of a YCbCr triple
#[inline(always)]
pub(crate) fn ycbcr_to_rgb_f32(y: f32, cb: f32, cr: f32) -> (f32, f32, f32) {
    let cb = cb - 128.0;
    let cr = cr - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;
    (r, g, b)
}

/// Convert an RGB pixel to rounded and clamped YCbCr
#[inline]
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (y, cb, cr) = rgb_to_ycbcr_f32(f32::from(r), f32::from(g), f32::from(b));
    (clamp_u8(y), clamp_u8(cb), clamp_u8(cr))
}

/// Convert a YCbCr pixel to rounded and clamped RGB
#[inline]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> (u8, u8, u8) {
    let (r, g, b) = ycbcr_to_rgb_f32(f32::from(y), f32::from(cb), f32::from(cr));
    (clamp_u8(r), clamp_u8(g), clamp_u8(b))
}

/// Write one row of YCbCr samples as RGBA pixels
pub(crate) fn ycbcr_row_to_rgba(y: &[u8], cb: &[u8], cr: &[u8], output: &mut [u8]) {
    for (((pixel, &y), &cb), &cr) in output.chunks_exact_mut(4).zip(y).zip(cb).zip(cr) {
        let (r, g, b) = ycbcr_to_rgb(y, cb, cr);
        pixel.copy_from_slice(&[r, g, b, 255]);
    }
}

/// Write one row of untransformed RGB planes as RGBA pixels
pub(crate) fn rgb_row_to_rgba(r: &[u8], g: &[u8], b: &[u8], output: &mut [u8]) {
    for (((pixel, &r), &g), &b) in output.chunks_exact_mut(4).zip(r).zip(g).zip(b) {
        pixel.copy_from_slice(&[r, g, b, 255]);
    }
}

/// Write one row of luma samples as opaque gray RGBA pixels
pub(crate) fn gray_row_to_rgba(y: &[u8], output: &mut [u8]) {
    for (pixel, &y) in output.chunks_exact_mut(4).zip(y) {
        pixel.copy_from_slice(&[y, y, y, 255]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_primaries() {
        let (y, cb, cr) = rgb_to_ycbcr_f32(255.0, 0.0, 0.0);
        assert_abs_diff_eq!(y, 76.245, epsilon = 1e-3);
        assert_abs_diff_eq!(cb, 84.972, epsilon = 1e-2);
        assert_abs_diff_eq!(cr, 255.5, epsilon = 1e-2);

        assert_eq!(rgb_to_ycbcr(255, 0, 0), (76, 85, 255));
        assert_eq!(rgb_to_ycbcr(0, 0, 0), (0, 128, 128));
        assert_eq!(rgb_to_ycbcr(255, 255, 255), (255, 128, 128));
    }

    #[test]
    fn test_gray_has_neutral_chroma() {
        for v in [0u8, 1, 17, 128, 200, 255] {
            let (y, cb, cr) = rgb_to_ycbcr(v, v, v);
            assert_eq!(y, v);
            assert_eq!(cb, 128);
            assert_eq!(cr, 128);
            assert_eq!(ycbcr_to_rgb(y, cb, cr), (v, v, v));
        }
    }

    #[test]
    fn test_round_trip_within_rounding() {
        let mut state = 0xDEAD_BEEFu32;
        for _ in 0..1000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();

            let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
            let (r2, g2, b2) = ycbcr_to_rgb(y, cb, cr);

            assert!((i16::from(r) - i16::from(r2)).abs() <= 2, "{} {}", r, r2);
            assert!((i16::from(g) - i16::from(g2)).abs() <= 2, "{} {}", g, g2);
            assert!((i16::from(b) - i16::from(b2)).abs() <= 2, "{} {}", b, b2);
        }
    }

    #[test]
    fn test_inverse_clamps() {
        let (r, _, b) = ycbcr_to_rgb(255, 255, 255);
        assert_eq!((r, b), (255, 255));
        let (r, _, b) = ycbcr_to_rgb(0, 0, 0);
        assert_eq!((r, b), (0, 0));
        let (r, g, b) = ycbcr_to_rgb(76, 85, 255);
        assert!(r > 250 && g < 5 && b < 5);
    }

    #[test]
    fn test_rows() {
        let mut out = [0u8; 8];

        ycbcr_row_to_rgba(&[0, 255], &[128, 128], &[128, 128], &mut out);
        assert_eq!(out, [0, 0, 0, 255, 255, 255, 255, 255]);

        rgb_row_to_rgba(&[1, 2], &[3, 4], &[5, 6], &mut out);
        assert_eq!(out, [1, 3, 5, 255, 2, 4, 6, 255]);

        gray_row_to_rgba(&[9, 10], &mut out);
        assert_eq!(out, [9, 9, 9, 255, 10, 10, 10, 255]);
    }
}
