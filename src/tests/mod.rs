mod coefficients;
mod compat;
mod properties;

/// Smooth RGB test image with a color ramp along each axis
pub(crate) fn create_test_img_rgb(width: u16, height: u16) -> Vec<u8> {
    let (width, height) = (usize::from(width), usize::from(height));
    let mut data = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        for x in 0..width {
            data.push((x * 255 / (width - 1).max(1)) as u8);
            data.push((y * 255 / (height - 1).max(1)) as u8);
            data.push(((x + y) * 127 / (width + height)) as u8 + 64);
        }
    }

    data
}

pub(crate) fn create_test_img_rgba(width: u16, height: u16) -> Vec<u8> {
    create_test_img_rgb(width, height)
        .chunks_exact(3)
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect()
}

pub(crate) fn create_test_img_gray(width: u16, height: u16) -> Vec<u8> {
    let (width, height) = (usize::from(width), usize::from(height));
    let mut data = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            data.push(((x * 3 + y * 2) * 255 / (width * 3 + height * 2)) as u8);
        }
    }

    data
}

/// Drop the alpha channel of RGBA pixels
pub(crate) fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|p| [p[0], p[1], p[2]])
        .collect()
}

/// Peak signal to noise ratio of two equally sized 8 bit buffers
pub(crate) fn psnr(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());

    let mse = a
        .iter()
        .zip(b)
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum::<f64>()
        / a.len() as f64;

    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}

/// Largest and mean absolute difference of two equally sized buffers
pub(crate) fn differences(a: &[u8], b: &[u8]) -> (u8, f64) {
    assert_eq!(a.len(), b.len());

    let mut max = 0;
    let mut sum = 0u64;
    for (&a, &b) in a.iter().zip(b) {
        let d = a.abs_diff(b);
        max = max.max(d);
        sum += u64::from(d);
    }

    (max, sum as f64 / a.len() as f64)
}
