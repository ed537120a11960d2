//! Zigzag scan order of the 64 coefficients of a block.

/// Natural (row-major) index for every zigzag position
pub static ZIGZAG: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorder a natural order block into zigzag order
pub fn to_zigzag<T: Copy + Default>(natural: &[T; 64]) -> [T; 64] {
    let mut out = [T::default(); 64];
    for (zz, &n) in ZIGZAG.iter().enumerate() {
        out[zz] = natural[n as usize];
    }
    out
}

/// Reorder a zigzag order block into natural order
pub fn from_zigzag<T: Copy + Default>(zigzag: &[T; 64]) -> [T; 64] {
    let mut out = [T::default(); 64];
    for (zz, &n) in ZIGZAG.iter().enumerate() {
        out[n as usize] = zigzag[zz];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_is_a_permutation() {
        let mut seen = [false; 64];
        for &n in ZIGZAG.iter() {
            assert!(!seen[n as usize], "duplicate index {}", n);
            seen[n as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_known_positions() {
        // DC, then the first diagonal sweep
        assert_eq!(&ZIGZAG[..6], &[0, 1, 8, 16, 9, 2]);
        assert_eq!(ZIGZAG[63], 63);
    }

    #[test]
    fn test_zigzag_round_trip() {
        let zeros = [0i16; 64];
        assert_eq!(from_zigzag(&to_zigzag(&zeros)), zeros);

        let mut values = [0i16; 64];
        let mut state = 0x2545_f491u32;
        for v in values.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *v = (state % 2048) as i16 - 1024;
        }
        assert_eq!(from_zigzag(&to_zigzag(&values)), values);
        assert_eq!(to_zigzag(&from_zigzag(&values)), values);
    }

    #[test]
    fn test_to_zigzag_order() {
        let mut natural = [0u8; 64];
        for (i, v) in natural.iter_mut().enumerate() {
            *v = i as u8;
        }
        let zz = to_zigzag(&natural);
        assert_eq!(zz, ZIGZAG);
    }
}
