use core::fmt::{self, Debug};

use crate::error::{JpegError, JpegResult};

/// Reads bits MSB-first from the entropy-coded data of one scan.
///
/// The reader removes byte stuffing (`0xFF 0x00` is a literal `0xFF`), skips
/// fill bytes and steps over restart markers, remembering the last one seen so
/// the scan decoder can reset its DC predictors. Any other marker ends the
/// readable data with [JpegError::UnexpectedMarker].
///
/// Whole bytes are buffered in a 64-bit accumulator, but buffering stops in
/// front of every marker. A restart marker is only stepped over when a bit
/// behind it is actually requested, so peeking never runs ahead of the
/// decoder into the next restart interval.
#[derive(Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Offset of the next byte that has not been buffered yet
    position: usize,
    /// Buffered bits, the unread ones are the lowest `count` bits
    bits: u64,
    count: u8,
    restart_marker: Option<u8>,
}

impl Debug for BitReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BitReader{{ data: [{} bytes], position: {}, count: {} }}",
            self.data.len(),
            self.position,
            self.count
        )
    }
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            position: 0,
            bits: 0,
            count: 0,
            restart_marker: None,
        }
    }

    /// Buffer whole bytes until the accumulator is full or the next byte
    /// starts a marker
    #[inline]
    fn fill(&mut self) {
        while self.count <= 48 {
            let byte = match self.data.get(self.position) {
                Some(0xFF) if self.data.get(self.position + 1) == Some(&0x00) => {
                    self.position += 2;
                    0xFF
                }
                Some(0xFF) | None => return,
                Some(&byte) => {
                    self.position += 1;
                    byte
                }
            };

            self.bits = (self.bits << 8) | u64::from(byte);
            self.count += 8;
        }
    }

    /// Step over fill bytes and a restart marker at the current position
    fn step_over_marker(&mut self) -> JpegResult<()> {
        let mut position = self.position;

        loop {
            let next = match self.data.get(position..position + 2) {
                Some(&[0xFF, next]) => next,
                _ => return Err(JpegError::UnexpectedEndOfData),
            };

            match next {
                0x00 => {
                    self.position = position;
                    return Ok(());
                }
                // Fill byte in front of a marker
                0xFF => position += 1,
                0xD0..=0xD7 => {
                    self.position = position + 2;
                    self.restart_marker = Some(next - 0xD0);
                    return Ok(());
                }
                marker => return Err(JpegError::UnexpectedMarker(marker)),
            }
        }
    }

    /// Read a single bit
    #[inline]
    pub fn read_bit(&mut self) -> JpegResult<u32> {
        self.read_bits(1).map(u32::from)
    }

    /// Read `count` bits (at most 16) and compose them MSB-first
    pub fn read_bits(&mut self, count: u8) -> JpegResult<u16> {
        debug_assert!(count <= 16);

        while self.count < count {
            self.fill();
            if self.count < count {
                self.step_over_marker()?;
            }
        }

        self.count -= count;
        Ok(((self.bits >> self.count) & ((1 << count) - 1)) as u16)
    }

    /// Look at the next `count` bits (at most 16) without consuming them.
    ///
    /// Bits beyond the end of the data or behind a marker read as 1, the value
    /// used for padding, so a lookup near the end of a scan still succeeds as
    /// long as the accepted code fits into the real data.
    #[inline]
    pub fn peek_bits(&mut self, count: u8) -> u16 {
        debug_assert!(count <= 16);

        if self.count < count {
            self.fill();
        }

        let value = if self.count >= count {
            self.bits >> (self.count - count)
        } else {
            let missing = count - self.count;
            (self.bits << missing) | ((1 << missing) - 1)
        };

        (value & ((1 << count) - 1)) as u16
    }

    #[inline]
    pub fn peek_16_bits(&mut self) -> u16 {
        self.peek_bits(16)
    }

    /// Consume `count` bits that were previously peeked
    pub fn skip_bits(&mut self, count: u8) -> JpegResult<()> {
        self.read_bits(count).map(|_| ())
    }

    /// Discard the unread bits of the current byte
    pub fn align_to_byte(&mut self) {
        self.count -= self.count % 8;
    }

    /// Returns the number of the last restart marker the reader stepped over
    /// and clears it
    pub fn take_restart_marker(&mut self) -> Option<u8> {
        self.restart_marker.take()
    }

    /// Align to the next byte and consume a restart marker at that position.
    ///
    /// Returns `None` if there is no restart marker.
    pub fn read_restart_marker(&mut self) -> Option<u8> {
        self.align_to_byte();

        if let Some(marker) = self.restart_marker.take() {
            return Some(marker);
        }

        // Buffered bytes precede any marker
        if self.count > 0 {
            return None;
        }

        let mut position = self.position;
        while self.data.get(position) == Some(&0xFF) {
            match self.data.get(position + 1) {
                Some(0xFF) => position += 1,
                Some(&marker @ 0xD0..=0xD7) => {
                    self.position = position + 2;
                    return Some(marker - 0xD0);
                }
                _ => break,
            }
        }

        None
    }
}
