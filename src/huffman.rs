use core::fmt::{self, Debug};

use crate::bit_reader::BitReader;
use crate::error::{JpegError, JpegResult};
use crate::marker::Marker;

/// Table class of a Huffman table
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CodingClass {
    Dc = 0,
    Ac = 1,
}

impl CodingClass {
    pub fn from_u8(value: u8) -> Option<CodingClass> {
        match value {
            0 => Some(CodingClass::Dc),
            1 => Some(CodingClass::Ac),
            _ => None,
        }
    }
}

/// # How the decoder matches Huffman codes
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum HuffmanDecodeMode {
    /// Read one bit at a time and compare against the largest code of each
    /// length
    BitSerial,

    /// Peek 16 bits, resolve short codes with a lookup table and longer ones
    /// against the left-justified maximum codes, then consume the code length
    #[default]
    Lookahead,
}

const LOOKAHEAD_BITS: u8 = 9;

// Annex K.3, tables K.3 to K.6
static LUMA_DC_CODE_LENGTHS: [u8; 16] = [
    0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

static LUMA_DC_VALUES: [u8; 12] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
];

static CHROMA_DC_CODE_LENGTHS: [u8; 16] = [
    0x00, 0x03, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
];

static CHROMA_DC_VALUES: [u8; 12] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
];

static LUMA_AC_CODE_LENGTHS: [u8; 16] = [
    0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05, 0x04, 0x04, 0x00, 0x00, 0x01, 0x7D,
];

static LUMA_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

static CHROMA_AC_CODE_LENGTHS: [u8; 16] = [
    0x00, 0x02, 0x01, 0x02, 0x04, 0x04, 0x03, 0x04, 0x07, 0x05, 0x04, 0x04, 0x00, 0x01, 0x02, 0x77,
];
static CHROMA_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

/// # A canonical Huffman table
///
/// Built once from the `BITS`/`HUFFVAL` lists of a DHT segment and used for
/// both directions.
#[derive(Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    bits: [u8; 16],
    values: Vec<u8>,

    /// Code and length for every symbol, length 0 if the symbol has no code
    codes: [(u16, u8); 256],

    /// Largest code of each length (index 1..=16), -1 if there is none
    max_code: [i32; 17],

    /// Offset from a code to the index of its symbol in `values`
    value_offset: [i32; 17],

    /// `length << 8 | symbol` for every 9 bit prefix starting with a short code
    lookahead: [u16; 1 << LOOKAHEAD_BITS],

    max_length: u8,
}

impl Debug for HuffmanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuffmanTable")
            .field("bits", &self.bits)
            .field("values", &self.values)
            .finish()
    }
}

impl HuffmanTable {
    /// Build a table from the number of codes per length and the symbols in
    /// code order
    ///
    /// # Errors
    ///
    /// Fails if the table defines more than 256 symbols, the symbol count does
    /// not match `bits` or the code lengths over-subscribe the code space.
    pub fn new(bits: &[u8; 16], values: &[u8]) -> JpegResult<HuffmanTable> {
        let count: usize = bits.iter().map(|&b| usize::from(b)).sum();

        if count > 256 {
            return Err(JpegError::InvalidHuffmanTable("more than 256 symbols"));
        }
        if count != values.len() {
            return Err(JpegError::InvalidHuffmanTable(
                "symbol count does not match code lengths",
            ));
        }

        let mut code = 0u32;
        for (i, &b) in bits.iter().enumerate() {
            code += u32::from(b);
            if code > 1 << (i + 1) {
                return Err(JpegError::InvalidHuffmanTable(
                    "code lengths over-subscribe the code space",
                ));
            }
            code <<= 1;
        }

        Ok(Self::build(bits, values))
    }

    /// Generate the canonical codes of a table already known to be valid
    fn build(bits: &[u8; 16], values: &[u8]) -> HuffmanTable {
        let mut table = HuffmanTable {
            bits: *bits,
            values: values.to_vec(),
            codes: [(0, 0); 256],
            max_code: [-1; 17],
            value_offset: [0; 17],
            lookahead: [0; 1 << LOOKAHEAD_BITS],
            max_length: 0,
        };

        let mut code = 0u32;
        let mut k = 0usize;

        for length in 1..=16u8 {
            let count = usize::from(bits[usize::from(length - 1)]);

            if count > 0 {
                table.value_offset[usize::from(length)] = k as i32 - code as i32;

                for _ in 0..count {
                    let symbol = values[k];
                    table.codes[usize::from(symbol)] = (code as u16, length);

                    if length <= LOOKAHEAD_BITS {
                        let shift = LOOKAHEAD_BITS - length;
                        let first = (code << shift) as usize;
                        let entry = (u16::from(length) << 8) | u16::from(symbol);
                        for slot in &mut table.lookahead[first..first + (1 << shift)] {
                            *slot = entry;
                        }
                    }

                    k += 1;
                    code += 1;
                }

                table.max_code[usize::from(length)] = code as i32 - 1;
                table.max_length = length;
            }

            code <<= 1;
        }

        table
    }

    pub fn default_luma_dc() -> HuffmanTable {
        Self::build(&LUMA_DC_CODE_LENGTHS, &LUMA_DC_VALUES)
    }

    pub fn default_luma_ac() -> HuffmanTable {
        Self::build(&LUMA_AC_CODE_LENGTHS, &LUMA_AC_VALUES)
    }

    pub fn default_chroma_dc() -> HuffmanTable {
        Self::build(&CHROMA_DC_CODE_LENGTHS, &CHROMA_DC_VALUES)
    }

    pub fn default_chroma_ac() -> HuffmanTable {
        Self::build(&CHROMA_AC_CODE_LENGTHS, &CHROMA_AC_VALUES)
    }

    /// Generates an optimized huffman table as described in Section K.2
    ///
    /// Code lengths are limited to 16 bits and no symbol gets the all-ones
    /// code. Symbols with a frequency of zero get no code.
    pub fn new_optimized(frequencies: &[u32; 256]) -> HuffmanTable {
        let mut freq = [0u64; 257];
        for (f, &v) in freq.iter_mut().zip(frequencies.iter()) {
            *f = u64::from(v);
        }
        if freq.iter().all(|&f| f == 0) {
            freq[0] = 1;
        }
        // Reserved symbol, keeps the all-ones code unused
        freq[256] = 1;

        let mut others = [usize::MAX; 257];
        let mut code_size = [0usize; 257];

        loop {
            // Least frequent symbol, the larger value on ties
            let mut c1 = None;
            let mut v = u64::MAX;
            for (i, &f) in freq.iter().enumerate() {
                if f > 0 && f <= v {
                    v = f;
                    c1 = Some(i);
                }
            }

            let c1 = match c1 {
                Some(c1) => c1,
                None => break,
            };

            // Next least frequent
            let mut c2 = None;
            let mut v = u64::MAX;
            for (i, &f) in freq.iter().enumerate() {
                if f > 0 && f <= v && i != c1 {
                    v = f;
                    c2 = Some(i);
                }
            }

            let c2 = match c2 {
                Some(c2) => c2,
                None => break,
            };

            freq[c1] += freq[c2];
            freq[c2] = 0;

            code_size[c1] += 1;
            let mut c = c1;
            while others[c] != usize::MAX {
                c = others[c];
                code_size[c] += 1;
            }

            others[c] = c2;

            code_size[c2] += 1;
            let mut c = c2;
            while others[c] != usize::MAX {
                c = others[c];
                code_size[c] += 1;
            }
        }

        let mut num_codes = [0usize; 258];
        for &size in code_size.iter() {
            if size > 0 {
                num_codes[size] += 1;
            }
        }

        // Limit code lengths to 16 bits
        for i in (17..num_codes.len()).rev() {
            while num_codes[i] > 0 {
                let mut j = i - 2;
                while j > 0 && num_codes[j] == 0 {
                    j -= 1;
                }

                num_codes[i] -= 2;
                num_codes[i - 1] += 1;
                num_codes[j + 1] += 2;
                num_codes[j] -= 1;
            }
        }

        // Remove the reserved symbol from the longest length
        let mut i = 16;
        while i > 1 && num_codes[i] == 0 {
            i -= 1;
        }
        num_codes[i] -= 1;

        let mut bits = [0u8; 16];
        for (b, &n) in bits.iter_mut().zip(num_codes[1..=16].iter()) {
            *b = n as u8;
        }

        let mut values = Vec::with_capacity(256);
        for size in 1..=code_size.iter().copied().max().unwrap_or(0) {
            for (symbol, &s) in code_size[..256].iter().enumerate() {
                if s == size {
                    values.push(symbol as u8);
                }
            }
        }

        Self::build(&bits, &values)
    }

    /// Parse the payload of a DHT segment, which may define several tables
    pub fn parse_dht(data: &[u8]) -> JpegResult<Vec<(CodingClass, u8, HuffmanTable)>> {
        let mut tables = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let class = data[offset] >> 4;
            let id = data[offset] & 0x0F;
            offset += 1;

            let class = CodingClass::from_u8(class).ok_or(JpegError::InvalidTableId {
                class: "Huffman class",
                id: class,
            })?;
            if id > 3 {
                return Err(JpegError::InvalidTableId {
                    class: "Huffman",
                    id,
                });
            }

            if data.len() < offset + 16 {
                return Err(JpegError::TruncatedSegment(Marker::DHT));
            }
            let mut bits = [0u8; 16];
            bits.copy_from_slice(&data[offset..offset + 16]);
            offset += 16;

            let count: usize = bits.iter().map(|&b| usize::from(b)).sum();
            if count > 256 {
                return Err(JpegError::InvalidHuffmanTable("more than 256 symbols"));
            }
            if data.len() < offset + count {
                return Err(JpegError::TruncatedSegment(Marker::DHT));
            }

            let table = HuffmanTable::new(&bits, &data[offset..offset + count])?;
            offset += count;

            tables.push((class, id, table));
        }

        Ok(tables)
    }

    pub fn bits(&self) -> &[u8; 16] {
        &self.bits
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Code and code length of a symbol
    #[inline]
    pub fn code(&self, symbol: u8) -> Option<(u16, u8)> {
        let (code, length) = self.codes[usize::from(symbol)];
        if length == 0 {
            None
        } else {
            Some((code, length))
        }
    }

    /// Decode the next symbol
    ///
    /// # Errors
    ///
    /// [JpegError::InvalidHuffmanCode] if no code of up to the table's maximum
    /// length matches, or the errors of the bit reader.
    pub fn decode(&self, reader: &mut BitReader, mode: HuffmanDecodeMode) -> JpegResult<u8> {
        match mode {
            HuffmanDecodeMode::BitSerial => self.decode_bit_serial(reader),
            HuffmanDecodeMode::Lookahead => self.decode_lookahead(reader),
        }
    }

    fn decode_bit_serial(&self, reader: &mut BitReader) -> JpegResult<u8> {
        let mut code = 0i32;

        for length in 1..=usize::from(self.max_length) {
            code = (code << 1) | reader.read_bit()? as i32;

            if code <= self.max_code[length] {
                return Ok(self.values[(code + self.value_offset[length]) as usize]);
            }
        }

        Err(JpegError::InvalidHuffmanCode)
    }

    fn decode_lookahead(&self, reader: &mut BitReader) -> JpegResult<u8> {
        let peek = reader.peek_16_bits();

        let entry = self.lookahead[usize::from(peek >> (16 - LOOKAHEAD_BITS))];
        if entry != 0 {
            reader.skip_bits((entry >> 8) as u8)?;
            return Ok(entry as u8);
        }

        for length in LOOKAHEAD_BITS + 1..=self.max_length {
            let code = i32::from(peek >> (16 - length));

            if code <= self.max_code[usize::from(length)] {
                reader.skip_bits(length)?;
                return Ok(self.values[(code + self.value_offset[usize::from(length)]) as usize]);
            }
        }

        Err(JpegError::InvalidHuffmanCode)
    }
}

/// Sign-extend `size` appended bits into a coefficient value
#[inline]
pub(crate) fn extend(bits: u16, size: u8) -> i32 {
    let value = i32::from(bits);

    if size == 0 {
        0
    } else if value < 1 << (size - 1) {
        value - (1 << size) + 1
    } else {
        value
    }
}

/// Read `size` appended bits and sign-extend them
#[inline]
pub(crate) fn receive_extend(reader: &mut BitReader, size: u8) -> JpegResult<i32> {
    if size == 0 {
        return Ok(0);
    }

    Ok(extend(reader.read_bits(size)?, size))
}
