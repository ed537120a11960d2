use std::num::NonZeroU16;

use arrayref::array_ref;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{JpegError, JpegResult};
use crate::marker::Marker;
use crate::zigzag::from_zigzag;

/// # Quantization table used for encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuantizationTableType {
    /// Sample quantization tables given in Annex K (Clause K.1) of Recommendation ITU-T T.81 (1992) | ISO/IEC 10918-1:1994.
    #[default]
    Default,

    /// Flat
    Flat,

    /// A user supplied quantization table in natural order
    ///
    /// The values are used as-is and are not scaled by the quality setting.
    Custom(Box<[u16; 64]>),
}

// Annex K.1, natural order
static DEFAULT_LUMA_TABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
    92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

static DEFAULT_CHROMA_TABLE: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

static FLAT_TABLE: [u16; 64] = [16; 64];

/// Linear scale factor in percent for a quality between 1 and 100
fn get_scale_factor(quality: u8) -> u32 {
    let quality = u32::from(quality.clamp(1, 100));

    if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    }
}

/// # A table of 64 quantization step sizes in natural order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    table: [NonZeroU16; 64],
}

impl QuantizationTable {
    /// Build the table for `table_type`, scaling the base tables by `quality`
    ///
    /// `luma` selects between the luma and chroma variant of the base table.
    ///
    /// # Errors
    ///
    /// Returns [JpegError::InvalidQuality] if quality is not in 1..=100 and
    /// [JpegError::InvalidQuantizationValue] if a custom table contains a zero.
    pub fn new(table_type: &QuantizationTableType, quality: u8, luma: bool) -> JpegResult<Self> {
        if !(1..=100).contains(&quality) {
            return Err(JpegError::InvalidQuality(quality));
        }

        match table_type {
            QuantizationTableType::Default => {
                let base = if luma {
                    &DEFAULT_LUMA_TABLE
                } else {
                    &DEFAULT_CHROMA_TABLE
                };
                Ok(Self::with_quality(base, quality))
            }
            QuantizationTableType::Flat => Ok(Self::with_quality(&FLAT_TABLE, quality)),
            QuantizationTableType::Custom(table) => Self::from_values(table),
        }
    }

    fn with_quality(base: &[u16; 64], quality: u8) -> Self {
        let scale = get_scale_factor(quality);

        let mut table = [NonZeroU16::MIN; 64];
        for (q, &v) in table.iter_mut().zip(base.iter()) {
            let v = (u32::from(v) * scale + 50) / 100;
            *q = NonZeroU16::new(v.clamp(1, 255) as u16).unwrap_or(NonZeroU16::MIN);
        }

        QuantizationTable { table }
    }

    /// Table with the same step size at every position
    pub fn flat(value: u8) -> Self {
        let value = NonZeroU16::new(u16::from(value)).unwrap_or(NonZeroU16::MIN);
        QuantizationTable {
            table: [value; 64],
        }
    }

    /// Build a table from natural order values
    pub fn from_values(values: &[u16; 64]) -> JpegResult<Self> {
        let mut table = [NonZeroU16::MIN; 64];

        for (i, (q, &v)) in table.iter_mut().zip(values.iter()).enumerate() {
            *q = NonZeroU16::new(v).ok_or(JpegError::InvalidQuantizationValue(i))?;
        }

        Ok(QuantizationTable { table })
    }

    /// Parse the payload of a DQT segment, which may define several tables
    ///
    /// Returns the destination id and table of every definition in segment
    /// order.
    pub fn parse_dqt(data: &[u8]) -> JpegResult<Vec<(u8, QuantizationTable)>> {
        let mut tables = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let precision = data[offset] >> 4;
            let id = data[offset] & 0x0F;
            offset += 1;

            if precision > 1 {
                return Err(JpegError::InvalidTableId {
                    class: "quantization precision",
                    id: precision,
                });
            }
            if id > 3 {
                return Err(JpegError::InvalidTableId {
                    class: "quantization",
                    id,
                });
            }

            let size = if precision == 0 { 64 } else { 128 };
            if data.len() < offset + size {
                return Err(JpegError::TruncatedSegment(Marker::DQT));
            }

            let mut zigzag = [0u16; 64];
            if precision == 0 {
                let raw = array_ref!(data, offset, 64);
                for (v, &raw) in zigzag.iter_mut().zip(raw.iter()) {
                    *v = u16::from(raw);
                }
            } else {
                let raw = array_ref!(data, offset, 128);
                for (v, raw) in zigzag.iter_mut().zip(raw.chunks_exact(2)) {
                    *v = BigEndian::read_u16(raw);
                }
            }
            offset += size;

            tables.push((id, QuantizationTable::from_values(&from_zigzag(&zigzag))?));
        }

        Ok(tables)
    }

    /// Step size at a natural order index
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        self.table[index].get()
    }

    /// All step sizes in natural order
    pub fn values(&self) -> [u16; 64] {
        let mut values = [0u16; 64];
        for (v, q) in values.iter_mut().zip(self.table.iter()) {
            *v = q.get();
        }
        values
    }

    /// True if a value needs 16 bit precision in a DQT segment
    pub fn is_extended(&self) -> bool {
        self.table.iter().any(|v| v.get() > 255)
    }

    /// Quantize a natural order block of DCT coefficients
    ///
    /// Each coefficient is divided by its step size and rounded half away
    /// from zero.
    pub fn quantize(&self, coefficients: &[f32; 64], out: &mut [i16; 64]) {
        for i in 0..64 {
            let value = coefficients[i] / f32::from(self.table[i].get());
            out[i] = value.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
        }
    }

    /// Multiply a natural order block of quantized coefficients by the step sizes
    pub fn dequantize(&self, block: &[i16; 64], out: &mut [f32; 64]) {
        for i in 0..64 {
            out[i] = f32::from(block[i]) * f32::from(self.table[i].get());
        }
    }
}
