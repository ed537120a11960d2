use std::io::Write;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{JpegError, JpegResult};
use crate::frame::{FrameHeader, ScanHeader};
use crate::huffman::{CodingClass, HuffmanTable};
use crate::marker::Marker;
use crate::quantization::QuantizationTable;
use crate::zigzag::{to_zigzag, ZIGZAG};
use crate::Density;

/// Represents an abstract writer for the JPEG output
///
/// Implemented for every [std::io::Write], so a `Vec<u8>` or a
/// `BufWriter<File>` can be passed directly to the encoder.
pub trait JfifWrite {
    /// Writes the whole buffer. The behavior must be identical to std::io::Write::write_all
    /// # Errors
    ///
    /// Return an error if the data can't be written
    fn write_all(&mut self, buf: &[u8]) -> JpegResult<()>;
}

impl<W: Write + ?Sized> JfifWrite for W {
    #[inline(always)]
    fn write_all(&mut self, buf: &[u8]) -> JpegResult<()> {
        Write::write_all(self, buf)?;
        Ok(())
    }
}

/// Category and appended bits for a DC difference or AC coefficient
///
/// Negative values are stored as `value + 2^category - 1`.
pub(crate) fn get_code(value: i32) -> (u8, u16) {
    if value == 0 {
        return (0, 0);
    }

    let category = (32 - value.unsigned_abs().leading_zeros()) as u8;
    let bits = if value < 0 { value - 1 } else { value };
    let mask = (1i32 << category) - 1;

    (category, (bits & mask) as u16)
}

/// Symbol, category and appended bits of the DC difference between `value`
/// and the predictor
pub(crate) fn dc_symbol(value: i16, prediction: i16) -> JpegResult<(u8, u16)> {
    let (category, bits) = get_code(i32::from(value) - i32::from(prediction));

    if category > 15 {
        return Err(JpegError::InvalidMagnitudeCategory(category));
    }

    Ok((category, bits))
}

/// Run-length code the AC band `start..=end` (zigzag positions) of a natural
/// order block.
///
/// `emit` receives the symbol, the number of appended bits and the bits.
/// Runs longer than 15 zeros produce ZRL symbols, trailing zeros a single EOB.
pub(crate) fn ac_symbols<F>(block: &[i16; 64], start: u8, end: u8, mut emit: F) -> JpegResult<()>
where
    F: FnMut(u8, u8, u16) -> JpegResult<()>,
{
    let mut zero_run = 0u8;

    for &index in &ZIGZAG[usize::from(start)..=usize::from(end)] {
        let value = block[usize::from(index)];

        if value == 0 {
            zero_run += 1;
            continue;
        }

        while zero_run > 15 {
            emit(0xF0, 0, 0)?;
            zero_run -= 16;
        }

        let (category, bits) = get_code(i32::from(value));
        if category > 15 {
            return Err(JpegError::InvalidMagnitudeCategory(category));
        }

        emit((zero_run << 4) | category, category, bits)?;
        zero_run = 0;
    }

    if zero_run > 0 {
        emit(0x00, 0, 0)?;
    }

    Ok(())
}

pub(crate) struct JfifWriter<W: JfifWrite> {
    w: W,
    bit_buffer: u64,
    free_bits: i8,
}

impl<W: JfifWrite> JfifWriter<W> {
    pub fn new(w: W) -> Self {
        JfifWriter {
            w,
            bit_buffer: 0,
            free_bits: 64,
        }
    }

    #[inline(always)]
    pub fn write(&mut self, buf: &[u8]) -> JpegResult<()> {
        self.w.write_all(buf)
    }

    #[inline(always)]
    pub fn write_u8(&mut self, value: u8) -> JpegResult<()> {
        self.w.write_all(&[value])
    }

    #[inline(always)]
    pub fn write_u16(&mut self, value: u16) -> JpegResult<()> {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.w.write_all(&buf)
    }

    /// Flush every complete byte of the bit buffer, inserting a stuffed zero
    /// after each 0xFF
    fn flush_bytes(&mut self) -> JpegResult<()> {
        while self.free_bits <= 56 {
            let byte = (self.bit_buffer >> 56) as u8;
            self.bit_buffer <<= 8;
            self.free_bits += 8;

            if byte == 0xFF {
                self.w.write_all(&[0xFF, 0x00])?;
            } else {
                self.w.write_all(&[byte])?;
            }
        }

        Ok(())
    }

    /// Append the low `size` bits of `value` to the entropy-coded data
    pub fn write_bits(&mut self, value: u16, size: u8) -> JpegResult<()> {
        debug_assert!(size <= 16);

        if size == 0 {
            return Ok(());
        }

        let value = u64::from(value) & ((1u64 << size) - 1);

        self.free_bits -= size as i8;
        self.bit_buffer |= value << self.free_bits;

        self.flush_bytes()
    }

    /// Pad the last partial byte with 1 bits and emit it
    pub fn finalize_bit_buffer(&mut self) -> JpegResult<()> {
        self.write_bits(0x7F, 7)?;
        self.bit_buffer = 0;
        self.free_bits = 64;

        Ok(())
    }

    pub fn write_marker(&mut self, marker: Marker) -> JpegResult<()> {
        self.finalize_bit_buffer()?;
        self.write(&[0xFF, marker.into()])
    }

    pub fn write_segment(&mut self, marker: Marker, data: &[u8]) -> JpegResult<()> {
        self.write_marker(marker)?;
        self.write_u16(data.len() as u16 + 2)?;
        self.write(data)
    }

    pub fn write_jfif_header(&mut self, density: Density) -> JpegResult<()> {
        let mut data = [0u8; 14];
        data[..5].copy_from_slice(b"JFIF\0");
        data[5] = 1;
        data[6] = 2;

        let (unit, x, y) = match density {
            Density::None => (0, 1, 1),
            Density::Inch { x, y } => (1, x, y),
            Density::Centimeter { x, y } => (2, x, y),
        };
        data[7] = unit;
        BigEndian::write_u16(&mut data[8..10], x);
        BigEndian::write_u16(&mut data[10..12], y);
        // No thumbnail

        self.write_segment(Marker::APP(0), &data)
    }

    /// Append a DQT segment for every table
    ///
    /// Values are written in zigzag order. A table holding a value above 255
    /// is written with 16 bit precision.
    pub fn write_dqt(&mut self, tables: &[(u8, &QuantizationTable)]) -> JpegResult<()> {
        for &(id, table) in tables {
            let extended = table.is_extended();
            let precision = u8::from(extended);

            self.write_marker(Marker::DQT)?;
            self.write_u16(if extended { 2 + 1 + 128 } else { 2 + 1 + 64 })?;
            self.write_u8((precision << 4) | id)?;

            for value in to_zigzag(&table.values()) {
                if extended {
                    self.write_u16(value)?;
                } else {
                    self.write_u8(value as u8)?;
                }
            }
        }

        Ok(())
    }

    pub fn write_dht(
        &mut self,
        class: CodingClass,
        id: u8,
        table: &HuffmanTable,
    ) -> JpegResult<()> {
        let values = table.values();

        self.write_marker(Marker::DHT)?;
        self.write_u16(2 + 1 + 16 + values.len() as u16)?;
        self.write_u8(((class as u8) << 4) | id)?;
        self.write(table.bits())?;
        self.write(values)
    }

    pub fn write_sof(&mut self, frame: &FrameHeader) -> JpegResult<()> {
        self.write_marker(Marker::SOF(frame.sof_type))?;
        self.write_u16(2 + 1 + 2 + 2 + 1 + 3 * frame.components.len() as u16)?;
        self.write_u8(frame.precision)?;
        self.write_u16(frame.height)?;
        self.write_u16(frame.width)?;
        self.write_u8(frame.components.len() as u8)?;

        for component in &frame.components {
            self.write_u8(component.id)?;
            self.write_u8(
                (component.horizontal_sampling_factor << 4) | component.vertical_sampling_factor,
            )?;
            self.write_u8(component.quantization_table)?;
        }

        Ok(())
    }

    pub fn write_sos(&mut self, scan: &ScanHeader) -> JpegResult<()> {
        self.write_marker(Marker::SOS)?;
        self.write_u16(2 + 1 + 2 * scan.components.len() as u16 + 3)?;
        self.write_u8(scan.components.len() as u8)?;

        for component in &scan.components {
            self.write_u8(component.component_id)?;
            self.write_u8((component.dc_table << 4) | component.ac_table)?;
        }

        self.write_u8(scan.spectral_start)?;
        self.write_u8(scan.spectral_end)?;
        self.write_u8((scan.successive_high << 4) | scan.successive_low)
    }

    pub fn write_dri(&mut self, restart_interval: u16) -> JpegResult<()> {
        self.write_marker(Marker::DRI)?;
        self.write_u16(4)?;
        self.write_u16(restart_interval)
    }

    pub fn write_app_segment(&mut self, segment_nr: u8, data: &[u8]) -> JpegResult<()> {
        self.write_segment(Marker::APP(segment_nr), data)
    }

    pub fn write_comment(&mut self, comment: &[u8]) -> JpegResult<()> {
        self.write_segment(Marker::COM, comment)
    }

    #[inline]
    pub fn huffman_encode(&mut self, symbol: u8, table: &HuffmanTable) -> JpegResult<()> {
        let (code, length) = table
            .code(symbol)
            .ok_or(JpegError::MissingHuffmanCode { symbol })?;

        self.write_bits(code, length)
    }
}
