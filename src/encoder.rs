use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::debug;

use crate::coefficients::JpegCoefficients;
use crate::error::{JpegError, JpegResult};
use crate::fdct::DctMethod;
use crate::frame::{for_each_block, FrameComponent, FrameHeader, ScanComponent, ScanHeader};
use crate::huffman::{CodingClass, HuffmanTable};
use crate::image_buffer::*;
use crate::marker::{Marker, SofType};
use crate::quantization::{QuantizationTable, QuantizationTableType};
use crate::upsampling::downsample_box;
use crate::writer::{ac_symbols, dc_symbol, JfifWrite, JfifWriter};
use crate::Density;

/// # Color types used in encoding
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JpegColorType {
    /// One component grayscale colorspace
    Luma,

    /// Three component YCbCr colorspace
    Ycbcr,
}

impl JpegColorType {
    pub(crate) fn get_num_components(self) -> usize {
        match self {
            JpegColorType::Luma => 1,
            JpegColorType::Ycbcr => 3,
        }
    }
}

/// # Color types for input images
///
/// Available color input formats for [Encoder::encode]. Other types can be used
/// by implementing an [ImageBuffer](crate::ImageBuffer).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColorType {
    /// Grayscale with 1 byte per pixel
    Luma,

    /// RGB with 3 bytes per pixel
    Rgb,

    /// Red, Green, Blue with 4 bytes per pixel. The alpha channel will be ignored during encoding.
    Rgba,
}

impl ColorType {
    pub(crate) fn get_bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Luma => 1,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
/// # Sampling factors for chroma subsampling
///
/// The factors apply to the luma component, chroma components always use 1x1.
///
/// ## Warning
/// Sampling factor of 4 are not supported by all decoders or applications
#[allow(non_camel_case_types)]
pub enum SamplingFactor {
    F_1_1 = 1 << 4 | 1,
    F_2_1 = 2 << 4 | 1,
    F_1_2 = 1 << 4 | 2,
    F_2_2 = 2 << 4 | 2,
    F_4_1 = 4 << 4 | 1,
    F_4_2 = 4 << 4 | 2,
    F_1_4 = 1 << 4 | 4,
    F_2_4 = 2 << 4 | 4,

    /// Alias for F_1_1
    R_4_4_4 = 0x80 | 1 << 4 | 1,

    /// Alias for F_1_2
    R_4_4_0 = 0x80 | 1 << 4 | 2,

    /// Alias for F_1_4
    R_4_4_1 = 0x80 | 1 << 4 | 4,

    /// Alias for F_2_1
    R_4_2_2 = 0x80 | 2 << 4 | 1,

    /// Alias for F_2_2
    R_4_2_0 = 0x80 | 2 << 4 | 2,

    /// Alias for F_2_4
    R_4_2_1 = 0x80 | 2 << 4 | 4,

    /// Alias for F_4_1
    R_4_1_1 = 0x80 | 4 << 4 | 1,

    /// Alias for F_4_2
    R_4_1_0 = 0x80 | 4 << 4 | 2,
}

impl SamplingFactor {
    /// Get variant for supplied factors or None if not supported
    pub fn from_factors(horizontal: u8, vertical: u8) -> Option<SamplingFactor> {
        use SamplingFactor::*;

        match (horizontal, vertical) {
            (1, 1) => Some(F_1_1),
            (1, 2) => Some(F_1_2),
            (1, 4) => Some(F_1_4),
            (2, 1) => Some(F_2_1),
            (2, 2) => Some(F_2_2),
            (2, 4) => Some(F_2_4),
            (4, 1) => Some(F_4_1),
            (4, 2) => Some(F_4_2),
            _ => None,
        }
    }

    pub(crate) fn get_sampling_factors(self) -> (u8, u8) {
        let value = self as u8;
        ((value >> 4) & 0x07, value & 0xf)
    }
}

/// Receives the entropy coding decisions of a scan, either to count symbol
/// frequencies or to write them out
trait SymbolSink {
    fn symbol(&mut self, class: CodingClass, table: u8, symbol: u8, size: u8, bits: u16)
        -> JpegResult<()>;

    fn restart(&mut self, marker: u8) -> JpegResult<()>;
}

/// Symbol frequencies per table class and id
struct SymbolStatistics {
    dc: [[u32; 256]; 2],
    ac: [[u32; 256]; 2],
}

impl SymbolSink for SymbolStatistics {
    fn symbol(&mut self, class: CodingClass, table: u8, symbol: u8, _: u8, _: u16) -> JpegResult<()> {
        let frequencies = match class {
            CodingClass::Dc => &mut self.dc[usize::from(table)],
            CodingClass::Ac => &mut self.ac[usize::from(table)],
        };
        frequencies[usize::from(symbol)] += 1;
        Ok(())
    }

    fn restart(&mut self, _: u8) -> JpegResult<()> {
        Ok(())
    }
}

struct ScanWriter<'a, W: JfifWrite> {
    writer: &'a mut JfifWriter<W>,
    tables: &'a [(HuffmanTable, HuffmanTable); 2],
}

impl<'a, W: JfifWrite> SymbolSink for ScanWriter<'a, W> {
    #[inline]
    fn symbol(
        &mut self,
        class: CodingClass,
        table: u8,
        symbol: u8,
        size: u8,
        bits: u16,
    ) -> JpegResult<()> {
        let (dc, ac) = &self.tables[usize::from(table)];
        let table = match class {
            CodingClass::Dc => dc,
            CodingClass::Ac => ac,
        };

        self.writer.huffman_encode(symbol, table)?;
        self.writer.write_bits(bits, size)
    }

    fn restart(&mut self, marker: u8) -> JpegResult<()> {
        self.writer.write_marker(Marker::RST(marker))
    }
}

/// Run the entropy coding of one scan, resetting the DC predictors every
/// `restart_interval` MCUs
fn code_scan<S: SymbolSink>(
    coefficients: &JpegCoefficients,
    scan: &ScanHeader,
    restart_interval: Option<u16>,
    sink: &mut S,
) -> JpegResult<()> {
    let indices = scan.component_indices();
    let mut predictions = vec![0i16; scan.components.len()];
    let mut current_mcu = None;
    let mut restarts = 0u8;

    let spectral_start = scan.spectral_start.max(1);

    for_each_block(&coefficients.frame, &indices, |position| {
        if current_mcu != Some(position.mcu) {
            if let Some(interval) = restart_interval {
                let interval = usize::from(interval);
                if position.mcu > 0 && position.mcu % interval == 0 {
                    sink.restart(restarts)?;
                    restarts = (restarts + 1) & 7;
                    predictions.iter_mut().for_each(|p| *p = 0);
                }
            }
            current_mcu = Some(position.mcu);
        }

        let component = &scan.components[position.scan_component];
        let block = &coefficients.components[component.component_index].blocks
            [position.block_index];

        if scan.includes_dc() {
            let prediction = &mut predictions[position.scan_component];
            let (category, bits) = dc_symbol(block[0], *prediction)?;
            sink.symbol(CodingClass::Dc, component.dc_table, category, category, bits)?;
            *prediction = block[0];
        }

        if scan.includes_ac() {
            ac_symbols(block, spectral_start, scan.spectral_end, |symbol, size, bits| {
                sink.symbol(CodingClass::Ac, component.ac_table, symbol, size, bits)
            })?;
        }

        Ok(())
    })
}

/// # The JPEG encoder
pub struct Encoder<W: JfifWrite> {
    writer: JfifWriter<W>,
    density: Density,
    quality: u8,

    quantization_tables: [QuantizationTableType; 2],
    huffman_tables: [(HuffmanTable, HuffmanTable); 2],

    sampling_factor: SamplingFactor,

    progressive: bool,

    restart_interval: Option<u16>,

    optimize_huffman_table: bool,

    dct_method: DctMethod,

    app_segments: Vec<(u8, Vec<u8>)>,
    comments: Vec<Vec<u8>>,
}

impl<W: JfifWrite> Encoder<W> {
    /// Create a new encoder with the given quality
    ///
    /// The quality must be between 1 and 100 where 100 is the highest image quality.<br>
    /// By default, quality settings below 90 use a chroma subsampling (2x2 / 4:2:0) which can
    /// be changed with [set_sampling_factor](Encoder::set_sampling_factor).
    ///
    /// # Errors
    ///
    /// Returns [JpegError::InvalidQuality] for a quality outside of 1..=100
    pub fn new(w: W, quality: u8) -> JpegResult<Encoder<W>> {
        if !(1..=100).contains(&quality) {
            return Err(JpegError::InvalidQuality(quality));
        }

        let huffman_tables = [
            (
                HuffmanTable::default_luma_dc(),
                HuffmanTable::default_luma_ac(),
            ),
            (
                HuffmanTable::default_chroma_dc(),
                HuffmanTable::default_chroma_ac(),
            ),
        ];

        let sampling_factor = if quality < 90 {
            SamplingFactor::R_4_2_0
        } else {
            SamplingFactor::R_4_4_4
        };

        Ok(Encoder {
            writer: JfifWriter::new(w),
            density: Density::default(),
            quality,
            quantization_tables: [
                QuantizationTableType::Default,
                QuantizationTableType::Default,
            ],
            huffman_tables,
            sampling_factor,
            progressive: false,
            restart_interval: None,
            optimize_huffman_table: false,
            dct_method: DctMethod::default(),
            app_segments: Vec::new(),
            comments: Vec::new(),
        })
    }

    /// Set pixel density for the image
    ///
    /// By default, this value is None which is equal to "1 pixel per pixel".
    pub fn set_density(&mut self, density: Density) {
        self.density = density;
    }

    /// Return pixel density
    pub fn density(&self) -> Density {
        self.density
    }

    /// Set chroma subsampling factor
    pub fn set_sampling_factor(&mut self, sampling: SamplingFactor) {
        self.sampling_factor = sampling;
    }

    /// Get chroma subsampling factor
    pub fn sampling_factor(&self) -> SamplingFactor {
        self.sampling_factor
    }

    /// Set quantization tables for luma and chroma components
    pub fn set_quantization_tables(
        &mut self,
        luma: QuantizationTableType,
        chroma: QuantizationTableType,
    ) {
        self.quantization_tables = [luma, chroma];
    }

    /// Get configured quantization tables
    pub fn quantization_tables(&self) -> &[QuantizationTableType; 2] {
        &self.quantization_tables
    }

    /// Controls if progressive encoding is used.
    ///
    /// A progressive image has one interleaved scan with the DC coefficients
    /// of all components followed by one scan per component with the 63 AC
    /// coefficients.
    pub fn set_progressive(&mut self, progressive: bool) {
        self.progressive = progressive;
    }

    pub fn progressive(&self) -> bool {
        self.progressive
    }

    /// Set restart interval
    ///
    /// Set numbers of MCUs between restart markers. 0 disables restart markers.
    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart_interval = if interval == 0 { None } else { Some(interval) };
    }

    /// Return the restart interval
    pub fn restart_interval(&self) -> Option<u16> {
        self.restart_interval
    }

    /// Set if optimized huffman table should be created
    ///
    /// Optimized tables result in slightly smaller file sizes but decrease encoding performance.
    pub fn set_optimized_huffman_tables(&mut self, optimize_huffman_table: bool) {
        self.optimize_huffman_table = optimize_huffman_table;
    }

    /// Returns if optimized huffman table should be generated
    pub fn optimized_huffman_tables(&self) -> bool {
        self.optimize_huffman_table
    }

    /// Select the forward DCT implementation
    pub fn set_dct_method(&mut self, method: DctMethod) {
        self.dct_method = method;
    }

    pub fn dct_method(&self) -> DctMethod {
        self.dct_method
    }

    /// Appends a custom app segment to the JFIF file
    ///
    /// Segment numbers need to be in the range between 1 and 15<br>
    /// The maximum allowed data length is 2^16 - 2 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment number is invalid or data exceeds the allowed size
    pub fn add_app_segment(&mut self, segment_nr: u8, data: &[u8]) -> JpegResult<()> {
        if segment_nr == 0 || segment_nr > 15 {
            Err(JpegError::InvalidAppSegment(segment_nr))
        } else if data.len() > 65533 {
            Err(JpegError::AppSegmentTooLarge(data.len()))
        } else {
            self.app_segments.push((segment_nr, data.to_vec()));
            Ok(())
        }
    }

    /// Appends a COM segment
    ///
    /// # Errors
    ///
    /// Returns an error if the comment exceeds 65533 bytes
    pub fn add_comment(&mut self, comment: &[u8]) -> JpegResult<()> {
        if comment.len() > 65533 {
            return Err(JpegError::CommentTooLarge(comment.len()));
        }

        self.comments.push(comment.to_vec());
        Ok(())
    }

    /// Encode an image
    ///
    /// Data format and length must conform to specified width, height and color type.
    pub fn encode(
        self,
        data: &[u8],
        width: u16,
        height: u16,
        color_type: ColorType,
    ) -> JpegResult<()> {
        let required_data_len = width as usize * height as usize * color_type.get_bytes_per_pixel();

        if data.len() < required_data_len {
            return Err(JpegError::BadImageData {
                length: data.len(),
                required: required_data_len,
            });
        }

        match color_type {
            ColorType::Luma => self.encode_image(GrayImage(data, width, height)),
            ColorType::Rgb => self.encode_image(RgbImage(data, width, height)),
            ColorType::Rgba => self.encode_image(RgbaImage(data, width, height)),
        }
    }

    /// Encode an image
    pub fn encode_image<I: ImageBuffer>(self, image: I) -> JpegResult<()> {
        let coefficients = self.quantize_image(&image)?;
        self.encode_coefficients(&coefficients)
    }

    /// Run the transform and quantization steps of the encoder
    ///
    /// The result can be modified and then written with
    /// [encode_coefficients](Encoder::encode_coefficients).
    pub fn quantize_image<I: ImageBuffer>(&self, image: &I) -> JpegResult<JpegCoefficients> {
        let width = image.width();
        let height = image.height();
        let color = image.get_jpeg_color_type();

        let frame = FrameHeader::new(
            SofType::BaselineDct,
            width,
            height,
            self.frame_components(color),
        )?;

        let tables = [
            QuantizationTable::new(&self.quantization_tables[0], self.quality, true)?,
            QuantizationTable::new(&self.quantization_tables[1], self.quality, false)?,
        ];

        debug!(
            "Quantizing {}x{} image, {} components, {} x {} MCUs",
            width,
            height,
            frame.components.len(),
            frame.mcu_cols,
            frame.mcu_rows
        );

        let planes = padded_planes(image, &frame);

        let component_tables = frame
            .components
            .iter()
            .map(|c| tables[usize::from(c.quantization_table)].clone())
            .collect();
        let mut coefficients = JpegCoefficients::new(frame, component_tables);

        let max_h = usize::from(coefficients.frame.max_h_sampling);
        let max_v = usize::from(coefficients.frame.max_v_sampling);
        let full_width = coefficients.frame.mcu_cols * 8 * max_h;
        let full_height = coefficients.frame.mcu_rows * 8 * max_v;

        for (component, plane) in coefficients.components.iter_mut().zip(planes) {
            let plane = downsample_box(
                &plane,
                full_width,
                full_height,
                max_h / usize::from(component.horizontal_sampling_factor),
                max_v / usize::from(component.vertical_sampling_factor),
            );
            let stride = component.blocks_wide * 8;

            let mut samples = [0f32; 64];
            let mut dct = [0f32; 64];

            for (i, block) in component.blocks.iter_mut().enumerate() {
                let bx = (i % component.blocks_wide) * 8;
                let by = (i / component.blocks_wide) * 8;

                for y in 0..8 {
                    let row = &plane[(by + y) * stride + bx..(by + y) * stride + bx + 8];
                    for (s, &p) in samples[y * 8..y * 8 + 8].iter_mut().zip(row) {
                        *s = p - 128.0;
                    }
                }

                self.dct_method.forward(&samples, &mut dct);
                component.quantization_table.quantize(&dct, block);
            }
        }

        Ok(coefficients)
    }

    /// Write quantized coefficients as a complete JPEG stream
    ///
    /// The frame geometry, component ids and quantization tables are taken
    /// from `coefficients`; progressive mode, restart interval, Huffman table
    /// optimization and metadata from the encoder settings.
    pub fn encode_coefficients(mut self, coefficients: &JpegCoefficients) -> JpegResult<()> {
        coefficients.validate()?;

        let extended = coefficients
            .components
            .iter()
            .any(|c| c.quantization_table.is_extended());

        let sof_type = if self.progressive {
            SofType::ProgressiveDct
        } else if extended {
            SofType::ExtendedSequentialDct
        } else {
            SofType::BaselineDct
        };

        let source = &coefficients.frame;
        let frame = FrameHeader::new(
            sof_type,
            source.width,
            source.height,
            source.components.clone(),
        )?;
        let coefficients = JpegCoefficients {
            frame,
            components: coefficients.components.clone(),
        };

        let scans = self.scans(&coefficients.frame);

        if self.optimize_huffman_table {
            self.optimize_tables(&coefficients, &scans)?;
        }

        debug!(
            "Writing {:?} frame with {} scans, restart interval {:?}, optimized tables: {}",
            sof_type,
            scans.len(),
            self.restart_interval,
            self.optimize_huffman_table
        );

        self.write_headers(&coefficients)?;

        for scan in &scans {
            self.writer.write_sos(scan)?;

            let mut sink = ScanWriter {
                writer: &mut self.writer,
                tables: &self.huffman_tables,
            };
            code_scan(&coefficients, scan, self.restart_interval, &mut sink)?;
        }

        self.writer.write_marker(Marker::EOI)?;

        Ok(())
    }

    fn frame_components(&self, color: JpegColorType) -> Vec<FrameComponent> {
        let (h, v) = self.sampling_factor.get_sampling_factors();

        (0..color.get_num_components())
            .map(|i| {
                let (h, v) = if i == 0 { (h, v) } else { (1, 1) };
                FrameComponent {
                    id: i as u8 + 1,
                    horizontal_sampling_factor: h,
                    vertical_sampling_factor: v,
                    quantization_table: u8::from(i > 0),
                }
            })
            .collect()
    }

    /// Huffman table id of a component, 0 for luma and 1 for chroma
    fn huffman_table_id(component_index: usize) -> u8 {
        u8::from(component_index > 0)
    }

    fn scans(&self, frame: &FrameHeader) -> Vec<ScanHeader> {
        let scan_component = |index: usize| ScanComponent {
            component_index: index,
            component_id: frame.components[index].id,
            dc_table: Self::huffman_table_id(index),
            ac_table: Self::huffman_table_id(index),
        };

        let all = (0..frame.components.len()).map(scan_component).collect();

        if !self.progressive {
            return vec![ScanHeader {
                components: all,
                spectral_start: 0,
                spectral_end: 63,
                successive_high: 0,
                successive_low: 0,
            }];
        }

        let mut scans = vec![ScanHeader {
            components: all,
            spectral_start: 0,
            spectral_end: 0,
            successive_high: 0,
            successive_low: 0,
        }];

        for index in 0..frame.components.len() {
            scans.push(ScanHeader {
                components: vec![scan_component(index)],
                spectral_start: 1,
                spectral_end: 63,
                successive_high: 0,
                successive_low: 0,
            });
        }

        scans
    }

    fn optimize_tables(
        &mut self,
        coefficients: &JpegCoefficients,
        scans: &[ScanHeader],
    ) -> JpegResult<()> {
        let mut statistics = SymbolStatistics {
            dc: [[0; 256]; 2],
            ac: [[0; 256]; 2],
        };

        for scan in scans {
            code_scan(coefficients, scan, self.restart_interval, &mut statistics)?;
        }

        for (i, tables) in self.huffman_tables.iter_mut().enumerate() {
            *tables = (
                HuffmanTable::new_optimized(&statistics.dc[i]),
                HuffmanTable::new_optimized(&statistics.ac[i]),
            );
        }

        Ok(())
    }

    fn write_headers(&mut self, coefficients: &JpegCoefficients) -> JpegResult<()> {
        let frame = &coefficients.frame;

        self.writer.write_marker(Marker::SOI)?;
        self.writer.write_jfif_header(self.density)?;

        for (nr, data) in &self.app_segments {
            self.writer.write_app_segment(*nr, data)?;
        }
        for comment in &self.comments {
            self.writer.write_comment(comment)?;
        }

        let mut tables: Vec<(u8, &QuantizationTable)> = Vec::with_capacity(2);
        for (component, coefficients) in frame.components.iter().zip(&coefficients.components) {
            if !tables.iter().any(|(id, _)| *id == component.quantization_table) {
                tables.push((component.quantization_table, &coefficients.quantization_table));
            }
        }
        self.writer.write_dqt(&tables)?;

        self.writer.write_sof(frame)?;

        let table_count = if frame.components.len() > 1 { 2 } else { 1 };
        for (id, (dc, ac)) in self.huffman_tables.iter().enumerate().take(table_count) {
            self.writer.write_dht(CodingClass::Dc, id as u8, dc)?;
            self.writer.write_dht(CodingClass::Ac, id as u8, ac)?;
        }

        if let Some(interval) = self.restart_interval {
            self.writer.write_dri(interval)?;
        }

        Ok(())
    }
}

impl Encoder<BufWriter<File>> {
    /// Create a new encoder that writes into a file
    ///
    /// See [new](Encoder::new) for further information.
    ///
    /// # Errors
    ///
    /// Returns an `IoError(std::io::Error)` if the file can't be created
    pub fn new_file<P: AsRef<Path>>(
        path: P,
        quality: u8,
    ) -> JpegResult<Encoder<BufWriter<File>>> {
        let file = File::create(path)?;
        let buf = BufWriter::new(file);
        Self::new(buf, quality)
    }
}

/// Full resolution component planes covering every MCU, with the right and
/// bottom edge replicated into the padding
fn padded_planes<I: ImageBuffer>(image: &I, frame: &FrameHeader) -> Vec<Vec<f32>> {
    let width = usize::from(image.width());
    let height = usize::from(image.height());
    let full_width = frame.mcu_cols * 8 * usize::from(frame.max_h_sampling);
    let full_height = frame.mcu_rows * 8 * usize::from(frame.max_v_sampling);
    let num_components = frame.components.len();

    let mut planes = vec![Vec::with_capacity(full_width * full_height); num_components];
    let mut buffers = [
        Vec::with_capacity(width),
        Vec::with_capacity(width),
        Vec::with_capacity(width),
    ];

    for y in 0..height {
        for buffer in buffers.iter_mut() {
            buffer.clear();
        }
        image.fill_buffers(y as u16, &mut buffers);

        for (plane, buffer) in planes.iter_mut().zip(buffers.iter()) {
            plane.extend(buffer.iter().map(|&v| f32::from(v)));
            let last = plane.last().copied().unwrap_or(0.0);
            plane.resize(plane.len() + full_width - width, last);
        }
    }

    for plane in planes.iter_mut() {
        let last_row = plane[(height - 1) * full_width..height * full_width].to_vec();
        for _ in height..full_height {
            plane.extend_from_slice(&last_row);
        }
    }

    planes
}
