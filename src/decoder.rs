use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace, warn};

use crate::bit_reader::BitReader;
use crate::coefficients::JpegCoefficients;
use crate::color_transform::{gray_row_to_rgba, rgb_row_to_rgba, ycbcr_row_to_rgba};
use crate::error::{JpegError, JpegResult};
use crate::frame::{for_each_block, FrameHeader, ScanHeader, ScanValidation};
use crate::huffman::{receive_extend, CodingClass, HuffmanDecodeMode, HuffmanTable};
use crate::idct::{BlockReconstructor, Dequantization, IdctMethod};
use crate::marker::Marker;
use crate::quantization::QuantizationTable;
use crate::segments::Segments;
use crate::upsampling::Plane;
use crate::zigzag::ZIGZAG;
use crate::Density;

/// # Decoder configuration
///
/// Selects the implementation of each decoding step. All combinations
/// produce valid images; they differ in speed and in rounding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DecoderOptions {
    pub idct: IdctMethod,
    pub dequantization: Dequantization,
    pub huffman: HuffmanDecodeMode,
    pub validation: ScanValidation,
}

/// Contents of a JFIF APP0 segment
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct JfifInfo {
    pub version: (u8, u8),
    pub density: Density,
}

/// Sampling factors of a frame component
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentInfo {
    pub id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
}

/// # Everything besides the image data
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub jfif: Option<JfifInfo>,

    /// An APP8 SPIFF header is present
    pub spiff: bool,

    /// Color transform flag of an Adobe APP14 segment
    pub adobe_transform: Option<u8>,

    pub comments: Vec<Vec<u8>>,

    /// Number and payload of every APPn segment in file order
    pub app_segments: Vec<(u8, Vec<u8>)>,

    pub restart_interval: Option<u16>,
    pub progressive: bool,
    pub components: Vec<ComponentInfo>,
}

impl Metadata {
    fn parse(segments: &Segments, frame: &FrameHeader) -> Metadata {
        let mut metadata = Metadata {
            progressive: frame.is_progressive(),
            components: frame
                .components
                .iter()
                .map(|c| ComponentInfo {
                    id: c.id,
                    horizontal_sampling_factor: c.horizontal_sampling_factor,
                    vertical_sampling_factor: c.vertical_sampling_factor,
                })
                .collect(),
            ..Default::default()
        };

        for segment in segments.iter() {
            let data = segment.data;

            match segment.marker {
                Marker::APP(nr) => {
                    match nr {
                        0 if data.starts_with(b"JFIF\0") && data.len() >= 12 => {
                            let x = BigEndian::read_u16(&data[8..10]);
                            let y = BigEndian::read_u16(&data[10..12]);
                            let density = match data[7] {
                                1 => Density::Inch { x, y },
                                2 => Density::Centimeter { x, y },
                                _ => Density::None,
                            };
                            metadata.jfif = Some(JfifInfo {
                                version: (data[5], data[6]),
                                density,
                            });
                        }
                        0 if data.starts_with(b"JFXX\0") => {}
                        8 if data.starts_with(b"SPIFF\0") => metadata.spiff = true,
                        14 if data.starts_with(b"Adobe") && data.len() >= 12 => {
                            metadata.adobe_transform = Some(data[11]);
                        }
                        0 | 14 => warn!(
                            "Unrecognized APP{} segment of {} bytes at offset {}",
                            nr,
                            data.len(),
                            segment.offset
                        ),
                        _ => debug!("APP{} segment of {} bytes", nr, data.len()),
                    }
                    metadata.app_segments.push((nr, data.to_vec()));
                }
                Marker::COM => metadata.comments.push(data.to_vec()),
                Marker::DRI if data.len() == 2 => {
                    let interval = BigEndian::read_u16(data);
                    metadata.restart_interval = if interval == 0 { None } else { Some(interval) };
                }
                _ => {}
            }
        }

        metadata
    }

    /// Three component images are stored as RGB when an Adobe segment says
    /// so, or without Adobe segment when the component ids spell "RGB"
    fn is_rgb(&self) -> bool {
        match self.adobe_transform {
            Some(transform) => transform == 0,
            None => {
                self.jfif.is_none()
                    && self.components.iter().map(|c| c.id).eq([b'R', b'G', b'B'])
            }
        }
    }
}

/// # A decoded image
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// RGBA pixels, 4 bytes per pixel, rows from top to bottom
    pub pixels: Vec<u8>,
    pub width: u16,
    pub height: u16,
    pub metadata: Metadata,
}

/// # The JPEG decoder
///
/// The stream structure, frame header and metadata are parsed by
/// [new](Decoder::new); entropy decoding and reconstruction happen in
/// [decode](Decoder::decode) or in the two separate steps
/// [read_coefficients](Decoder::read_coefficients) and
/// [render](Decoder::render).
pub struct Decoder<'a> {
    segments: Segments<'a>,
    frame: FrameHeader,
    metadata: Metadata,
    options: DecoderOptions,
}

impl<'a> Decoder<'a> {
    /// Create a decoder with default options
    pub fn new(data: &'a [u8]) -> JpegResult<Decoder<'a>> {
        Self::with_options(data, DecoderOptions::default())
    }

    /// Create a decoder
    ///
    /// # Errors
    ///
    /// Fails if the stream structure is invalid or the frame header is
    /// invalid or uses an unsupported coding process.
    pub fn with_options(data: &'a [u8], options: DecoderOptions) -> JpegResult<Decoder<'a>> {
        let segments = Segments::parse(data)?;

        let frame_segment = segments.frame().ok_or(JpegError::MissingSegment(Marker::SOF(
            crate::marker::SofType::BaselineDct,
        )))?;
        let frame = match frame_segment.marker {
            Marker::SOF(sof_type) => FrameHeader::parse(sof_type, frame_segment.data)?,
            marker => return Err(JpegError::UnsupportedFrameType(marker)),
        };

        let metadata = Metadata::parse(&segments, &frame);

        debug!("Decoder options: {:?}", options);

        Ok(Decoder {
            segments,
            frame,
            metadata,
            options,
        })
    }

    pub fn frame(&self) -> &FrameHeader {
        &self.frame
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Decode to RGBA pixels
    pub fn decode(&self) -> JpegResult<DecodedImage> {
        let coefficients = self.read_coefficients()?;
        self.render(&coefficients)
    }

    /// Entropy decode every scan into quantized coefficient blocks
    ///
    /// Tables and restart intervals take effect in file order, so a table
    /// redefined between scans applies to the following scans only. Each
    /// component keeps the quantization table that was active at its first
    /// scan.
    pub fn read_coefficients(&self) -> JpegResult<JpegCoefficients> {
        let frame = &self.frame;

        let mut quantization_tables: [Option<QuantizationTable>; 4] = Default::default();
        let mut dc_tables: [Option<HuffmanTable>; 4] = Default::default();
        let mut ac_tables: [Option<HuffmanTable>; 4] = Default::default();
        let mut restart_interval = None;

        let mut component_tables: Vec<Option<QuantizationTable>> =
            vec![None; frame.components.len()];
        let mut components: Vec<Vec<[i16; 64]>> = (0..frame.components.len())
            .map(|i| vec![[0i16; 64]; frame.blocks_wide(i) * frame.blocks_tall(i)])
            .collect();

        let mut scan_count = 0;

        for segment in self.segments.iter() {
            match segment.marker {
                Marker::DQT => {
                    for (id, table) in QuantizationTable::parse_dqt(segment.data)? {
                        debug!("Quantization table {}", id);
                        quantization_tables[usize::from(id)] = Some(table);
                    }
                }
                Marker::DHT => {
                    for (class, id, table) in HuffmanTable::parse_dht(segment.data)? {
                        debug!("{:?} Huffman table {}", class, id);
                        match class {
                            CodingClass::Dc => dc_tables[usize::from(id)] = Some(table),
                            CodingClass::Ac => ac_tables[usize::from(id)] = Some(table),
                        }
                    }
                }
                Marker::DRI => {
                    if segment.data.len() != 2 {
                        return Err(JpegError::InvalidSegmentLength {
                            marker: Marker::DRI,
                            length: segment.data.len() + 2,
                        });
                    }
                    let interval = BigEndian::read_u16(segment.data);
                    restart_interval = if interval == 0 { None } else { Some(interval) };
                }
                Marker::DNL => warn!("Ignoring DNL segment"),
                Marker::SOS => {
                    let scan = ScanHeader::parse(segment.data, frame, self.options.validation)?;

                    for component in &scan.components {
                        let index = component.component_index;
                        if component_tables[index].is_none() {
                            let id = frame.components[index].quantization_table;
                            component_tables[index] = Some(
                                quantization_tables[usize::from(id)].clone().ok_or(
                                    JpegError::UndefinedTable {
                                        class: "quantization",
                                        id,
                                    },
                                )?,
                            );
                        }
                    }

                    let tables = ScanTables::resolve(&scan, &dc_tables, &ac_tables)?;
                    self.decode_scan(
                        &scan,
                        &tables,
                        segment.entropy_data,
                        restart_interval,
                        &mut components,
                    )?;
                    scan_count += 1;
                }
                _ => {}
            }
        }

        debug!("Decoded {} scans", scan_count);

        let mut tables = Vec::with_capacity(component_tables.len());
        for (component, table) in frame.components.iter().zip(component_tables) {
            let id = component.quantization_table;
            let table = match table {
                Some(table) => table,
                None => {
                    warn!("Component {} is not part of any scan", component.id);
                    quantization_tables[usize::from(id)]
                        .clone()
                        .ok_or(JpegError::UndefinedTable {
                            class: "quantization",
                            id,
                        })?
                }
            };
            tables.push(table);
        }

        let mut coefficients = JpegCoefficients::new(frame.clone(), tables);
        for (component, blocks) in coefficients.components.iter_mut().zip(components) {
            component.blocks = blocks;
        }

        Ok(coefficients)
    }

    fn decode_scan(
        &self,
        scan: &ScanHeader,
        tables: &ScanTables,
        data: &[u8],
        restart_interval: Option<u16>,
        components: &mut [Vec<[i16; 64]>],
    ) -> JpegResult<()> {
        let mode = self.options.huffman;
        let progressive = self.frame.is_progressive();
        let (ss, se) = (scan.spectral_start, scan.spectral_end);

        let mut reader = BitReader::new(data);
        let mut predictions = vec![0i32; scan.components.len()];
        let mut current_mcu = None;
        let mut expected_restart = 0u8;

        for_each_block(&self.frame, &scan.component_indices(), |position| {
            if current_mcu != Some(position.mcu) {
                if let Some(interval) = restart_interval {
                    let interval = usize::from(interval);
                    if position.mcu > 0 && position.mcu % interval == 0 {
                        self.handle_restart(&mut reader, position.mcu, &mut expected_restart)?;
                        predictions.iter_mut().for_each(|p| *p = 0);
                    }
                }
                current_mcu = Some(position.mcu);
            }

            let component = &scan.components[position.scan_component];
            let block = &mut components[component.component_index][position.block_index];

            if scan.includes_dc() {
                let table = tables.dc[position.scan_component].ok_or(JpegError::UndefinedTable {
                    class: "DC Huffman",
                    id: component.dc_table,
                })?;

                let category = table.decode(&mut reader, mode)?;
                if category > 15 {
                    return Err(JpegError::InvalidMagnitudeCategory(category));
                }

                let prediction = &mut predictions[position.scan_component];
                let value = *prediction + receive_extend(&mut reader, category)?;
                if value < i32::from(i16::MIN) || value > i32::from(i16::MAX) {
                    return Err(JpegError::InvalidMagnitudeCategory(category));
                }

                *prediction = value;
                block[0] = value as i16;
            }

            if scan.includes_ac() {
                let table = tables.ac[position.scan_component].ok_or(JpegError::UndefinedTable {
                    class: "AC Huffman",
                    id: component.ac_table,
                })?;

                decode_ac(&mut reader, table, mode, block, ss.max(1), se, progressive)?;
            }

            Ok(())
        })?;

        if let Some(marker) = reader.take_restart_marker() {
            trace!("Scan ended behind restart marker {}", marker);
        }

        Ok(())
    }

    fn handle_restart(
        &self,
        reader: &mut BitReader,
        mcu: usize,
        expected: &mut u8,
    ) -> JpegResult<()> {
        match reader.read_restart_marker() {
            Some(marker) => {
                if marker != *expected {
                    warn!(
                        "Restart marker {} found where {} was expected, MCU {}",
                        marker, *expected, mcu
                    );
                }
                trace!("Restart marker {} before MCU {}", marker, mcu);
                *expected = (marker + 1) & 7;
            }
            None => match self.options.validation {
                ScanValidation::Strict => return Err(JpegError::MissingRestartMarker(mcu)),
                ScanValidation::Lenient => {
                    warn!(
                        "Missing restart marker before MCU {}, continuing at the byte boundary",
                        mcu
                    );
                    *expected = (*expected + 1) & 7;
                }
            },
        }

        Ok(())
    }

    /// Dequantize, transform and color convert coefficients into RGBA pixels
    ///
    /// The frame of `coefficients` is used, so blocks read from this decoder
    /// can be modified before rendering.
    pub fn render(&self, coefficients: &JpegCoefficients) -> JpegResult<DecodedImage> {
        coefficients.validate()?;

        let frame = &coefficients.frame;
        let width = usize::from(frame.width);
        let height = usize::from(frame.height);

        let mut planes = Vec::with_capacity(coefficients.components.len());

        for (i, component) in coefficients.components.iter().enumerate() {
            let reconstructor = BlockReconstructor::new(
                &component.quantization_table,
                self.options.idct,
                self.options.dequantization,
            );

            let stride = component.blocks_wide * 8;
            let mut data = vec![0u8; stride * component.blocks_tall * 8];
            let mut samples = [0u8; 64];

            for (b, block) in component.blocks.iter().enumerate() {
                reconstructor.reconstruct(block, &mut samples);

                let x = (b % component.blocks_wide) * 8;
                let y = (b / component.blocks_wide) * 8;
                for (row, line) in samples.chunks_exact(8).enumerate() {
                    let start = (y + row) * stride + x;
                    data[start..start + 8].copy_from_slice(line);
                }
            }

            let plane = Plane {
                data,
                stride,
                width: frame.component_width(i),
                height: frame.component_height(i),
            };

            let scale_x = f32::from(component.horizontal_sampling_factor)
                / f32::from(frame.max_h_sampling);
            let scale_y =
                f32::from(component.vertical_sampling_factor) / f32::from(frame.max_v_sampling);

            planes.push(plane.upsample(width, height, scale_x, scale_y));
        }

        let mut pixels = vec![0u8; width * height * 4];
        let rgb = self.metadata.is_rgb();

        for (y, output) in pixels.chunks_exact_mut(width * 4).enumerate() {
            match planes.as_slice() {
                [luma] => gray_row_to_rgba(luma.row(y), output),
                [c0, c1, c2] if rgb => rgb_row_to_rgba(c0.row(y), c1.row(y), c2.row(y), output),
                [c0, c1, c2] => ycbcr_row_to_rgba(c0.row(y), c1.row(y), c2.row(y), output),
                _ => {
                    return Err(JpegError::UnsupportedComponentCount(planes.len() as u8));
                }
            }
        }

        Ok(DecodedImage {
            pixels,
            width: frame.width,
            height: frame.height,
            metadata: self.metadata.clone(),
        })
    }
}

/// Huffman tables of every scan component, resolved before decoding starts
struct ScanTables<'t> {
    dc: Vec<Option<&'t HuffmanTable>>,
    ac: Vec<Option<&'t HuffmanTable>>,
}

impl<'t> ScanTables<'t> {
    fn resolve(
        scan: &ScanHeader,
        dc_tables: &'t [Option<HuffmanTable>; 4],
        ac_tables: &'t [Option<HuffmanTable>; 4],
    ) -> JpegResult<ScanTables<'t>> {
        let mut tables = ScanTables {
            dc: Vec::with_capacity(scan.components.len()),
            ac: Vec::with_capacity(scan.components.len()),
        };

        for component in &scan.components {
            let dc = if scan.includes_dc() {
                Some(
                    dc_tables[usize::from(component.dc_table)]
                        .as_ref()
                        .ok_or(JpegError::UndefinedTable {
                            class: "DC Huffman",
                            id: component.dc_table,
                        })?,
                )
            } else {
                None
            };

            let ac = if scan.includes_ac() {
                Some(
                    ac_tables[usize::from(component.ac_table)]
                        .as_ref()
                        .ok_or(JpegError::UndefinedTable {
                            class: "AC Huffman",
                            id: component.ac_table,
                        })?,
                )
            } else {
                None
            };

            tables.dc.push(dc);
            tables.ac.push(ac);
        }

        Ok(tables)
    }
}

/// Decode the AC band `start..=end` (zigzag positions) of one block
fn decode_ac(
    reader: &mut BitReader,
    table: &HuffmanTable,
    mode: HuffmanDecodeMode,
    block: &mut [i16; 64],
    start: u8,
    end: u8,
    progressive: bool,
) -> JpegResult<()> {
    let end = usize::from(end);
    let mut k = usize::from(start);

    while k <= end {
        let symbol = table.decode(reader, mode)?;
        let run = usize::from(symbol >> 4);
        let size = symbol & 0x0F;

        if size == 0 {
            match run {
                // EOB
                0 => break,
                // ZRL
                15 => {
                    k += 16;
                    if k > end + 1 {
                        return Err(JpegError::CoefficientOutOfBand {
                            index: k - 1,
                            ss: start,
                            se: end as u8,
                        });
                    }
                    continue;
                }
                _ if progressive => return Err(JpegError::UnsupportedEobRun(symbol)),
                _ => return Err(JpegError::InvalidHuffmanCode),
            }
        }

        k += run;
        if k > end {
            return Err(JpegError::CoefficientOutOfBand {
                index: k,
                ss: start,
                se: end as u8,
            });
        }

        block[usize::from(ZIGZAG[k])] = receive_extend(reader, size)? as i16;
        k += 1;
    }

    Ok(())
}
