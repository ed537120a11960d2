use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::error::{JpegError, JpegResult};
use crate::marker::{Marker, SofType};

/// # Strictness of scan header and restart marker checks
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ScanValidation {
    /// Every deviation is an error
    #[default]
    Strict,

    /// Accept a sequential scan with a spectral range other than 0..=63 and
    /// continue at the next byte boundary if an expected restart marker is missing
    Lenient,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
    pub quantization_table: u8,
}

/// # Parameters of a SOFn segment and the MCU geometry derived from them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub sof_type: SofType,
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    pub components: Vec<FrameComponent>,

    pub max_h_sampling: u8,
    pub max_v_sampling: u8,

    /// Number of MCUs per row of an interleaved scan
    pub mcu_cols: usize,

    /// Number of MCU rows of an interleaved scan
    pub mcu_rows: usize,
}

fn ceil_div(value: usize, div: usize) -> usize {
    value / div + usize::from(value % div != 0)
}

impl FrameHeader {
    /// Validate the frame parameters and derive the MCU geometry
    pub fn new(
        sof_type: SofType,
        width: u16,
        height: u16,
        components: Vec<FrameComponent>,
    ) -> JpegResult<FrameHeader> {
        if !sof_type.is_supported() {
            return Err(JpegError::UnsupportedFrameType(Marker::SOF(sof_type)));
        }

        if width == 0 || height == 0 {
            return Err(JpegError::InvalidDimensions { width, height });
        }

        if components.len() != 1 && components.len() != 3 {
            return Err(JpegError::UnsupportedComponentCount(components.len() as u8));
        }

        for (i, component) in components.iter().enumerate() {
            let h = component.horizontal_sampling_factor;
            let v = component.vertical_sampling_factor;

            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(JpegError::InvalidSamplingFactor { h, v });
            }

            if component.quantization_table > 3 {
                return Err(JpegError::InvalidTableId {
                    class: "quantization",
                    id: component.quantization_table,
                });
            }

            if components[..i].iter().any(|c| c.id == component.id) {
                return Err(JpegError::DuplicateComponent(component.id));
            }
        }

        let max_h_sampling = components
            .iter()
            .map(|c| c.horizontal_sampling_factor)
            .max()
            .unwrap_or(1);
        let max_v_sampling = components
            .iter()
            .map(|c| c.vertical_sampling_factor)
            .max()
            .unwrap_or(1);

        let mcu_cols = ceil_div(usize::from(width), 8 * usize::from(max_h_sampling));
        let mcu_rows = ceil_div(usize::from(height), 8 * usize::from(max_v_sampling));

        Ok(FrameHeader {
            sof_type,
            precision: 8,
            width,
            height,
            components,
            max_h_sampling,
            max_v_sampling,
            mcu_cols,
            mcu_rows,
        })
    }

    /// Parse the payload of a SOFn segment
    pub fn parse(sof_type: SofType, data: &[u8]) -> JpegResult<FrameHeader> {
        let marker = Marker::SOF(sof_type);

        if !sof_type.is_supported() {
            return Err(JpegError::UnsupportedFrameType(marker));
        }

        if data.len() < 6 {
            return Err(JpegError::InvalidSegmentLength {
                marker,
                length: data.len() + 2,
            });
        }

        let precision = data[0];
        if precision != 8 {
            return Err(JpegError::UnsupportedPrecision(precision));
        }

        let height = BigEndian::read_u16(&data[1..3]);
        let width = BigEndian::read_u16(&data[3..5]);
        let component_count = data[5];

        if component_count != 1 && component_count != 3 {
            return Err(JpegError::UnsupportedComponentCount(component_count));
        }

        if data.len() != 6 + 3 * usize::from(component_count) {
            return Err(JpegError::InvalidSegmentLength {
                marker,
                length: data.len() + 2,
            });
        }

        let components = data[6..]
            .chunks_exact(3)
            .map(|c| FrameComponent {
                id: c[0],
                horizontal_sampling_factor: c[1] >> 4,
                vertical_sampling_factor: c[1] & 0x0F,
                quantization_table: c[2],
            })
            .collect();

        let frame = FrameHeader::new(sof_type, width, height, components)?;

        debug!(
            "Frame {:?}: {}x{}, components {:?}, {}x{} MCUs",
            sof_type,
            width,
            height,
            frame
                .components
                .iter()
                .map(|c| (c.id, c.horizontal_sampling_factor, c.vertical_sampling_factor))
                .collect::<Vec<_>>(),
            frame.mcu_cols,
            frame.mcu_rows
        );

        Ok(frame)
    }

    pub fn is_progressive(&self) -> bool {
        self.sof_type.is_progressive()
    }

    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Width of the block grid of a component, covering all MCUs
    pub fn blocks_wide(&self, component: usize) -> usize {
        self.mcu_cols * usize::from(self.components[component].horizontal_sampling_factor)
    }

    /// Height of the block grid of a component, covering all MCUs
    pub fn blocks_tall(&self, component: usize) -> usize {
        self.mcu_rows * usize::from(self.components[component].vertical_sampling_factor)
    }

    /// Number of samples per line of a component, `ceil(X * H / Hmax)`
    pub fn component_width(&self, component: usize) -> usize {
        ceil_div(
            usize::from(self.width) * usize::from(self.components[component].horizontal_sampling_factor),
            usize::from(self.max_h_sampling),
        )
    }

    /// Number of lines of a component, `ceil(Y * V / Vmax)`
    pub fn component_height(&self, component: usize) -> usize {
        ceil_div(
            usize::from(self.height) * usize::from(self.components[component].vertical_sampling_factor),
            usize::from(self.max_v_sampling),
        )
    }

    /// Blocks per line a non-interleaved scan of the component covers
    pub fn nominal_blocks_wide(&self, component: usize) -> usize {
        ceil_div(self.component_width(component), 8)
    }

    /// Block rows a non-interleaved scan of the component covers
    pub fn nominal_blocks_tall(&self, component: usize) -> usize {
        ceil_div(self.component_height(component), 8)
    }

    /// Number of MCUs of a scan over the given components
    pub fn mcus_in_scan(&self, component_indices: &[usize]) -> usize {
        match component_indices {
            [single] => self.nominal_blocks_wide(*single) * self.nominal_blocks_tall(*single),
            _ => self.mcu_cols * self.mcu_rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into the frame's components
    pub component_index: usize,
    pub component_id: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

/// # Parameters of a SOS segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub successive_high: u8,
    pub successive_low: u8,
}

impl ScanHeader {
    /// Parse and validate the payload of a SOS segment against the frame
    ///
    /// With [ScanValidation::Lenient] the spectral range of a sequential scan
    /// is replaced by 0..=63.
    pub fn parse(
        data: &[u8],
        frame: &FrameHeader,
        validation: ScanValidation,
    ) -> JpegResult<ScanHeader> {
        let count = *data.first().ok_or(JpegError::InvalidSegmentLength {
            marker: Marker::SOS,
            length: 2,
        })?;

        if count == 0 || usize::from(count) > frame.components.len() {
            return Err(JpegError::InvalidScanComponentCount(count));
        }

        if data.len() != 1 + 2 * usize::from(count) + 3 {
            return Err(JpegError::InvalidSegmentLength {
                marker: Marker::SOS,
                length: data.len() + 2,
            });
        }

        let mut components: Vec<ScanComponent> = Vec::with_capacity(usize::from(count));
        for c in data[1..1 + 2 * usize::from(count)].chunks_exact(2) {
            let id = c[0];
            let component_index = frame
                .component_index(id)
                .ok_or(JpegError::UnknownComponent(id))?;

            if components.iter().any(|s| s.component_id == id) {
                return Err(JpegError::DuplicateComponent(id));
            }

            let dc_table = c[1] >> 4;
            let ac_table = c[1] & 0x0F;
            for table in [dc_table, ac_table] {
                if table > 3 {
                    return Err(JpegError::InvalidTableId {
                        class: "Huffman",
                        id: table,
                    });
                }
            }

            components.push(ScanComponent {
                component_index,
                component_id: id,
                dc_table,
                ac_table,
            });
        }

        // Frame order is required for interleaved scans
        if components
            .windows(2)
            .any(|w| w[0].component_index >= w[1].component_index)
        {
            return Err(JpegError::InvalidScanComponentOrder);
        }

        let tail = &data[1 + 2 * usize::from(count)..];
        let mut scan = ScanHeader {
            components,
            spectral_start: tail[0],
            spectral_end: tail[1],
            successive_high: tail[2] >> 4,
            successive_low: tail[2] & 0x0F,
        };

        scan.validate(frame, validation)?;

        debug!(
            "Scan over components {:?}, Ss={} Se={} Ah={} Al={}",
            scan.components
                .iter()
                .map(|c| c.component_id)
                .collect::<Vec<_>>(),
            scan.spectral_start,
            scan.spectral_end,
            scan.successive_high,
            scan.successive_low
        );

        Ok(scan)
    }

    fn validate(&mut self, frame: &FrameHeader, validation: ScanValidation) -> JpegResult<()> {
        let (ss, se) = (self.spectral_start, self.spectral_end);

        if self.successive_high != 0 || self.successive_low != 0 {
            return Err(JpegError::UnsupportedSuccessiveApproximation {
                ah: self.successive_high,
                al: self.successive_low,
            });
        }

        if frame.is_progressive() {
            if ss == 0 && se != 0 {
                return Err(JpegError::InvalidSpectralSelection { ss, se });
            }
            if ss > 0 {
                if se < ss || se > 63 {
                    return Err(JpegError::InvalidSpectralSelection { ss, se });
                }
                if self.components.len() != 1 {
                    return Err(JpegError::InvalidScanComponentCount(
                        self.components.len() as u8,
                    ));
                }
            }
        } else if ss != 0 || se != 63 {
            match validation {
                ScanValidation::Strict => {
                    return Err(JpegError::InvalidSpectralSelection { ss, se });
                }
                ScanValidation::Lenient => {
                    log::warn!(
                        "Sequential scan with spectral range {}..={}, decoding as 0..=63",
                        ss,
                        se
                    );
                    self.spectral_start = 0;
                    self.spectral_end = 63;
                }
            }
        }

        Ok(())
    }

    /// Scan carries the DC coefficient
    pub fn includes_dc(&self) -> bool {
        self.spectral_start == 0
    }

    /// Scan carries AC coefficients
    pub fn includes_ac(&self) -> bool {
        self.spectral_end > 0
    }

    pub fn component_indices(&self) -> Vec<usize> {
        self.components.iter().map(|c| c.component_index).collect()
    }
}

/// Location of one block in the traversal of a scan
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct BlockPosition {
    /// Running MCU number within the scan
    pub mcu: usize,

    /// Index into the scan's components
    pub scan_component: usize,

    /// Index into the component's block grid
    pub block_index: usize,
}

/// Visit the blocks of a scan in coding order
///
/// Interleaved scans visit MCU by MCU, each component contributing `H x V`
/// blocks in raster order. A single-component scan visits the component's
/// nominal blocks in raster order, one block per MCU.
pub(crate) fn for_each_block<F>(
    frame: &FrameHeader,
    component_indices: &[usize],
    mut visit: F,
) -> JpegResult<()>
where
    F: FnMut(BlockPosition) -> JpegResult<()>,
{
    if let [component] = *component_indices {
        let stride = frame.blocks_wide(component);
        let mut mcu = 0;

        for row in 0..frame.nominal_blocks_tall(component) {
            for col in 0..frame.nominal_blocks_wide(component) {
                visit(BlockPosition {
                    mcu,
                    scan_component: 0,
                    block_index: row * stride + col,
                })?;
                mcu += 1;
            }
        }

        return Ok(());
    }

    for mcu_row in 0..frame.mcu_rows {
        for mcu_col in 0..frame.mcu_cols {
            let mcu = mcu_row * frame.mcu_cols + mcu_col;

            for (scan_component, &c) in component_indices.iter().enumerate() {
                let component = &frame.components[c];
                let h = usize::from(component.horizontal_sampling_factor);
                let v = usize::from(component.vertical_sampling_factor);
                let stride = frame.blocks_wide(c);

                for y in 0..v {
                    for x in 0..h {
                        let row = mcu_row * v + y;
                        let col = mcu_col * h + x;

                        visit(BlockPosition {
                            mcu,
                            scan_component,
                            block_index: row * stride + col,
                        })?;
                    }
                }
            }
        }
    }

    Ok(())
}
