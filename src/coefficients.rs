use crc32fast::Hasher;

use crate::error::{JpegError, JpegResult};
use crate::frame::FrameHeader;
use crate::quantization::QuantizationTable;

/// Quantized DCT blocks of one component
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentCoefficients {
    pub id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,

    /// Table the blocks were quantized with
    pub quantization_table: QuantizationTable,

    pub blocks_wide: usize,
    pub blocks_tall: usize,

    /// Natural order blocks in raster order over the component's block grid,
    /// which covers whole MCUs
    pub blocks: Vec<[i16; 64]>,
}

/// # The quantized coefficients of an image
///
/// This is the data between entropy coding and the transforms.
/// [Decoder::read_coefficients](crate::Decoder::read_coefficients) produces
/// it, [Decoder::render](crate::Decoder::render) turns it into pixels and
/// [Encoder::encode_coefficients](crate::Encoder::encode_coefficients) writes
/// it to a new stream. Blocks can be modified in place between those steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JpegCoefficients {
    pub frame: FrameHeader,
    pub components: Vec<ComponentCoefficients>,
}

impl JpegCoefficients {
    /// Zeroed block grids for every component of the frame
    pub(crate) fn new(frame: FrameHeader, tables: Vec<QuantizationTable>) -> JpegCoefficients {
        let components = frame
            .components
            .iter()
            .zip(tables)
            .enumerate()
            .map(|(i, (component, quantization_table))| {
                let blocks_wide = frame.blocks_wide(i);
                let blocks_tall = frame.blocks_tall(i);

                ComponentCoefficients {
                    id: component.id,
                    horizontal_sampling_factor: component.horizontal_sampling_factor,
                    vertical_sampling_factor: component.vertical_sampling_factor,
                    quantization_table,
                    blocks_wide,
                    blocks_tall,
                    blocks: vec![[0i16; 64]; blocks_wide * blocks_tall],
                }
            })
            .collect();

        JpegCoefficients { frame, components }
    }

    /// All blocks, component by component in frame order
    pub fn blocks(&self) -> impl Iterator<Item = &[i16; 64]> {
        self.components.iter().flat_map(|c| c.blocks.iter())
    }

    /// All blocks in the order of [blocks](JpegCoefficients::blocks), mutable
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut [i16; 64]> {
        self.components.iter_mut().flat_map(|c| c.blocks.iter_mut())
    }

    /// CRC32 over every coefficient in block order, as little endian `i16`
    pub fn checksum(&self) -> u32 {
        let mut hasher = Hasher::new();

        for block in self.blocks() {
            for value in block {
                hasher.update(&value.to_le_bytes());
            }
        }

        hasher.finalize()
    }

    /// Check that the components and block grids match the frame
    pub(crate) fn validate(&self) -> JpegResult<()> {
        if self.components.len() != self.frame.components.len() {
            return Err(JpegError::CoefficientMismatch("component count"));
        }

        for (i, (component, frame_component)) in self
            .components
            .iter()
            .zip(self.frame.components.iter())
            .enumerate()
        {
            if component.id != frame_component.id
                || component.horizontal_sampling_factor != frame_component.horizontal_sampling_factor
                || component.vertical_sampling_factor != frame_component.vertical_sampling_factor
            {
                return Err(JpegError::CoefficientMismatch("component parameters"));
            }

            if component.blocks_wide != self.frame.blocks_wide(i)
                || component.blocks_tall != self.frame.blocks_tall(i)
                || component.blocks.len() != component.blocks_wide * component.blocks_tall
            {
                return Err(JpegError::CoefficientMismatch("block grid size"));
            }
        }

        for (i, a) in self.components.iter().enumerate() {
            for (j, b) in self.components.iter().enumerate().skip(i + 1) {
                if self.frame.components[i].quantization_table
                    == self.frame.components[j].quantization_table
                    && a.quantization_table != b.quantization_table
                {
                    return Err(JpegError::CoefficientMismatch(
                        "components sharing a table id use different tables",
                    ));
                }
            }
        }

        Ok(())
    }
}
