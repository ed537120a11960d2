/// Coding process signalled by a SOFn marker
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SofType {
    /// SOF0
    BaselineDct,

    /// SOF1
    ExtendedSequentialDct,

    /// SOF2
    ProgressiveDct,

    /// SOF3
    Lossless,

    /// SOF5
    DifferentialSequentialDct,

    /// SOF6
    DifferentialProgressiveDct,

    /// SOF7
    DifferentialLossless,

    /// SOF9
    ExtendedSequentialDctArithmetic,

    /// SOF10
    ProgressiveDctArithmetic,

    /// SOF11
    LosslessArithmetic,

    /// SOF13
    DifferentialSequentialDctArithmetic,

    /// SOF14
    DifferentialProgressiveDctArithmetic,

    /// SOF15
    DifferentialLosslessArithmetic,
}

impl SofType {
    /// Frame types this codec can decode: Huffman coded 8 bit DCT frames
    pub fn is_supported(self) -> bool {
        use SofType::*;

        matches!(self, BaselineDct | ExtendedSequentialDct | ProgressiveDct)
    }

    pub fn is_progressive(self) -> bool {
        use SofType::*;

        matches!(
            self,
            ProgressiveDct
                | DifferentialProgressiveDct
                | ProgressiveDctArithmetic
                | DifferentialProgressiveDctArithmetic
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Marker {
    /// Stuffed zero byte, only valid inside entropy-coded data
    Zero,

    /// Start Of Image
    SOI,

    /// Start Of Frame
    SOF(SofType),

    /// Define Huffman Table
    DHT,

    /// Define Arithmetic Coding conditioning
    DAC,

    /// Define Quantization Table
    DQT,

    /// Define Restart Interval
    DRI,

    /// Define Number of Lines
    DNL,

    /// Start Of Scan
    SOS,

    /// Restart marker 0..=7
    RST(u8),

    /// Application segment 0..=15
    APP(u8),

    /// Comment
    COM,

    /// End Of Image
    EOI,

    /// Fill byte preceding a marker
    Fill,

    /// Reserved or otherwise unknown marker code
    Other(u8),
}

impl Marker {
    /// Markers without a length field and payload
    pub fn is_standalone(self) -> bool {
        matches!(
            self,
            Marker::SOI | Marker::EOI | Marker::RST(_) | Marker::Zero | Marker::Fill
        ) || matches!(self, Marker::Other(0x01))
    }
}

impl From<u8> for Marker {
    fn from(value: u8) -> Marker {
        use Marker::*;
        use SofType::*;

        match value {
            0x00 => Zero,
            0xC0 => SOF(BaselineDct),
            0xC1 => SOF(ExtendedSequentialDct),
            0xC2 => SOF(ProgressiveDct),
            0xC3 => SOF(Lossless),
            0xC4 => DHT,
            0xC5 => SOF(DifferentialSequentialDct),
            0xC6 => SOF(DifferentialProgressiveDct),
            0xC7 => SOF(DifferentialLossless),
            0xC9 => SOF(ExtendedSequentialDctArithmetic),
            0xCA => SOF(ProgressiveDctArithmetic),
            0xCB => SOF(LosslessArithmetic),
            0xCC => DAC,
            0xCD => SOF(DifferentialSequentialDctArithmetic),
            0xCE => SOF(DifferentialProgressiveDctArithmetic),
            0xCF => SOF(DifferentialLosslessArithmetic),
            0xD0..=0xD7 => RST(value - 0xD0),
            0xD8 => SOI,
            0xD9 => EOI,
            0xDA => SOS,
            0xDB => DQT,
            0xDC => DNL,
            0xDD => DRI,
            0xE0..=0xEF => APP(value - 0xE0),
            0xFE => COM,
            0xFF => Fill,
            other => Other(other),
        }
    }
}

impl From<Marker> for u8 {
    fn from(marker: Marker) -> Self {
        use Marker::*;
        use SofType::*;

        match marker {
            Zero => 0x00,
            SOF(BaselineDct) => 0xC0,
            SOF(ExtendedSequentialDct) => 0xC1,
            SOF(ProgressiveDct) => 0xC2,
            SOF(Lossless) => 0xC3,
            DHT => 0xC4,
            SOF(DifferentialSequentialDct) => 0xC5,
            SOF(DifferentialProgressiveDct) => 0xC6,
            SOF(DifferentialLossless) => 0xC7,
            SOF(ExtendedSequentialDctArithmetic) => 0xC9,
            SOF(ProgressiveDctArithmetic) => 0xCA,
            SOF(LosslessArithmetic) => 0xCB,
            DAC => 0xCC,
            SOF(DifferentialSequentialDctArithmetic) => 0xCD,
            SOF(DifferentialProgressiveDctArithmetic) => 0xCE,
            SOF(DifferentialLosslessArithmetic) => 0xCF,
            RST(v) => 0xD0 + (v & 0x07),
            SOI => 0xD8,
            EOI => 0xD9,
            SOS => 0xDA,
            DQT => 0xDB,
            DNL => 0xDC,
            DRI => 0xDD,
            APP(v) => 0xE0 + (v & 0x0F),
            COM => 0xFE,
            Fill => 0xFF,
            Other(v) => v,
        }
    }
}
