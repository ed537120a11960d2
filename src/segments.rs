use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use crate::error::{JpegError, JpegResult};
use crate::marker::Marker;

/// A marker segment of a JPEG stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub marker: Marker,

    /// Offset of the marker in the stream
    pub offset: usize,

    /// Payload following the length field, empty for standalone markers
    pub data: &'a [u8],

    /// Entropy-coded bytes following a SOS segment, stuffing and restart
    /// markers included. Empty for every other marker.
    pub entropy_data: &'a [u8],
}

/// # The segments of a JPEG stream
///
/// Keeps every segment in file order and an index grouping them by marker,
/// in encounter order within each marker.
#[derive(Clone, Debug)]
pub struct Segments<'a> {
    segments: Vec<Segment<'a>>,
    by_marker: BTreeMap<Marker, Vec<usize>>,
}

impl<'a> Segments<'a> {
    /// Split a JPEG stream into its segments
    ///
    /// # Errors
    ///
    /// Fails if the data does not start with SOI, a segment length is invalid
    /// or runs past the end of the data, there is more than one frame header,
    /// a scan precedes the frame header or the frame header or scans are
    /// missing.
    pub fn parse(data: &'a [u8]) -> JpegResult<Segments<'a>> {
        if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
            return Err(JpegError::MissingSoi);
        }

        let mut segments = Segments {
            segments: Vec::new(),
            by_marker: BTreeMap::new(),
        };
        segments.push(Segment {
            marker: Marker::SOI,
            offset: 0,
            data: &[],
            entropy_data: &[],
        });

        let mut position = 2;
        let mut seen_eoi = false;

        while position < data.len() {
            let start = position;
            while position < data.len() && data[position] != 0xFF {
                position += 1;
            }
            if position > start {
                warn!(
                    "Skipping {} extraneous bytes at offset {}",
                    position - start,
                    start
                );
            }

            // Fill bytes
            while position + 1 < data.len() && data[position + 1] == 0xFF {
                position += 1;
            }

            if position + 1 >= data.len() {
                break;
            }

            let offset = position;
            let code = data[position + 1];
            let marker = Marker::from(code);
            position += 2;

            if marker == Marker::Zero {
                warn!("Stuffed zero byte outside entropy-coded data at offset {}", offset);
                continue;
            }

            if marker == Marker::EOI {
                segments.push(Segment {
                    marker,
                    offset,
                    data: &[],
                    entropy_data: &[],
                });
                seen_eoi = true;
                break;
            }

            if marker.is_standalone() {
                warn!("Ignoring standalone marker {:?} at offset {}", marker, offset);
                continue;
            }

            if position + 2 > data.len() {
                return Err(JpegError::TruncatedSegment(marker));
            }

            let length = usize::from(BigEndian::read_u16(&data[position..position + 2]));
            if length < 2 {
                return Err(JpegError::InvalidSegmentLength { marker, length });
            }
            if position + length > data.len() {
                return Err(JpegError::TruncatedSegment(marker));
            }

            let payload = &data[position + 2..position + length];
            position += length;

            let entropy_data = if marker == Marker::SOS {
                let end = entropy_data_end(data, position);
                let entropy = &data[position..end];
                position = end;
                entropy
            } else {
                &[]
            };

            segments.push(Segment {
                marker,
                offset,
                data: payload,
                entropy_data,
            });
        }

        if !seen_eoi {
            warn!("Missing EOI marker");
        } else if position < data.len() {
            warn!("Ignoring {} bytes after EOI", data.len() - position);
        }

        segments.check_structure()?;

        debug!(
            "Parsed {} segments: {:?}",
            segments.segments.len(),
            segments
                .segments
                .iter()
                .map(|s| s.marker)
                .collect::<Vec<_>>()
        );

        Ok(segments)
    }

    fn push(&mut self, segment: Segment<'a>) {
        self.by_marker
            .entry(segment.marker)
            .or_default()
            .push(self.segments.len());
        self.segments.push(segment);
    }

    fn check_structure(&self) -> JpegResult<()> {
        let mut frame_seen = false;

        for segment in &self.segments {
            match segment.marker {
                Marker::SOF(_) => {
                    if frame_seen {
                        return Err(JpegError::DuplicateFrame);
                    }
                    frame_seen = true;
                }
                Marker::SOS if !frame_seen => {
                    return Err(JpegError::SegmentBeforeFrame(Marker::SOS));
                }
                _ => {}
            }
        }

        if !frame_seen {
            return Err(JpegError::MissingSegment(Marker::SOF(
                crate::marker::SofType::BaselineDct,
            )));
        }
        if !self.by_marker.contains_key(&Marker::SOS) {
            return Err(JpegError::MissingSegment(Marker::SOS));
        }

        Ok(())
    }

    /// All segments in file order
    pub fn iter(&self) -> impl Iterator<Item = &Segment<'a>> {
        self.segments.iter()
    }

    /// Segments with the given marker in encounter order
    pub fn of_type(&self, marker: Marker) -> impl Iterator<Item = &Segment<'a>> {
        self.by_marker
            .get(&marker)
            .into_iter()
            .flatten()
            .map(move |&i| &self.segments[i])
    }

    /// The SOFn segment
    pub fn frame(&self) -> Option<&Segment<'a>> {
        self.segments
            .iter()
            .find(|s| matches!(s.marker, Marker::SOF(_)))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Offset of the first marker after `start` that is neither a stuffed byte
/// nor a restart marker. Fill bytes in front of that marker are excluded.
fn entropy_data_end(data: &[u8], start: usize) -> usize {
    let mut position = start;

    while position + 1 < data.len() {
        if data[position] == 0xFF {
            match data[position + 1] {
                0x00 | 0xD0..=0xD7 => position += 2,
                0xFF => position += 1,
                _ => break,
            }
        } else {
            position += 1;
        }
    }

    if position + 1 >= data.len() {
        return data.len();
    }

    while position > start && data[position - 1] == 0xFF {
        position -= 1;
    }

    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::SofType;

    fn minimal_stream() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, // APP0
            0xFF, 0xDB, 0x00, 0x03, 0x01, // DQT (payload not parsed here)
            0xFF, 0xC0, 0x00, 0x03, 0x08, // SOF0
            0xFF, 0xDA, 0x00, 0x03, 0x01, // SOS
            0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56, // entropy data
            0xFF, 0xDB, 0x00, 0x03, 0x02, // DQT
            0xFF, 0xDA, 0x00, 0x03, 0x02, // SOS
            0x78, 0xFF, 0xFF, // entropy data with fill byte
            0xFF, 0xD9, // EOI
        ]
    }

    #[test]
    fn test_segments_in_order() {
        let data = minimal_stream();
        let segments = Segments::parse(&data).unwrap();

        let markers: Vec<Marker> = segments.iter().map(|s| s.marker).collect();
        assert_eq!(
            markers,
            vec![
                Marker::SOI,
                Marker::APP(0),
                Marker::DQT,
                Marker::SOF(SofType::BaselineDct),
                Marker::SOS,
                Marker::DQT,
                Marker::SOS,
                Marker::EOI,
            ]
        );

        let dqt: Vec<&[u8]> = segments.of_type(Marker::DQT).map(|s| s.data).collect();
        assert_eq!(dqt, vec![&[0x01][..], &[0x02][..]]);

        let scans: Vec<&Segment> = segments.of_type(Marker::SOS).collect();
        assert_eq!(scans[0].entropy_data, &[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56]);
        assert_eq!(scans[1].entropy_data, &[0x78]);

        assert_eq!(segments.frame().map(|s| s.data), Some(&[0x08][..]));
        assert_eq!(segments.of_type(Marker::COM).count(), 0);
    }

    #[test]
    fn test_missing_soi() {
        assert!(matches!(
            Segments::parse(&[0xFF, 0xE0, 0x00, 0x02]),
            Err(JpegError::MissingSoi)
        ));
        assert!(matches!(Segments::parse(&[]), Err(JpegError::MissingSoi)));
    }

    #[test]
    fn test_missing_frame_and_scan() {
        let data = [0xFF, 0xD8, 0xFF, 0xD9];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::MissingSegment(Marker::SOF(_)))
        ));

        let data = [0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x03, 0x08, 0xFF, 0xD9];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::MissingSegment(Marker::SOS))
        ));

        let data = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xC0, 0x00, 0x02, 0xFF, 0xD9];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::SegmentBeforeFrame(Marker::SOS))
        ));
    }

    #[test]
    fn test_bad_lengths() {
        let data = [0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x01];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::InvalidSegmentLength { length: 1, .. })
        ));

        let data = [0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10, 0x00];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::TruncatedSegment(Marker::APP(1)))
        ));
    }

    #[test]
    fn test_duplicate_frame() {
        let data = [
            0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x02, 0xFF, 0xC2, 0x00, 0x02, 0xFF, 0xDA, 0x00, 0x02,
            0xFF, 0xD9,
        ];
        assert!(matches!(
            Segments::parse(&data),
            Err(JpegError::DuplicateFrame)
        ));
    }

    #[test]
    fn test_garbage_and_missing_eoi_are_tolerated() {
        let data = [
            0xFF, 0xD8, 0x00, 0x11, 0xFF, 0xFF, 0xC0, 0x00, 0x02, 0xFF, 0xDA, 0x00, 0x02, 0x12,
            0x34,
        ];
        let segments = Segments::parse(&data).unwrap();
        let scan = segments.of_type(Marker::SOS).next().unwrap();
        assert_eq!(scan.entropy_data, &[0x12, 0x34]);
        assert_eq!(segments.of_type(Marker::EOI).count(), 0);
    }
}
