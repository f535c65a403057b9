use crate::{format_fourcc, read_u32_be};

use super::generic::{read_box_header, ChildBoxes, Mp4Box};

/// Reference type linking a timed metadata track to the track it describes.
pub const CONTENT_DESCRIBES: [u8; 4] = *b"cdsc";

// The `TrefBox` struct represents a Track Reference Box.
// It holds one child box per reference type; each child lists the ids of the
// referenced tracks. A metadata track uses a `cdsc` child to point at the
// video track its samples describe.
#[derive(Default, Clone, PartialEq)]
pub struct TrefBox {
    pub references: Vec<TrackReference>,
}

#[derive(Clone, PartialEq)]
pub struct TrackReference {
    pub reference_type: [u8; 4],
    pub track_ids: Vec<u32>,
}

impl TrefBox {
    /// Track ids referenced with `reference_type`, in declaration order.
    pub fn referenced_tracks(&self, reference_type: &[u8; 4]) -> impl Iterator<Item = u32> + '_ {
        let reference_type = *reference_type;
        self.references
            .iter()
            .filter(move |r| r.reference_type == reference_type)
            .flat_map(|r| r.track_ids.iter().copied())
    }
}

impl std::fmt::Debug for TrefBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrefBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("references", &self.references)
            .finish()
    }
}

impl std::fmt::Debug for TrackReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackReference")
            .field("reference_type", &format_fourcc(&self.reference_type))
            .field("track_ids", &self.track_ids)
            .finish()
    }
}

impl Mp4Box for TrefBox {
    fn box_type(&self) -> [u8; 4] { *b"tref" }

    fn box_size(&self) -> u32 {
        8 + self
            .references
            .iter()
            .map(|r| 8 + 4 * r.track_ids.len() as u32)
            .sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        for reference in &self.references {
            let size = 8 + 4 * reference.track_ids.len() as u32;
            buffer.extend_from_slice(&size.to_be_bytes());
            buffer.extend_from_slice(&reference.reference_type);
            for track_id in &reference.track_ids {
                buffer.extend_from_slice(&track_id.to_be_bytes());
            }
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"tref")?;

        let mut references = Vec::new();
        for child in ChildBoxes::new(data, 8, size) {
            let (reference_type, bytes) = child?;
            let mut track_ids = Vec::new();
            let mut offset = 8;
            while offset + 4 <= bytes.len() {
                track_ids.push(read_u32_be(bytes, offset)?);
                offset += 4;
            }
            references.push(TrackReference { reference_type, track_ids });
        }

        Ok((TrefBox { references }, size))
    }
}
