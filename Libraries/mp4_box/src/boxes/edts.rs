use crate::format_fourcc;

use super::{elst::ElstBox, generic::{read_box_header, write_child, ChildBoxes, Mp4Box}};

// The `EdtsBox` struct represents an Edit Box (`edts`).
// It wraps the edit list that maps the track's media timeline onto the movie timeline.
#[derive(Default, Clone, PartialEq)]
pub struct EdtsBox {
    pub elst: Option<ElstBox>,
}

impl std::fmt::Debug for EdtsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdtsBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("elst", &self.elst)
            .finish()
    }
}

impl Mp4Box for EdtsBox {
    fn box_type(&self) -> [u8; 4] { *b"edts" }

    fn box_size(&self) -> u32 {
        8 + self.elst.as_ref().map_or(0, |elst| elst.box_size())
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        if let Some(elst) = &self.elst {
            write_child(buffer, elst);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"edts")?;

        let mut elst = None;
        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            if &box_type == b"elst" {
                elst = Some(ElstBox::read_box(bytes)?.0);
            }
        }

        Ok((EdtsBox { elst }, size))
    }
}
