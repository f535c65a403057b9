use crate::format_fourcc;

use super::{dref::DrefBox, generic::{read_box_header, write_child, ChildBoxes, Mp4Box}};

// The `DinfBox` struct represents a Data Information Box.
// It only wraps the data reference table (`dref`).
#[derive(Default, Clone, PartialEq)]
pub struct DinfBox {
    pub dref: DrefBox,
}

impl std::fmt::Debug for DinfBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DinfBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("dref", &self.dref)
            .finish()
    }
}

impl Mp4Box for DinfBox {
    fn box_type(&self) -> [u8; 4] { *b"dinf" }

    fn box_size(&self) -> u32 {
        8 + self.dref.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.dref);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"dinf")?;

        let mut dref = None;
        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            if &box_type == b"dref" {
                dref = Some(DrefBox::read_box(bytes)?.0);
            }
        }

        Ok((DinfBox { dref: dref.ok_or("Missing DREF box inside DINF")? }, size))
    }
}
