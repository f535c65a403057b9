use crate::format_fourcc;

use super::{generic::{read_box_header, write_child, ChildBoxes, Mp4Box}, hdlr::HdlrBox, mdhd::MdhdBox, minf::MinfBox};

// The `MdiaBox` struct represents a Media Box.
// - `mdhd`: media timescale and duration.
// - `hdlr`: media handler (`vide`, `soun`, `meta`).
// - `minf`: media header and sample table.
#[derive(Default, Clone, PartialEq)]
pub struct MdiaBox {
    pub mdhd: MdhdBox,
    pub hdlr: HdlrBox,
    pub minf: MinfBox,
}

impl std::fmt::Debug for MdiaBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdiaBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("mdhd", &self.mdhd)
            .field("hdlr", &self.hdlr)
            .field("minf", &self.minf)
            .finish()
    }
}

impl Mp4Box for MdiaBox {
    fn box_type(&self) -> [u8; 4] { *b"mdia" }

    fn box_size(&self) -> u32 {
        8 + self.mdhd.box_size() + self.hdlr.box_size() + self.minf.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.mdhd);
        write_child(buffer, &self.hdlr);
        write_child(buffer, &self.minf);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"mdia")?;

        let mut mdhd = None;
        let mut hdlr = None;
        let mut minf = None;

        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"mdhd" => mdhd = Some(MdhdBox::read_box(bytes)?.0),
                b"hdlr" => hdlr = Some(HdlrBox::read_box(bytes)?.0),
                b"minf" => minf = Some(MinfBox::read_box(bytes)?.0),
                _ => {}
            }
        }

        Ok((
            MdiaBox {
                mdhd: mdhd.ok_or("Missing MDHD box inside MDIA")?,
                hdlr: hdlr.ok_or("Missing HDLR box inside MDIA")?,
                minf: minf.ok_or("Missing MINF box inside MDIA")?,
            },
            size,
        ))
    }
}
