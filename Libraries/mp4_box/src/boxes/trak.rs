use crate::format_fourcc;

use super::{
    edts::EdtsBox,
    generic::{read_box_header, write_child, ChildBoxes, Mp4Box},
    mdia::MdiaBox,
    tkhd::TkhdBox,
    tref::TrefBox,
};

// The `TrakBox` struct represents a Track Box.
//
// Fields:
// - `tkhd`: Track header (id, duration, dimensions).
// - `tref`: (Optional) References to other tracks, e.g. `cdsc` for metadata.
// - `edts`: (Optional) Edit list placing the media on the movie timeline.
// - `mdia`: Media information and sample table.
#[derive(Default, Clone, PartialEq)]
pub struct TrakBox {
    pub tkhd: TkhdBox,
    pub tref: Option<TrefBox>,
    pub edts: Option<EdtsBox>,
    pub mdia: MdiaBox,
}

impl TrakBox {
    pub fn track_id(&self) -> u32 {
        self.tkhd.track_id
    }

    pub fn handler_type(&self) -> [u8; 4] {
        self.mdia.hdlr.handler_type
    }
}

impl std::fmt::Debug for TrakBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrakBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("tkhd", &self.tkhd)
            .field("tref", &self.tref)
            .field("edts", &self.edts)
            .field("mdia", &self.mdia)
            .finish()
    }
}

impl Mp4Box for TrakBox {
    fn box_type(&self) -> [u8; 4] { *b"trak" }

    fn box_size(&self) -> u32 {
        8 + self.tkhd.box_size()
            + self.tref.as_ref().map_or(0, |b| b.box_size())
            + self.edts.as_ref().map_or(0, |b| b.box_size())
            + self.mdia.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.tkhd);
        if let Some(tref) = &self.tref {
            write_child(buffer, tref);
        }
        if let Some(edts) = &self.edts {
            write_child(buffer, edts);
        }
        write_child(buffer, &self.mdia);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"trak")?;

        let mut tkhd = None;
        let mut tref = None;
        let mut edts = None;
        let mut mdia = None;

        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"tkhd" => {
                    if tkhd.is_some() {
                        return Err("Duplicate TKHD box inside TRAK".into());
                    }
                    tkhd = Some(TkhdBox::read_box(bytes)?.0);
                }
                b"tref" => tref = Some(TrefBox::read_box(bytes)?.0),
                b"edts" => edts = Some(EdtsBox::read_box(bytes)?.0),
                b"mdia" => {
                    if mdia.is_some() {
                        return Err("Duplicate MDIA box inside TRAK".into());
                    }
                    mdia = Some(MdiaBox::read_box(bytes)?.0);
                }
                _ => {
                    // Skip unknown boxes safely
                }
            }
        }

        Ok((
            TrakBox {
                tkhd: tkhd.ok_or("Missing required TKHD box inside TRAK")?,
                tref,
                edts,
                mdia: mdia.ok_or("Missing required MDIA box inside TRAK")?,
            },
            size,
        ))
    }
}
