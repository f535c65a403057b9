use crate::format_fourcc;

use super::{
    dinf::DinfBox,
    generic::{read_box_header, write_child, ChildBoxes, Mp4Box},
    nmhd::NmhdBox,
    smhd::SmhdBox,
    stbl::StblBox,
    vmhd::VmhdBox,
};

// The `MinfBox` struct represents a Media Information Box.
// Exactly one media header is present, chosen by the track's handler:
// - `vmhd` for video, `smhd` for sound, `nmhd` for timed metadata.
// It also contains the data references (`dinf`) and the sample table (`stbl`).
#[derive(Default, Clone, PartialEq)]
pub struct MinfBox {
    pub vmhd: Option<VmhdBox>,
    pub smhd: Option<SmhdBox>,
    pub nmhd: Option<NmhdBox>,
    pub dinf: DinfBox,
    pub stbl: StblBox,
}

impl std::fmt::Debug for MinfBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("MinfBox");
        dbg.field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()));
        if let Some(vmhd) = &self.vmhd {
            dbg.field("vmhd", vmhd);
        }
        if let Some(smhd) = &self.smhd {
            dbg.field("smhd", smhd);
        }
        if let Some(nmhd) = &self.nmhd {
            dbg.field("nmhd", nmhd);
        }
        dbg.field("dinf", &self.dinf).field("stbl", &self.stbl).finish()
    }
}

impl Mp4Box for MinfBox {
    fn box_type(&self) -> [u8; 4] { *b"minf" }

    fn box_size(&self) -> u32 {
        8 + self.vmhd.as_ref().map_or(0, |b| b.box_size())
            + self.smhd.as_ref().map_or(0, |b| b.box_size())
            + self.nmhd.as_ref().map_or(0, |b| b.box_size())
            + self.dinf.box_size()
            + self.stbl.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        if let Some(vmhd) = &self.vmhd {
            write_child(buffer, vmhd);
        }
        if let Some(smhd) = &self.smhd {
            write_child(buffer, smhd);
        }
        if let Some(nmhd) = &self.nmhd {
            write_child(buffer, nmhd);
        }
        write_child(buffer, &self.dinf);
        write_child(buffer, &self.stbl);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"minf")?;

        let mut minf = MinfBox::default();
        let mut stbl = None;
        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"vmhd" => minf.vmhd = Some(VmhdBox::read_box(bytes)?.0),
                b"smhd" => minf.smhd = Some(SmhdBox::read_box(bytes)?.0),
                b"nmhd" => minf.nmhd = Some(NmhdBox::read_box(bytes)?.0),
                b"dinf" => minf.dinf = DinfBox::read_box(bytes)?.0,
                b"stbl" => stbl = Some(StblBox::read_box(bytes)?.0),
                _ => {}
            }
        }
        minf.stbl = stbl.ok_or("Missing STBL box inside MINF")?;

        Ok((minf, size))
    }
}
