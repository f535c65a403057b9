use crate::format_fourcc;

use super::{
    co64::Co64Box,
    generic::{read_box_header, write_child, ChildBoxes, Mp4Box},
    stco::StcoBox,
    stsc::StscBox,
    stsd::StsdBox,
    stss::StssBox,
    stsz::StszBox,
    stts::SttsBox,
};

// The `StblBox` struct represents a Sample Table Box.
// Together its children locate and time every sample of the track:
// - `stsd`: sample descriptions.
// - `stts`: sample durations (and therefore decode times).
// - `stss`: sync samples, absent when every sample is a sync sample.
// - `stsc`: grouping of samples into chunks.
// - `stsz`: sample sizes.
// - `stco` / `co64`: chunk file offsets (32 or 64 bit).
#[derive(Default, Clone, PartialEq)]
pub struct StblBox {
    pub stsd: StsdBox,
    pub stts: SttsBox,
    pub stss: Option<StssBox>,
    pub stsc: StscBox,
    pub stsz: StszBox,
    pub stco: Option<StcoBox>,
    pub co64: Option<Co64Box>,
}

impl std::fmt::Debug for StblBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StblBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("stsd", &self.stsd)
            .field("stts", &self.stts)
            .field("stss", &self.stss)
            .field("stsc", &self.stsc)
            .field("stsz", &self.stsz)
            .field("stco", &self.stco)
            .field("co64", &self.co64)
            .finish()
    }
}

impl Mp4Box for StblBox {
    fn box_type(&self) -> [u8; 4] { *b"stbl" }

    fn box_size(&self) -> u32 {
        8 + self.stsd.box_size()
            + self.stts.box_size()
            + self.stss.as_ref().map_or(0, |b| b.box_size())
            + self.stsc.box_size()
            + self.stsz.box_size()
            + self.stco.as_ref().map_or(0, |b| b.box_size())
            + self.co64.as_ref().map_or(0, |b| b.box_size())
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.stsd);
        write_child(buffer, &self.stts);
        if let Some(stss) = &self.stss {
            write_child(buffer, stss);
        }
        write_child(buffer, &self.stsc);
        write_child(buffer, &self.stsz);
        if let Some(stco) = &self.stco {
            write_child(buffer, stco);
        }
        if let Some(co64) = &self.co64 {
            write_child(buffer, co64);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stbl")?;

        let mut stsd = None;
        let mut stts = None;
        let mut stss = None;
        let mut stsc = None;
        let mut stsz = None;
        let mut stco = None;
        let mut co64 = None;

        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"stsd" => stsd = Some(StsdBox::read_box(bytes)?.0),
                b"stts" => stts = Some(SttsBox::read_box(bytes)?.0),
                b"stss" => stss = Some(StssBox::read_box(bytes)?.0),
                b"stsc" => stsc = Some(StscBox::read_box(bytes)?.0),
                b"stsz" => stsz = Some(StszBox::read_box(bytes)?.0),
                b"stco" => stco = Some(StcoBox::read_box(bytes)?.0),
                b"co64" => co64 = Some(Co64Box::read_box(bytes)?.0),
                // ctts, sgpd, sbgp and friends are not needed to locate samples
                _ => {}
            }
        }

        Ok((
            StblBox {
                stsd: stsd.ok_or("Missing STSD box")?,
                stts: stts.ok_or("Missing STTS box")?,
                stss,
                stsc: stsc.ok_or("Missing STSC box")?,
                stsz: stsz.ok_or("Missing STSZ box")?,
                stco,
                co64,
            },
            size,
        ))
    }
}
