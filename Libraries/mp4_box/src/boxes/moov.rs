use crate::format_fourcc;

use super::{
    generic::{read_box_header, write_child, ChildBoxes, Mp4Box},
    mvhd::MvhdBox,
    trak::TrakBox,
};

// The `MoovBox` struct represents a Movie Box.
// It is the index of the whole file: the movie header and one `trak` per
// track. The movie writer emits it after the media data, once every sample
// position is known.
#[derive(Default, Clone, PartialEq)]
pub struct MoovBox {
    pub mvhd: MvhdBox,
    pub traks: Vec<TrakBox>,
}

impl MoovBox {
    pub fn track(&self, track_id: u32) -> Option<&TrakBox> {
        self.traks.iter().find(|trak| trak.track_id() == track_id)
    }
}

impl std::fmt::Debug for MoovBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoovBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("mvhd", &self.mvhd)
            .field("traks", &self.traks)
            .finish()
    }
}

impl Mp4Box for MoovBox {
    fn box_type(&self) -> [u8; 4] { *b"moov" }

    fn box_size(&self) -> u32 {
        8 + self.mvhd.box_size() + self.traks.iter().map(|t| t.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.mvhd);
        for trak in &self.traks {
            write_child(buffer, trak);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"moov")?;

        let mut mvhd = None;
        let mut traks = Vec::new();
        for child in ChildBoxes::new(data, 8, size) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"mvhd" => mvhd = Some(MvhdBox::read_box(bytes)?.0),
                b"trak" => traks.push(TrakBox::read_box(bytes)?.0),
                _ => {}
            }
        }

        Ok((
            MoovBox {
                mvhd: mvhd.ok_or("Missing MVHD box inside MOOV")?,
                traks,
            },
            size,
        ))
    }
}
