use crate::{format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

/// The `StssBox` lists the 1-based numbers of the sync samples.
/// When the box is absent every sample is a sync sample.
#[derive(Default, Clone, PartialEq)]
pub struct StssBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<u32>,
}

impl std::fmt::Debug for StssBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StssBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl Mp4Box for StssBox {
    fn box_type(&self) -> [u8; 4] { *b"stss" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32 * 4)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for sample_number in &self.entries {
            buffer.extend_from_slice(&sample_number.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stss")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)? as usize;

        let entries = (0..entry_count)
            .map(|i| read_u32_be(data, 16 + i * 4))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((StssBox { version, flags, entries }, size))
    }
}
