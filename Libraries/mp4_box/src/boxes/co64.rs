use crate::{format_fourcc, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

// The `Co64Box` struct represents a 64-bit Chunk Offset Box.
#[derive(Default, Clone, PartialEq)]
pub struct Co64Box {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<u64>,
}

impl std::fmt::Debug for Co64Box {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Co64Box")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl Mp4Box for Co64Box {
    fn box_type(&self) -> [u8; 4] { *b"co64" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32 * 8)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for offset in &self.entries {
            buffer.extend_from_slice(&offset.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"co64")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)? as usize;

        let entries = (0..entry_count)
            .map(|i| read_u64_be(data, 16 + i * 8))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((Co64Box { version, flags, entries }, size))
    }
}
