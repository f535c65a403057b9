use crate::{format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

// The `StscBox` struct represents a Sample-to-Chunk Box.
// Each entry starts a run of chunks (from `first_chunk`, 1-based) that all
// hold `samples_per_chunk` samples described by `sample_description_index`.
// The run lasts until the next entry's `first_chunk`.
#[derive(Clone, PartialEq)]
pub struct StscBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<StscEntry>,
}

#[derive(Clone, PartialEq)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

// One sample per chunk, first description. This is the layout the movie
// writer produces.
impl Default for StscBox {
    fn default() -> Self {
        StscBox {
            version: 0,
            flags: 0,
            entries: vec![StscEntry::default()],
        }
    }
}

impl Default for StscEntry {
    fn default() -> Self {
        StscEntry {
            first_chunk: 1,
            samples_per_chunk: 1,
            sample_description_index: 1,
        }
    }
}

impl std::fmt::Debug for StscBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StscBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for StscEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StscEntry")
            .field("first_chunk", &self.first_chunk)
            .field("samples_per_chunk", &self.samples_per_chunk)
            .field("sample_description_index", &self.sample_description_index)
            .finish()
    }
}

impl Mp4Box for StscBox {
    fn box_type(&self) -> [u8; 4] { *b"stsc" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32 * 12)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.first_chunk.to_be_bytes());
            buffer.extend_from_slice(&entry.samples_per_chunk.to_be_bytes());
            buffer.extend_from_slice(&entry.sample_description_index.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stsc")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)?;

        let mut entries = Vec::new();
        let mut offset = 16;
        for _ in 0..entry_count {
            entries.push(StscEntry {
                first_chunk: read_u32_be(data, offset)?,
                samples_per_chunk: read_u32_be(data, offset + 4)?,
                sample_description_index: read_u32_be(data, offset + 8)?,
            });
            offset += 12;
        }

        Ok((StscBox { version, flags, entries }, size))
    }
}
