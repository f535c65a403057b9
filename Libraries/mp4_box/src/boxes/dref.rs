use crate::{format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, ChildBoxes, Mp4Box};

/// `url ` flag meaning the media data lives in the same file.
pub const SELF_CONTAINED: u32 = 0x000001;

// The `DrefBox` struct represents a Data Reference Box.
// Sample entries point into this table through their `data_reference_index`.
// Every movie written by this library keeps its samples in the same file, so
// the default table holds a single self-contained `url ` entry.
#[derive(Clone, PartialEq)]
pub struct DrefBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<DataEntryUrlBox>,
}

// The `DataEntryUrlBox` struct represents a `url ` data entry.
// With the `SELF_CONTAINED` flag set it carries no location string.
#[derive(Clone, PartialEq)]
pub struct DataEntryUrlBox {
    pub version: u8,
    pub flags: u32,
    pub location: Option<String>,
}

impl Default for DrefBox {
    fn default() -> Self {
        DrefBox {
            version: 0,
            flags: 0,
            entries: vec![DataEntryUrlBox::default()],
        }
    }
}

impl Default for DataEntryUrlBox {
    fn default() -> Self {
        DataEntryUrlBox {
            version: 0,
            flags: SELF_CONTAINED,
            location: None,
        }
    }
}

impl std::fmt::Debug for DrefBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrefBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for DataEntryUrlBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("DataEntryUrlBox");
        dbg.field("flags", &format!("0x{:06X}", self.flags));
        if let Some(loc) = &self.location {
            dbg.field("location", loc);
        }
        dbg.finish()
    }
}

impl Mp4Box for DrefBox {
    fn box_type(&self) -> [u8; 4] { *b"dref" }

    // 8 header + 4 version/flags + 4 entry count + entries.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + self.entries.iter().map(|e| e.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            entry.write_box(buffer);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"dref")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)? as usize;

        let mut entries = Vec::new();
        for child in ChildBoxes::new(data, 16, size).take(entry_count) {
            let (box_type, bytes) = child?;
            if &box_type != b"url " {
                return Err(format!("Unsupported data entry box {}", format_fourcc(&box_type)));
            }
            let (version, flags) = read_version_and_flags(bytes, 8)?;
            let location = (bytes.len() > 12).then(|| {
                String::from_utf8_lossy(&bytes[12..]).trim_end_matches('\0').to_string()
            });
            entries.push(DataEntryUrlBox { version, flags, location });
        }

        Ok((DrefBox { version, flags, entries }, size))
    }
}

impl DataEntryUrlBox {
    fn box_size(&self) -> u32 {
        12 + self.location.as_ref().map_or(0, |loc| loc.len() as u32 + 1)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(b"url ");
        write_version_and_flags(buffer, self.version, self.flags);
        if let Some(location) = &self.location {
            buffer.extend_from_slice(location.as_bytes());
            buffer.push(0);
        }
    }
}
