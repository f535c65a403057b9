use crate::{format_fourcc, read_fourcc, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

pub const HANDLER_VIDEO: [u8; 4] = *b"vide";
pub const HANDLER_SOUND: [u8; 4] = *b"soun";
pub const HANDLER_METADATA: [u8; 4] = *b"meta";

// The `HdlrBox` struct represents a Handler Reference Box.
// - `handler_type`: Media type of the track (`vide`, `soun`, `meta`).
// - `name`: Null-terminated, human-readable handler name.
#[derive(Clone, PartialEq)]
pub struct HdlrBox {
    pub version: u8,
    pub flags: u32,
    pub handler_type: [u8; 4],
    pub name: String,
}

impl Default for HdlrBox {
    fn default() -> Self {
        HdlrBox {
            version: 0,
            flags: 0,
            handler_type: HANDLER_VIDEO,
            name: "VideoHandler".to_string(),
        }
    }
}

impl std::fmt::Debug for HdlrBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdlrBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("handler_type", &format_fourcc(&self.handler_type))
            .field("name", &self.name)
            .finish()
    }
}

impl Mp4Box for HdlrBox {
    fn box_type(&self) -> [u8; 4] { *b"hdlr" }

    // 8 header + 4 version/flags + 4 pre_defined + 4 handler type
    // + 12 reserved + name + null terminator.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + 4 + 12 + (self.name.len() as u32 + 1)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
        buffer.extend_from_slice(&self.handler_type);
        buffer.extend_from_slice(&[0u8; 12]); // reserved
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.push(0);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"hdlr")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let handler_type = read_fourcc(data, 16)?;

        let name_start = 32.min(size);
        let name_end = data[name_start..]
            .iter()
            .position(|&b| b == 0)
            .map(|pos| name_start + pos)
            .unwrap_or(size);
        let name = String::from_utf8_lossy(&data[name_start..name_end]).to_string();

        Ok((
            HdlrBox {
                version,
                flags,
                handler_type,
                name,
            },
            size,
        ))
    }
}
