use crate::{format_fourcc, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

/// The `NmhdBox` represents the Null Media Header Box.
/// Used by tracks without a dedicated media header, such as timed metadata.
#[derive(Default, Clone, PartialEq)]
pub struct NmhdBox {
    pub version: u8,
    pub flags: u32,
}

impl std::fmt::Debug for NmhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .finish()
    }
}

impl Mp4Box for NmhdBox {
    fn box_type(&self) -> [u8; 4] { *b"nmhd" }

    fn box_size(&self) -> u32 {
        8 + 4
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"nmhd")?;
        let (version, flags) = read_version_and_flags(data, 8)?;
        Ok((NmhdBox { version, flags }, size))
    }
}
