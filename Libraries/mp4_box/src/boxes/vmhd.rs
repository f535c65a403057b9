use crate::{format_fourcc, read_u16_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

/// The `VmhdBox` struct represents a Video Media Header Box (`vmhd`).
/// Present in the `minf` of every video track.
///
/// Fields:
/// - `flags`: Always 1 (no lean ahead).
/// - `graphicsmode`: Composition mode, 0 = copy.
/// - `opcolor`: Red, green and blue values used by some graphics modes.
#[derive(Clone, PartialEq)]
pub struct VmhdBox {
    pub version: u8,
    pub flags: u32,
    pub graphicsmode: u16,
    pub opcolor: [u16; 3],
}

impl Default for VmhdBox {
    fn default() -> Self {
        VmhdBox {
            version: 0,
            flags: 0x000001,
            graphicsmode: 0,
            opcolor: [0, 0, 0],
        }
    }
}

impl std::fmt::Debug for VmhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("flags", &format!("0x{:06X}", self.flags))
            .field("graphicsmode", &self.graphicsmode)
            .field("opcolor", &self.opcolor)
            .finish()
    }
}

impl Mp4Box for VmhdBox {
    fn box_type(&self) -> [u8; 4] { *b"vmhd" }

    fn box_size(&self) -> u32 {
        8 + 4 + 2 + 6 // header + version/flags + graphicsmode + opcolor (3*2)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&self.graphicsmode.to_be_bytes());
        for color in &self.opcolor {
            buffer.extend_from_slice(&color.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"vmhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;

        Ok((
            VmhdBox {
                version,
                flags,
                graphicsmode: read_u16_be(data, 12)?,
                opcolor: [read_u16_be(data, 14)?, read_u16_be(data, 16)?, read_u16_be(data, 18)?],
            },
            size,
        ))
    }
}
