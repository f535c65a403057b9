use crate::{format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::{generic::{read_box_header, Mp4Box}, mvhd::UNITY_MATRIX};

/// Track is enabled.
pub const TRACK_ENABLED: u32 = 0x000001;
/// Track is used in the presentation.
pub const TRACK_IN_MOVIE: u32 = 0x000002;
/// Track is used when previewing the presentation.
pub const TRACK_IN_PREVIEW: u32 = 0x000004;

// The `TkhdBox` struct represents a Track Header Box.
// It identifies the track and carries its presentation properties.
//
// Fields:
// - `flags`: Combination of `TRACK_ENABLED`, `TRACK_IN_MOVIE`, `TRACK_IN_PREVIEW`.
// - `track_id`: Unique, non-zero id of the track within the movie.
// - `duration`: Track duration in *movie* timescale units, including edits.
// - `volume`: 8.8 fixed-point, 0x0100 for audio tracks and 0 otherwise.
// - `width`, `height`: 16.16 fixed-point visual size, 0 for non-visual tracks.
#[derive(Clone, PartialEq)]
pub struct TkhdBox {
    pub version: u8,
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: u16,
    pub alternate_group: u16,
    pub volume: u16,
    pub width: u32,
    pub height: u32,
}

impl Default for TkhdBox {
    fn default() -> Self {
        TkhdBox {
            version: 0,
            flags: TRACK_ENABLED | TRACK_IN_MOVIE | TRACK_IN_PREVIEW,
            creation_time: 0,
            modification_time: 0,
            track_id: 1,
            duration: 0,
            layer: 0,
            alternate_group: 0,
            volume: 0,
            width: 0,
            height: 0,
        }
    }
}

impl std::fmt::Debug for TkhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TkhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("flags", &format!("0x{:06X}", self.flags))
            .field("track_id", &self.track_id)
            .field("duration", &self.duration)
            .field("width", &format!("{} px", self.width >> 16))
            .field("height", &format!("{} px", self.height >> 16))
            .finish()
    }
}

impl Mp4Box for TkhdBox {
    fn box_type(&self) -> [u8; 4] { *b"tkhd" }

    // - 8 bytes header, 4 bytes version/flags.
    // - creation, modification, track id, reserved, duration (20 or 32 bytes).
    // - 60 bytes of fixed fields: reserved (8), layer, alternate group,
    //   volume, reserved (2 each), matrix (36), width and height (4 each).
    fn box_size(&self) -> u32 {
        let time_fields = if self.version == 1 { 8 + 8 + 4 + 4 + 8 } else { 4 + 4 + 4 + 4 + 4 };
        8 + 4 + time_fields + 60
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);

        if self.version == 1 {
            buffer.extend_from_slice(&self.creation_time.to_be_bytes());
            buffer.extend_from_slice(&self.modification_time.to_be_bytes());
            buffer.extend_from_slice(&self.track_id.to_be_bytes());
            buffer.extend_from_slice(&0u32.to_be_bytes()); // reserved
            buffer.extend_from_slice(&self.duration.to_be_bytes());
        } else {
            buffer.extend_from_slice(&(self.creation_time as u32).to_be_bytes());
            buffer.extend_from_slice(&(self.modification_time as u32).to_be_bytes());
            buffer.extend_from_slice(&self.track_id.to_be_bytes());
            buffer.extend_from_slice(&0u32.to_be_bytes()); // reserved
            buffer.extend_from_slice(&(self.duration as u32).to_be_bytes());
        }

        buffer.extend_from_slice(&0u64.to_be_bytes()); // reserved
        buffer.extend_from_slice(&self.layer.to_be_bytes());
        buffer.extend_from_slice(&self.alternate_group.to_be_bytes());
        buffer.extend_from_slice(&self.volume.to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes()); // reserved
        for value in UNITY_MATRIX {
            buffer.extend_from_slice(&value.to_be_bytes());
        }
        buffer.extend_from_slice(&self.width.to_be_bytes());
        buffer.extend_from_slice(&self.height.to_be_bytes());
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"tkhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;

        let (creation_time, modification_time, track_id, duration, mut offset) = if version == 1 {
            (
                read_u64_be(data, 12)?,
                read_u64_be(data, 20)?,
                read_u32_be(data, 28)?,
                read_u64_be(data, 36)?,
                44,
            )
        } else {
            (
                read_u32_be(data, 12)? as u64,
                read_u32_be(data, 16)? as u64,
                read_u32_be(data, 20)?,
                read_u32_be(data, 28)? as u64,
                32,
            )
        };

        offset += 8; // reserved
        let layer = read_u16_be(data, offset)?;
        let alternate_group = read_u16_be(data, offset + 2)?;
        let volume = read_u16_be(data, offset + 4)?;
        offset += 8 + 36; // reserved after volume, matrix

        let width = read_u32_be(data, offset)?;
        let height = read_u32_be(data, offset + 4)?;

        Ok((
            TkhdBox {
                version,
                flags,
                creation_time,
                modification_time,
                track_id,
                duration,
                layer,
                alternate_group,
                volume,
                width,
                height,
            },
            size,
        ))
    }
}
