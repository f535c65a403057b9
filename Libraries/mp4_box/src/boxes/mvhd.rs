use crate::{format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

/// Identity transformation matrix shared by `mvhd` and `tkhd`.
/// Entries are 16.16 fixed point except the last column (2.30).
pub const UNITY_MATRIX: [u32; 9] = [
    0x0001_0000, 0, 0,
    0, 0x0001_0000, 0,
    0, 0, 0x4000_0000,
];

// The `MvhdBox` struct represents a Movie Header Box.
// It holds movie-wide timing: the movie timescale (units per second) that
// track durations and edit lists are expressed in, and the overall duration.
//
// Fields:
// - `version`: 0 stores times in 32 bits, 1 in 64 bits.
// - `timescale`: Movie time units per second.
// - `duration`: Length of the longest track, in movie timescale units.
// - `rate`: 16.16 fixed-point preferred playback rate (1.0 = `0x00010000`).
// - `volume`: 8.8 fixed-point preferred volume (1.0 = `0x0100`).
// - `next_track_id`: One past the largest track id in use.
#[derive(Clone, PartialEq)]
pub struct MvhdBox {
    pub version: u8,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub rate: u32,
    pub volume: u16,
    pub next_track_id: u32,
}

impl Default for MvhdBox {
    fn default() -> Self {
        MvhdBox {
            version: 0,
            creation_time: 0,
            modification_time: 0,
            timescale: 600,
            duration: 0,
            rate: 0x00010000,
            volume: 0x0100,
            next_track_id: 1,
        }
    }
}

impl std::fmt::Debug for MvhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("timescale", &self.timescale)
            .field("duration", &self.duration)
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("next_track_id", &self.next_track_id)
            .finish()
    }
}

impl Mp4Box for MvhdBox {
    fn box_type(&self) -> [u8; 4] { *b"mvhd" }

    fn box_size(&self) -> u32 {
        let time_fields_size = if self.version == 1 { 28 } else { 16 };
        8 + 4 + time_fields_size + 80 // header + version/flags + time fields + rest
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, 0);

        if self.version == 1 {
            buffer.extend_from_slice(&self.creation_time.to_be_bytes());
            buffer.extend_from_slice(&self.modification_time.to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&self.duration.to_be_bytes());
        } else {
            buffer.extend_from_slice(&(self.creation_time as u32).to_be_bytes());
            buffer.extend_from_slice(&(self.modification_time as u32).to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&(self.duration as u32).to_be_bytes());
        }

        buffer.extend_from_slice(&self.rate.to_be_bytes());
        buffer.extend_from_slice(&self.volume.to_be_bytes());
        buffer.extend_from_slice(&[0; 10]); // reserved
        for value in UNITY_MATRIX {
            buffer.extend_from_slice(&value.to_be_bytes());
        }
        buffer.extend_from_slice(&[0; 24]); // pre_defined
        buffer.extend_from_slice(&self.next_track_id.to_be_bytes());
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"mvhd")?;
        let data = &data[..size];
        let (version, _) = read_version_and_flags(data, 8)?;

        let (creation_time, modification_time, timescale, duration, mut offset) = match version {
            1 => (
                read_u64_be(data, 12)?,
                read_u64_be(data, 20)?,
                read_u32_be(data, 28)?,
                read_u64_be(data, 32)?,
                40,
            ),
            0 => (
                read_u32_be(data, 12)? as u64,
                read_u32_be(data, 16)? as u64,
                read_u32_be(data, 20)?,
                read_u32_be(data, 24)? as u64,
                28,
            ),
            _ => return Err(format!("Unsupported MVHD version {}", version)),
        };

        let rate = read_u32_be(data, offset)?;
        let volume = read_u16_be(data, offset + 4)?;
        // volume + reserved (10) + matrix (36) + pre_defined (24)
        offset += 4 + 2 + 10 + 36 + 24;
        let next_track_id = read_u32_be(data, offset)?;

        Ok((
            MvhdBox {
                version,
                creation_time,
                modification_time,
                timescale,
                duration,
                rate,
                volume,
                next_track_id,
            },
            size,
        ))
    }
}
