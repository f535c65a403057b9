use crate::{format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

/// `media_time` value of an empty edit (a gap in the presentation).
pub const EMPTY_EDIT: i64 = -1;

/// The `ElstBox` struct represents an Edit List Box (`elst`).
/// It maps the media timeline onto the movie timeline. A leading empty edit
/// delays the start of a track whose first sample is presented after zero.
///
/// Fields:
/// - `version`: 0 for 32-bit entries, 1 for 64-bit entries.
/// - `entries`: Edit segments, played back in order.
#[derive(Default, Clone, PartialEq)]
pub struct ElstBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<ElstEntry>,
}

/// One edit segment.
///
/// `segment_duration` is in movie timescale units, `media_time` in media
/// timescale units (or [`EMPTY_EDIT`]).
#[derive(Default, Clone, PartialEq)]
pub struct ElstEntry {
    pub segment_duration: u64,
    pub media_time: i64,
    pub media_rate: i16,
    pub media_rate_fraction: i16,
}

impl ElstEntry {
    pub fn empty(segment_duration: u64) -> Self {
        ElstEntry { segment_duration, media_time: EMPTY_EDIT, media_rate: 1, media_rate_fraction: 0 }
    }

    pub fn normal(segment_duration: u64, media_time: i64) -> Self {
        ElstEntry { segment_duration, media_time, media_rate: 1, media_rate_fraction: 0 }
    }

    pub fn is_empty_edit(&self) -> bool {
        self.media_time == EMPTY_EDIT
    }
}

impl ElstBox {
    /// Builds an edit list, picking version 1 only when a value needs 64 bits.
    pub fn with_entries(entries: Vec<ElstEntry>) -> Self {
        let needs_64 = entries.iter().any(|e| {
            e.segment_duration > u32::MAX as u64 || e.media_time > i32::MAX as i64
        });
        ElstBox { version: if needs_64 { 1 } else { 0 }, flags: 0, entries }
    }
}

impl std::fmt::Debug for ElstBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElstBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for ElstEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElstEntry")
            .field("segment_duration", &self.segment_duration)
            .field("media_time", &self.media_time)
            .field("media_rate", &self.media_rate)
            .finish()
    }
}

impl Mp4Box for ElstBox {
    fn box_type(&self) -> [u8; 4] { *b"elst" }

    fn box_size(&self) -> u32 {
        let entry_size = if self.version == 1 { 20 } else { 12 };
        8 + 4 + 4 + (self.entries.len() as u32 * entry_size)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in &self.entries {
            if self.version == 1 {
                buffer.extend_from_slice(&entry.segment_duration.to_be_bytes());
                buffer.extend_from_slice(&entry.media_time.to_be_bytes());
            } else {
                buffer.extend_from_slice(&(entry.segment_duration as u32).to_be_bytes());
                buffer.extend_from_slice(&(entry.media_time as i32).to_be_bytes());
            }
            buffer.extend_from_slice(&entry.media_rate.to_be_bytes());
            buffer.extend_from_slice(&entry.media_rate_fraction.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"elst")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)?;

        let mut entries = Vec::new();
        let mut offset = 16;
        for _ in 0..entry_count {
            let (segment_duration, media_time) = if version == 1 {
                let values = (read_u64_be(data, offset)?, read_u64_be(data, offset + 8)? as i64);
                offset += 16;
                values
            } else {
                let values = (read_u32_be(data, offset)? as u64, read_u32_be(data, offset + 4)? as i32 as i64);
                offset += 8;
                values
            };
            let media_rate = read_u16_be(data, offset)? as i16;
            let media_rate_fraction = read_u16_be(data, offset + 2)? as i16;
            offset += 4;
            entries.push(ElstEntry { segment_duration, media_time, media_rate, media_rate_fraction });
        }

        Ok((ElstBox { version, flags, entries }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_edit_survives_version_zero() {
        let elst = ElstBox::with_entries(vec![ElstEntry::empty(300), ElstEntry::normal(1200, 0)]);
        assert_eq!(elst.version, 0);

        let mut buffer = Vec::new();
        elst.write_box(&mut buffer);
        assert_eq!(buffer.len(), elst.box_size() as usize);

        let (parsed, _) = ElstBox::read_box(&buffer).unwrap();
        assert!(parsed.entries[0].is_empty_edit());
        assert_eq!(parsed.entries[1].media_time, 0);
        assert_eq!(parsed, elst);
    }
}
