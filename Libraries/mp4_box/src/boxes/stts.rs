use crate::{format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

// The `SttsBox` struct represents a Time-to-Sample Box.
// Decode times are not stored directly: the table run-length encodes sample
// durations, and the decode time of sample `n` is the sum of the durations
// of the samples before it.
#[derive(Default, Clone, PartialEq)]
pub struct SttsBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SttsEntry>,
}

#[derive(Default, Clone, PartialEq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

impl SttsBox {
    /// Builds the table from per-sample durations, merging equal neighbours.
    pub fn from_durations(durations: impl IntoIterator<Item = u32>) -> Self {
        let mut entries: Vec<SttsEntry> = Vec::new();
        for delta in durations {
            match entries.last_mut() {
                Some(last) if last.sample_delta == delta => last.sample_count += 1,
                _ => entries.push(SttsEntry { sample_count: 1, sample_delta: delta }),
            }
        }
        SttsBox { version: 0, flags: 0, entries }
    }

    pub fn sample_count(&self) -> u64 {
        self.entries.iter().map(|e| e.sample_count as u64).sum()
    }
}

impl std::fmt::Debug for SttsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttsBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for SttsEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttsEntry")
            .field("sample_count", &self.sample_count)
            .field("sample_delta", &self.sample_delta)
            .finish()
    }
}

impl Mp4Box for SttsBox {
    fn box_type(&self) -> [u8; 4] { *b"stts" }

    // 8 header + 4 version/flags + 4 entry_count + 8 per entry
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32 * 8)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.sample_count.to_be_bytes());
            buffer.extend_from_slice(&entry.sample_delta.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stts")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)?;

        let mut entries = Vec::new();
        let mut offset = 16;
        for _ in 0..entry_count {
            entries.push(SttsEntry {
                sample_count: read_u32_be(data, offset)?,
                sample_delta: read_u32_be(data, offset + 4)?,
            });
            offset += 8;
        }

        Ok((SttsBox { version, flags, entries }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_run_length_encoded() {
        let stts = SttsBox::from_durations([20, 20, 20, 40, 20]);
        let runs: Vec<_> = stts.entries.iter().map(|e| (e.sample_count, e.sample_delta)).collect();
        assert_eq!(runs, vec![(3, 20), (1, 40), (1, 20)]);
        assert_eq!(stts.sample_count(), 5);

        let mut buffer = Vec::new();
        stts.write_box(&mut buffer);
        assert_eq!(read_u32_be(&buffer, 12).unwrap(), 3);
        assert_eq!(SttsBox::read_box(&buffer).unwrap().0, stts);
    }
}
