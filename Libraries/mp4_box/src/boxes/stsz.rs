use crate::{format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

// The `StszBox` struct represents a Sample Size Box.
// When every sample has the same non-zero size it is stored once in
// `sample_size` and `entry_sizes` stays empty. Otherwise `sample_size` is 0
// and one size per sample follows.
#[derive(Default, Clone, PartialEq)]
pub struct StszBox {
    pub version: u8,
    pub flags: u32,
    pub sample_size: u32,
    pub sample_count: u32,
    pub entry_sizes: Vec<u32>,
}

impl StszBox {
    pub fn from_sizes(sizes: Vec<u32>) -> Self {
        let sample_count = sizes.len() as u32;
        let uniform = sizes.first().copied().filter(|first| *first != 0 && sizes.iter().all(|s| s == first));
        match uniform {
            Some(sample_size) => StszBox { version: 0, flags: 0, sample_size, sample_count, entry_sizes: Vec::new() },
            None => StszBox { version: 0, flags: 0, sample_size: 0, sample_count, entry_sizes: sizes },
        }
    }

    pub fn size_of(&self, index: usize) -> Option<u32> {
        if self.sample_size != 0 {
            (index < self.sample_count as usize).then_some(self.sample_size)
        } else {
            self.entry_sizes.get(index).copied()
        }
    }
}

impl std::fmt::Debug for StszBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StszBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("sample_size", &self.sample_size)
            .field("sample_count", &self.sample_count)
            .finish()
    }
}

impl Mp4Box for StszBox {
    fn box_type(&self) -> [u8; 4] { *b"stsz" }

    // 8 header + 4 version/flags + 4 sample_size + 4 sample_count + table
    fn box_size(&self) -> u32 {
        let table = if self.sample_size == 0 { self.entry_sizes.len() as u32 * 4 } else { 0 };
        8 + 4 + 4 + 4 + table
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&self.sample_size.to_be_bytes());
        buffer.extend_from_slice(&self.sample_count.to_be_bytes());
        if self.sample_size == 0 {
            for size in &self.entry_sizes {
                buffer.extend_from_slice(&size.to_be_bytes());
            }
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stsz")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let sample_size = read_u32_be(data, 12)?;
        let sample_count = read_u32_be(data, 16)?;

        let entry_sizes = if sample_size == 0 {
            (0..sample_count as usize)
                .map(|i| read_u32_be(data, 20 + i * 4))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok((StszBox { version, flags, sample_size, sample_count, entry_sizes }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_samples_keep_their_table() {
        let stsz = StszBox::from_sizes(vec![0, 0, 0]);
        assert_eq!(stsz.sample_size, 0);
        assert_eq!(stsz.entry_sizes.len(), 3);
        assert_eq!(stsz.size_of(2), Some(0));
        assert_eq!(stsz.size_of(3), None);
    }

    #[test]
    fn uniform_sizes_collapse() {
        let stsz = StszBox::from_sizes(vec![12, 12]);
        assert_eq!(stsz.sample_size, 12);
        assert!(stsz.entry_sizes.is_empty());
        assert_eq!(stsz.box_size(), 20);
        assert_eq!(stsz.size_of(1), Some(12));
    }
}
