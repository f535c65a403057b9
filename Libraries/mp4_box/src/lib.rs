//! # ISO Base Media / QuickTime movie boxes
//!
//! A movie file is a sequence of **boxes** (atoms). Every box starts with a
//! 32-bit big-endian size and a four character type, followed by a payload
//! that is either raw data or more boxes.
//!
//! ## Layout written by this library
//! 1. **File Type Box (`ftyp`)**: brand and compatibility information.
//! 2. **Media Data Box (`mdat`)**: sample payloads, appended while recording.
//!    The header uses the 64-bit `largesize` form so the box can grow past
//!    4 GiB and be patched once the final size is known.
//! 3. **Movie Box (`moov`)**: written last. Holds one `trak` per track with
//!    its sample table (`stbl`) describing where every sample lives in
//!    `mdat` and when it is presented.
//!
//! Timed metadata tracks use the QuickTime `mebx` sample entry. Its `keys`
//! box maps small local key ids to a namespaced key (`keyd`) and a data type
//! (`dtyp`); each metadata sample is then a list of `[size][local key id][value]`
//! items. A track reference of type `cdsc` ties a metadata track to the track
//! it describes.
//!
//! ## Modules
//! - `boxes`: one file per box type, all implementing [`boxes::generic::Mp4Box`].
//! - `writer`: [`writer::MovieWriter`], an incremental, non-fragmented writer.
//! - `reader`: in-memory box parsing and [`reader::MovieFile`], which indexes
//!   a file on disk and reads sample payloads on demand.
//! - `sample_table`: flattening of `stbl` into per-sample records.

pub mod boxes;
pub mod reader;
pub mod sample_table;
pub mod writer;

pub fn format_fourcc(fourcc: &[u8; 4]) -> String {
    std::str::from_utf8(fourcc).unwrap_or("????").to_string()
}

pub fn format_capped_bytes(data: &[u8]) -> String {
    let capped = &data[..data.len().min(8)];
    if data.len() > 8 {
        format!("{:?} ...", capped)
    } else {
        format!("{:?}", capped)
    }
}

pub fn read_u16_be(data: &[u8], offset: usize) -> Result<u16, String> {
    data.get(offset..offset + 2)
        .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
        .ok_or_else(|| format!("Out of bounds while reading u16 at {}", offset))
}

pub fn read_u32_be(data: &[u8], offset: usize) -> Result<u32, String> {
    data.get(offset..offset + 4)
        .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .ok_or_else(|| format!("Out of bounds while reading u32 at {}", offset))
}

pub fn read_u64_be(data: &[u8], offset: usize) -> Result<u64, String> {
    let bytes = data
        .get(offset..offset + 8)
        .ok_or_else(|| format!("Out of bounds while reading u64 at {}", offset))?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(raw))
}

pub fn read_fourcc(data: &[u8], offset: usize) -> Result<[u8; 4], String> {
    read_u32_be(data, offset).map(|value| value.to_be_bytes())
}

pub fn read_version_and_flags(data: &[u8], offset: usize) -> Result<(u8, u32), String> {
    let word = read_u32_be(data, offset)?;
    Ok(((word >> 24) as u8, word & 0x00FF_FFFF))
}

pub fn write_version_and_flags(buffer: &mut Vec<u8>, version: u8, flags: u32) {
    buffer.push(version);
    buffer.push(((flags >> 16) & 0xFF) as u8);
    buffer.push(((flags >> 8) & 0xFF) as u8);
    buffer.push((flags & 0xFF) as u8);
}

/// Converts `value` from one timescale to another, rounding down.
pub fn rescale(value: u64, from_timescale: u32, to_timescale: u32) -> u64 {
    if from_timescale == to_timescale || from_timescale == 0 {
        return value;
    }
    ((value as u128 * to_timescale as u128) / from_timescale as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_reads_fail_instead_of_panicking() {
        let data = [0u8, 1, 2];
        assert!(read_u32_be(&data, 0).is_err());
        assert_eq!(read_u16_be(&data, 1).unwrap(), 0x0102);
        assert!(read_u64_be(&data, 0).is_err());
    }

    #[test]
    fn version_and_flags_split() {
        let mut buffer = Vec::new();
        write_version_and_flags(&mut buffer, 1, 0x000007);
        assert_eq!(read_version_and_flags(&buffer, 0).unwrap(), (1, 7));
    }

    #[test]
    fn rescale_between_timescales() {
        assert_eq!(rescale(600, 600, 1000), 1000);
        assert_eq!(rescale(45, 90000, 600), 0);
        assert_eq!(rescale(90000, 90000, 600), 600);
    }
}
