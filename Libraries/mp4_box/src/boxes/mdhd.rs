use crate::{format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::{read_box_header, Mp4Box};

// The `MdhdBox` struct represents a Media Header Box.
// It carries the media timescale that every sample time and duration in the
// track's sample table is expressed in.
//
// Fields:
// - `timescale`: Media time units per second.
// - `duration`: Sum of all sample durations, in media timescale units.
// - `language`: ISO 639-2/T code, e.g. "und".
#[derive(Clone, PartialEq)]
pub struct MdhdBox {
    pub version: u8,
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub language: String,
}

impl Default for MdhdBox {
    fn default() -> Self {
        MdhdBox {
            version: 0,
            flags: 0,
            creation_time: 0,
            modification_time: 0,
            timescale: 600,
            duration: 0,
            language: "und".to_string(),
        }
    }
}

impl std::fmt::Debug for MdhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("timescale", &self.timescale)
            .field("duration", &self.duration)
            .field("language", &self.language)
            .finish()
    }
}

impl Mp4Box for MdhdBox {
    fn box_type(&self) -> [u8; 4] { *b"mdhd" }

    fn box_size(&self) -> u32 {
        let times = if self.version == 1 { 8 + 8 + 4 + 8 } else { 4 + 4 + 4 + 4 };
        8 + 4 + times + 4 // + language (2) + pre_defined (2)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);

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

        buffer.extend_from_slice(&encode_language(&self.language).to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"mdhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;

        let (creation_time, modification_time, timescale, duration, offset) = if version == 1 {
            (
                read_u64_be(data, 12)?,
                read_u64_be(data, 20)?,
                read_u32_be(data, 28)?,
                read_u64_be(data, 32)?,
                40,
            )
        } else {
            (
                read_u32_be(data, 12)? as u64,
                read_u32_be(data, 16)? as u64,
                read_u32_be(data, 20)?,
                read_u32_be(data, 24)? as u64,
                28,
            )
        };

        let language = decode_language(read_u16_be(data, offset)?);

        Ok((
            MdhdBox {
                version,
                flags,
                creation_time,
                modification_time,
                timescale,
                duration,
                language,
            },
            size,
        ))
    }
}

/// Packs a three letter ISO 639-2/T code into 15 bits.
/// Anything that is not three lowercase letters packs as "und".
fn encode_language(lang: &str) -> u16 {
    let bytes = lang.as_bytes();
    let valid = bytes.len() == 3 && bytes.iter().all(|b| b.is_ascii_lowercase());
    let bytes = if valid { bytes } else { b"und".as_slice() };
    (((bytes[0] - 0x60) as u16) << 10) | (((bytes[1] - 0x60) as u16) << 5) | ((bytes[2] - 0x60) as u16)
}

fn decode_language(code: u16) -> String {
    let mut lang = String::new();
    lang.push((((code >> 10) & 0x1F) + 0x60) as u8 as char);
    lang.push((((code >> 5) & 0x1F) + 0x60) as u8 as char);
    lang.push(((code & 0x1F) + 0x60) as u8 as char);
    lang
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_packing() {
        assert_eq!(encode_language("und"), 0x55C4);
        assert_eq!(decode_language(0x55C4), "und");
        assert_eq!(encode_language("English"), 0x55C4);
    }
}
