use crate::{format_capped_bytes, format_fourcc, read_fourcc, read_u32_be, read_u64_be};

use super::generic::Mp4Box;

/// Size of an `mdat` header using the 64-bit `largesize` field.
pub const LARGE_HEADER_SIZE: u64 = 16;

// The `MdatBox` struct represents a Media Data Box.
// It holds the raw sample payloads; the sample tables in `moov` point into it
// by absolute file offset.
//
// Fields:
// - `data`: The payload bytes after the header.
#[derive(Default, Clone, PartialEq)]
pub struct MdatBox {
    pub data: Vec<u8>,
}

/// Writes an `mdat` header in the 64-bit form: size 1, type, largesize.
pub fn write_large_header(buffer: &mut Vec<u8>, total_size: u64) {
    buffer.extend_from_slice(&1u32.to_be_bytes());
    buffer.extend_from_slice(b"mdat");
    buffer.extend_from_slice(&total_size.to_be_bytes());
}

/// Reads a box header, resolving the 64-bit and to-end-of-data forms.
///
/// Returns `(box_type, header_size, total_size)`; `available` is the number
/// of bytes from the start of the box to the end of the enclosing data.
pub fn read_extended_header(data: &[u8], available: u64) -> Result<([u8; 4], u64, u64), String> {
    let size = read_u32_be(data, 0)? as u64;
    let box_type = read_fourcc(data, 4)?;
    let (header, total) = match size {
        0 => (8, available),
        1 => (LARGE_HEADER_SIZE, read_u64_be(data, 8)?),
        _ => (8, size),
    };
    if total < header {
        return Err(format!("Invalid {} box size {}", format_fourcc(&box_type), total));
    }
    Ok((box_type, header, total))
}

impl std::fmt::Debug for MdatBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdatBox")
            .field("payload_size", &self.data.len())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("data", &format_capped_bytes(&self.data))
            .finish()
    }
}

impl Mp4Box for MdatBox {
    fn box_type(&self) -> [u8; 4] { *b"mdat" }

    fn box_size(&self) -> u32 {
        8 + self.data.len() as u32
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        buffer.extend_from_slice(&self.data);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let (box_type, header, total) = read_extended_header(data, data.len() as u64)?;
        if &box_type != b"mdat" {
            return Err("Not an MDAT box".into());
        }
        if total > data.len() as u64 {
            return Err("Incomplete MDAT box".into());
        }

        Ok((
            MdatBox { data: data[header as usize..total as usize].to_vec() },
            total as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_header_is_resolved() {
        let mut buffer = Vec::new();
        write_large_header(&mut buffer, LARGE_HEADER_SIZE + 3);
        buffer.extend_from_slice(&[7, 8, 9]);

        let (parsed, consumed) = MdatBox::read_box(&buffer).unwrap();
        assert_eq!(consumed, 19);
        assert_eq!(parsed.data, vec![7, 8, 9]);
    }

    #[test]
    fn size_zero_extends_to_end() {
        let mut buffer = vec![0, 0, 0, 0];
        buffer.extend_from_slice(b"mdat");
        buffer.extend_from_slice(&[1, 2]);
        let (_, header, total) = read_extended_header(&buffer, buffer.len() as u64).unwrap();
        assert_eq!((header, total), (8, 10));
    }
}
