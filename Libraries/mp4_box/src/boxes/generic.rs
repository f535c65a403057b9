use crate::{format_capped_bytes, format_fourcc, read_fourcc, read_u32_be};

// The `Mp4Box` trait defines a generic interface for movie boxes.
// Each box has a specific type, size, and content, and this trait provides
// methods to interact with these properties.
//
// Required Methods:
// - `box_type`: Returns the 4-byte type identifier of the box.
// - `box_size`: Calculates the total size of the box in bytes, including the header.
// - `write_box`: Serializes the box into a buffer for writing to a file or stream.
// - `read_box`: Parses the box from the start of a byte slice.
pub trait Mp4Box {
    // Returns the 4-byte type identifier of the box.
    fn box_type(&self) -> [u8; 4];

    // Calculates the total size of the box in bytes.
    // The size includes the header (8 bytes: 4 bytes for size and 4 bytes for type)
    // and the size of the box's content.
    fn box_size(&self) -> u32;

    // Serializes the box into the provided buffer.
    fn write_box(&self, buffer: &mut Vec<u8>);

    /// Reads a box from the given byte slice.
    /// Returns a tuple of (BoxInstance, bytes_consumed).
    fn read_box(data: &[u8]) -> Result<(Self, usize), String> where Self: Sized;
}

/// Validates the compact header at the start of `data` and returns the box size.
///
/// Fails when the slice is shorter than the declared size, the size is smaller
/// than a header, or the type does not match `expected`.
pub fn read_box_header(data: &[u8], expected: &[u8; 4]) -> Result<usize, String> {
    let size = read_u32_be(data, 0)? as usize;
    let box_type = read_fourcc(data, 4)?;
    if &box_type != expected {
        return Err(format!(
            "Expected {} box, found {}",
            format_fourcc(expected),
            format_fourcc(&box_type)
        ));
    }
    if size < 8 {
        return Err(format!("Invalid {} box size {}", format_fourcc(expected), size));
    }
    if data.len() < size {
        return Err(format!(
            "Incomplete {} box: declared {} bytes, have {}",
            format_fourcc(expected),
            size,
            data.len()
        ));
    }
    Ok(size)
}

/// Writes a child box and checks that it produced exactly `box_size` bytes.
pub fn write_child<B: Mp4Box + ?Sized>(buffer: &mut Vec<u8>, child: &B) {
    let start = buffer.len();
    child.write_box(buffer);
    debug_assert_eq!(
        buffer.len() - start,
        child.box_size() as usize,
        "Error writing {} box",
        format_fourcc(&child.box_type())
    );
}

/// Iterates over the child boxes stored in `data[offset..end]`.
///
/// Each item is the child's type together with its full bytes (header
/// included). A malformed child header ends the iteration with an error.
pub struct ChildBoxes<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> ChildBoxes<'a> {
    pub fn new(data: &'a [u8], offset: usize, end: usize) -> Self {
        ChildBoxes { data, offset, end: end.min(data.len()) }
    }
}

impl<'a> Iterator for ChildBoxes<'a> {
    type Item = Result<([u8; 4], &'a [u8]), String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + 8 > self.end {
            return None;
        }
        let header = read_u32_be(self.data, self.offset)
            .and_then(|size| read_fourcc(self.data, self.offset + 4).map(|t| (size as usize, t)));
        let (size, box_type) = match header {
            Ok(header) => header,
            Err(e) => {
                self.offset = self.end;
                return Some(Err(e));
            }
        };
        if size < 8 || self.offset + size > self.end {
            self.offset = self.end;
            return Some(Err(format!(
                "Invalid child box size {} for {}",
                size,
                format_fourcc(&box_type)
            )));
        }
        let child = &self.data[self.offset..self.offset + size];
        self.offset += size;
        Some(Ok((box_type, child)))
    }
}

// The `UnknownBox` struct represents a box that is carried through untouched.
// Codec configuration boxes inside sample entries (e.g. `avcC`, `esds`) and any
// box type this library does not model end up here.
//
// Fields:
// - `btype`: The 4-byte box type.
// - `data`: The raw payload after the header.
#[derive(Clone, PartialEq)]
pub struct UnknownBox {
    pub btype: [u8; 4],
    pub data: Vec<u8>,
}

impl Default for UnknownBox {
    fn default() -> Self {
        UnknownBox {
            btype: *b"xxxx",
            data: Vec::new(),
        }
    }
}

impl std::fmt::Debug for UnknownBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("data", &format_capped_bytes(&self.data))
            .finish()
    }
}

impl Mp4Box for UnknownBox {
    fn box_type(&self) -> [u8; 4] {
        self.btype
    }

    fn box_size(&self) -> u32 {
        8 + self.data.len() as u32
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        buffer.extend_from_slice(&self.data);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let btype = read_fourcc(data, 4)?;
        let size = read_box_header(data, &btype)?;
        Ok((
            UnknownBox {
                btype,
                data: data[8..size].to_vec(),
            },
            size,
        ))
    }
}
