use crate::{format_fourcc, read_fourcc, read_u32_be};

use super::generic::{read_box_header, Mp4Box};

// The `FtypBox` struct represents a File Type Box.
// It is the first box of a movie file and names the brands the file conforms to.
// - `major_brand`: The brand the file is primarily written for.
// - `minor_version`: Version of the major brand.
// - `compatible_brands`: Other brands a reader may use to interpret the file.
#[derive(Clone, PartialEq)]
pub struct FtypBox {
    pub major_brand: [u8; 4],
    pub minor_version: u32,
    pub compatible_brands: Vec<[u8; 4]>,
}

// Timed metadata tracks with `mebx` entries are a QuickTime feature, so the
// default brand is `qt  `.
impl Default for FtypBox {
    fn default() -> Self {
        FtypBox {
            major_brand: *b"qt  ",
            minor_version: 0,
            compatible_brands: vec![*b"qt  "],
        }
    }
}

impl std::fmt::Debug for FtypBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtypBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("major_brand", &format_fourcc(&self.major_brand))
            .field("minor_version", &self.minor_version)
            .field(
                "compatible_brands",
                &self.compatible_brands.iter().map(format_fourcc).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Mp4Box for FtypBox {
    fn box_type(&self) -> [u8; 4] { *b"ftyp" }

    // 8 header + 4 major brand + 4 minor version + 4 per compatible brand.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (4 * self.compatible_brands.len() as u32)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        buffer.extend_from_slice(&self.major_brand);
        buffer.extend_from_slice(&self.minor_version.to_be_bytes());
        for brand in &self.compatible_brands {
            buffer.extend_from_slice(brand);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"ftyp")?;
        let data = &data[..size];

        let major_brand = read_fourcc(data, 8)?;
        let minor_version = read_u32_be(data, 12)?;

        let mut compatible_brands = Vec::new();
        let mut offset = 16;
        while offset + 4 <= size {
            compatible_brands.push(read_fourcc(data, offset)?);
            offset += 4;
        }

        Ok((
            FtypBox {
                major_brand,
                minor_version,
                compatible_brands,
            },
            size,
        ))
    }
}
