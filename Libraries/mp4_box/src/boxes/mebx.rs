use crate::{format_fourcc, read_fourcc, read_u16_be, read_u32_be};

use super::generic::{read_box_header, ChildBoxes, Mp4Box};

/// Key namespace for reverse-DNS keys.
pub const KEY_NAMESPACE_MDTA: [u8; 4] = *b"mdta";
/// Data type namespace for reverse-DNS type names.
pub const DATATYPE_NAMESPACE_REVERSE_DNS: u32 = 1;

// The `MetadataSampleEntry` struct represents a QuickTime `mebx` sample entry.
// Its `keys` table declares every metadata key the track may carry. Samples
// never repeat the key itself; each item names its key through the
// `local_key_id` chosen here.
//
// Layout:
// - 6 reserved bytes and a 2-byte data reference index, as in every sample entry.
// - A `keys` box whose children are typed by their local key id. Each child
//   holds a `keyd` box (key namespace + key value) and optionally a `dtyp`
//   box (data type namespace + type name).
#[derive(Clone, PartialEq)]
pub struct MetadataSampleEntry {
    pub data_reference_index: u16,
    pub keys: Vec<MetadataKey>,
}

#[derive(Clone, PartialEq)]
pub struct MetadataKey {
    pub local_key_id: u32,
    pub key_namespace: [u8; 4],
    pub key_value: Vec<u8>,
    pub data_type: Option<MetadataDataType>,
}

#[derive(Clone, PartialEq)]
pub struct MetadataDataType {
    pub namespace: u32,
    pub value: Vec<u8>,
}

impl Default for MetadataSampleEntry {
    fn default() -> Self {
        MetadataSampleEntry {
            data_reference_index: 1,
            keys: Vec::new(),
        }
    }
}

impl MetadataKey {
    /// Declares a reverse-DNS key with a reverse-DNS data type.
    pub fn reverse_dns(local_key_id: u32, key: &str, data_type: &str) -> Self {
        MetadataKey {
            local_key_id,
            key_namespace: KEY_NAMESPACE_MDTA,
            key_value: key.as_bytes().to_vec(),
            data_type: Some(MetadataDataType {
                namespace: DATATYPE_NAMESPACE_REVERSE_DNS,
                value: data_type.as_bytes().to_vec(),
            }),
        }
    }

    /// The key written as `namespace/value`, e.g. `mdta/com.example.key`.
    pub fn identifier(&self) -> String {
        format!("{}/{}", format_fourcc(&self.key_namespace), String::from_utf8_lossy(&self.key_value))
    }

    pub fn data_type_name(&self) -> Option<String> {
        self.data_type
            .as_ref()
            .map(|data_type| String::from_utf8_lossy(&data_type.value).to_string())
    }

    fn keyd_size(&self) -> u32 {
        8 + 4 + self.key_value.len() as u32
    }

    fn dtyp_size(&self) -> u32 {
        self.data_type.as_ref().map_or(0, |d| 8 + 4 + d.value.len() as u32)
    }

    fn box_size(&self) -> u32 {
        8 + self.keyd_size() + self.dtyp_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.local_key_id.to_be_bytes());

        buffer.extend_from_slice(&self.keyd_size().to_be_bytes());
        buffer.extend_from_slice(b"keyd");
        buffer.extend_from_slice(&self.key_namespace);
        buffer.extend_from_slice(&self.key_value);

        if let Some(data_type) = &self.data_type {
            buffer.extend_from_slice(&self.dtyp_size().to_be_bytes());
            buffer.extend_from_slice(b"dtyp");
            buffer.extend_from_slice(&data_type.namespace.to_be_bytes());
            buffer.extend_from_slice(&data_type.value);
        }
    }

    fn read_box(local_key_id: u32, data: &[u8]) -> Result<Self, String> {
        let mut key = None;
        let mut data_type = None;
        for child in ChildBoxes::new(data, 8, data.len()) {
            let (box_type, bytes) = child?;
            match &box_type {
                b"keyd" => key = Some((read_fourcc(bytes, 8)?, bytes[12.min(bytes.len())..].to_vec())),
                b"dtyp" => {
                    data_type = Some(MetadataDataType {
                        namespace: read_u32_be(bytes, 8)?,
                        value: bytes[12.min(bytes.len())..].to_vec(),
                    })
                }
                _ => {}
            }
        }
        let (key_namespace, key_value) = key.ok_or_else(|| format!("Metadata key {} has no keyd box", local_key_id))?;
        Ok(MetadataKey { local_key_id, key_namespace, key_value, data_type })
    }
}

impl MetadataSampleEntry {
    /// Finds the key declaring `identifier` with data type `data_type`.
    pub fn find_key(&self, identifier: &str, data_type: &str) -> Option<&MetadataKey> {
        self.keys
            .iter()
            .find(|key| key.identifier() == identifier && key.data_type_name().as_deref() == Some(data_type))
    }

    fn keys_size(&self) -> u32 {
        8 + self.keys.iter().map(|k| k.box_size()).sum::<u32>()
    }
}

impl std::fmt::Debug for MetadataSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataSampleEntry")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("keys", &self.keys)
            .finish()
    }
}

impl std::fmt::Debug for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataKey")
            .field("local_key_id", &self.local_key_id)
            .field("identifier", &self.identifier())
            .field("data_type", &self.data_type_name())
            .finish()
    }
}

impl Mp4Box for MetadataSampleEntry {
    fn box_type(&self) -> [u8; 4] { *b"mebx" }

    // 8 header + 6 reserved + 2 data reference index + keys box
    fn box_size(&self) -> u32 {
        8 + 8 + self.keys_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        buffer.extend_from_slice(&[0u8; 6]); // reserved
        buffer.extend_from_slice(&self.data_reference_index.to_be_bytes());

        buffer.extend_from_slice(&self.keys_size().to_be_bytes());
        buffer.extend_from_slice(b"keys");
        for key in &self.keys {
            key.write_box(buffer);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"mebx")?;
        let data = &data[..size];
        let data_reference_index = read_u16_be(data, 14)?;

        let mut keys = Vec::new();
        for child in ChildBoxes::new(data, 16, size) {
            let (box_type, bytes) = child?;
            if &box_type != b"keys" {
                continue;
            }
            for key_box in ChildBoxes::new(bytes, 8, bytes.len()) {
                let (local_key_id, key_bytes) = key_box?;
                keys.push(MetadataKey::read_box(u32::from_be_bytes(local_key_id), key_bytes)?);
            }
        }

        Ok((MetadataSampleEntry { data_reference_index, keys }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_table_declares_identifier_and_type() {
        let entry = MetadataSampleEntry {
            data_reference_index: 1,
            keys: vec![MetadataKey::reverse_dns(1, "com.example.pose", "com.apple.metadata.datatype.JSON")],
        };

        let mut buffer = Vec::new();
        entry.write_box(&mut buffer);
        assert_eq!(buffer.len(), entry.box_size() as usize);

        let (parsed, consumed) = MetadataSampleEntry::read_box(&buffer).unwrap();
        assert_eq!(consumed, buffer.len());
        assert_eq!(parsed, entry);

        let key = parsed.find_key("mdta/com.example.pose", "com.apple.metadata.datatype.JSON").unwrap();
        assert_eq!(key.local_key_id, 1);
        assert!(parsed.find_key("mdta/com.example.pose", "com.apple.metadata.datatype.UTF-8").is_none());
    }
}
