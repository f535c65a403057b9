// metadata.rs

use bytes::{BufMut, Bytes, BytesMut};
use mp4_box::boxes::mebx::{MetadataKey, MetadataSampleEntry};

use crate::error::{BodyTrackError, Result};
use crate::joints::JointSample;

/// Reverse-DNS key of the joint payloads.
pub const JOINTS_KEY: &str = "com.bodytrack.joints.metadata";
/// Full identifier as it appears in the key table: `<namespace>/<key>`.
pub const JOINTS_IDENTIFIER: &str = "mdta/com.bodytrack.joints.metadata";
/// Data type of the joint payloads.
pub const JOINTS_DATA_TYPE: &str = "com.apple.metadata.datatype.JSON";
/// Local key id the joint key is declared under.
pub const JOINTS_LOCAL_KEY_ID: u32 = 1;

const ITEM_HEADER_SIZE: usize = 8;

/// Sample description of the joint metadata track: a single `mebx` key.
pub fn joints_sample_entry() -> MetadataSampleEntry {
    MetadataSampleEntry {
        data_reference_index: 1,
        keys: vec![MetadataKey::reverse_dns(JOINTS_LOCAL_KEY_ID, JOINTS_KEY, JOINTS_DATA_TYPE)],
    }
}

/// One item of a metadata sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub key_id: u32,
    pub value: Bytes,
}

/// All items presented at one instant; stored as one track sample.
///
/// Each item is written as `u32 size | u32 local key id | value`, with
/// `size` counting the 8 header bytes. A group without items is an empty
/// sample and means no subject was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataGroup {
    pub items: Vec<MetadataItem>,
}

impl MetadataGroup {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn joints(sample: &JointSample) -> Result<Self> {
        Ok(MetadataGroup {
            items: vec![MetadataItem {
                key_id: JOINTS_LOCAL_KEY_ID,
                value: Bytes::from(sample.encode()?),
            }],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn encode(&self) -> Bytes {
        let size: usize = self.items.iter().map(|i| ITEM_HEADER_SIZE + i.value.len()).sum();
        let mut buffer = BytesMut::with_capacity(size);
        for item in &self.items {
            buffer.put_u32((ITEM_HEADER_SIZE + item.value.len()) as u32);
            buffer.put_u32(item.key_id);
            buffer.put_slice(&item.value);
        }
        buffer.freeze()
    }

    pub fn decode(sample: &[u8]) -> Result<Self> {
        let mut items = Vec::new();
        let mut offset = 0;
        while offset < sample.len() {
            let header = sample.get(offset..offset + ITEM_HEADER_SIZE).ok_or_else(|| {
                BodyTrackError::MalformedPayload(format!("truncated item header at offset {}", offset))
            })?;
            let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let key_id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
            if size < ITEM_HEADER_SIZE || offset + size > sample.len() {
                return Err(BodyTrackError::MalformedPayload(format!(
                    "item at offset {} claims {} bytes, {} available",
                    offset,
                    size,
                    sample.len() - offset
                )));
            }
            items.push(MetadataItem {
                key_id,
                value: Bytes::copy_from_slice(&sample[offset + ITEM_HEADER_SIZE..offset + size]),
            });
            offset += size;
        }
        Ok(MetadataGroup { items })
    }

    /// The payload of the first item declared under `key_id`.
    pub fn value_for(&self, key_id: u32) -> Option<&Bytes> {
        self.items.iter().find(|item| item.key_id == key_id).map(|item| &item.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn empty_group_is_an_empty_sample() {
        assert!(MetadataGroup::empty().encode().is_empty());
        assert!(MetadataGroup::decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn empty_joint_sample_is_not_an_empty_group() {
        let group = MetadataGroup::joints(&JointSample::new()).unwrap();
        let bytes = group.encode();
        assert_eq!(&bytes[..], &[0, 0, 0, 10, 0, 0, 0, 1, b'{', b'}']);

        let decoded = MetadataGroup::decode(&bytes).unwrap();
        assert_eq!(decoded.value_for(JOINTS_LOCAL_KEY_ID).map(|v| &v[..]), Some(&b"{}"[..]));
    }

    #[test]
    fn items_keep_their_order() {
        let mut sample = JointSample::new();
        sample.insert("root", Mat4::IDENTITY);
        let group = MetadataGroup {
            items: vec![
                MetadataItem { key_id: 7, value: Bytes::from_static(b"other") },
                MetadataGroup::joints(&sample).unwrap().items.remove(0),
            ],
        };
        let decoded = MetadataGroup::decode(&group.encode()).unwrap();
        assert_eq!(decoded, group);
        assert_eq!(
            JointSample::decode(decoded.value_for(JOINTS_LOCAL_KEY_ID).unwrap()).unwrap(),
            sample
        );
    }

    #[test]
    fn truncated_items_are_malformed() {
        let mut bytes = MetadataGroup::joints(&JointSample::new()).unwrap().encode().to_vec();
        bytes.pop();
        assert!(matches!(MetadataGroup::decode(&bytes), Err(BodyTrackError::MalformedPayload(_))));
        assert!(MetadataGroup::decode(&[0, 0, 0, 4, 0, 0, 0, 1]).is_err());
        assert!(MetadataGroup::decode(&[0, 0, 0]).is_err());
    }

    #[test]
    fn sample_entry_declares_joint_key() {
        let entry = joints_sample_entry();
        let key = entry.find_key(JOINTS_IDENTIFIER, JOINTS_DATA_TYPE).unwrap();
        assert_eq!(key.local_key_id, JOINTS_LOCAL_KEY_ID);
    }
}
