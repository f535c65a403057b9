// joints.rs

use std::collections::BTreeMap;

use glam::Mat4;
use serde_json::Value;

use crate::error::{BodyTrackError, Result};
use crate::transform::{flatten, unflatten};

/// Key of the whole-body placement. Every other entry is relative to it.
pub const ROOT_KEY: &str = "root";
/// Older recordings name the placement entry `anchor`.
pub const LEGACY_ROOT_KEY: &str = "anchor";

/// One joint reported by the skeleton estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedJoint {
    pub name: String,
    pub transform: Mat4, // Relative to the skeleton root
    pub tracked: bool,
}

/// Estimator output for one captured instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonSnapshot {
    pub root: Mat4, // World-space placement of the body
    pub joints: Vec<TrackedJoint>,
}

/// Transforms of the tracked joints at one instant, keyed by joint name.
///
/// Untracked joints are left out rather than zero-filled, so the set of keys
/// changes from frame to frame. An empty sample is valid: the subject is
/// present but nothing is tracked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointSample {
    joints: BTreeMap<String, Mat4>,
}

impl JointSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the root and every joint flagged as tracked.
    pub fn from_snapshot(snapshot: &SkeletonSnapshot) -> Self {
        let mut sample = JointSample::new();
        sample.insert(ROOT_KEY, snapshot.root);
        for joint in snapshot.joints.iter().filter(|j| j.tracked) {
            sample.insert(joint.name.clone(), joint.transform);
        }
        sample
    }

    pub fn insert(&mut self, name: impl Into<String>, transform: Mat4) -> Option<Mat4> {
        self.joints.insert(name.into(), transform)
    }

    pub fn root(&self) -> Option<Mat4> {
        self.joints.get(ROOT_KEY).copied()
    }

    pub fn joint(&self, name: &str) -> Option<Mat4> {
        self.joints.get(name).copied()
    }

    /// World-space transform of `name`: the root placement applied to the
    /// joint's relative transform. The root itself is returned as is.
    pub fn world_transform(&self, name: &str) -> Option<Mat4> {
        let root = self.root()?;
        if name == ROOT_KEY {
            return Some(root);
        }
        self.joint(name).map(|joint| root * joint)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.joints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mat4)> {
        self.joints.iter().map(|(name, transform)| (name.as_str(), transform))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Serializes the sample as a JSON object of row-major 16-value arrays.
    /// Keys come out sorted; the empty sample is `{}`. Transforms holding
    /// NaN or infinite values have no JSON form and are rejected.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if let Some((name, _)) = self.joints.iter().find(|(_, transform)| !transform.is_finite()) {
            return Err(BodyTrackError::MalformedPayload(format!("joint {} is not finite", name)));
        }
        let wire: BTreeMap<&str, [f32; 16]> = self
            .joints
            .iter()
            .map(|(name, transform)| (name.as_str(), flatten(transform)))
            .collect();
        serde_json::to_vec(&wire).map_err(|e| BodyTrackError::MalformedPayload(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| BodyTrackError::MalformedPayload(format!("not valid JSON: {}", e)))?;
        let Value::Object(object) = value else {
            return Err(BodyTrackError::MalformedPayload("joint sample is not a JSON object".into()));
        };

        let has_root = object.contains_key(ROOT_KEY);
        let mut sample = JointSample::new();
        for (name, value) in object {
            let Value::Array(elements) = value else {
                return Err(BodyTrackError::MalformedPayload(format!("joint {} is not an array", name)));
            };
            let values = elements
                .iter()
                .map(|element| element.as_f64().map(|v| v as f32))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| BodyTrackError::MalformedPayload(format!("joint {} holds a non-number", name)))?;
            let transform = unflatten(&values)
                .map_err(|e| BodyTrackError::MalformedPayload(format!("joint {}: {}", name, e)))?;

            let name = if name == LEGACY_ROOT_KEY && !has_root { ROOT_KEY.to_string() } else { name };
            sample.insert(name, transform);
        }
        Ok(sample)
    }
}

impl<'a> IntoIterator for &'a JointSample {
    type Item = (&'a String, &'a Mat4);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Mat4>;

    fn into_iter(self) -> Self::IntoIter {
        self.joints.iter()
    }
}

impl FromIterator<(String, Mat4)> for JointSample {
    fn from_iter<I: IntoIterator<Item = (String, Mat4)>>(iter: I) -> Self {
        JointSample { joints: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn snapshot() -> SkeletonSnapshot {
        SkeletonSnapshot {
            root: Mat4::from_translation(Vec3::new(0.0, 1.0, -2.0)),
            joints: vec![
                TrackedJoint {
                    name: "head_joint".into(),
                    transform: Mat4::from_translation(Vec3::Y * 0.5),
                    tracked: true,
                },
                TrackedJoint {
                    name: "left_hand_joint".into(),
                    transform: Mat4::from_translation(Vec3::X * -0.5),
                    tracked: false,
                },
            ],
        }
    }

    #[test]
    fn untracked_joints_are_omitted() {
        let sample = JointSample::from_snapshot(&snapshot());
        assert_eq!(sample.names().collect::<Vec<_>>(), vec!["head_joint", "root"]);
        assert!(sample.joint("left_hand_joint").is_none());
    }

    #[test]
    fn world_transform_applies_root() {
        let sample = JointSample::from_snapshot(&snapshot());
        let head = sample.world_transform("head_joint").unwrap();
        assert_eq!(head.w_axis.truncate(), Vec3::new(0.0, 1.5, -2.0));
        assert_eq!(sample.world_transform(ROOT_KEY), sample.root());
    }

    #[test]
    fn empty_sample_encodes_as_empty_object() {
        let bytes = JointSample::new().encode().unwrap();
        assert_eq!(bytes, b"{}");
        assert!(JointSample::decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn legacy_anchor_becomes_root() {
        let identity: Vec<String> = flatten(&Mat4::IDENTITY).iter().map(|v| v.to_string()).collect();
        let payload = format!("{{\"anchor\":[{}]}}", identity.join(","));
        let sample = JointSample::decode(payload.as_bytes()).unwrap();
        assert_eq!(sample.root(), Some(Mat4::IDENTITY));
        assert!(sample.joint(LEGACY_ROOT_KEY).is_none());
    }

    #[test]
    fn non_finite_transforms_are_not_encoded() {
        let mut sample = JointSample::from_snapshot(&snapshot());
        sample.insert("head_joint", Mat4::from_translation(Vec3::new(f32::NAN, 0.0, 0.0)));
        match sample.encode() {
            Err(BodyTrackError::MalformedPayload(reason)) => assert!(reason.contains("head_joint")),
            other => panic!("unexpected {:?}", other),
        }

        sample.insert("head_joint", Mat4::IDENTITY);
        sample.insert(ROOT_KEY, Mat4::from_translation(Vec3::new(0.0, f32::INFINITY, 0.0)));
        assert!(sample.encode().is_err());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for payload in [
            &b"{\"root\": [1, 2, 3"[..],
            b"[1, 2, 3]",
            b"{\"root\": 5}",
            b"{\"root\": [1, 2, 3]}",
            b"{\"root\": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,\"x\"]}",
        ] {
            assert!(
                matches!(JointSample::decode(payload), Err(BodyTrackError::MalformedPayload(_))),
                "accepted {:?}",
                String::from_utf8_lossy(payload)
            );
        }
    }
}
