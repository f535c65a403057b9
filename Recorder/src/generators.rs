// generators.rs

use std::f32::consts::TAU;

use body_track::{CaptureSession, RecorderConfig, SkeletonSnapshot, TrackedJoint, VideoFrame};
use bytes::Bytes;
use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::{info, instrument};

/// Capture session without a device: frames come from the generators below.
pub struct SyntheticSession;

impl CaptureSession for SyntheticSession {
    fn configure(&mut self, config: &RecorderConfig) -> body_track::Result<()> {
        info!("Synthetic capture at {}x{}, {} fps", config.width, config.height, config.frame_rate);
        Ok(())
    }

    fn start_running(&mut self) -> body_track::Result<()> {
        Ok(())
    }

    fn stop_running(&mut self) {}
}

/// A skeleton walking forward at `speed` meters per second with swinging
/// limbs. One stride takes `stride_secs`.
#[derive(Debug, Clone, Copy)]
pub struct WalkingSkeleton {
    pub speed: f32,
    pub stride_secs: f32,
}

impl Default for WalkingSkeleton {
    fn default() -> Self {
        WalkingSkeleton { speed: 1.2, stride_secs: 1.0 }
    }
}

impl WalkingSkeleton {
    /// Pose at `t` seconds. Hands drop out of tracking for a moment once
    /// per stride, as they would when swinging behind the body.
    #[instrument(skip_all, level = "trace")]
    pub fn pose(&self, t: f32) -> SkeletonSnapshot {
        let phase = (t / self.stride_secs) * TAU;
        let swing = phase.sin() * 0.6;

        // Walk along -Z with a slight vertical bob
        let root = Mat4::from_rotation_translation(
            Quat::IDENTITY,
            Vec3::new(0.0, 0.02 * (2.0 * phase).sin(), -self.speed * t),
        );

        let limb = |name: &str, offset: Vec3, angle: f32| TrackedJoint {
            name: name.to_string(),
            transform: Mat4::from_rotation_translation(Quat::from_euler(EulerRot::XYZ, angle, 0.0, 0.0), offset),
            tracked: true,
        };
        let hands_tracked = phase.rem_euclid(TAU) > 0.3;

        let mut joints = vec![
            limb("hips_joint", Vec3::new(0.0, 0.95, 0.0), 0.0),
            limb("spine_7_joint", Vec3::new(0.0, 1.45, 0.0), 0.0),
            limb("head_joint", Vec3::new(0.0, 1.65, 0.0), 0.05 * phase.cos()),
            limb("left_hand_joint", Vec3::new(-0.25, 0.9, 0.0), swing),
            limb("right_hand_joint", Vec3::new(0.25, 0.9, 0.0), -swing),
            limb("left_foot_joint", Vec3::new(-0.1, 0.05, 0.0), -swing),
            limb("right_foot_joint", Vec3::new(0.1, 0.05, 0.0), swing),
        ];
        for joint in joints.iter_mut().filter(|j| j.name.ends_with("hand_joint")) {
            joint.tracked = hands_tracked;
        }

        SkeletonSnapshot { root, joints }
    }
}

/// Placeholder encoded frame: a small payload tagged with its index.
pub fn dummy_frame(index: u64, keyframe_interval: u64) -> VideoFrame {
    let mut data = b"FRAME".to_vec();
    data.extend_from_slice(&index.to_be_bytes());
    VideoFrame {
        data: Bytes::from(data),
        is_sync: index % keyframe_interval.max(1) == 0,
    }
}
