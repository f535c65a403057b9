//! # Body metadata tracks
//!
//! Records per-frame skeleton poses as a timed metadata track next to a
//! video track, and plays them back in step with the video timeline.
//!
//! ## Layers
//! - `transform`: 4x4 transforms to and from 16 row-major values.
//! - `joints`: [`joints::JointSample`], a map of joint names to transforms
//!   with a reserved `root` entry, serialized as a JSON object.
//! - `metadata`: the `mebx` key of the track and the item layout of its
//!   samples.
//! - `writer`: [`writer::BodyRecorder`], which owns the movie while recording,
//!   drops samples under backpressure and finalizes on a muxer thread.
//! - `reader`: [`reader::BodyTrackReader`] for lazy decoding and
//!   [`reader::BodyPlayer`] for clock-driven delivery.
//!
//! ## Track layout
//! The metadata track uses the `mebx` sample entry with one key,
//! `mdta/com.bodytrack.joints.metadata`, of data type
//! `com.apple.metadata.datatype.JSON`, and references the video track with a
//! `cdsc` track reference. An empty sample means no subject was seen; a
//! sample holding `{}` means a subject with no tracked joints.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod joints;
pub mod metadata;
pub mod metrics;
pub mod reader;
pub mod transform;
pub mod writer;

pub use config::{AudioConfig, PlayerConfig, RecorderConfig};
pub use error::{BodyTrackError, Result};
pub use events::{PlayerCallback, PlayerEvent, RecorderCallback, RecorderEvent};
pub use joints::{JointSample, SkeletonSnapshot, TrackedJoint};
pub use reader::{BodyPlayer, BodySample, BodyTrackReader, TimedSample};
pub use writer::{BodyRecorder, CaptureSession, EmissionPolicy, VideoFrame};
