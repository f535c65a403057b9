// writer/ingest.rs

use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{BodyTrackError, Result};
use crate::joints::{JointSample, SkeletonSnapshot};
use crate::metadata::MetadataGroup;
use crate::metrics::IngestMetrics;

/// When the recorder writes a metadata group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmissionPolicy {
    /// One group per frame. Frames without a subject carry the empty joint
    /// sample `{}`, so the track never has gaps.
    #[default]
    Dense,
    /// Only presence edges: the joint sample of the first frame a subject is
    /// seen, and an empty group on the first frame it is gone.
    Transitions,
    /// Every frame with a subject, plus one empty group at the start of each
    /// absence.
    SparseAbsence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubjectState {
    #[default]
    NoSubject,
    SubjectPresent,
}

impl SubjectState {
    /// Moves to the state matching `present` and reports whether it changed.
    pub fn observe(&mut self, present: bool) -> bool {
        let next = if present { SubjectState::SubjectPresent } else { SubjectState::NoSubject };
        let changed = next != *self;
        *self = next;
        changed
    }

    pub fn is_present(self) -> bool {
        self == SubjectState::SubjectPresent
    }
}

/// Applies an [`EmissionPolicy`] frame by frame.
#[derive(Debug, Clone)]
pub struct Emitter {
    policy: EmissionPolicy,
    state: SubjectState,
}

impl Emitter {
    pub fn new(policy: EmissionPolicy) -> Self {
        Emitter { policy, state: SubjectState::NoSubject }
    }

    pub fn state(&self) -> SubjectState {
        self.state
    }

    /// The group to write for this frame, if any.
    pub fn next_group(&mut self, skeleton: Option<&SkeletonSnapshot>) -> Result<Option<MetadataGroup>> {
        let changed = self.state.observe(skeleton.is_some());
        let group = match (self.policy, skeleton) {
            (EmissionPolicy::Dense, Some(skeleton)) => Some(MetadataGroup::joints(&JointSample::from_snapshot(skeleton))?),
            (EmissionPolicy::Dense, None) => Some(MetadataGroup::joints(&JointSample::new())?),
            (EmissionPolicy::Transitions, Some(skeleton)) if changed => {
                Some(MetadataGroup::joints(&JointSample::from_snapshot(skeleton))?)
            }
            (EmissionPolicy::SparseAbsence, Some(skeleton)) => {
                Some(MetadataGroup::joints(&JointSample::from_snapshot(skeleton))?)
            }
            (EmissionPolicy::Transitions | EmissionPolicy::SparseAbsence, None) if changed => Some(MetadataGroup::empty()),
            _ => None,
        };
        if changed {
            debug!("Subject state changed to {:?}", self.state);
        }
        Ok(group)
    }
}

/// A sample handed to a track input. `time` is in the recording timescale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSample {
    pub data: Bytes,
    pub time: u64,
    pub is_sync: bool,
}

/// The writing end of one track.
///
/// `is_ready` must not block. Callers check it before every `append` and
/// drop the sample when the input is not ready.
pub trait TrackInput: Send {
    fn is_ready(&self) -> bool;
    fn append(&mut self, sample: MediaSample) -> Result<()>;
}

/// An encoded video frame as delivered by the capture pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub data: Bytes,
    pub is_sync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    Appended,
    Suppressed, // The policy had nothing to write for this frame
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub time: u64,
    pub video_appended: bool,
    pub metadata: MetadataOutcome,
}

struct InputSlot {
    input: Box<dyn TrackInput>,
    last_time: Option<u64>,
}

impl InputSlot {
    fn new(input: Box<dyn TrackInput>) -> Self {
        InputSlot { input, last_time: None }
    }

    fn check_time(&self, time: u64) -> Result<()> {
        match self.last_time {
            Some(last) if time < last => Err(BodyTrackError::InvalidTime(format!(
                "sample time {} precedes previous sample time {}",
                time, last
            ))),
            _ => Ok(()),
        }
    }

    fn append(&mut self, sample: MediaSample) -> Result<()> {
        let time = sample.time;
        self.input.append(sample)?;
        self.last_time = Some(time);
        Ok(())
    }
}

/// Routes captured frames to the track inputs of one recording.
///
/// The first instant passed to any capture call becomes time zero. Video and
/// metadata readiness are checked independently; a sample whose input is
/// not ready is dropped and counted, never queued.
pub struct CaptureIngest {
    video: InputSlot,
    metadata: InputSlot,
    audio: Option<InputSlot>,
    emitter: Emitter,
    timescale: u32,
    frame_duration: u64,
    origin: Option<Instant>,
    last_time: Option<u64>,
    metrics: IngestMetrics,
}

impl CaptureIngest {
    pub fn new(
        video: Box<dyn TrackInput>,
        metadata: Box<dyn TrackInput>,
        audio: Option<Box<dyn TrackInput>>,
        policy: EmissionPolicy,
        timescale: u32,
        frame_duration: u64,
        metrics: IngestMetrics,
    ) -> Self {
        CaptureIngest {
            video: InputSlot::new(video),
            metadata: InputSlot::new(metadata),
            audio: audio.map(InputSlot::new),
            emitter: Emitter::new(policy),
            timescale,
            frame_duration,
            origin: None,
            last_time: None,
            metrics,
        }
    }

    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    pub fn subject_state(&self) -> SubjectState {
        self.emitter.state()
    }

    /// Converts a capture instant to recording time, fixing the origin on first use.
    pub fn presentation_time(&mut self, at: Instant) -> Result<u64> {
        let origin = *self.origin.get_or_insert(at);
        let elapsed = at
            .checked_duration_since(origin)
            .ok_or_else(|| BodyTrackError::InvalidTime("capture instant precedes the recording origin".into()))?;
        let units = (elapsed.as_nanos() * self.timescale as u128 + 500_000_000) / 1_000_000_000;
        Ok(units as u64)
    }

    pub fn capture(&mut self, frame: VideoFrame, skeleton: Option<&SkeletonSnapshot>, at: Instant) -> Result<CaptureOutcome> {
        let time = self.presentation_time(at)?;
        self.video.check_time(time)?;
        self.metadata.check_time(time)?;

        let video_appended = if self.video.input.is_ready() {
            self.video.append(MediaSample { data: frame.data, time, is_sync: frame.is_sync })?;
            self.metrics.video_frames_appended.inc();
            true
        } else {
            debug!("Video input not ready, dropping frame at {}", time);
            self.metrics.video_frames_dropped.inc();
            false
        };

        let metadata = if self.metadata.input.is_ready() {
            match self.emitter.next_group(skeleton)? {
                Some(group) => {
                    trace!("Appending metadata group with {} items at {}", group.items.len(), time);
                    self.metadata.append(MediaSample { data: group.encode(), time, is_sync: true })?;
                    self.metrics.metadata_groups_appended.inc();
                    MetadataOutcome::Appended
                }
                None => MetadataOutcome::Suppressed,
            }
        } else {
            debug!("Metadata input not ready, dropping group at {}", time);
            self.metrics.metadata_groups_dropped.inc();
            MetadataOutcome::Dropped
        };

        self.note_time(time);
        Ok(CaptureOutcome { time, video_appended, metadata })
    }

    /// Appends an audio sample. Returns whether it was accepted.
    pub fn capture_audio(&mut self, data: Bytes, at: Instant) -> Result<bool> {
        let time = self.presentation_time(at)?;
        let Some(audio) = self.audio.as_mut() else {
            return Ok(false);
        };
        audio.check_time(time)?;
        if !audio.input.is_ready() {
            debug!("Audio input not ready, dropping sample at {}", time);
            self.metrics.audio_samples_dropped.inc();
            return Ok(false);
        }
        audio.append(MediaSample { data, time, is_sync: true })?;
        self.metrics.audio_samples_appended.inc();
        self.note_time(time);
        Ok(true)
    }

    /// Where every track should end: one frame after the latest capture.
    pub fn end_time(&self) -> u64 {
        self.last_time.map_or(0, |last| last + self.frame_duration)
    }

    fn note_time(&mut self, time: u64) {
        self.last_time = Some(self.last_time.map_or(time, |last| last.max(time)));
    }
}
