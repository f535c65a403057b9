// events.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BodyTrackError;
use crate::joints::JointSample;

/// Lifecycle notifications of a [`crate::writer::BodyRecorder`].
///
/// Session and recording state changes are delivered on the thread that
/// caused them. `Finished` and `Failed` come from the muxer thread once
/// finalization completes.
#[derive(Debug)]
pub enum RecorderEvent {
    SetupFailed(BodyTrackError),
    Running(bool),
    Recording(bool),
    Finished(PathBuf),
    Failed(BodyTrackError),
    Interrupted,
    InterruptionEnded,
}

/// Notifications of a [`crate::reader::BodyPlayer`], delivered from its
/// playback task. Times are positions on the movie timeline.
#[derive(Debug)]
pub enum PlayerEvent {
    Joints { time: Duration, sample: JointSample },
    NoSubject { time: Duration },
    DecodeFailed { index: usize, time: Duration, error: BodyTrackError },
    SubjectPresent { time: Duration },
    SubjectAbsent { time: Duration },
    ReachedEnd,
}

pub type RecorderCallback = Arc<dyn Fn(RecorderEvent) + Send + Sync>;
pub type PlayerCallback = Arc<dyn Fn(PlayerEvent) + Send + Sync>;
