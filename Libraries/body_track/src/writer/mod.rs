//! Recording of a video track, an optional audio track and the joint
//! metadata track into one movie.
//!
//! [`BodyRecorder`] serializes every lifecycle call through one lock. Samples
//! flow from [`ingest::CaptureIngest`] to a muxer thread over a channel, so a
//! capture call never waits on file I/O: when a track's queue is full the
//! sample is dropped.

pub mod ingest;
mod muxer;

use std::{
    collections::HashMap,
    fs::File,
    io::BufWriter,
    path::PathBuf,
    sync::{atomic::AtomicUsize, mpsc, Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Instant,
};

use bytes::Bytes;
use mp4_box::{
    boxes::{
        ftyp::FtypBox,
        stsd::{AudioSampleEntry, SampleEntry, VisualSampleEntry},
        tref::CONTENT_DESCRIBES,
    },
    writer::{MediaKind, MovieWriter, TrackConfig},
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::{HostClock, PresentationClock};
use crate::config::{fourcc, RecorderConfig};
use crate::error::{BodyTrackError, Result};
use crate::events::{RecorderCallback, RecorderEvent};
use crate::joints::SkeletonSnapshot;
use crate::metadata::joints_sample_entry;
use crate::metrics::IngestMetrics;

pub use ingest::{
    CaptureIngest, CaptureOutcome, EmissionPolicy, Emitter, MediaSample, MetadataOutcome, SubjectState, TrackInput,
    VideoFrame,
};
use muxer::{start_muxer_thread, MuxCommand, QueuedTrackInput};

/// The capture device side of a recording session.
pub trait CaptureSession: Send {
    /// Applies the recording settings. Fails when the device or a
    /// permission is unavailable.
    fn configure(&mut self, config: &RecorderConfig) -> Result<()>;
    fn start_running(&mut self) -> Result<()>;
    fn stop_running(&mut self);
}

enum RecorderState {
    Idle,
    Recording {
        ingest: CaptureIngest,
        sender: mpsc::Sender<MuxCommand>,
        path: PathBuf,
    },
    Finalizing,
}

struct Inner {
    state: RecorderState,
    running: bool,
    session: Box<dyn CaptureSession>,
}

pub struct BodyRecorder {
    config: RecorderConfig,
    callback: RecorderCallback,
    clock: Arc<dyn PresentationClock>,
    inner: Arc<Mutex<Inner>>,
}

impl BodyRecorder {
    pub fn new(config: RecorderConfig, session: Box<dyn CaptureSession>, callback: RecorderCallback) -> Self {
        Self::with_clock(config, session, callback, Arc::new(HostClock))
    }

    pub fn with_clock(
        config: RecorderConfig,
        session: Box<dyn CaptureSession>,
        callback: RecorderCallback,
        clock: Arc<dyn PresentationClock>,
    ) -> Self {
        BodyRecorder {
            config,
            callback,
            clock,
            inner: Arc::new(Mutex::new(Inner { state: RecorderState::Idle, running: false, session })),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        matches!(lock(&self.inner).state, RecorderState::Recording { .. })
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).running
    }

    /// Configures and starts the capture session.
    #[instrument(skip_all)]
    pub fn start_session(&self) -> Result<()> {
        let result = {
            let mut inner = lock(&self.inner);
            inner
                .session
                .configure(&self.config)
                .and_then(|_| inner.session.start_running())
                .map_err(|e| match e {
                    BodyTrackError::SetupFailed(reason) => reason,
                    other => other.to_string(),
                })
        };
        match result {
            Ok(()) => {
                info!("Capture session running");
                self.set_running(true);
                Ok(())
            }
            Err(reason) => {
                error!("Capture session setup failed: {}", reason);
                (self.callback)(RecorderEvent::SetupFailed(BodyTrackError::SetupFailed(reason.clone())));
                Err(BodyTrackError::SetupFailed(reason))
            }
        }
    }

    /// Stops the capture session, finalizing any recording in progress.
    pub fn stop_session(&self) {
        if self.is_recording() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop recording with the session: {}", e);
            }
        }
        lock(&self.inner).session.stop_running();
        self.set_running(false);
    }

    /// Reports a running state observed on the capture session. Emits
    /// `Running` only when the state actually changes.
    pub fn set_running(&self, running: bool) {
        let changed = {
            let mut inner = lock(&self.inner);
            std::mem::replace(&mut inner.running, running) != running
        };
        if changed {
            (self.callback)(RecorderEvent::Running(running));
        }
    }

    /// Creates the movie and starts accepting samples. Without a `path` the
    /// file is named `<uuid>.mov` in the configured output directory.
    #[instrument(skip_all)]
    pub fn start_recording(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let mut inner = lock(&self.inner);
        match inner.state {
            RecorderState::Idle => {}
            RecorderState::Recording { .. } => return Err(BodyTrackError::AlreadyRecording),
            RecorderState::Finalizing => return Err(BodyTrackError::StopInProgress),
        }

        let path = path.unwrap_or_else(|| self.config.output_dir.join(format!("{}.mov", Uuid::new_v4())));
        let (ingest, sender) = match self.open_container(&path) {
            Ok(opened) => opened,
            Err(e) => {
                drop(inner);
                error!("Failed to create {}: {}", path.display(), e);
                let reason = e.to_string();
                (self.callback)(RecorderEvent::SetupFailed(BodyTrackError::SetupFailed(reason.clone())));
                return Err(BodyTrackError::SetupFailed(reason));
            }
        };

        inner.state = RecorderState::Recording { ingest, sender, path: path.clone() };
        drop(inner);

        info!("Recording to {}", path.display());
        (self.callback)(RecorderEvent::Recording(true));
        Ok(path)
    }

    fn open_container(&self, path: &std::path::Path) -> Result<(CaptureIngest, mpsc::Sender<MuxCommand>)> {
        let file = File::create(path)?;
        self.start_container(file, path).inspect_err(|_| {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove partial movie {}: {}", path.display(), e);
            }
        })
    }

    fn start_container(&self, file: File, path: &std::path::Path) -> Result<(CaptureIngest, mpsc::Sender<MuxCommand>)> {
        let config = &self.config;
        let mut writer = MovieWriter::new(BufWriter::new(file), &FtypBox::default(), config.timescale)
            .map_err(BodyTrackError::Container)?;

        let video = writer.add_track(TrackConfig {
            kind: MediaKind::Video { width: config.width, height: config.height },
            timescale: config.timescale,
            sample_entry: SampleEntry::Visual(VisualSampleEntry {
                data_format: fourcc(&config.video_codec),
                width: config.width,
                height: config.height,
                ..Default::default()
            }),
            handler_name: "Core Media Video".to_string(),
        });
        let audio = config.audio.as_ref().map(|audio| {
            writer.add_track(TrackConfig {
                kind: MediaKind::Audio,
                timescale: config.timescale,
                sample_entry: SampleEntry::Audio(AudioSampleEntry {
                    data_format: fourcc(&audio.codec),
                    channel_count: audio.channels,
                    sample_rate: audio.sample_rate,
                    ..Default::default()
                }),
                handler_name: "Core Media Audio".to_string(),
            })
        });
        let metadata = writer.add_track(TrackConfig {
            kind: MediaKind::Metadata,
            timescale: config.timescale,
            sample_entry: SampleEntry::Metadata(joints_sample_entry()),
            handler_name: "Core Media Metadata".to_string(),
        });
        writer
            .add_reference(metadata, CONTENT_DESCRIBES, video)
            .map_err(BodyTrackError::Container)?;

        let track_ids: Vec<u32> = [Some(video), audio, Some(metadata)].into_iter().flatten().collect();
        let in_flight: HashMap<u32, Arc<AtomicUsize>> =
            track_ids.iter().map(|&id| (id, Arc::new(AtomicUsize::new(0)))).collect();

        // The recorder state owns the sender, so the muxer only holds a weak handle
        let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let callback = self.callback.clone();
        let sender = start_muxer_thread(writer, path.to_path_buf(), in_flight.clone(), move |result| {
            if let Some(inner) = inner.upgrade() {
                lock(&inner).state = RecorderState::Idle;
            }
            match result {
                Ok(path) => callback(RecorderEvent::Finished(path)),
                Err(e) => {
                    error!("Recording failed: {}", e);
                    callback(RecorderEvent::Failed(e));
                }
            }
        })?;

        let input = |track_id: u32| -> Box<dyn TrackInput> {
            Box::new(QueuedTrackInput::new(
                track_id,
                in_flight[&track_id].clone(),
                config.queue_depth,
                sender.clone(),
            ))
        };
        let ingest = CaptureIngest::new(
            input(video),
            input(metadata),
            audio.map(input),
            config.emission,
            config.timescale,
            config.frame_duration(),
            IngestMetrics::new(),
        );
        Ok((ingest, sender))
    }

    /// Submits one captured frame and the skeleton seen in it, if any.
    pub fn capture(&self, frame: VideoFrame, skeleton: Option<&SkeletonSnapshot>, at: Instant) -> Result<CaptureOutcome> {
        match &mut lock(&self.inner).state {
            RecorderState::Recording { ingest, .. } => ingest.capture(frame, skeleton, at),
            _ => Err(BodyTrackError::NotRecording),
        }
    }

    /// [`BodyRecorder::capture`] stamped with the recorder's clock.
    pub fn capture_now(&self, frame: VideoFrame, skeleton: Option<&SkeletonSnapshot>) -> Result<CaptureOutcome> {
        let at = self.clock.now();
        self.capture(frame, skeleton, at)
    }

    pub fn capture_audio(&self, data: Bytes, at: Instant) -> Result<bool> {
        match &mut lock(&self.inner).state {
            RecorderState::Recording { ingest, .. } => ingest.capture_audio(data, at),
            _ => Err(BodyTrackError::NotRecording),
        }
    }

    /// Counters of the current recording.
    pub fn metrics(&self) -> Option<IngestMetrics> {
        match &lock(&self.inner).state {
            RecorderState::Recording { ingest, .. } => Some(ingest.metrics().clone()),
            _ => None,
        }
    }

    /// Stops accepting samples and finalizes the movie on the muxer thread.
    ///
    /// Returns as soon as finalization is scheduled. Completion is reported
    /// through `Finished` or `Failed`. A second call before completion is
    /// rejected with `StopInProgress`.
    #[instrument(skip_all)]
    pub fn stop(&self) -> Result<()> {
        let (ingest, sender, path) = {
            let mut inner = lock(&self.inner);
            match std::mem::replace(&mut inner.state, RecorderState::Finalizing) {
                RecorderState::Recording { ingest, sender, path } => (ingest, sender, path),
                RecorderState::Idle => {
                    inner.state = RecorderState::Idle;
                    return Err(BodyTrackError::NotRecording);
                }
                RecorderState::Finalizing => return Err(BodyTrackError::StopInProgress),
            }
        };

        let end_time = ingest.end_time();
        info!("Stopping recording of {} at {}", path.display(), end_time);
        (self.callback)(RecorderEvent::Recording(false));

        // Dropping the ingest releases the inputs' senders.
        drop(ingest);
        if sender.send(MuxCommand::Finish { end_time }).is_err() {
            lock(&self.inner).state = RecorderState::Idle;
            let e = BodyTrackError::FinalizeFailed("muxer thread is gone".into());
            error!("{}", e);
            return Err(e);
        }
        Ok(())
    }

    /// The capture device was claimed by someone else. A recording in
    /// progress is finalized; the session stays configured, and once the
    /// interruption ends the caller starts a new recording to resume.
    pub fn interrupted(&self) {
        warn!("Capture session interrupted");
        (self.callback)(RecorderEvent::Interrupted);
        if self.is_recording() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop recording after interruption: {}", e);
            }
        }
    }

    pub fn interruption_ended(&self) {
        info!("Capture session interruption ended");
        (self.callback)(RecorderEvent::InterruptionEnded);
    }
}

impl Drop for BodyRecorder {
    fn drop(&mut self) {
        if self.is_recording() {
            warn!("Recorder dropped while recording, finalizing");
            if let Err(e) = self.stop() {
                error!("Failed to finalize dropped recording: {}", e);
            }
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
