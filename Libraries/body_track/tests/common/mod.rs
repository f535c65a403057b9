#![allow(dead_code)]

use std::{
    fs::File,
    io::BufWriter,
    path::PathBuf,
    sync::{mpsc, Arc},
    time::{Duration, Instant},
};

use body_track::{
    metadata::MetadataGroup, BodyRecorder, CaptureSession, EmissionPolicy, JointSample, RecorderConfig,
    RecorderEvent, Result, SkeletonSnapshot, TrackedJoint, VideoFrame,
};
use bytes::Bytes;
use glam::{Mat4, Vec3};
use mp4_box::{
    boxes::{
        ftyp::FtypBox,
        mebx::MetadataSampleEntry,
        stsd::{SampleEntry, VisualSampleEntry},
        tref::CONTENT_DESCRIBES,
    },
    writer::{MediaKind, MovieWriter, TrackConfig},
};
use uuid::Uuid;

pub const FRAME: Duration = Duration::from_millis(50);

pub fn temp_movie() -> PathBuf {
    std::env::temp_dir().join(format!("body_track_test_{}.mov", Uuid::new_v4()))
}

pub struct NullSession;

impl CaptureSession for NullSession {
    fn configure(&mut self, _config: &RecorderConfig) -> Result<()> {
        Ok(())
    }

    fn start_running(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_running(&mut self) {}
}

pub fn config(policy: EmissionPolicy) -> RecorderConfig {
    RecorderConfig {
        frame_rate: 20,
        emission: policy,
        queue_depth: 4096,
        ..Default::default()
    }
}

pub fn recorder(config: RecorderConfig) -> (BodyRecorder, mpsc::Receiver<RecorderEvent>) {
    let (sender, receiver) = mpsc::channel();
    let sender = std::sync::Mutex::new(sender);
    let callback = Arc::new(move |event: RecorderEvent| {
        let _ = sender.lock().unwrap().send(event);
    });
    (BodyRecorder::new(config, Box::new(NullSession), callback), receiver)
}

pub fn skeleton(frame: usize) -> SkeletonSnapshot {
    let step = frame as f32 * 0.25;
    SkeletonSnapshot {
        root: Mat4::from_translation(Vec3::new(step, 0.0, -1.0)),
        joints: vec![
            TrackedJoint {
                name: "head_joint".into(),
                transform: Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)),
                tracked: true,
            },
            TrackedJoint {
                name: "left_hand_joint".into(),
                transform: Mat4::from_translation(Vec3::new(-0.25, step, 0.0)),
                tracked: frame % 2 == 0,
            },
        ],
    }
}

pub fn frame(index: usize) -> VideoFrame {
    VideoFrame {
        data: Bytes::from(vec![index as u8; 32]),
        is_sync: index % 10 == 0,
    }
}

/// Waits for the recording to complete and returns the finished path.
pub fn wait_finished(events: &mpsc::Receiver<RecorderEvent>) -> PathBuf {
    loop {
        match events.recv_timeout(Duration::from_secs(10)).expect("recording did not finish") {
            RecorderEvent::Finished(path) => return path,
            RecorderEvent::Failed(e) => panic!("recording failed: {}", e),
            _ => {}
        }
    }
}

/// Records `frames` frames, 50 ms apart; frame `i` sees a subject when
/// `present(i)` holds.
pub fn record(policy: EmissionPolicy, frames: usize, present: impl Fn(usize) -> bool) -> PathBuf {
    let (recorder, events) = recorder(config(policy));
    recorder.start_recording(Some(temp_movie())).unwrap();

    let origin = Instant::now();
    for i in 0..frames {
        let snapshot = present(i).then(|| skeleton(i));
        recorder.capture(frame(i), snapshot.as_ref(), origin + FRAME * i as u32).unwrap();
    }
    recorder.stop().unwrap();
    wait_finished(&events)
}

pub const FRAME_UNITS: u64 = 20;

pub fn video_track() -> TrackConfig {
    TrackConfig {
        kind: MediaKind::Video { width: 64, height: 48 },
        timescale: 600,
        sample_entry: SampleEntry::Visual(VisualSampleEntry { width: 64, height: 48, ..Default::default() }),
        handler_name: "Video".into(),
    }
}

pub fn metadata_track(entry: MetadataSampleEntry) -> TrackConfig {
    TrackConfig {
        kind: MediaKind::Metadata,
        timescale: 600,
        sample_entry: SampleEntry::Metadata(entry),
        handler_name: "Metadata".into(),
    }
}

pub fn joints_at(x: f32) -> Bytes {
    let mut sample = JointSample::new();
    sample.insert("root", Mat4::from_translation(Vec3::new(x, 0.0, 0.0)));
    sample.insert("head", Mat4::IDENTITY);
    MetadataGroup::joints(&sample).unwrap().encode()
}

/// Writes a movie with `frames` video frames and the given metadata samples,
/// each placed on the frame of the same index.
pub fn write_movie(entry: MetadataSampleEntry, frames: u64, samples: &[Bytes]) -> PathBuf {
    let path = temp_movie();
    let file = BufWriter::new(File::create(&path).unwrap());
    let mut writer = MovieWriter::new(file, &FtypBox::default(), 600).unwrap();
    let video = writer.add_track(video_track());
    let metadata = writer.add_track(metadata_track(entry));
    writer.add_reference(metadata, CONTENT_DESCRIBES, video).unwrap();

    for frame in 0..frames {
        writer.write_sample(video, &[0; 16], frame * FRAME_UNITS, frame == 0).unwrap();
        if let Some(sample) = samples.get(frame as usize) {
            writer.write_sample(metadata, sample, frame * FRAME_UNITS, true).unwrap();
        }
    }
    writer.finish(frames * FRAME_UNITS).unwrap();
    path
}
