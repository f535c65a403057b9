mod common;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use body_track::{
    metrics::IngestMetrics,
    writer::{CaptureIngest, MediaSample, MetadataOutcome, TrackInput},
    BodyTrackError, EmissionPolicy, Result,
};
use common::{frame, skeleton, FRAME};

/// Track input that records what it receives and can be switched off.
#[derive(Clone, Default)]
struct FakeInput {
    ready: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<MediaSample>>>,
}

impl FakeInput {
    fn new() -> Self {
        let input = FakeInput::default();
        input.set_ready(true);
        input
    }

    fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn times(&self) -> Vec<u64> {
        self.samples.lock().unwrap().iter().map(|s| s.time).collect()
    }
}

impl TrackInput for FakeInput {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn append(&mut self, sample: MediaSample) -> Result<()> {
        self.samples.lock().unwrap().push(sample);
        Ok(())
    }
}

fn ingest(policy: EmissionPolicy) -> (CaptureIngest, FakeInput, FakeInput) {
    let video = FakeInput::new();
    let metadata = FakeInput::new();
    let ingest = CaptureIngest::new(
        Box::new(video.clone()),
        Box::new(metadata.clone()),
        None,
        policy,
        600,
        30,
        IngestMetrics::new(),
    );
    (ingest, video, metadata)
}

#[test]
fn busy_metadata_input_drops_only_metadata() {
    let (mut ingest, video, metadata) = ingest(EmissionPolicy::Dense);
    let origin = Instant::now();

    for i in 0..100 {
        metadata.set_ready(!(50..=60).contains(&i));
        let outcome = ingest.capture(frame(i), Some(&skeleton(i)), origin + FRAME * i as u32).unwrap();
        assert!(outcome.video_appended);
        let expected = if (50..=60).contains(&i) { MetadataOutcome::Dropped } else { MetadataOutcome::Appended };
        assert_eq!(outcome.metadata, expected);
    }

    assert_eq!(video.times().len(), 100);
    let times = metadata.times();
    assert_eq!(times.len(), 89);
    assert!(!times.contains(&(50 * 30)));
    assert!(!times.contains(&(60 * 30)));
    assert!(times.contains(&(61 * 30)));
    assert_eq!(ingest.metrics().metadata_groups_dropped.get(), 11);
    assert_eq!(ingest.metrics().metadata_groups_appended.get(), 89);
    assert_eq!(ingest.metrics().video_frames_dropped.get(), 0);
}

#[test]
fn busy_video_input_drops_only_video() {
    let (mut ingest, video, metadata) = ingest(EmissionPolicy::Dense);
    let origin = Instant::now();

    for i in 0..100 {
        video.set_ready(!(50..=60).contains(&i));
        let outcome = ingest.capture(frame(i), Some(&skeleton(i)), origin + FRAME * i as u32).unwrap();
        assert_eq!(outcome.metadata, MetadataOutcome::Appended);
    }

    assert_eq!(video.times().len(), 89);
    assert_eq!(metadata.times().len(), 100);
    assert_eq!(ingest.metrics().video_frames_dropped.get(), 11);
}

#[test]
fn dropped_metadata_does_not_advance_the_subject_state() {
    let (mut ingest, _video, metadata) = ingest(EmissionPolicy::Transitions);
    let origin = Instant::now();

    // The subject appears while the metadata input is busy
    metadata.set_ready(false);
    ingest.capture(frame(0), Some(&skeleton(0)), origin).unwrap();
    metadata.set_ready(true);
    let outcome = ingest.capture(frame(1), Some(&skeleton(1)), origin + FRAME).unwrap();

    assert_eq!(outcome.metadata, MetadataOutcome::Appended);
    assert_eq!(metadata.times(), vec![30]);
    assert!(ingest.subject_state().is_present());
}

#[test]
fn policies_suppress_frames_without_news() {
    let (mut ingest, _video, metadata) = ingest(EmissionPolicy::Transitions);
    let origin = Instant::now();

    let outcomes: Vec<MetadataOutcome> = (0..4)
        .map(|i| {
            let snapshot = (i < 2).then(|| skeleton(i));
            ingest.capture(frame(i), snapshot.as_ref(), origin + FRAME * i as u32).unwrap().metadata
        })
        .collect();

    assert_eq!(
        outcomes,
        vec![
            MetadataOutcome::Appended,
            MetadataOutcome::Suppressed,
            MetadataOutcome::Appended,
            MetadataOutcome::Suppressed,
        ]
    );
    let samples = metadata.samples.lock().unwrap();
    assert!(samples[1].data.is_empty());
}

#[test]
fn times_are_relative_to_the_first_capture() {
    let (mut ingest, video, _metadata) = ingest(EmissionPolicy::Dense);
    let origin = Instant::now() + Duration::from_secs(5);

    assert_eq!(ingest.capture(frame(0), None, origin).unwrap().time, 0);
    // 10 ms at 600 units per second
    assert_eq!(ingest.capture(frame(1), None, origin + Duration::from_millis(10)).unwrap().time, 6);
    assert_eq!(video.times(), vec![0, 6]);
    assert_eq!(ingest.end_time(), 36);
}

#[test]
fn captures_before_the_origin_are_rejected() {
    let (mut ingest, video, _metadata) = ingest(EmissionPolicy::Dense);
    let origin = Instant::now() + Duration::from_secs(5);

    ingest.capture(frame(0), None, origin).unwrap();
    let result = ingest.capture(frame(1), None, origin - Duration::from_millis(1));
    assert!(matches!(result, Err(BodyTrackError::InvalidTime(_))));
    assert_eq!(video.times().len(), 1);
}

#[test]
fn audio_without_a_track_is_ignored() {
    let (mut ingest, _video, _metadata) = ingest(EmissionPolicy::Dense);
    assert!(!ingest.capture_audio(bytes::Bytes::from_static(b"pcm"), Instant::now()).unwrap());
}
