mod common;

use std::{
    sync::{Arc, Mutex, OnceLock, Weak},
    time::{Duration, Instant},
};

use body_track::{
    reader::BodySample, AudioConfig, BodyRecorder, BodyTrackError, BodyTrackReader, CaptureSession,
    EmissionPolicy, RecorderConfig, RecorderEvent, Result,
};
use bytes::Bytes;
use common::*;
use mp4_box::{boxes::hdlr::HANDLER_SOUND, reader::MovieFile};

fn read_all(path: &std::path::Path) -> (Duration, Vec<(Duration, BodySample)>) {
    let reader = BodyTrackReader::open(path).unwrap();
    let duration = reader.duration();
    let samples = reader
        .samples()
        .map(|timed| (timed.time, timed.sample.unwrap()))
        .collect();
    (duration, samples)
}

fn is_present(sample: &BodySample) -> bool {
    matches!(sample, BodySample::Joints(joints) if !joints.is_empty())
}

#[test]
fn dense_recording_has_one_group_per_frame() {
    let path = record(EmissionPolicy::Dense, 40, |i| i < 20);
    let (duration, samples) = read_all(&path);

    assert_eq!(duration, Duration::from_secs(2));
    assert_eq!(samples.len(), 40);
    for (i, (time, sample)) in samples.iter().enumerate() {
        assert_eq!(*time, FRAME * i as u32);
        match sample {
            BodySample::Joints(joints) if i < 20 => {
                assert!(joints.root().is_some());
                assert_eq!(joints.joint("left_hand_joint").is_some(), i % 2 == 0);
            }
            // Untracked frames carry the empty mapping, not an empty group
            BodySample::Joints(joints) => assert!(joints.is_empty()),
            BodySample::NoSubject => panic!("dense recording wrote an empty group at {}", i),
        }
    }
    std::fs::remove_file(path).unwrap();
}

#[test]
fn transitions_recording_keeps_only_edges() {
    let path = record(EmissionPolicy::Transitions, 40, |i| i < 20);
    let (duration, samples) = read_all(&path);

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].0, Duration::ZERO);
    assert!(is_present(&samples[0].1));
    assert_eq!(samples[1], (Duration::from_secs(1), BodySample::NoSubject));
    assert!(samples[1].0 <= duration);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn sparse_absence_recording_marks_each_absence_once() {
    let path = record(EmissionPolicy::SparseAbsence, 40, |i| i < 10 || (20..30).contains(&i));
    let (_, samples) = read_all(&path);

    let absent: Vec<Duration> = samples
        .iter()
        .filter(|(_, s)| *s == BodySample::NoSubject)
        .map(|(t, _)| *t)
        .collect();
    assert_eq!(absent, vec![Duration::from_millis(500), Duration::from_millis(1500)]);
    assert_eq!(samples.iter().filter(|(_, s)| is_present(s)).count(), 20);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn times_are_monotonic_and_within_the_video() {
    let path = record(EmissionPolicy::Dense, 25, |i| i % 3 != 0);
    let reader = BodyTrackReader::open(&path).unwrap();
    let duration = reader.duration();
    let times: Vec<Duration> = reader.samples().map(|s| s.time).collect();

    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert!(times.iter().all(|t| *t <= duration));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn metadata_track_describes_the_video_track() {
    let path = record(EmissionPolicy::Dense, 5, |_| true);
    let reader = BodyTrackReader::open(&path).unwrap();
    assert_eq!(reader.primary_track_id(), Some(1));
    assert_eq!(reader.metadata_track_id(), 2);
    assert_eq!(reader.sample_count(), 5);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn audio_track_is_written_alongside() {
    let config = RecorderConfig { audio: Some(AudioConfig::default()), ..config(EmissionPolicy::Dense) };
    let (recorder, events) = recorder(config);
    let path = recorder.start_recording(Some(temp_movie())).unwrap();

    let origin = Instant::now();
    for i in 0..4 {
        let at = origin + FRAME * i;
        recorder.capture(frame(i as usize), Some(&skeleton(0)), at).unwrap();
        assert!(recorder.capture_audio(Bytes::from_static(&[1, 2, 3, 4]), at).unwrap());
    }
    let metrics = recorder.metrics().unwrap();
    assert_eq!(metrics.audio_samples_appended.get(), 4);
    recorder.stop().unwrap();
    assert_eq!(wait_finished(&events), path);

    let movie = MovieFile::open(&path).unwrap();
    assert_eq!(movie.moov().traks.len(), 3);
    assert_eq!(movie.moov().track(2).unwrap().handler_type(), HANDLER_SOUND);
    assert_eq!(movie.track_index(2).unwrap().samples.len(), 4);

    let reader = BodyTrackReader::open(&path).unwrap();
    assert_eq!(reader.primary_track_id(), Some(1));
    assert_eq!(reader.metadata_track_id(), 3);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn default_path_is_unique_in_the_output_directory() {
    let (recorder, events) = recorder(config(EmissionPolicy::Dense));
    let path = recorder.start_recording(None).unwrap();
    assert_eq!(path.parent(), Some(std::env::temp_dir().as_path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mov"));

    recorder.capture(frame(0), None, Instant::now()).unwrap();
    recorder.stop().unwrap();
    assert_eq!(wait_finished(&events), path);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn lifecycle_calls_are_checked() {
    let (recorder, events) = recorder(config(EmissionPolicy::Dense));
    assert!(matches!(recorder.stop(), Err(BodyTrackError::NotRecording)));
    assert!(matches!(
        recorder.capture(frame(0), None, Instant::now()),
        Err(BodyTrackError::NotRecording)
    ));

    let path = recorder.start_recording(Some(temp_movie())).unwrap();
    assert!(matches!(recorder.start_recording(None), Err(BodyTrackError::AlreadyRecording)));
    assert!(matches!(events.recv().unwrap(), RecorderEvent::Recording(true)));

    recorder.stop().unwrap();
    assert!(matches!(events.recv().unwrap(), RecorderEvent::Recording(false)));
    assert_eq!(wait_finished(&events), path);
    assert!(!recorder.is_recording());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn second_stop_while_finalizing_is_rejected() {
    let slot: Arc<OnceLock<Weak<BodyRecorder>>> = Arc::new(OnceLock::new());
    let second_stop: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
    let (sender, events) = std::sync::mpsc::channel();
    let sender = Mutex::new(sender);

    let callback = {
        let slot = slot.clone();
        let second_stop = second_stop.clone();
        Arc::new(move |event: RecorderEvent| {
            // Recording(false) is emitted after the recorder has entered finalization
            if matches!(event, RecorderEvent::Recording(false)) {
                if let Some(recorder) = slot.get().and_then(Weak::upgrade) {
                    *second_stop.lock().unwrap() = Some(recorder.stop());
                }
            }
            let _ = sender.lock().unwrap().send(event);
        })
    };
    let recorder = Arc::new(BodyRecorder::new(config(EmissionPolicy::Dense), Box::new(NullSession), callback));
    slot.set(Arc::downgrade(&recorder)).unwrap();

    let path = recorder.start_recording(Some(temp_movie())).unwrap();
    recorder.capture(frame(0), Some(&skeleton(0)), Instant::now()).unwrap();
    recorder.stop().unwrap();
    let finished = wait_finished(&events);

    assert!(matches!(*second_stop.lock().unwrap(), Some(Err(BodyTrackError::StopInProgress))));
    assert_eq!(finished, path);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn interruption_finalizes_the_recording() {
    let (recorder, events) = recorder(config(EmissionPolicy::Dense));
    let path = recorder.start_recording(Some(temp_movie())).unwrap();
    recorder.capture(frame(0), Some(&skeleton(0)), Instant::now()).unwrap();

    recorder.interrupted();
    assert_eq!(wait_finished(&events), path);
    recorder.interruption_ended();

    let seen: Vec<RecorderEvent> = events.try_iter().collect();
    assert!(matches!(seen.last(), Some(RecorderEvent::InterruptionEnded)));
    assert_eq!(BodyTrackReader::open(&path).unwrap().sample_count(), 1);
    std::fs::remove_file(path).unwrap();

    let resumed = recorder.start_recording(Some(temp_movie())).unwrap();
    recorder.stop().unwrap();
    assert_eq!(wait_finished(&events), resumed);
    std::fs::remove_file(resumed).unwrap();
}

#[test]
fn dropping_a_recording_recorder_finalizes_the_movie() {
    let (recorder, events) = recorder(config(EmissionPolicy::Dense));
    let path = recorder.start_recording(Some(temp_movie())).unwrap();
    let origin = Instant::now();
    for i in 0..5 {
        recorder.capture(frame(i), Some(&skeleton(i)), origin + FRAME * i as u32).unwrap();
    }
    drop(recorder);

    assert_eq!(wait_finished(&events), path);
    let (duration, samples) = read_all(&path);
    assert_eq!(samples.len(), 5);
    assert_eq!(duration, FRAME * 5);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn failed_container_setup_leaves_no_file() {
    let (recorder, events) = recorder(RecorderConfig { timescale: 0, ..config(EmissionPolicy::Dense) });
    let path = temp_movie();

    assert!(matches!(recorder.start_recording(Some(path.clone())), Err(BodyTrackError::SetupFailed(_))));
    assert!(matches!(events.recv().unwrap(), RecorderEvent::SetupFailed(_)));
    assert!(!path.exists());
    assert!(!recorder.is_recording());
}

struct BrokenSession;

impl CaptureSession for BrokenSession {
    fn configure(&mut self, _config: &RecorderConfig) -> Result<()> {
        Err(BodyTrackError::SetupFailed("camera unavailable".into()))
    }

    fn start_running(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_running(&mut self) {}
}

#[test]
fn setup_failures_are_reported() {
    let (sender, events) = std::sync::mpsc::channel();
    let sender = Mutex::new(sender);
    let callback = Arc::new(move |event: RecorderEvent| {
        let _ = sender.lock().unwrap().send(event);
    });
    let recorder = BodyRecorder::new(config(EmissionPolicy::Dense), Box::new(BrokenSession), callback);

    assert!(matches!(recorder.start_session(), Err(BodyTrackError::SetupFailed(_))));
    assert!(matches!(events.recv().unwrap(), RecorderEvent::SetupFailed(_)));
    assert!(!recorder.is_running());

    let missing = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4())).join("out.mov");
    assert!(matches!(recorder.start_recording(Some(missing)), Err(BodyTrackError::SetupFailed(_))));
    assert!(matches!(events.recv().unwrap(), RecorderEvent::SetupFailed(_)));
    assert!(!recorder.is_recording());
}

#[test]
fn session_running_changes_are_reported_once() {
    let (recorder, events) = recorder(config(EmissionPolicy::Dense));
    recorder.start_session().unwrap();
    recorder.set_running(true);
    recorder.stop_session();

    let seen: Vec<RecorderEvent> = events.try_iter().collect();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[0], RecorderEvent::Running(true)));
    assert!(matches!(seen[1], RecorderEvent::Running(false)));
}
