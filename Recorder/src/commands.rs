// commands.rs

use std::{error::Error, ops::Range, path::Path, path::PathBuf, sync::Arc, time::Duration};

use body_track::{
    metrics::IngestMetrics, BodyPlayer, BodyRecorder, BodySample, BodyTrackReader, JointSample, PlayerConfig,
    PlayerEvent, RecorderConfig, RecorderEvent, TimedSample,
};
use mp4_box::{format_fourcc, reader::MovieFile};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::generators::{dummy_frame, SyntheticSession, WalkingSkeleton};

type CommandResult = Result<(), Box<dyn Error>>;

/// Captures `frames` frames at the configured rate. Frames whose index
/// falls in `absent` carry no skeleton.
#[instrument(skip_all)]
pub async fn record(
    config: RecorderConfig,
    frames: u64,
    output: Option<PathBuf>,
    absent: Range<u64>,
    print_metrics: bool,
) -> CommandResult {
    let (sender, mut events) = mpsc::unbounded_channel();
    let callback = Arc::new(move |event: RecorderEvent| {
        let _ = sender.send(event);
    });
    let frame_rate = config.frame_rate.max(1);
    let recorder = BodyRecorder::new(config, Box::new(SyntheticSession), callback);

    recorder.start_session()?;
    let path = recorder.start_recording(output)?;

    let walker = WalkingSkeleton::default();
    let frame_interval = Duration::from_secs(1) / frame_rate;
    let mut ticker = tokio::time::interval(frame_interval);
    let origin = std::time::Instant::now();

    for index in 0..frames {
        ticker.tick().await;
        let skeleton = (!absent.contains(&index)).then(|| walker.pose(index as f32 / frame_rate as f32));
        let at = origin + frame_interval * index as u32;
        let outcome = recorder.capture(dummy_frame(index, frame_rate as u64), skeleton.as_ref(), at)?;
        debug!("Frame {}: {:?}", index, outcome);
    }

    let metrics = recorder.metrics();
    recorder.stop()?;

    while let Some(event) = events.recv().await {
        match event {
            RecorderEvent::Finished(finished) => {
                info!("Finished {}", finished.display());
                break;
            }
            RecorderEvent::Failed(e) => return Err(e.into()),
            other => debug!("{:?}", other),
        }
    }
    recorder.stop_session();
    println!("{}", path.display());

    if let Some(metrics) = metrics.filter(|_| print_metrics) {
        print!("{}", encode_metrics(&metrics)?);
    }
    Ok(())
}

fn encode_metrics(metrics: &IngestMetrics) -> Result<String, Box<dyn Error>> {
    let registry = Registry::new();
    metrics.register(&registry)?;
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Prints the joint metadata of `file`. With `realtime` the samples are
/// paced by a [`BodyPlayer`] and the lifecycle events are printed too.
pub async fn play(file: &Path, realtime: bool) -> CommandResult {
    if !realtime {
        for timed in BodyTrackReader::open(file)?.samples() {
            println!("{}", describe_sample(&timed));
        }
        return Ok(());
    }

    let (sender, mut events) = mpsc::unbounded_channel();
    let callback = Arc::new(move |event: PlayerEvent| {
        let _ = sender.send(event);
    });
    let player = BodyPlayer::open(file, PlayerConfig::default(), callback)?;
    info!("Playing {:?} of joint metadata", player.duration());

    while let Some(event) = events.recv().await {
        println!("{}", describe_event(&event));
        if matches!(event, PlayerEvent::ReachedEnd) {
            break;
        }
    }
    player.close();
    Ok(())
}

/// Lists every track of `file`, then the joint metadata track if present.
pub fn inspect(file: &Path) -> CommandResult {
    let movie = MovieFile::open(file)?;
    println!("{} ({} bytes)", file.display(), movie.length());
    for trak in &movie.moov().traks {
        let index = movie.track_index(trak.track_id())?;
        let end = index.presentation_end() as f64 / index.timescale.max(1) as f64;
        println!(
            "  track {} [{}] {} samples, ends at {:.3}s",
            index.track_id,
            format_fourcc(&index.handler_type),
            index.samples.len(),
            end
        );
    }

    let reader = match BodyTrackReader::open(file) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("{}", e);
            println!("  no joint metadata track");
            return Ok(());
        }
    };
    println!(
        "  joint metadata on track {}, describing track {:?}, primary duration {:?}",
        reader.metadata_track_id(),
        reader.primary_track_id(),
        reader.duration()
    );

    let (mut joints, mut absent, mut failed) = (0, 0, 0);
    for timed in reader.samples() {
        match timed.sample {
            Ok(BodySample::Joints(_)) => joints += 1,
            Ok(BodySample::NoSubject) => absent += 1,
            Err(_) => failed += 1,
        }
    }
    println!("  {} joint samples, {} without subject, {} unreadable", joints, absent, failed);
    Ok(())
}

fn describe_sample(timed: &TimedSample) -> String {
    match &timed.sample {
        Ok(BodySample::Joints(sample)) => format!("{:>9.3}s  {}", timed.time.as_secs_f64(), describe_joints(sample)),
        Ok(BodySample::NoSubject) => format!("{:>9.3}s  no subject", timed.time.as_secs_f64()),
        Err(e) => format!("{:>9.3}s  sample {} unreadable: {}", timed.time.as_secs_f64(), timed.index, e),
    }
}

fn describe_event(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::Joints { time, sample } => format!("{:>9.3}s  {}", time.as_secs_f64(), describe_joints(sample)),
        PlayerEvent::NoSubject { time } => format!("{:>9.3}s  no subject", time.as_secs_f64()),
        PlayerEvent::DecodeFailed { index, time, error } => {
            format!("{:>9.3}s  sample {} unreadable: {}", time.as_secs_f64(), index, error)
        }
        PlayerEvent::SubjectPresent { time } => format!("{:>9.3}s  subject appeared", time.as_secs_f64()),
        PlayerEvent::SubjectAbsent { time } => format!("{:>9.3}s  subject left", time.as_secs_f64()),
        PlayerEvent::ReachedEnd => "end of playback".to_string(),
    }
}

fn describe_joints(sample: &JointSample) -> String {
    match sample.root() {
        Some(root) => {
            let position = root.w_axis.truncate();
            format!(
                "{} joints, root at ({:.2}, {:.2}, {:.2})",
                sample.len(),
                position.x,
                position.y,
                position.z
            )
        }
        None if sample.is_empty() => "subject without tracked joints".to_string(),
        None => format!("{} joints without root", sample.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn joints_are_described_by_their_root() {
        let mut sample = JointSample::new();
        assert_eq!(describe_joints(&sample), "subject without tracked joints");

        sample.insert("root", Mat4::from_translation(Vec3::new(1.0, 0.0, -2.5)));
        sample.insert("head_joint", Mat4::IDENTITY);
        assert_eq!(describe_joints(&sample), "2 joints, root at (1.00, 0.00, -2.50)");
    }

    #[test]
    fn end_of_playback_is_printed() {
        assert_eq!(describe_event(&PlayerEvent::ReachedEnd), "end of playback");
        let event = PlayerEvent::SubjectAbsent { time: Duration::from_millis(1500) };
        assert_eq!(describe_event(&event), "    1.500s  subject left");
    }
}
