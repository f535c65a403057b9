// writer/muxer.rs

use std::{
    collections::HashMap,
    fs::File,
    io::BufWriter,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread,
};

use bytes::Bytes;
use mp4_box::writer::MovieWriter;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{BodyTrackError, Result};

use super::ingest::{MediaSample, TrackInput};

pub(crate) enum MuxCommand {
    Sample { track_id: u32, data: Bytes, time: u64, is_sync: bool },
    Finish { end_time: u64 },
}

/// Track input backed by the muxer thread.
///
/// At most `capacity` samples may be queued for the track at once; the
/// muxer releases a slot after writing each sample.
pub(crate) struct QueuedTrackInput {
    track_id: u32,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
    sender: mpsc::Sender<MuxCommand>,
}

impl QueuedTrackInput {
    pub(crate) fn new(track_id: u32, in_flight: Arc<AtomicUsize>, capacity: usize, sender: mpsc::Sender<MuxCommand>) -> Self {
        QueuedTrackInput { track_id, in_flight, capacity: capacity.max(1), sender }
    }
}

impl TrackInput for QueuedTrackInput {
    fn is_ready(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) < self.capacity
    }

    fn append(&mut self, sample: MediaSample) -> Result<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let command = MuxCommand::Sample {
            track_id: self.track_id,
            data: sample.data,
            time: sample.time,
            is_sync: sample.is_sync,
        };
        self.sender.send(command).map_err(|_| {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            BodyTrackError::Container(format!("muxer for track {} has stopped", self.track_id))
        })
    }
}

/// Starts the thread that owns the movie writer.
///
/// Samples are written in arrival order. The first write error is kept and
/// reported when finalizing; later samples are discarded. `on_done` runs on
/// the muxer thread once the file is complete or has failed.
pub(crate) fn start_muxer_thread<F>(
    writer: MovieWriter<BufWriter<File>>,
    path: PathBuf,
    in_flight: HashMap<u32, Arc<AtomicUsize>>,
    on_done: F,
) -> Result<mpsc::Sender<MuxCommand>>
where
    F: FnOnce(Result<PathBuf>) + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let thread_name = format!("MUXER {}", path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default());

    thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let result = run_muxer(writer, &path, &in_flight, receiver);
            on_done(result.map(|_| path));
        })
        .map_err(|e| BodyTrackError::SetupFailed(format!("failed to start muxer thread: {}", e)))?;

    Ok(sender)
}

#[instrument(skip_all, fields(path = %path.display()))]
fn run_muxer(
    mut writer: MovieWriter<BufWriter<File>>,
    path: &std::path::Path,
    in_flight: &HashMap<u32, Arc<AtomicUsize>>,
    receiver: mpsc::Receiver<MuxCommand>,
) -> Result<()> {
    let mut first_error: Option<String> = None;
    let mut latest_time = 0u64;

    let end_time = loop {
        match receiver.recv() {
            Ok(MuxCommand::Sample { track_id, data, time, is_sync }) => {
                if first_error.is_none() {
                    if let Err(e) = writer.write_sample(track_id, &data, time, is_sync) {
                        error!("Failed to write sample on track {}: {}", track_id, e);
                        first_error = Some(e);
                    }
                }
                latest_time = latest_time.max(time);
                if let Some(counter) = in_flight.get(&track_id) {
                    counter.fetch_sub(1, Ordering::AcqRel);
                }
            }
            Ok(MuxCommand::Finish { end_time }) => break end_time,
            Err(_) => {
                warn!("Recorder went away without stopping, finalizing at {}", latest_time);
                break latest_time;
            }
        }
    };

    if let Some(e) = first_error {
        return Err(BodyTrackError::FinalizeFailed(e));
    }

    debug!("Finalizing movie at end time {}", end_time);
    let out = writer.finish(end_time).map_err(BodyTrackError::FinalizeFailed)?;
    let file = out
        .into_inner()
        .map_err(|e| BodyTrackError::FinalizeFailed(e.error().to_string()))?;
    file.sync_all()
        .map_err(|e| BodyTrackError::FinalizeFailed(e.to_string()))?;

    info!("Finished writing {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: u64) -> MediaSample {
        MediaSample { data: Bytes::from_static(b"frame"), time, is_sync: true }
    }

    #[test]
    fn queue_is_ready_until_capacity_is_in_flight() {
        let (sender, receiver) = mpsc::channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut input = QueuedTrackInput::new(3, in_flight.clone(), 2, sender);

        assert!(input.is_ready());
        input.append(sample(0)).unwrap();
        assert!(input.is_ready());
        input.append(sample(20)).unwrap();
        assert!(!input.is_ready());
        assert_eq!(in_flight.load(Ordering::Acquire), 2);

        // The muxer writes one sample and releases its slot
        match receiver.recv().unwrap() {
            MuxCommand::Sample { track_id, time, .. } => assert_eq!((track_id, time), (3, 0)),
            MuxCommand::Finish { .. } => panic!("unexpected finish"),
        }
        in_flight.fetch_sub(1, Ordering::AcqRel);
        assert!(input.is_ready());
    }

    #[test]
    fn zero_capacity_still_admits_one_sample() {
        let (sender, _receiver) = mpsc::channel();
        let mut input = QueuedTrackInput::new(1, Arc::new(AtomicUsize::new(0)), 0, sender);
        assert!(input.is_ready());
        input.append(sample(0)).unwrap();
        assert!(!input.is_ready());
    }

    #[test]
    fn failed_send_releases_the_slot() {
        let (sender, receiver) = mpsc::channel();
        drop(receiver);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut input = QueuedTrackInput::new(2, in_flight.clone(), 1, sender);

        assert!(matches!(input.append(sample(0)), Err(BodyTrackError::Container(_))));
        assert_eq!(in_flight.load(Ordering::Acquire), 0);
        assert!(input.is_ready());
    }
}
