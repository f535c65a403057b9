// reader/player.rs

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::mpsc,
    time::{sleep_until, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PlayerConfig;
use crate::error::Result;
use crate::events::{PlayerCallback, PlayerEvent};
use crate::writer::SubjectState;

use super::{BodySample, BodyTrackReader, TimedSample, TimedSamples};

enum PlayerCommand {
    Play,
    Pause,
}

/// Playback position: `base` plus the time elapsed since `playing_since`.
#[derive(Debug, Clone, Copy)]
struct Timeline {
    base: Duration,
    playing_since: Option<Instant>,
    duration: Duration,
}

impl Timeline {
    fn position(&self) -> Duration {
        let elapsed = self.playing_since.map_or(Duration::ZERO, |since| since.elapsed());
        (self.base + elapsed).min(self.duration)
    }

    /// Clock instant at which the position reaches `target`.
    fn deadline(&self, target: Duration) -> Option<Instant> {
        self.playing_since.map(|since| since + target.saturating_sub(self.base))
    }
}

/// Plays the joint metadata track of a movie against a playback clock.
///
/// Every event is delivered from the player's own tokio task: a sample at
/// time `t` is delivered when the position reaches `t`. When the position
/// reaches the end of the primary track the player pauses and emits
/// `ReachedEnd`; the next `play` rewinds the position and the metadata
/// cursor to zero together.
pub struct BodyPlayer {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    timeline: Arc<Mutex<Timeline>>,
    cancellation_token: CancellationToken,
}

impl BodyPlayer {
    /// Opens `path` and spawns the playback task on the current runtime.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: PlayerConfig, callback: PlayerCallback) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let samples = BodyTrackReader::open(&path)?.samples();
        let timeline = Arc::new(Mutex::new(Timeline {
            base: Duration::ZERO,
            playing_since: None,
            duration: samples.duration(),
        }));
        let (commands, receiver) = mpsc::unbounded_channel();
        let cancellation_token = CancellationToken::new();

        let task = PlaybackTask {
            path,
            samples,
            pending: None,
            subject: SubjectState::NoSubject,
            ended: false,
            timeline: timeline.clone(),
            callback,
        };
        tokio::spawn(task.run(receiver, cancellation_token.clone()));

        let player = BodyPlayer { commands, timeline, cancellation_token };
        if !config.start_paused {
            player.play();
        }
        Ok(player)
    }

    pub fn play(&self) {
        let _ = self.commands.send(PlayerCommand::Play);
    }

    pub fn pause(&self) {
        let _ = self.commands.send(PlayerCommand::Pause);
    }

    pub fn position(&self) -> Duration {
        lock(&self.timeline).position()
    }

    pub fn duration(&self) -> Duration {
        lock(&self.timeline).duration
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.timeline).playing_since.is_some()
    }

    /// Stops the playback task. The player cannot be restarted.
    pub fn close(&self) {
        self.cancellation_token.cancel();
    }
}

impl Drop for BodyPlayer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

struct PlaybackTask {
    path: PathBuf,
    samples: TimedSamples,
    pending: Option<TimedSample>,
    subject: SubjectState,
    ended: bool,
    timeline: Arc<Mutex<Timeline>>,
    callback: PlayerCallback,
}

impl PlaybackTask {
    #[instrument(skip_all)]
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PlayerCommand>, cancellation_token: CancellationToken) {
        loop {
            if self.pending.is_none() {
                self.pending = self.samples.next();
            }
            let (target, duration) = {
                let timeline = lock(&self.timeline);
                let target = match &self.pending {
                    Some(sample) if sample.time <= timeline.duration => sample.time,
                    _ => timeline.duration,
                };
                (timeline.deadline(target), timeline.duration)
            };

            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    debug!("Playback task stopped");
                    break;
                }
                command = commands.recv() => match command {
                    Some(PlayerCommand::Play) => self.play(),
                    Some(PlayerCommand::Pause) => self.pause(),
                    None => break,
                },
                _ = wait_until(target) => {
                    match self.pending.take() {
                        Some(sample) if sample.time <= duration => self.deliver(sample),
                        Some(sample) => {
                            warn!("Sample {} at {:?} lies past the end at {:?}", sample.index, sample.time, duration);
                            self.reach_end();
                        }
                        None => self.reach_end(),
                    }
                }
            }
        }
    }

    fn play(&mut self) {
        if self.ended {
            match BodyTrackReader::open(&self.path) {
                Ok(reader) => {
                    info!("Rewinding to the start");
                    self.samples = reader.samples();
                    self.pending = None;
                    self.subject = SubjectState::NoSubject;
                    self.ended = false;
                    lock(&self.timeline).base = Duration::ZERO;
                }
                Err(e) => {
                    warn!("Failed to reopen for rewind: {}", e);
                    return;
                }
            }
        }
        let mut timeline = lock(&self.timeline);
        if timeline.playing_since.is_none() {
            timeline.playing_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut timeline = lock(&self.timeline);
        timeline.base = timeline.position();
        timeline.playing_since = None;
    }

    fn reach_end(&mut self) {
        {
            let mut timeline = lock(&self.timeline);
            timeline.base = timeline.duration;
            timeline.playing_since = None;
        }
        self.ended = true;
        info!("Reached the end of playback");
        (self.callback)(PlayerEvent::ReachedEnd);
    }

    fn deliver(&mut self, sample: TimedSample) {
        let time = sample.time;
        match sample.sample {
            Ok(BodySample::Joints(joints)) => {
                // An empty joint sample still counts as no subject for the lifecycle
                if self.subject.observe(!joints.is_empty()) {
                    (self.callback)(self.transition_event(time));
                }
                (self.callback)(PlayerEvent::Joints { time, sample: joints });
            }
            Ok(BodySample::NoSubject) => {
                if self.subject.observe(false) {
                    (self.callback)(self.transition_event(time));
                }
                (self.callback)(PlayerEvent::NoSubject { time });
            }
            Err(error) => {
                warn!("Skipping sample {} at {:?}: {}", sample.index, time, error);
                (self.callback)(PlayerEvent::DecodeFailed { index: sample.index, time, error });
            }
        }
    }

    fn transition_event(&self, time: Duration) -> PlayerEvent {
        if self.subject.is_present() {
            PlayerEvent::SubjectPresent { time }
        } else {
            PlayerEvent::SubjectAbsent { time }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn lock(timeline: &Mutex<Timeline>) -> MutexGuard<'_, Timeline> {
    timeline.lock().unwrap_or_else(PoisonError::into_inner)
}
