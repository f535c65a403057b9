// clock.rs

use std::time::Instant;

/// Source of capture instants shared by every track of a recording.
///
/// Instants only need to be comparable with each other; the recorder maps
/// the first one it sees to time zero.
pub trait PresentationClock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The host's monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostClock;

impl PresentationClock for HostClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
