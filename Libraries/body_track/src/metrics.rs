// metrics.rs

use prometheus::{IntCounter, Registry};

/// Per-recording counters of accepted and dropped inputs.
///
/// Counters are created unregistered so that several recordings can coexist;
/// call [`IngestMetrics::register`] to expose one set through a registry.
#[derive(Debug, Clone)]
pub struct IngestMetrics {
    pub video_frames_appended: IntCounter,
    pub video_frames_dropped: IntCounter,
    pub metadata_groups_appended: IntCounter,
    pub metadata_groups_dropped: IntCounter,
    pub audio_samples_appended: IntCounter,
    pub audio_samples_dropped: IntCounter,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            video_frames_appended: counter("video_frames_appended", "Video frames handed to the muxer"),
            video_frames_dropped: counter("video_frames_dropped", "Video frames dropped because the video input was not ready"),
            metadata_groups_appended: counter("metadata_groups_appended", "Metadata groups handed to the muxer"),
            metadata_groups_dropped: counter("metadata_groups_dropped", "Metadata groups dropped because the metadata input was not ready"),
            audio_samples_appended: counter("audio_samples_appended", "Audio samples handed to the muxer"),
            audio_samples_dropped: counter("audio_samples_dropped", "Audio samples dropped because the audio input was not ready"),
        }
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        for counter in [
            &self.video_frames_appended,
            &self.video_frames_dropped,
            &self.metadata_groups_appended,
            &self.metadata_groups_dropped,
            &self.audio_samples_appended,
            &self.audio_samples_dropped,
        ] {
            registry.register(Box::new(counter.clone()))?;
        }
        Ok(())
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).expect("Failed to create ingest counter")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_once() {
        let metrics = IngestMetrics::new();
        metrics.metadata_groups_dropped.inc();

        let registry = Registry::new();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());

        let families = registry.gather();
        assert_eq!(families.len(), 6);
        let dropped = families.iter().find(|f| f.get_name() == "metadata_groups_dropped").unwrap();
        assert_eq!(dropped.get_metric()[0].get_counter().get_value(), 1.0);
    }
}
