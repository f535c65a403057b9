//! Reading the joint metadata track back from a finished movie.

mod player;

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use mp4_box::{
    boxes::{
        hdlr::{HANDLER_METADATA, HANDLER_VIDEO},
        stsd::SampleEntry,
        trak::TrakBox,
        tref::CONTENT_DESCRIBES,
    },
    reader::MovieFile,
    sample_table::TrackIndex,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{BodyTrackError, Result};
use crate::joints::JointSample;
use crate::metadata::{MetadataGroup, JOINTS_DATA_TYPE, JOINTS_IDENTIFIER};

pub use player::BodyPlayer;

/// What one metadata sample says about the subject.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySample {
    Joints(JointSample),
    /// The sample is an empty group: no subject at this instant.
    NoSubject,
}

/// A metadata sample placed on the movie timeline.
#[derive(Debug)]
pub struct TimedSample {
    pub index: usize,
    pub time: Duration,
    pub duration: Duration,
    pub sample: Result<BodySample>,
}

/// A movie opened for reading its joint metadata track.
pub struct BodyTrackReader {
    path: PathBuf,
    movie: MovieFile<BufReader<File>>,
    metadata: TrackIndex,
    local_key_id: u32,
    primary: Option<TrackIndex>,
}

impl BodyTrackReader {
    /// Opens `path` and locates the joint metadata track and the video track
    /// it describes. Fails with `TrackNotFound` when no metadata track
    /// declares the joint key.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let movie = MovieFile::open(path).map_err(BodyTrackError::Container)?;

        let (metadata_trak, local_key_id) = movie
            .moov()
            .traks
            .iter()
            .filter(|trak| trak.handler_type() == HANDLER_METADATA)
            .find_map(|trak| joint_key(trak).map(|key| (trak, key)))
            .ok_or_else(|| BodyTrackError::TrackNotFound {
                identifier: JOINTS_IDENTIFIER.to_string(),
                data_type: JOINTS_DATA_TYPE.to_string(),
            })?;

        let primary_id = metadata_trak
            .tref
            .as_ref()
            .and_then(|tref| {
                tref.referenced_tracks(&CONTENT_DESCRIBES)
                    .find(|id| movie.moov().track(*id).is_some_and(|t| t.handler_type() == HANDLER_VIDEO))
            })
            .or_else(|| {
                movie
                    .moov()
                    .traks
                    .iter()
                    .find(|t| t.handler_type() == HANDLER_VIDEO)
                    .map(|t| t.track_id())
            });

        let metadata_id = metadata_trak.track_id();
        let metadata = movie.track_index(metadata_id).map_err(BodyTrackError::Container)?;
        let primary = match primary_id {
            Some(id) => Some(movie.track_index(id).map_err(BodyTrackError::Container)?),
            None => {
                warn!("No video track found, timing playback on the metadata track");
                None
            }
        };

        info!(
            "Found joint metadata track {} with {} samples, primary track {:?}",
            metadata_id,
            metadata.samples.len(),
            primary_id
        );

        Ok(BodyTrackReader {
            path: path.to_path_buf(),
            movie,
            metadata,
            local_key_id,
            primary,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_track_id(&self) -> u32 {
        self.metadata.track_id
    }

    pub fn primary_track_id(&self) -> Option<u32> {
        self.primary.as_ref().map(|p| p.track_id)
    }

    pub fn sample_count(&self) -> usize {
        self.metadata.samples.len()
    }

    /// Length of the primary track on the movie timeline.
    pub fn duration(&self) -> Duration {
        let track = self.primary.as_ref().unwrap_or(&self.metadata);
        to_duration(track.presentation_end(), track.timescale)
    }

    /// Decodes the metadata samples in presentation order, reading each
    /// payload only when the iterator reaches it. A sample that cannot be
    /// read or decoded is yielded as an error; the following ones are not
    /// affected.
    pub fn samples(self) -> TimedSamples {
        TimedSamples { reader: self, next: 0 }
    }
}

/// Local key id under which a metadata track declares the joint key.
fn joint_key(trak: &TrakBox) -> Option<u32> {
    trak.mdia.minf.stbl.stsd.entries.iter().find_map(|entry| match entry {
        SampleEntry::Metadata(mebx) => mebx
            .find_key(JOINTS_IDENTIFIER, JOINTS_DATA_TYPE)
            .map(|key| key.local_key_id),
        _ => None,
    })
}

fn to_duration(units: u64, timescale: u32) -> Duration {
    let nanos = units as u128 * 1_000_000_000 / timescale.max(1) as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}

/// Forward-only iterator over the samples of a [`BodyTrackReader`].
pub struct TimedSamples {
    reader: BodyTrackReader,
    next: usize,
}

impl TimedSamples {
    pub fn duration(&self) -> Duration {
        self.reader.duration()
    }

    fn decode(&mut self, index: usize) -> Result<BodySample> {
        let info = self.reader.metadata.samples[index];
        let bytes = self.reader.movie.read_sample(&info).map_err(BodyTrackError::Container)?;
        let group = MetadataGroup::decode(&bytes)?;
        if group.is_empty() {
            return Ok(BodySample::NoSubject);
        }
        let value = group.value_for(self.reader.local_key_id).ok_or_else(|| {
            BodyTrackError::MalformedPayload(format!("sample {} has no joint item", index))
        })?;
        Ok(BodySample::Joints(JointSample::decode(value)?))
    }
}

impl Iterator for TimedSamples {
    type Item = TimedSample;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let info = *self.reader.metadata.samples.get(index)?;
        self.next += 1;

        let track = &self.reader.metadata;
        let time = to_duration(track.presentation_time(&info), track.timescale);
        let duration = to_duration(info.duration as u64, track.timescale);
        let sample = self.decode(index);
        if let Err(e) = &sample {
            debug!("Sample {} at {:?} failed to decode: {}", index, time, e);
        }
        Some(TimedSample { index, time, duration, sample })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.metadata.samples.len() - self.next;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timescale_units_become_durations() {
        assert_eq!(to_duration(600, 600), Duration::from_secs(1));
        assert_eq!(to_duration(20, 600), Duration::from_nanos(33_333_333));
        assert_eq!(to_duration(5, 0), Duration::from_nanos(5_000_000_000));
    }
}
