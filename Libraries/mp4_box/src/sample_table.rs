//! Flattening of a track's sample table into one record per sample.

use std::collections::HashSet;

use crate::{
    boxes::{stbl::StblBox, trak::TrakBox},
    format_fourcc, rescale,
};

/// Location and timing of one sample, in media timescale units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub offset: u64,
    pub size: u32,
    pub decode_time: u64,
    pub duration: u32,
    pub is_sync: bool,
}

/// Walks `stsc`/`stco`/`stsz`/`stts`/`stss` and returns every sample in decode order.
pub fn flatten(stbl: &StblBox) -> Result<Vec<SampleInfo>, String> {
    let sample_count = stbl.stsz.sample_count as usize;

    let chunk_offsets: Vec<u64> = match (&stbl.stco, &stbl.co64) {
        (Some(stco), _) => stco.entries.iter().map(|&o| o as u64).collect(),
        (None, Some(co64)) => co64.entries.clone(),
        (None, None) if sample_count == 0 => Vec::new(),
        (None, None) => return Err("Sample table has samples but no chunk offsets".into()),
    };

    let mut locations: Vec<(u64, u32)> = Vec::with_capacity(sample_count.min(1 << 16));
    for (i, run) in stbl.stsc.entries.iter().enumerate() {
        if run.first_chunk == 0 {
            return Err("STSC chunk numbers start at 1".into());
        }
        let first = run.first_chunk as usize - 1;
        let end = stbl
            .stsc
            .entries
            .get(i + 1)
            .map(|next| (next.first_chunk as usize).saturating_sub(1))
            .unwrap_or(chunk_offsets.len())
            .min(chunk_offsets.len());

        for &chunk_offset in chunk_offsets.get(first..end).unwrap_or(&[]) {
            let mut offset = chunk_offset;
            for _ in 0..run.samples_per_chunk {
                if locations.len() == sample_count {
                    break;
                }
                let size = stbl
                    .stsz
                    .size_of(locations.len())
                    .ok_or_else(|| format!("Missing size for sample {}", locations.len()))?;
                locations.push((offset, size));
                offset += size as u64;
            }
        }
    }
    if locations.len() != sample_count {
        return Err(format!(
            "Sample table declares {} samples but its chunks hold {}",
            sample_count,
            locations.len()
        ));
    }

    let mut timing = Vec::with_capacity(locations.len());
    let mut decode_time = 0u64;
    'runs: for run in &stbl.stts.entries {
        for _ in 0..run.sample_count {
            if timing.len() == sample_count {
                break 'runs;
            }
            timing.push((decode_time, run.sample_delta));
            decode_time += run.sample_delta as u64;
        }
    }
    if timing.len() != sample_count {
        return Err(format!("STTS covers {} of {} samples", timing.len(), sample_count));
    }

    let sync: Option<HashSet<u32>> = stbl.stss.as_ref().map(|stss| stss.entries.iter().copied().collect());

    Ok(locations
        .into_iter()
        .zip(timing)
        .enumerate()
        .map(|(index, ((offset, size), (decode_time, duration)))| SampleInfo {
            offset,
            size,
            decode_time,
            duration,
            is_sync: sync.as_ref().map_or(true, |s| s.contains(&(index as u32 + 1))),
        })
        .collect())
}

/// A track's samples placed on the movie timeline.
///
/// Leading empty edits delay the track by `presentation_offset`; the first
/// normal edit starts playback at `media_start`. Later edits are ignored.
#[derive(Debug, Clone)]
pub struct TrackIndex {
    pub track_id: u32,
    pub handler_type: [u8; 4],
    pub timescale: u32,
    pub media_duration: u64,
    pub presentation_offset: u64,
    pub media_start: u64,
    pub samples: Vec<SampleInfo>,
}

impl TrackIndex {
    pub fn from_trak(trak: &TrakBox, movie_timescale: u32) -> Result<Self, String> {
        let timescale = trak.mdia.mdhd.timescale;
        if timescale == 0 {
            return Err(format!("Track {} has a zero timescale", trak.track_id()));
        }
        let samples = flatten(&trak.mdia.minf.stbl)
            .map_err(|e| format!("Track {} ({}): {}", trak.track_id(), format_fourcc(&trak.handler_type()), e))?;
        let media_duration = samples.iter().map(|s| s.duration as u64).sum();

        let mut presentation_offset = 0;
        let mut media_start = 0;
        if let Some(elst) = trak.edts.as_ref().and_then(|edts| edts.elst.as_ref()) {
            for entry in &elst.entries {
                if entry.is_empty_edit() {
                    presentation_offset += rescale(entry.segment_duration, movie_timescale, timescale);
                } else {
                    media_start = entry.media_time.max(0) as u64;
                    break;
                }
            }
        }

        Ok(TrackIndex {
            track_id: trak.track_id(),
            handler_type: trak.handler_type(),
            timescale,
            media_duration,
            presentation_offset,
            media_start,
            samples,
        })
    }

    /// Presentation time of `sample` in media timescale units.
    pub fn presentation_time(&self, sample: &SampleInfo) -> u64 {
        (sample.decode_time + self.presentation_offset).saturating_sub(self.media_start)
    }

    /// End of the track on the movie timeline, in media timescale units.
    pub fn presentation_end(&self) -> u64 {
        (self.media_duration + self.presentation_offset).saturating_sub(self.media_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{
        stco::StcoBox,
        stsc::{StscBox, StscEntry},
        stss::StssBox,
        stsz::StszBox,
        stts::SttsBox,
    };

    #[test]
    fn multi_sample_chunks_are_laid_out_back_to_back() {
        let stbl = StblBox {
            stts: SttsBox::from_durations([10, 10, 20]),
            stss: Some(StssBox { entries: vec![1, 3], ..Default::default() }),
            stsc: StscBox {
                entries: vec![
                    StscEntry { first_chunk: 1, samples_per_chunk: 2, sample_description_index: 1 },
                    StscEntry { first_chunk: 2, samples_per_chunk: 1, sample_description_index: 1 },
                ],
                ..Default::default()
            },
            stsz: StszBox::from_sizes(vec![4, 6, 5]),
            stco: Some(StcoBox { entries: vec![100, 500], ..Default::default() }),
            ..Default::default()
        };

        let samples = flatten(&stbl).unwrap();
        let layout: Vec<_> = samples.iter().map(|s| (s.offset, s.size, s.decode_time, s.is_sync)).collect();
        assert_eq!(layout, vec![(100, 4, 0, true), (104, 6, 10, false), (500, 5, 20, true)]);
    }

    #[test]
    fn short_time_table_is_rejected() {
        let stbl = StblBox {
            stts: SttsBox::from_durations([10]),
            stsz: StszBox::from_sizes(vec![4, 4]),
            stco: Some(StcoBox { entries: vec![0, 4], ..Default::default() }),
            ..Default::default()
        };
        assert!(flatten(&stbl).is_err());
    }
}
