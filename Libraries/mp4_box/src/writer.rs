use std::io::{Seek, SeekFrom, Write};

use crate::boxes::{
    co64::Co64Box,
    dinf::DinfBox,
    edts::EdtsBox,
    elst::{ElstBox, ElstEntry},
    ftyp::FtypBox,
    generic::Mp4Box,
    hdlr::{HdlrBox, HANDLER_METADATA, HANDLER_SOUND, HANDLER_VIDEO},
    mdat::{write_large_header, LARGE_HEADER_SIZE},
    mdhd::MdhdBox,
    mdia::MdiaBox,
    minf::MinfBox,
    moov::MoovBox,
    mvhd::MvhdBox,
    nmhd::NmhdBox,
    smhd::SmhdBox,
    stbl::StblBox,
    stco::StcoBox,
    stsc::StscBox,
    stsd::{SampleEntry, StsdBox},
    stss::StssBox,
    stsz::StszBox,
    stts::SttsBox,
    tkhd::{TkhdBox, TRACK_ENABLED, TRACK_IN_MOVIE, TRACK_IN_PREVIEW},
    trak::TrakBox,
    tref::{TrackReference, TrefBox},
    vmhd::VmhdBox,
};
use crate::rescale;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video { width: u16, height: u16 },
    Audio,
    Metadata,
}

#[derive(Clone, Debug)]
pub struct TrackConfig {
    pub kind: MediaKind,
    pub timescale: u32,            // Media time units per second
    pub sample_entry: SampleEntry, // The single sample description of the track
    pub handler_name: String,
}

struct WrittenSample {
    offset: u64,
    size: u32,
    time: u64,
    is_sync: bool,
}

struct TrackState {
    track_id: u32,
    config: TrackConfig,
    samples: Vec<WrittenSample>,
    references: Vec<TrackReference>,
}

/// Writes a non-fragmented movie incrementally.
///
/// `new` emits `ftyp` and an `mdat` header with a 64-bit size placeholder.
/// Every `write_sample` appends the payload straight to the output as its
/// own chunk. `finish` patches the `mdat` size and appends `moov`, so the
/// output stays a valid movie only once `finish` returns.
pub struct MovieWriter<W: Write + Seek> {
    out: W,
    movie_timescale: u32,
    mdat_start: u64,
    position: u64,
    tracks: Vec<TrackState>,
}

impl<W: Write + Seek> MovieWriter<W> {
    pub fn new(mut out: W, ftyp: &FtypBox, movie_timescale: u32) -> Result<Self, String> {
        if movie_timescale == 0 {
            return Err("Movie timescale must be non-zero".into());
        }
        let mut header = Vec::new();
        ftyp.write_box(&mut header);
        let mdat_start = header.len() as u64;
        write_large_header(&mut header, LARGE_HEADER_SIZE);

        out.write_all(&header)
            .map_err(|e| format!("Failed to write movie header: {}", e))?;

        Ok(MovieWriter {
            out,
            movie_timescale,
            mdat_start,
            position: header.len() as u64,
            tracks: Vec::new(),
        })
    }

    /// Declares a track and returns its id. Ids start at 1 in declaration order.
    pub fn add_track(&mut self, config: TrackConfig) -> u32 {
        let track_id = self.tracks.len() as u32 + 1;
        self.tracks.push(TrackState {
            track_id,
            config,
            samples: Vec::new(),
            references: Vec::new(),
        });
        track_id
    }

    /// Records that track `from` references track `to` with `reference_type` (e.g. `cdsc`).
    pub fn add_reference(&mut self, from: u32, reference_type: [u8; 4], to: u32) -> Result<(), String> {
        if self.track(to).is_none() {
            return Err(format!("Referenced track {} does not exist", to));
        }
        let track = self.track_mut(from)?;
        match track.references.iter_mut().find(|r| r.reference_type == reference_type) {
            Some(reference) => reference.track_ids.push(to),
            None => track.references.push(TrackReference { reference_type, track_ids: vec![to] }),
        }
        Ok(())
    }

    /// Appends one sample. `time` is the presentation time in the track's
    /// timescale and may not go backwards within a track.
    pub fn write_sample(&mut self, track_id: u32, data: &[u8], time: u64, is_sync: bool) -> Result<(), String> {
        let offset = self.position;
        let track = self.track_mut(track_id)?;
        if let Some(last) = track.samples.last() {
            if time < last.time {
                return Err(format!(
                    "Sample time {} precedes previous sample time {} on track {}",
                    time, last.time, track_id
                ));
            }
        }
        if data.len() > u32::MAX as usize {
            return Err("Sample larger than 4 GiB".into());
        }
        track.samples.push(WrittenSample { offset, size: data.len() as u32, time, is_sync });

        self.out
            .write_all(data)
            .map_err(|e| format!("Failed to write sample on track {}: {}", track_id, e))?;
        self.position += data.len() as u64;
        Ok(())
    }

    pub fn sample_count(&self, track_id: u32) -> usize {
        self.track(track_id).map_or(0, |t| t.samples.len())
    }

    /// Completes the file. Every track's last sample lasts until `end_time`
    /// (movie timescale), so all tracks end together.
    pub fn finish(mut self, end_time: u64) -> Result<W, String> {
        let mdat_size = self.position - self.mdat_start;
        let io = |e: std::io::Error| format!("Failed to finalize movie: {}", e);
        self.out.seek(SeekFrom::Start(self.mdat_start + 8)).map_err(io)?;
        self.out.write_all(&mdat_size.to_be_bytes()).map_err(io)?;
        self.out.seek(SeekFrom::Start(self.position)).map_err(io)?;

        let moov = self.build_moov(end_time);
        let mut buffer = Vec::with_capacity(moov.box_size() as usize);
        moov.write_box(&mut buffer);
        self.out.write_all(&buffer).map_err(io)?;
        self.out.flush().map_err(io)?;
        Ok(self.out)
    }

    fn track(&self, track_id: u32) -> Option<&TrackState> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    fn track_mut(&mut self, track_id: u32) -> Result<&mut TrackState, String> {
        self.tracks
            .iter_mut()
            .find(|t| t.track_id == track_id)
            .ok_or_else(|| format!("Unknown track {}", track_id))
    }

    fn build_moov(&self, end_time: u64) -> MoovBox {
        let traks: Vec<TrakBox> = self
            .tracks
            .iter()
            .map(|track| build_trak(track, self.movie_timescale, end_time))
            .collect();
        let duration = traks.iter().map(|t| t.tkhd.duration).max().unwrap_or(0);

        MoovBox {
            mvhd: MvhdBox {
                version: if duration > u32::MAX as u64 { 1 } else { 0 },
                timescale: self.movie_timescale,
                duration,
                next_track_id: self.tracks.len() as u32 + 1,
                ..Default::default()
            },
            traks,
        }
    }
}

fn build_trak(track: &TrackState, movie_timescale: u32, end_time: u64) -> TrakBox {
    let timescale = track.config.timescale;
    let end_media = rescale(end_time, movie_timescale, timescale);

    let durations: Vec<u32> = track
        .samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let next = match track.samples.get(i + 1) {
                Some(next) => next.time,
                None => end_media.max(sample.time + 1),
            };
            (next - sample.time).min(u32::MAX as u64) as u32
        })
        .collect();
    let media_duration: u64 = durations.iter().map(|&d| d as u64).sum();
    let first_time = track.samples.first().map_or(0, |s| s.time);

    let edts = (first_time > 0 && !track.samples.is_empty()).then(|| EdtsBox {
        elst: Some(ElstBox::with_entries(vec![
            ElstEntry::empty(rescale(first_time, timescale, movie_timescale)),
            ElstEntry::normal(rescale(media_duration, timescale, movie_timescale), 0),
        ])),
    });
    let track_duration = rescale(first_time + media_duration, timescale, movie_timescale);

    let offsets: Vec<u64> = track.samples.iter().map(|s| s.offset).collect();
    let (stco, co64) = if offsets.iter().any(|&o| o > u32::MAX as u64) {
        (None, Some(Co64Box { entries: offsets, ..Default::default() }))
    } else {
        (Some(StcoBox { entries: offsets.iter().map(|&o| o as u32).collect(), ..Default::default() }), None)
    };

    let stss = track.samples.iter().any(|s| !s.is_sync).then(|| StssBox {
        entries: track
            .samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_sync)
            .map(|(i, _)| i as u32 + 1)
            .collect(),
        ..Default::default()
    });

    let stbl = StblBox {
        stsd: StsdBox::single(track.config.sample_entry.clone()),
        stts: SttsBox::from_durations(durations),
        stss,
        stsc: if track.samples.is_empty() {
            StscBox { entries: Vec::new(), ..Default::default() }
        } else {
            StscBox::default()
        },
        stsz: StszBox::from_sizes(track.samples.iter().map(|s| s.size).collect()),
        stco,
        co64,
    };

    let (handler_type, flags, volume, width, height) = match track.config.kind {
        MediaKind::Video { width, height } => (
            HANDLER_VIDEO,
            TRACK_ENABLED | TRACK_IN_MOVIE | TRACK_IN_PREVIEW,
            0,
            (width as u32) << 16,
            (height as u32) << 16,
        ),
        MediaKind::Audio => (HANDLER_SOUND, TRACK_ENABLED | TRACK_IN_MOVIE | TRACK_IN_PREVIEW, 0x0100, 0, 0),
        MediaKind::Metadata => (HANDLER_METADATA, TRACK_ENABLED | TRACK_IN_MOVIE, 0, 0, 0),
    };

    let minf = MinfBox {
        vmhd: matches!(track.config.kind, MediaKind::Video { .. }).then(VmhdBox::default),
        smhd: matches!(track.config.kind, MediaKind::Audio).then(SmhdBox::default),
        nmhd: matches!(track.config.kind, MediaKind::Metadata).then(NmhdBox::default),
        dinf: DinfBox::default(),
        stbl,
    };

    TrakBox {
        tkhd: TkhdBox {
            version: if track_duration > u32::MAX as u64 { 1 } else { 0 },
            flags,
            track_id: track.track_id,
            duration: track_duration,
            volume,
            width,
            height,
            ..Default::default()
        },
        tref: (!track.references.is_empty()).then(|| TrefBox { references: track.references.clone() }),
        edts,
        mdia: MdiaBox {
            mdhd: MdhdBox {
                version: if media_duration > u32::MAX as u64 { 1 } else { 0 },
                timescale,
                duration: media_duration,
                ..Default::default()
            },
            hdlr: HdlrBox {
                handler_type,
                name: track.config.handler_name.clone(),
                ..Default::default()
            },
            minf,
        },
    }
}
