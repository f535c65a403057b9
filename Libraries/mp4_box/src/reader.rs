use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::boxes::{
    co64::Co64Box,
    dinf::DinfBox,
    dref::DrefBox,
    edts::EdtsBox,
    elst::ElstBox,
    enums::Mp4BoxEnum,
    ftyp::FtypBox,
    generic::{Mp4Box, UnknownBox},
    hdlr::HdlrBox,
    mdat::{read_extended_header, MdatBox, LARGE_HEADER_SIZE},
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
    stsd::StsdBox,
    stss::StssBox,
    stsz::StszBox,
    stts::SttsBox,
    tkhd::TkhdBox,
    trak::TrakBox,
    tref::TrefBox,
    vmhd::VmhdBox,
};
use crate::format_fourcc;
use crate::sample_table::{SampleInfo, TrackIndex};

pub fn parse_mp4_boxes(mut data: &[u8]) -> Result<Vec<Mp4BoxEnum>, String> {
    let mut boxes = Vec::new();

    while !data.is_empty() {
        if data.len() < 8 {
            return Err("Remaining data too small for MP4 box header".into());
        }

        let (mp4_box, consumed) = read_mp4_box(data)?;

        boxes.push(mp4_box);

        if consumed == 0 || consumed > data.len() {
            return Err("Invalid box size detected".into());
        }

        data = &data[consumed..];
    }

    Ok(boxes)
}

pub fn read_mp4_box(data: &[u8]) -> Result<(Mp4BoxEnum, usize), String> {
    let (box_type, header, total) = read_extended_header(data, data.len() as u64)?;

    match &box_type {
        b"co64" => Co64Box::read_box(data).map(|(b, s)| (Mp4BoxEnum::Co64(b), s)),
        b"dinf" => DinfBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Dinf(b), s)),
        b"dref" => DrefBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Dref(b), s)),
        b"edts" => EdtsBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Edts(b), s)),
        b"elst" => ElstBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Elst(b), s)),
        b"ftyp" => FtypBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Ftyp(b), s)),
        b"hdlr" => HdlrBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Hdlr(b), s)),
        b"mdat" => MdatBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Mdat(b), s)),
        b"mdhd" => MdhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Mdhd(b), s)),
        b"mdia" => MdiaBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Mdia(b), s)),
        b"minf" => MinfBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Minf(b), s)),
        b"moov" => MoovBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Moov(b), s)),
        b"mvhd" => MvhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Mvhd(b), s)),
        b"nmhd" => NmhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Nmhd(b), s)),
        b"smhd" => SmhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Smhd(b), s)),
        b"stbl" => StblBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stbl(b), s)),
        b"stco" => StcoBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stco(b), s)),
        b"stsc" => StscBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stsc(b), s)),
        b"stsd" => StsdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stsd(b), s)),
        b"stss" => StssBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stss(b), s)),
        b"stsz" => StszBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stsz(b), s)),
        b"stts" => SttsBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Stts(b), s)),
        b"tkhd" => TkhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Tkhd(b), s)),
        b"trak" => TrakBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Trak(b), s)),
        b"tref" => TrefBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Tref(b), s)),
        b"vmhd" => VmhdBox::read_box(data).map(|(b, s)| (Mp4BoxEnum::Vmhd(b), s)),
        _ => {
            if (data.len() as u64) < total {
                return Err(format!("Incomplete {} box", format_fourcc(&box_type)));
            }
            let unknown = UnknownBox {
                btype: box_type,
                data: data[header as usize..total as usize].to_vec(),
            };
            Ok((Mp4BoxEnum::Unknown(unknown), total as usize))
        }
    }
}

/// Position of a top-level box inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopLevelBox {
    pub box_type: [u8; 4],
    pub offset: u64,
    pub size: u64,
}

/// A movie file opened for random access.
///
/// Opening scans the top-level boxes and parses `moov`; `mdat` is never
/// loaded as a whole. Sample payloads are read one at a time through
/// [`MovieFile::read_sample`].
pub struct MovieFile<R: Read + Seek> {
    source: R,
    length: u64,
    top_level: Vec<TopLevelBox>,
    ftyp: Option<FtypBox>,
    moov: MoovBox,
}

impl MovieFile<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> MovieFile<R> {
    pub fn from_reader(mut source: R) -> Result<Self, String> {
        let io = |e: std::io::Error| format!("Failed to read movie: {}", e);
        let length = source.seek(SeekFrom::End(0)).map_err(io)?;

        let mut top_level = Vec::new();
        let mut ftyp = None;
        let mut moov = None;
        let mut position = 0u64;
        while position + 8 <= length {
            source.seek(SeekFrom::Start(position)).map_err(io)?;
            let mut header = [0u8; LARGE_HEADER_SIZE as usize];
            let available = (length - position).min(LARGE_HEADER_SIZE) as usize;
            source.read_exact(&mut header[..available]).map_err(io)?;

            let (box_type, _, size) = read_extended_header(&header[..available], length - position)?;
            if position + size > length {
                return Err(format!(
                    "Box {} at offset {} claims {} bytes but only {} remain",
                    format_fourcc(&box_type),
                    position,
                    size,
                    length - position
                ));
            }

            match &box_type {
                b"ftyp" | b"moov" => {
                    let bytes = read_range(&mut source, position, size)?;
                    if &box_type == b"ftyp" {
                        ftyp = Some(FtypBox::read_box(&bytes)?.0);
                    } else {
                        moov = Some(MoovBox::read_box(&bytes)?.0);
                    }
                }
                _ => {}
            }
            top_level.push(TopLevelBox { box_type, offset: position, size });
            position += size;
        }

        let moov = moov.ok_or_else(|| "Movie has no moov box".to_string())?;
        Ok(MovieFile { source, length, top_level, ftyp, moov })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn top_level_boxes(&self) -> &[TopLevelBox] {
        &self.top_level
    }

    pub fn ftyp(&self) -> Option<&FtypBox> {
        self.ftyp.as_ref()
    }

    pub fn moov(&self) -> &MoovBox {
        &self.moov
    }

    pub fn movie_timescale(&self) -> u32 {
        self.moov.mvhd.timescale
    }

    /// Builds the sample index of track `track_id`.
    pub fn track_index(&self, track_id: u32) -> Result<TrackIndex, String> {
        let trak = self
            .moov
            .track(track_id)
            .ok_or_else(|| format!("Movie has no track {}", track_id))?;
        TrackIndex::from_trak(trak, self.movie_timescale())
    }

    /// Reads the payload of one sample.
    pub fn read_sample(&mut self, sample: &SampleInfo) -> Result<Vec<u8>, String> {
        if sample.offset + sample.size as u64 > self.length {
            return Err(format!(
                "Sample at offset {} with size {} lies beyond the end of the file",
                sample.offset, sample.size
            ));
        }
        read_range(&mut self.source, sample.offset, sample.size as u64)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

fn read_range<R: Read + Seek>(source: &mut R, offset: u64, size: u64) -> Result<Vec<u8>, String> {
    let size = usize::try_from(size).map_err(|_| format!("Range of {} bytes does not fit in memory", size))?;
    let mut bytes = vec![0u8; size];
    source
        .seek(SeekFrom::Start(offset))
        .and_then(|_| source.read_exact(&mut bytes))
        .map_err(|e| format!("Failed to read {} bytes at offset {}: {}", size, offset, e))?;
    Ok(bytes)
}
