use crate::{format_fourcc, read_fourcc, read_u16_be, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::{
    generic::{read_box_header, write_child, ChildBoxes, Mp4Box, UnknownBox},
    mebx::MetadataSampleEntry,
};

const VISUAL_FORMATS: &[[u8; 4]] = &[*b"avc1", *b"avc3", *b"hvc1", *b"hev1", *b"mp4v", *b"jpeg", *b"av01", *b"vp09"];
const AUDIO_FORMATS: &[[u8; 4]] = &[*b"mp4a", *b"lpcm", *b"sowt", *b"twos", *b"alac", *b"Opus", *b"fLaC", *b"ac-3", *b"ec-3"];

// The `StsdBox` struct represents a Sample Description Box.
// It holds the sample entries of a track; samples refer to an entry through
// the `sample_description_index` in `stsc`. Tracks written by this library
// carry exactly one entry.
#[derive(Default, Clone, PartialEq)]
pub struct StsdBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SampleEntry>,
}

/// A sample entry, selected by its format code.
#[derive(Clone, PartialEq)]
pub enum SampleEntry {
    Visual(VisualSampleEntry),
    Audio(AudioSampleEntry),
    Metadata(MetadataSampleEntry),
    Unknown(UnknownBox),
}

// The `VisualSampleEntry` struct describes coded video frames.
//
// Fields:
// - `data_format`: Codec four character code, e.g. `avc1`.
// - `width`, `height`: Frame size in pixels.
// - `compressor_name`: Up to 31 bytes, stored as a Pascal string.
// - `extensions`: Codec configuration boxes (e.g. `avcC`), kept verbatim.
#[derive(Clone, PartialEq)]
pub struct VisualSampleEntry {
    pub data_format: [u8; 4],
    pub data_reference_index: u16,
    pub width: u16,
    pub height: u16,
    pub compressor_name: String,
    pub extensions: Vec<UnknownBox>,
}

// The `AudioSampleEntry` struct describes audio samples.
// `sample_rate` is stored as 16.16 fixed point, so rates above 65535 Hz do
// not fit this entry version.
#[derive(Clone, PartialEq)]
pub struct AudioSampleEntry {
    pub data_format: [u8; 4],
    pub data_reference_index: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    pub sample_rate: u32,
    pub extensions: Vec<UnknownBox>,
}

impl Default for VisualSampleEntry {
    fn default() -> Self {
        VisualSampleEntry {
            data_format: *b"avc1",
            data_reference_index: 1,
            width: 640,
            height: 480,
            compressor_name: String::new(),
            extensions: Vec::new(),
        }
    }
}

impl Default for AudioSampleEntry {
    fn default() -> Self {
        AudioSampleEntry {
            data_format: *b"mp4a",
            data_reference_index: 1,
            channel_count: 1,
            sample_size: 16,
            sample_rate: 44_100,
            extensions: Vec::new(),
        }
    }
}

impl StsdBox {
    pub fn single(entry: SampleEntry) -> Self {
        StsdBox { version: 0, flags: 0, entries: vec![entry] }
    }
}

impl std::fmt::Debug for StsdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for SampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleEntry::Visual(entry) => std::fmt::Debug::fmt(entry, f),
            SampleEntry::Audio(entry) => std::fmt::Debug::fmt(entry, f),
            SampleEntry::Metadata(entry) => std::fmt::Debug::fmt(entry, f),
            SampleEntry::Unknown(entry) => std::fmt::Debug::fmt(entry, f),
        }
    }
}

impl std::fmt::Debug for VisualSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualSampleEntry")
            .field("data_format", &format_fourcc(&self.data_format))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("compressor_name", &self.compressor_name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl std::fmt::Debug for AudioSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSampleEntry")
            .field("data_format", &format_fourcc(&self.data_format))
            .field("channel_count", &self.channel_count)
            .field("sample_size", &self.sample_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl Mp4Box for StsdBox {
    fn box_type(&self) -> [u8; 4] { *b"stsd" }

    // 8 header + 4 version/flags + 4 entry count + entries
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + self.entries.iter().map(|e| e.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            write_child(buffer, entry);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = read_box_header(data, b"stsd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data, 8)?;
        let entry_count = read_u32_be(data, 12)? as usize;

        let mut entries = Vec::new();
        for child in ChildBoxes::new(data, 16, size).take(entry_count) {
            let (_, bytes) = child?;
            entries.push(SampleEntry::read_box(bytes)?.0);
        }

        Ok((StsdBox { version, flags, entries }, size))
    }
}

impl Mp4Box for SampleEntry {
    fn box_type(&self) -> [u8; 4] {
        match self {
            SampleEntry::Visual(entry) => entry.box_type(),
            SampleEntry::Audio(entry) => entry.box_type(),
            SampleEntry::Metadata(entry) => entry.box_type(),
            SampleEntry::Unknown(entry) => entry.box_type(),
        }
    }

    fn box_size(&self) -> u32 {
        match self {
            SampleEntry::Visual(entry) => entry.box_size(),
            SampleEntry::Audio(entry) => entry.box_size(),
            SampleEntry::Metadata(entry) => entry.box_size(),
            SampleEntry::Unknown(entry) => entry.box_size(),
        }
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        match self {
            SampleEntry::Visual(entry) => entry.write_box(buffer),
            SampleEntry::Audio(entry) => entry.write_box(buffer),
            SampleEntry::Metadata(entry) => entry.write_box(buffer),
            SampleEntry::Unknown(entry) => entry.write_box(buffer),
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let format = read_fourcc(data, 4)?;
        if &format == b"mebx" {
            MetadataSampleEntry::read_box(data).map(|(e, s)| (SampleEntry::Metadata(e), s))
        } else if VISUAL_FORMATS.contains(&format) {
            VisualSampleEntry::read_box(data).map(|(e, s)| (SampleEntry::Visual(e), s))
        } else if AUDIO_FORMATS.contains(&format) {
            AudioSampleEntry::read_box(data).map(|(e, s)| (SampleEntry::Audio(e), s))
        } else {
            UnknownBox::read_box(data).map(|(e, s)| (SampleEntry::Unknown(e), s))
        }
    }
}

fn read_extensions(data: &[u8], offset: usize, size: usize) -> Result<Vec<UnknownBox>, String> {
    ChildBoxes::new(data, offset, size)
        .map(|child| child.and_then(|(_, bytes)| UnknownBox::read_box(bytes).map(|(b, _)| b)))
        .collect()
}

impl Mp4Box for VisualSampleEntry {
    fn box_type(&self) -> [u8; 4] {
        self.data_format
    }

    // 8 header + 78 bytes of visual fields + extension boxes
    fn box_size(&self) -> u32 {
        86 + self.extensions.iter().map(|b| b.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.data_format);
        buffer.extend_from_slice(&[0u8; 6]); // reserved
        buffer.extend_from_slice(&self.data_reference_index.to_be_bytes());
        buffer.extend_from_slice(&[0u8; 16]); // pre_defined + reserved
        buffer.extend_from_slice(&self.width.to_be_bytes());
        buffer.extend_from_slice(&self.height.to_be_bytes());
        buffer.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // 72 dpi horizontal
        buffer.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // 72 dpi vertical
        buffer.extend_from_slice(&0u32.to_be_bytes()); // reserved
        buffer.extend_from_slice(&1u16.to_be_bytes()); // frame_count

        let name = self.compressor_name.as_bytes();
        let name_len = name.len().min(31);
        let mut compressor = [0u8; 32];
        compressor[0] = name_len as u8;
        compressor[1..=name_len].copy_from_slice(&name[..name_len]);
        buffer.extend_from_slice(&compressor);

        buffer.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
        buffer.extend_from_slice(&(-1i16).to_be_bytes()); // pre_defined
        for extension in &self.extensions {
            write_child(buffer, extension);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let data_format = read_fourcc(data, 4)?;
        let size = read_box_header(data, &data_format)?;
        let data = &data[..size];
        if size < 86 {
            return Err(format!("Visual sample entry {} too small", format_fourcc(&data_format)));
        }

        let name_len = (data[50] as usize).min(31);
        let compressor_name = String::from_utf8_lossy(&data[51..51 + name_len]).to_string();

        Ok((
            VisualSampleEntry {
                data_format,
                data_reference_index: read_u16_be(data, 14)?,
                width: read_u16_be(data, 32)?,
                height: read_u16_be(data, 34)?,
                compressor_name,
                extensions: read_extensions(data, 86, size)?,
            },
            size,
        ))
    }
}

impl Mp4Box for AudioSampleEntry {
    fn box_type(&self) -> [u8; 4] {
        self.data_format
    }

    // 8 header + 28 bytes of audio fields + extension boxes
    fn box_size(&self) -> u32 {
        36 + self.extensions.iter().map(|b| b.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.data_format);
        buffer.extend_from_slice(&[0u8; 6]); // reserved
        buffer.extend_from_slice(&self.data_reference_index.to_be_bytes());
        buffer.extend_from_slice(&[0u8; 8]); // reserved
        buffer.extend_from_slice(&self.channel_count.to_be_bytes());
        buffer.extend_from_slice(&self.sample_size.to_be_bytes());
        buffer.extend_from_slice(&[0u8; 4]); // pre_defined + reserved
        buffer.extend_from_slice(&(self.sample_rate.min(0xFFFF) << 16).to_be_bytes());
        for extension in &self.extensions {
            write_child(buffer, extension);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let data_format = read_fourcc(data, 4)?;
        let size = read_box_header(data, &data_format)?;
        let data = &data[..size];

        Ok((
            AudioSampleEntry {
                data_format,
                data_reference_index: read_u16_be(data, 14)?,
                channel_count: read_u16_be(data, 24)?,
                sample_size: read_u16_be(data, 26)?,
                sample_rate: read_u32_be(data, 32)? >> 16,
                extensions: read_extensions(data, 36, size)?,
            },
            size,
        ))
    }
}
