// Box types of the ISO base media / QuickTime movie format.
// Each submodule defines one box and implements `generic::Mp4Box` for it.
//
// - `co64`: 64-bit chunk offsets.
// - `dinf`: Data Information Box, wraps `dref`.
// - `dref`: Data Reference Box, where sample data lives.
// - `edts`: Edit Box, wraps `elst`.
// - `elst`: Edit List Box, maps media time onto movie time.
// - `enums`: `Mp4BoxEnum`, the sum of all parsable boxes.
// - `ftyp`: File Type Box.
// - `generic`: The `Mp4Box` trait, header validation and child iteration.
// - `hdlr`: Handler Reference Box, the media type of a track.
// - `mdat`: Media Data Box.
// - `mdhd`: Media Header Box, the media timescale.
// - `mdia`: Media Box.
// - `mebx`: QuickTime timed metadata sample entry and its key table.
// - `minf`: Media Information Box.
// - `moov`: Movie Box.
// - `mvhd`: Movie Header Box.
// - `nmhd`: Null Media Header Box, used by metadata tracks.
// - `smhd`: Sound Media Header Box.
// - `stbl`: Sample Table Box.
// - `stco`: 32-bit chunk offsets.
// - `stsc`: Sample-to-Chunk Box.
// - `stsd`: Sample Description Box and the visual/audio sample entries.
// - `stss`: Sync Sample Box.
// - `stsz`: Sample Size Box.
// - `stts`: Time-to-Sample Box.
// - `tkhd`: Track Header Box.
// - `trak`: Track Box.
// - `tref`: Track Reference Box.
// - `vmhd`: Video Media Header Box.

pub mod co64;
pub mod dinf;
pub mod dref;
pub mod edts;
pub mod elst;
pub mod enums;
pub mod ftyp;
pub mod generic;
pub mod hdlr;
pub mod mdat;
pub mod mdhd;
pub mod mdia;
pub mod mebx;
pub mod minf;
pub mod moov;
pub mod mvhd;
pub mod nmhd;
pub mod smhd;
pub mod stbl;
pub mod stco;
pub mod stsc;
pub mod stsd;
pub mod stss;
pub mod stsz;
pub mod stts;
pub mod tkhd;
pub mod trak;
pub mod tref;
pub mod vmhd;
