use super::{
    co64::Co64Box, dinf::DinfBox, dref::DrefBox, edts::EdtsBox, elst::ElstBox, ftyp::FtypBox,
    generic::UnknownBox, hdlr::HdlrBox, mdat::MdatBox, mdhd::MdhdBox, mdia::MdiaBox, minf::MinfBox,
    moov::MoovBox, mvhd::MvhdBox, nmhd::NmhdBox, smhd::SmhdBox, stbl::StblBox, stco::StcoBox,
    stsc::StscBox, stsd::StsdBox, stss::StssBox, stsz::StszBox, stts::SttsBox, tkhd::TkhdBox,
    trak::TrakBox, tref::TrefBox, vmhd::VmhdBox,
};

/// Any box [`crate::reader::read_mp4_box`] knows how to parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Mp4BoxEnum {
    Co64(Co64Box),
    Dinf(DinfBox),
    Dref(DrefBox),
    Edts(EdtsBox),
    Elst(ElstBox),
    Ftyp(FtypBox),
    Hdlr(HdlrBox),
    Mdat(MdatBox),
    Mdhd(MdhdBox),
    Mdia(MdiaBox),
    Minf(MinfBox),
    Moov(MoovBox),
    Mvhd(MvhdBox),
    Nmhd(NmhdBox),
    Smhd(SmhdBox),
    Stbl(StblBox),
    Stco(StcoBox),
    Stsc(StscBox),
    Stsd(StsdBox),
    Stss(StssBox),
    Stsz(StszBox),
    Stts(SttsBox),
    Tkhd(TkhdBox),
    Trak(TrakBox),
    Tref(TrefBox),
    Vmhd(VmhdBox),
    Unknown(UnknownBox),
}
