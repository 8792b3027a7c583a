//! Font binary parsing: sfnt directory plus lazy per-table accessors.
//!
//! `Font` holds the raw byte slice and the table directory only. Individual
//! tables are parsed on each access rather than eagerly at construction —
//! required tables (`head`/`maxp`/`hhea`/`hmtx`/`cmap`) surface
//! [`FontParseError::MissingRequiredTable`] the first time they're asked
//! for, never at `Font::parse` itself; optional tables (`GDEF`/`GSUB`/
//! `GPOS`/`kern`/`morx`/`fvar`/`avar`/`HVAR`/`gvar`/`MATH`) return `None`
//! when absent or when their format isn't one we support.

pub mod cmap;
pub mod face;
pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod head;
pub mod hhea_hmtx;
pub mod kern;
pub mod layout_common;
pub mod maxp;
pub mod morx;
pub mod table_record;
pub mod variation;

use crate::error::FontParseError;
use cmap::CmapTable;
use gdef::GdefTable;
use gpos::GposLookup;
use gsub::GsubLookup;
use head::HeadTable;
use hhea_hmtx::{HheaTable, HmtxTable};
use kern::KernTable;
use layout_common::{FeatureList, ScriptList};
use maxp::MaxpTable;
use morx::MorxTable;
use table_record::SfntDirectory;
use variation::{AvarTable, FvarTable, GvarTable, HvarTable, MathTable};

pub struct Font<'a> {
    data: &'a [u8],
    directory: SfntDirectory,
}

/// A parsed GSUB or GPOS layout table: script list, feature list and the
/// resolved lookup list, ready for a shape plan to pick from.
pub struct LayoutTable<T> {
    pub scripts: ScriptList,
    pub features: FeatureList,
    pub lookups: Vec<T>,
}

impl<'a> Font<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FontParseError> {
        let directory = SfntDirectory::parse(data)?;
        Ok(Font { data, directory })
    }

    fn table_data(&self, tag: &[u8; 4]) -> Option<&'a [u8]> {
        let record = self.directory.find(tag)?;
        self.data.get(record.offset as usize..(record.offset + record.length) as usize)
    }

    fn required_table(&self, tag: &'static str) -> Result<&'a [u8], FontParseError> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().unwrap();
        self.table_data(&bytes).ok_or(FontParseError::MissingRequiredTable(tag))
    }

    pub fn head(&self) -> Result<HeadTable, FontParseError> {
        HeadTable::parse(self.required_table("head")?)
    }

    pub fn maxp(&self) -> Result<MaxpTable, FontParseError> {
        MaxpTable::parse(self.required_table("maxp")?)
    }

    pub fn hhea(&self) -> Result<HheaTable, FontParseError> {
        HheaTable::parse(self.required_table("hhea")?)
    }

    pub fn hmtx(&self) -> Result<HmtxTable<'a>, FontParseError> {
        let hhea = self.hhea()?;
        Ok(HmtxTable::new(self.required_table("hmtx")?, hhea.number_of_h_metrics))
    }

    pub fn cmap(&self) -> Result<CmapTable<'a>, FontParseError> {
        CmapTable::parse(self.required_table("cmap")?)
    }

    pub fn gdef(&self) -> Option<GdefTable> {
        GdefTable::parse(self.table_data(b"GDEF")?).ok()
    }

    pub fn gsub(&self) -> Option<LayoutTable<GsubLookup>> {
        self.parse_layout_table(b"GSUB", GsubLookup::parse)
    }

    pub fn gpos(&self) -> Option<LayoutTable<GposLookup>> {
        self.parse_layout_table(b"GPOS", GposLookup::parse)
    }

    fn parse_layout_table<T>(
        &self,
        tag: &[u8; 4],
        parse_lookup: impl Fn(&crate::reader::Reader) -> Result<T, FontParseError>,
    ) -> Option<LayoutTable<T>> {
        let data = self.table_data(tag)?;
        let mut r = crate::reader::Reader::new(data, "layout");
        let major = r.read_u16().ok()?;
        let _minor = r.read_u16().ok()?;
        if major != 1 {
            return None;
        }
        let script_list_offset = r.read_u16().ok()?;
        let feature_list_offset = r.read_u16().ok()?;
        let lookup_list_offset = r.read_u16().ok()?;

        let scripts = ScriptList::parse(&r.slice_from(script_list_offset as usize).ok()?).ok()?;
        let features = FeatureList::parse(&r.slice_from(feature_list_offset as usize).ok()?).ok()?;

        let list_r = r.slice_from(lookup_list_offset as usize).ok()?;
        let mut lr = list_r.slice_from(0).ok()?;
        let lookup_count = lr.read_u16().ok()? as usize;
        let mut offsets = Vec::with_capacity(lookup_count);
        for _ in 0..lookup_count {
            offsets.push(lr.read_u16().ok()? as usize);
        }
        let mut lookups = Vec::with_capacity(lookup_count);
        for offset in offsets {
            lookups.push(parse_lookup(&list_r.slice_from(offset).ok()?).ok()?);
        }

        Some(LayoutTable { scripts, features, lookups })
    }

    pub fn kern(&self) -> Option<KernTable> {
        KernTable::parse(self.table_data(b"kern")?).ok()
    }

    pub fn morx(&self) -> Option<MorxTable<'a>> {
        MorxTable::parse(self.table_data(b"morx")?).ok()
    }

    pub fn fvar(&self) -> Option<FvarTable> {
        FvarTable::parse(self.table_data(b"fvar")?).ok()
    }

    pub fn avar(&self) -> Option<AvarTable> {
        AvarTable::parse(self.table_data(b"avar")?).ok()
    }

    pub fn hvar(&self) -> Option<HvarTable> {
        HvarTable::parse(self.table_data(b"HVAR")?).ok()
    }

    pub fn gvar(&self) -> Option<GvarTable<'a>> {
        GvarTable::parse(self.table_data(b"gvar")?).ok()
    }

    pub fn math(&self) -> Option<MathTable> {
        MathTable::parse(self.table_data(b"MATH")?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_minimal_sfnt() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 6]);
        data.extend_from_slice(b"head");
        data.extend_from_slice(&0u32.to_be_bytes());
        let offset = data.len() as u32 + 4;
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data
    }

    #[test]
    fn missing_required_table_is_not_fatal_at_parse() {
        let data = build_minimal_sfnt();
        let font = Font::parse(&data).unwrap();
        assert!(matches!(font.maxp(), Err(FontParseError::MissingRequiredTable("maxp"))));
    }

    #[test]
    fn optional_table_absent_is_none_not_error() {
        let data = build_minimal_sfnt();
        let font = Font::parse(&data).unwrap();
        assert!(font.gsub().is_none());
        assert!(font.morx().is_none());
    }
}
