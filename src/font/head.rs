//! `head` table: font-wide metrics that don't vary per glyph.

use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy)]
pub struct HeadTable {
    pub units_per_em: u16,
    pub index_to_loc_format: i16,
}

impl HeadTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "head");
        r.skip(18)?; // version, fontRevision, checkSumAdjustment, magicNumber, flags
        let units_per_em = r.read_u16()?;
        r.skip(30)?; // created, modified, bbox, macStyle, lowestRecPPEM, fontDirectionHint
        let index_to_loc_format = r.read_i16()?;
        Ok(HeadTable { units_per_em, index_to_loc_format })
    }
}
