//! `maxp` table: glyph count.

use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy)]
pub struct MaxpTable {
    pub num_glyphs: u16,
}

impl MaxpTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "maxp");
        let _version = r.read_u32()?;
        let num_glyphs = r.read_u16()?;
        Ok(MaxpTable { num_glyphs })
    }
}
