//! `hhea`/`hmtx` tables: horizontal metrics.

use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy)]
pub struct HheaTable {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub number_of_h_metrics: u16,
}

impl HheaTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "hhea");
        r.skip(4)?; // version
        let ascender = r.read_i16()?;
        let descender = r.read_i16()?;
        let line_gap = r.read_i16()?;
        r.skip(22)?; // advanceWidthMax..metricDataFormat
        let number_of_h_metrics = r.read_u16()?;
        Ok(HheaTable { ascender, descender, line_gap, number_of_h_metrics })
    }
}

/// `hmtx`: parsed lazily per-glyph rather than eagerly into a `Vec`, since
/// most shape calls touch only a small subset of a font's glyphs.
pub struct HmtxTable<'a> {
    data: &'a [u8],
    number_of_h_metrics: u16,
}

impl<'a> HmtxTable<'a> {
    pub fn new(data: &'a [u8], number_of_h_metrics: u16) -> Self {
        Self { data, number_of_h_metrics }
    }

    pub fn advance_width(&self, glyph: u16) -> i32 {
        if self.number_of_h_metrics == 0 {
            return 0;
        }
        let idx = if glyph < self.number_of_h_metrics {
            glyph as usize
        } else {
            (self.number_of_h_metrics - 1) as usize
        };
        let offset = idx * 4;
        if offset + 2 > self.data.len() {
            return 0;
        }
        u16::from_be_bytes([self.data[offset], self.data[offset + 1]]) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_metric_shared_by_trailing_glyphs() {
        let mut data = Vec::new();
        data.extend_from_slice(&100u16.to_be_bytes());
        data.extend_from_slice(&0i16.to_be_bytes());
        data.extend_from_slice(&200u16.to_be_bytes());
        data.extend_from_slice(&5i16.to_be_bytes());
        let hmtx = HmtxTable::new(&data, 2);
        assert_eq!(hmtx.advance_width(0), 100);
        assert_eq!(hmtx.advance_width(1), 200);
        assert_eq!(hmtx.advance_width(5), 200);
    }
}
