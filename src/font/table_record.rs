//! sfnt header and table directory.

use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy)]
pub struct TableRecord {
    pub tag: [u8; 4],
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

pub struct SfntDirectory {
    pub records: Vec<TableRecord>,
}

impl SfntDirectory {
    /// Parse the sfnt header (or the first font in a TrueType Collection).
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "sfnt");
        let scaler_tag = r.read_u32()?;

        if scaler_tag == u32::from_be_bytes(*b"ttcf") {
            let _version = r.read_u32()?;
            let num_fonts = r.read_u32()?;
            if num_fonts == 0 {
                return Err(FontParseError::MalformedFont);
            }
            let first_offset = r.read_u32()? as usize;
            let mut sub = r.slice_from(first_offset)?;
            return Self::parse_table_directory(&mut sub);
        }

        if scaler_tag != 0x0001_0000 && scaler_tag != u32::from_be_bytes(*b"OTTO") && scaler_tag != u32::from_be_bytes(*b"true") {
            return Err(FontParseError::MalformedFont);
        }

        Self::parse_table_directory(&mut r)
    }

    fn parse_table_directory(r: &mut Reader) -> Result<Self, FontParseError> {
        let num_tables = r.read_u16()?;
        r.skip(6)?; // searchRange, entrySelector, rangeShift
        let mut records = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            records.push(TableRecord {
                tag: r.read_tag()?,
                checksum: r.read_u32()?,
                offset: r.read_u32()?,
                length: r.read_u32()?,
            });
        }
        Ok(SfntDirectory { records })
    }

    pub fn find(&self, tag: &[u8; 4]) -> Option<TableRecord> {
        self.records.iter().find(|r| &r.tag == tag).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_minimal_sfnt() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // numTables
        data.extend_from_slice(&[0u8; 6]);
        data.extend_from_slice(b"head");
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&12u32.to_be_bytes());
        data.extend_from_slice(&4u32.to_be_bytes());
        data
    }

    #[test]
    fn finds_table_by_tag() {
        let data = build_minimal_sfnt();
        let dir = SfntDirectory::parse(&data).unwrap();
        let rec = dir.find(b"head").unwrap();
        assert_eq!(rec.offset, 12);
        assert_eq!(rec.length, 4);
        assert!(dir.find(b"maxp").is_none());
    }
}
