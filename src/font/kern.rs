//! `kern` table, format 0 subtables only (the legacy format AAT and old
//! Windows fonts both still ship for simple pair kerning).

use crate::error::FontParseError;
use crate::reader::Reader;

pub struct KernTable {
    pairs: Vec<(u32, i16)>,
}

impl KernTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "kern");
        let version = r.read_u16()?;
        let mut pairs = Vec::new();

        if version == 0 {
            let table_count = r.read_u16()?;
            for _ in 0..table_count {
                let _sub_version = r.read_u16()?;
                let length = r.read_u16()? as usize;
                let coverage = r.read_u16()?;
                let format = coverage >> 8;
                let start = r.pos();
                if format == 0 {
                    let pair_count = r.read_u16()?;
                    r.skip(6)?; // searchRange, entrySelector, rangeShift
                    for _ in 0..pair_count {
                        let left = r.read_u16()? as u32;
                        let right = r.read_u16()? as u32;
                        let value = r.read_i16()?;
                        pairs.push(((left << 16) | right, value));
                    }
                }
                r.set_pos(start + length.saturating_sub(6));
            }
        } else {
            // Apple's kern version 1 (u32 major/minor) uses `morx`/`kerx` for
            // anything beyond simple pairs; we don't consume it here.
            return Ok(KernTable { pairs });
        }

        pairs.sort_unstable_by_key(|&(k, _)| k);
        Ok(KernTable { pairs })
    }

    pub fn kerning(&self, left: u16, right: u16) -> i16 {
        let key = ((left as u32) << 16) | right as u32;
        self.pairs.binary_search_by_key(&key, |&(k, _)| k).map(|i| self.pairs[i].1).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&1u16.to_be_bytes()); // table count
        let sub_len = 14 + pairs.len() * 6;
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&(sub_len as u16).to_be_bytes());
        data.extend_from_slice(&0x0000u16.to_be_bytes()); // coverage, format 0
        data.extend_from_slice(&(pairs.len() as u16).to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        for (l, r, v) in pairs {
            data.extend_from_slice(&l.to_be_bytes());
            data.extend_from_slice(&r.to_be_bytes());
            data.extend_from_slice(&v.to_be_bytes());
        }
        data
    }

    #[test]
    fn looks_up_pair() {
        let data = build(&[(5, 6, -40), (10, 11, 20)]);
        let kern = KernTable::parse(&data).unwrap();
        assert_eq!(kern.kerning(5, 6), -40);
        assert_eq!(kern.kerning(10, 11), 20);
        assert_eq!(kern.kerning(1, 2), 0);
    }
}
