//! Coverage and ClassDef tables, shared by GSUB and GPOS.

use crate::digest::SetDigest;
use crate::error::FontParseError;
use crate::reader::Reader;

/// A `Coverage` table: format 1 is a sorted glyph list, format 2 is a sorted
/// list of glyph ranges. `get` returns the glyph's coverage index.
#[derive(Debug, Clone)]
pub enum Coverage {
    Format1 { glyphs: Vec<u16> },
    Format2 { ranges: Vec<RangeRecord> },
}

#[derive(Debug, Clone, Copy)]
pub struct RangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub start_coverage_index: u16,
}

impl Coverage {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        match format {
            1 => {
                let count = r.read_u16()? as usize;
                let mut glyphs = Vec::with_capacity(count);
                for _ in 0..count {
                    glyphs.push(r.read_u16()?);
                }
                Ok(Coverage::Format1 { glyphs })
            }
            2 => {
                let count = r.read_u16()? as usize;
                let mut ranges = Vec::with_capacity(count);
                for _ in 0..count {
                    ranges.push(RangeRecord {
                        start_glyph: r.read_u16()?,
                        end_glyph: r.read_u16()?,
                        start_coverage_index: r.read_u16()?,
                    });
                }
                Ok(Coverage::Format2 { ranges })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "Coverage", format: other }),
        }
    }

    pub fn get(&self, glyph: u16) -> Option<u16> {
        match self {
            Coverage::Format1 { glyphs } => glyphs.binary_search(&glyph).ok().map(|i| i as u16),
            Coverage::Format2 { ranges } => {
                let idx = ranges
                    .binary_search_by(|r| {
                        if glyph < r.start_glyph {
                            std::cmp::Ordering::Greater
                        } else if glyph > r.end_glyph {
                            std::cmp::Ordering::Less
                        } else {
                            std::cmp::Ordering::Equal
                        }
                    })
                    .ok()?;
                let r = &ranges[idx];
                Some(r.start_coverage_index + (glyph - r.start_glyph))
            }
        }
    }

    pub fn contains(&self, glyph: u16) -> bool {
        self.get(glyph).is_some()
    }

    pub fn digest(&self) -> SetDigest {
        let mut d = SetDigest::new();
        match self {
            Coverage::Format1 { glyphs } => {
                for &g in glyphs {
                    d.add(g);
                }
            }
            Coverage::Format2 { ranges } => {
                for r in ranges {
                    d.add_range(r.start_glyph, r.end_glyph);
                }
            }
        }
        d
    }

    pub fn len(&self) -> usize {
        match self {
            Coverage::Format1 { glyphs } => glyphs.len(),
            Coverage::Format2 { ranges } => {
                ranges.iter().map(|r| (r.end_glyph - r.start_glyph) as usize + 1).sum()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `ClassDef` table: format 1 is a start glyph plus a flat class array,
/// format 2 is a sorted list of class ranges. `get` defaults to class 0.
#[derive(Debug, Clone)]
pub enum ClassDef {
    Format1 { start_glyph: u16, classes: Vec<u16> },
    Format2 { ranges: Vec<ClassRangeRecord> },
}

#[derive(Debug, Clone, Copy)]
pub struct ClassRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub class: u16,
}

impl ClassDef {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        match format {
            1 => {
                let start_glyph = r.read_u16()?;
                let count = r.read_u16()? as usize;
                let mut classes = Vec::with_capacity(count);
                for _ in 0..count {
                    classes.push(r.read_u16()?);
                }
                Ok(ClassDef::Format1 { start_glyph, classes })
            }
            2 => {
                let count = r.read_u16()? as usize;
                let mut ranges = Vec::with_capacity(count);
                for _ in 0..count {
                    ranges.push(ClassRangeRecord {
                        start_glyph: r.read_u16()?,
                        end_glyph: r.read_u16()?,
                        class: r.read_u16()?,
                    });
                }
                Ok(ClassDef::Format2 { ranges })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "ClassDef", format: other }),
        }
    }

    pub fn get(&self, glyph: u16) -> u16 {
        match self {
            ClassDef::Format1 { start_glyph, classes } => {
                if glyph < *start_glyph {
                    return 0;
                }
                let idx = (glyph - start_glyph) as usize;
                classes.get(idx).copied().unwrap_or(0)
            }
            ClassDef::Format2 { ranges } => {
                ranges
                    .binary_search_by(|r| {
                        if glyph < r.start_glyph {
                            std::cmp::Ordering::Greater
                        } else if glyph > r.end_glyph {
                            std::cmp::Ordering::Less
                        } else {
                            std::cmp::Ordering::Equal
                        }
                    })
                    .ok()
                    .map(|i| ranges[i].class)
                    .unwrap_or(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_format1_cov(glyphs: &[u16]) -> Vec<u8> {
        let mut out = vec![0, 1];
        out.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        for g in glyphs {
            out.extend_from_slice(&g.to_be_bytes());
        }
        out
    }

    #[test]
    fn format1_coverage_lookup() {
        let data = build_format1_cov(&[5, 10, 20]);
        let r = Reader::new(&data, "GSUB");
        let cov = Coverage::parse(&r).unwrap();
        assert_eq!(cov.get(10), Some(1));
        assert_eq!(cov.get(7), None);
    }

    #[test]
    fn format2_coverage_binary_search() {
        let mut data = vec![0, 2, 0, 2];
        // two ranges: [10,20)->0, [30,40)->11
        for (s, e, idx) in [(10u16, 19u16, 0u16), (30, 39, 11)] {
            data.extend_from_slice(&s.to_be_bytes());
            data.extend_from_slice(&e.to_be_bytes());
            data.extend_from_slice(&idx.to_be_bytes());
        }
        let r = Reader::new(&data, "GSUB");
        let cov = Coverage::parse(&r).unwrap();
        assert_eq!(cov.get(35), Some(16));
        assert_eq!(cov.get(25), None);
    }

    #[test]
    fn classdef_format1_default_zero() {
        let mut data = vec![0, 1];
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(&7u16.to_be_bytes());
        let r = Reader::new(&data, "GDEF");
        let cd = ClassDef::parse(&r).unwrap();
        assert_eq!(cd.get(10), 3);
        assert_eq!(cd.get(11), 7);
        assert_eq!(cd.get(0), 0);
    }
}
