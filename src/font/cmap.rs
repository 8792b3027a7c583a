//! `cmap` table: codepoint to glyph id.

use crate::error::FontParseError;
use crate::reader::Reader;

pub struct CmapTable<'a> {
    data: &'a [u8],
    subtable_offset: usize,
    format: u16,
}

impl<'a> CmapTable<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "cmap");
        let _version = r.read_u16()?;
        let num_tables = r.read_u16()?;

        let mut best_offset = None;
        let mut best_priority = 0u8;
        for _ in 0..num_tables {
            let platform_id = r.read_u16()?;
            let encoding_id = r.read_u16()?;
            let offset = r.read_u32()?;
            let priority = match (platform_id, encoding_id) {
                (0, 4) | (0, 6) => 5, // Unicode full repertoire
                (3, 10) => 4,         // Windows UCS-4
                (0, 3) => 3,          // Unicode BMP
                (3, 1) => 2,          // Windows BMP
                (0, _) => 1,
                _ => 0,
            };
            if priority > best_priority {
                best_priority = priority;
                best_offset = Some(offset as usize);
            }
        }

        let subtable_offset = best_offset.ok_or(FontParseError::UnsupportedFormat {
            table: "cmap",
            format: 0,
        })?;
        let mut sub_r = r.slice_from(subtable_offset)?;
        let format = sub_r.read_u16()?;

        match format {
            4 | 6 | 12 => Ok(CmapTable { data, subtable_offset, format }),
            other => Err(FontParseError::UnsupportedFormat { table: "cmap", format: other }),
        }
    }

    pub fn lookup(&self, codepoint: u32) -> Option<u16> {
        let sub = &self.data[self.subtable_offset..];
        match self.format {
            4 => lookup_format4(sub, codepoint),
            6 => lookup_format6(sub, codepoint),
            12 => lookup_format12(sub, codepoint),
            _ => None,
        }
    }
}

fn lookup_format4(data: &[u8], codepoint: u32) -> Option<u16> {
    if codepoint > 0xFFFF {
        return None;
    }
    let code = codepoint as u16;
    let mut r = Reader::new(data, "cmap");
    let _format = r.read_u16().ok()?;
    let _length = r.read_u16().ok()?;
    let _language = r.read_u16().ok()?;
    let seg_count = r.read_u16().ok()? / 2;
    r.skip(6).ok()?;

    let end_codes_start = r.pos();
    let mut lo = 0u16;
    let mut hi = seg_count;
    while lo < hi {
        let mid = (lo + hi) / 2;
        let mut mr = Reader::new(&data[end_codes_start + (mid as usize) * 2..], "cmap");
        let end_code = mr.read_u16().ok()?;
        if end_code < code {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo >= seg_count {
        return None;
    }
    let seg_idx = lo as usize;

    let start_codes_offset = end_codes_start + seg_count as usize * 2 + 2;
    let deltas_offset = start_codes_offset + seg_count as usize * 2;
    let ranges_offset = deltas_offset + seg_count as usize * 2;

    let mut er = Reader::new(&data[end_codes_start + seg_idx * 2..], "cmap");
    let end_code = er.read_u16().ok()?;
    let mut sr = Reader::new(&data[start_codes_offset + seg_idx * 2..], "cmap");
    let start_code = sr.read_u16().ok()?;
    if code < start_code || code > end_code {
        return None;
    }
    let mut dr = Reader::new(&data[deltas_offset + seg_idx * 2..], "cmap");
    let id_delta = dr.read_i16().ok()?;
    let mut rr = Reader::new(&data[ranges_offset + seg_idx * 2..], "cmap");
    let id_range_offset = rr.read_u16().ok()?;

    let glyph_id = if id_range_offset == 0 {
        (code as i32 + id_delta as i32) as u16
    } else {
        let glyph_offset =
            ranges_offset + seg_idx * 2 + id_range_offset as usize + (code - start_code) as usize * 2;
        let mut gr = Reader::new(&data[glyph_offset..], "cmap");
        let glyph = gr.read_u16().ok()?;
        if glyph == 0 {
            0
        } else {
            (glyph as i32 + id_delta as i32) as u16
        }
    };
    if glyph_id == 0 {
        None
    } else {
        Some(glyph_id)
    }
}

fn lookup_format6(data: &[u8], codepoint: u32) -> Option<u16> {
    if codepoint > 0xFFFF {
        return None;
    }
    let mut r = Reader::new(data, "cmap");
    let _format = r.read_u16().ok()?;
    let _length = r.read_u16().ok()?;
    let _language = r.read_u16().ok()?;
    let first_code = r.read_u16().ok()? as u32;
    let entry_count = r.read_u16().ok()?;
    if codepoint < first_code || codepoint >= first_code + entry_count as u32 {
        return None;
    }
    let idx = (codepoint - first_code) as usize;
    r.skip(idx * 2).ok()?;
    let glyph = r.read_u16().ok()?;
    if glyph == 0 {
        None
    } else {
        Some(glyph)
    }
}

fn lookup_format12(data: &[u8], codepoint: u32) -> Option<u16> {
    let mut r = Reader::new(data, "cmap");
    let _format = r.read_u16().ok()?;
    let _reserved = r.read_u16().ok()?;
    let _length = r.read_u32().ok()?;
    let _language = r.read_u32().ok()?;
    let num_groups = r.read_u32().ok()?;

    let groups_start = r.pos();
    let mut lo = 0u32;
    let mut hi = num_groups;
    while lo < hi {
        let mid = (lo + hi) / 2;
        let mut mr = Reader::new(&data[groups_start + mid as usize * 12..], "cmap");
        let start_char = mr.read_u32().ok()?;
        let end_char = mr.read_u32().ok()?;
        if codepoint < start_char {
            hi = mid;
        } else if codepoint > end_char {
            lo = mid + 1;
        } else {
            let start_glyph = mr.read_u32().ok()?;
            return Some((start_glyph + (codepoint - start_char)) as u16);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_format6(first_code: u16, glyphs: &[u16]) -> Vec<u8> {
        let mut data = Vec::new();
        // table directory: 1 subtable, platform 3 encoding 1
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        let sub_offset = data.len() as u32 + 4;
        data.extend_from_slice(&sub_offset.to_be_bytes());
        data.extend_from_slice(&6u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // length
        data.extend_from_slice(&0u16.to_be_bytes()); // language
        data.extend_from_slice(&first_code.to_be_bytes());
        data.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        for g in glyphs {
            data.extend_from_slice(&g.to_be_bytes());
        }
        data
    }

    #[test]
    fn format6_lookup() {
        let data = build_format6(65, &[10, 11, 12]);
        let cmap = CmapTable::parse(&data).unwrap();
        assert_eq!(cmap.lookup(65), Some(10));
        assert_eq!(cmap.lookup(67), Some(12));
        assert_eq!(cmap.lookup(68), None);
    }
}
