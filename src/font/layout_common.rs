//! Structures shared by GSUB and GPOS: script/feature/lookup lists, lookup
//! flags, value records and anchors.

use bitflags::bitflags;

use crate::error::FontParseError;
use crate::font::gdef::{GdefTable, GlyphClass};
use crate::reader::Reader;
use crate::tag::Tag;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LookupFlag: u16 {
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE_MASK = 0xFF00;
    }
}

impl LookupFlag {
    pub fn mark_attachment_type(self) -> u16 {
        (self.bits() & Self::MARK_ATTACHMENT_TYPE_MASK.bits()) >> 8
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
}

impl ValueRecord {
    /// Parse only the fields selected by `format`, in OpenType bit order.
    /// Device table offsets are read (so the cursor advances correctly) but
    /// never followed — this engine has no hinting context to evaluate them.
    pub fn parse(r: &mut Reader, format: u16) -> Result<Self, FontParseError> {
        let mut v = ValueRecord::default();
        if format & 0x0001 != 0 {
            v.x_placement = r.read_i16()?;
        }
        if format & 0x0002 != 0 {
            v.y_placement = r.read_i16()?;
        }
        if format & 0x0004 != 0 {
            v.x_advance = r.read_i16()?;
        }
        if format & 0x0008 != 0 {
            v.y_advance = r.read_i16()?;
        }
        for bit in [0x0010u16, 0x0020, 0x0040, 0x0080] {
            if format & bit != 0 {
                r.read_u16()?; // device/variation-index offset, unevaluated
            }
        }
        Ok(v)
    }

    pub fn size_for_format(format: u16) -> usize {
        format.count_ones() as usize * 2
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl Anchor {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        let x = r.read_i16()?;
        let y = r.read_i16()?;
        if format == 3 {
            // x/y device offsets follow; unevaluated.
        }
        Ok(Anchor { x, y })
    }
}

pub struct LangSys {
    pub required_feature_index: Option<u16>,
    pub feature_indices: Vec<u16>,
}

impl LangSys {
    fn parse(r: &mut Reader) -> Result<Self, FontParseError> {
        let _lookup_order = r.read_u16()?;
        let required = r.read_u16()?;
        let count = r.read_u16()? as usize;
        let mut feature_indices = Vec::with_capacity(count);
        for _ in 0..count {
            feature_indices.push(r.read_u16()?);
        }
        Ok(LangSys {
            required_feature_index: if required == 0xFFFF { None } else { Some(required) },
            feature_indices,
        })
    }
}

pub struct Script {
    pub default_lang_sys: Option<LangSys>,
    pub lang_sys: Vec<(Tag, LangSys)>,
}

pub struct ScriptList {
    pub scripts: Vec<(Tag, Script)>,
}

impl ScriptList {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let count = r.read_u16()? as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = Tag::new(r.read_tag()?);
            let offset = r.read_u16()?;
            records.push((tag, offset));
        }
        let mut scripts = Vec::with_capacity(count);
        for (tag, offset) in records {
            let mut sr = r.slice_from(offset as usize)?;
            let default_offset = sr.read_u16()?;
            let lang_sys_count = sr.read_u16()? as usize;
            let mut lang_records = Vec::with_capacity(lang_sys_count);
            for _ in 0..lang_sys_count {
                let ltag = Tag::new(sr.read_tag()?);
                let loffset = sr.read_u16()?;
                lang_records.push((ltag, loffset));
            }
            let default_lang_sys = if default_offset != 0 {
                Some(LangSys::parse(&mut sr.slice_from(default_offset as usize)?)?)
            } else {
                None
            };
            let mut lang_sys = Vec::with_capacity(lang_records.len());
            for (ltag, loffset) in lang_records {
                lang_sys.push((ltag, LangSys::parse(&mut sr.slice_from(loffset as usize)?)?));
            }
            scripts.push((tag, Script { default_lang_sys, lang_sys }));
        }
        Ok(ScriptList { scripts })
    }

    pub fn find_script(&self, tag: Tag) -> Option<&Script> {
        self.scripts
            .iter()
            .find(|(t, _)| *t == tag)
            .or_else(|| self.scripts.iter().find(|(t, _)| *t == Tag::DFLT))
            .map(|(_, s)| s)
    }
}

impl Script {
    pub fn find_lang_sys(&self, tag: Option<Tag>) -> Option<&LangSys> {
        if let Some(tag) = tag {
            if let Some((_, ls)) = self.lang_sys.iter().find(|(t, _)| *t == tag) {
                return Some(ls);
            }
        }
        self.default_lang_sys.as_ref()
    }
}

pub struct Feature {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

pub struct FeatureList {
    pub features: Vec<Feature>,
}

impl FeatureList {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let count = r.read_u16()? as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = Tag::new(r.read_tag()?);
            let offset = r.read_u16()?;
            records.push((tag, offset));
        }
        let mut features = Vec::with_capacity(count);
        for (tag, offset) in records {
            let mut fr = r.slice_from(offset as usize)?;
            let _feature_params = fr.read_u16()?;
            let lookup_count = fr.read_u16()? as usize;
            let mut lookup_indices = Vec::with_capacity(lookup_count);
            for _ in 0..lookup_count {
                lookup_indices.push(fr.read_u16()?);
            }
            features.push(Feature { tag, lookup_indices });
        }
        Ok(FeatureList { features })
    }

    pub fn get(&self, index: u16) -> Option<&Feature> {
        self.features.get(index as usize)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubstLookupRecord {
    pub sequence_index: u16,
    pub lookup_list_index: u16,
}

impl SubstLookupRecord {
    pub fn parse(r: &mut Reader) -> Result<Self, FontParseError> {
        Ok(SubstLookupRecord {
            sequence_index: r.read_u16()?,
            lookup_list_index: r.read_u16()?,
        })
    }
}

/// Whether `glyph` should be skipped (left untouched, excluded from context
/// matching) under `flag` given the font's GDEF table. With no GDEF table or
/// an empty flag this is always `false` — the fast path GSUB/GPOS engines
/// take for the common case.
pub fn should_skip(gdef: Option<&GdefTable>, flag: LookupFlag, glyph: u16) -> bool {
    let Some(gdef) = gdef else { return false };
    let class = gdef.glyph_class(glyph);

    if flag.contains(LookupFlag::IGNORE_BASE_GLYPHS) && class == GlyphClass::Base {
        return true;
    }
    if flag.contains(LookupFlag::IGNORE_LIGATURES) && class == GlyphClass::Ligature {
        return true;
    }
    if class == GlyphClass::Mark {
        if flag.contains(LookupFlag::IGNORE_MARKS) {
            return true;
        }
        let required = flag.mark_attachment_type();
        if required != 0 && gdef.mark_attach_class(glyph) != required {
            return true;
        }
        if flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            // The caller resolves `mark_filtering_set` (a per-lookup index
            // into GDEF's mark glyph sets) and checks membership directly —
            // this helper only applies the flags that don't need that index.
        }
    }
    false
}

/// As [`should_skip`], but also checks membership in a specific mark glyph
/// filtering set (`USE_MARK_FILTERING_SET`). `set` is `None` when the lookup
/// didn't carry a mark filtering set index.
pub fn should_skip_with_set(
    gdef: Option<&GdefTable>,
    flag: LookupFlag,
    glyph: u16,
    set: Option<&crate::coverage::Coverage>,
) -> bool {
    if should_skip(gdef, flag, glyph) {
        return true;
    }
    if flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
        if let (Some(gdef), Some(set)) = (gdef, set) {
            if gdef.glyph_class(glyph) == GlyphClass::Mark && set.get(glyph).is_none() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdef_with_mark(glyph: u16) -> GdefTable {
        // Hand-build a minimal GDEF: version 1.0, GlyphClassDef format 1
        // covering just `glyph` as class 3 (Mark), no other subtables.
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
        data.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
        data.extend_from_slice(&12u16.to_be_bytes()); // glyphClassDefOffset
        data.extend_from_slice(&0u16.to_be_bytes()); // attachListOffset
        data.extend_from_slice(&0u16.to_be_bytes()); // ligCaretListOffset
        data.extend_from_slice(&0u16.to_be_bytes()); // markAttachClassDefOffset
        // ClassDef format 1 at offset 12
        data.extend_from_slice(&1u16.to_be_bytes()); // format
        data.extend_from_slice(&glyph.to_be_bytes()); // startGlyph
        data.extend_from_slice(&1u16.to_be_bytes()); // glyphCount
        data.extend_from_slice(&3u16.to_be_bytes()); // classValue = Mark
        GdefTable::parse(&data).unwrap()
    }

    #[test]
    fn no_gdef_never_skips() {
        assert!(!should_skip(None, LookupFlag::IGNORE_MARKS, 5));
    }

    #[test]
    fn ignore_marks_skips_mark_glyph() {
        let gdef = gdef_with_mark(5);
        assert!(should_skip(Some(&gdef), LookupFlag::IGNORE_MARKS, 5));
        assert!(!should_skip(Some(&gdef), LookupFlag::IGNORE_MARKS, 6));
    }

    #[test]
    fn zero_flag_never_skips() {
        let gdef = gdef_with_mark(5);
        assert!(!should_skip(Some(&gdef), LookupFlag::empty(), 5));
    }
}
