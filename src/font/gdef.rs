//! `GDEF` table: glyph class definitions and mark attachment classes.

use crate::coverage::ClassDef;
use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphClass {
    Base,
    Ligature,
    Mark,
    Component,
    Other,
}

impl GlyphClass {
    fn from_u16(v: u16) -> Self {
        match v {
            1 => GlyphClass::Base,
            2 => GlyphClass::Ligature,
            3 => GlyphClass::Mark,
            4 => GlyphClass::Component,
            _ => GlyphClass::Other,
        }
    }
}

pub struct GdefTable {
    glyph_class_def: Option<ClassDef>,
    mark_attach_class_def: Option<ClassDef>,
    mark_glyph_sets: Vec<crate::coverage::Coverage>,
}

impl GdefTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "GDEF");
        let major = r.read_u16()?;
        let minor = r.read_u16()?;
        let glyph_class_def_offset = r.read_u16()?;
        let _attach_list_offset = r.read_u16()?;
        let _lig_caret_list_offset = r.read_u16()?;
        let mark_attach_class_def_offset = r.read_u16()?;

        let mark_glyph_sets_def_offset = if major == 1 && minor >= 2 {
            r.read_u16()?
        } else {
            0
        };

        let glyph_class_def = if glyph_class_def_offset != 0 {
            Some(ClassDef::parse(&r.slice_from(glyph_class_def_offset as usize)?)?)
        } else {
            None
        };

        let mark_attach_class_def = if mark_attach_class_def_offset != 0 {
            Some(ClassDef::parse(&r.slice_from(mark_attach_class_def_offset as usize)?)?)
        } else {
            None
        };

        let mut mark_glyph_sets = Vec::new();
        if mark_glyph_sets_def_offset != 0 {
            let mut sr = r.slice_from(mark_glyph_sets_def_offset as usize)?;
            let _format = sr.read_u16()?;
            let count = sr.read_u16()? as usize;
            for _ in 0..count {
                let offset = sr.read_u32()? as usize;
                if offset != 0 {
                    mark_glyph_sets.push(crate::coverage::Coverage::parse(&sr.slice_from(offset)?)?);
                }
            }
        }

        Ok(GdefTable { glyph_class_def, mark_attach_class_def, mark_glyph_sets })
    }

    pub fn glyph_class(&self, glyph: u16) -> GlyphClass {
        match &self.glyph_class_def {
            Some(cd) => GlyphClass::from_u16(cd.get(glyph)),
            None => GlyphClass::Other,
        }
    }

    pub fn mark_attach_class(&self, glyph: u16) -> u16 {
        self.mark_attach_class_def.as_ref().map(|cd| cd.get(glyph)).unwrap_or(0)
    }

    pub fn mark_glyph_set(&self, index: u16) -> Option<&crate::coverage::Coverage> {
        self.mark_glyph_sets.get(index as usize)
    }

    pub fn is_mark(&self, glyph: u16) -> bool {
        self.glyph_class(glyph) == GlyphClass::Mark
    }
}
