//! Script-specific pre-shaping: runs before GSUB, reorders/composes
//! codepoints into logical shaping order and stamps feature-activation bits
//! into `GlyphInfo.mask`.

pub mod arabic;
pub mod hangul;
pub mod hebrew;
pub mod indic;
pub mod mongolian_georgian_tibetan;
pub mod thai_lao;
pub mod use_engine;

use crate::buffer::GlyphInfo;
use crate::unicode::Script;

/// Dispatches to the pre-shaper (if any) for `script`. A no-op for scripts
/// with no positional-form or reordering requirement (Latin, Greek,
/// Cyrillic, Han, ...).
pub fn apply(infos: &mut Vec<GlyphInfo>, script: Script) {
    match script {
        Script::Arabic | Script::Syriac | Script::Nko => arabic::shape(infos),
        Script::Hebrew => hebrew::shape(infos),
        Script::Hangul => hangul::shape(infos),
        Script::Devanagari
        | Script::Bengali
        | Script::Gurmukhi
        | Script::Gujarati
        | Script::Oriya
        | Script::Tamil
        | Script::Telugu
        | Script::Kannada
        | Script::Malayalam
        | Script::Sinhala => indic::shape(infos, script),
        Script::Thai | Script::Lao => thai_lao::shape(infos, script),
        Script::Khmer | Script::Myanmar => use_engine::shape(infos, script),
        Script::Mongolian | Script::Georgian | Script::Tibetan => mongolian_georgian_tibetan::shape(infos, script),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::glyph_buffer::GlyphFlags;

    fn info(cp: u32) -> GlyphInfo {
        GlyphInfo { glyph_id: cp, cluster: 0, mask: 0, flags: GlyphFlags::empty(), combining_class: 0 }
    }

    #[test]
    fn latin_has_no_registered_preshaper() {
        let mut infos = vec![info('A' as u32)];
        apply(&mut infos, Script::Latin);
        assert_eq!(infos[0].mask, 0);
    }

    #[test]
    fn arabic_dispatches_to_joining_shaper() {
        let mut infos = vec![info(0x0628), info(0x064A)];
        apply(&mut infos, Script::Arabic);
        assert_ne!(infos[0].mask, 0);
    }
}
