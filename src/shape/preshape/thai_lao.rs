//! Thai / Lao pre-shaping: swaps a visually-leading vowel in front of its
//! consonant into logical *consonant + vowel* order. The GSUB `pref` feature
//! (present in most Thai/Lao fonts) then visually repositions the vowel
//! back over/before the consonant at render time.

use crate::buffer::GlyphInfo;
use crate::unicode::Script;

fn is_leading_vowel(c: char) -> bool {
    matches!(c as u32, 0x0E40..=0x0E44 | 0x0EC0..=0x0EC4)
}

fn is_consonant(c: char, script: Script) -> bool {
    match script {
        Script::Thai => matches!(c as u32, 0x0E01..=0x0E2E),
        Script::Lao => matches!(c as u32, 0x0E81..=0x0EAE),
        _ => false,
    }
}

/// Swaps each `leading-vowel, consonant` pair into `consonant, leading-vowel`
/// logical order in place (same length, no insert/delete needed).
pub fn shape(infos: &mut [GlyphInfo], script: Script) {
    if !matches!(script, Script::Thai | Script::Lao) {
        return;
    }
    let mut i = 0;
    while i + 1 < infos.len() {
        let a = char::from_u32(infos[i].glyph_id).unwrap_or('\u{FFFD}');
        let b = char::from_u32(infos[i + 1].glyph_id).unwrap_or('\u{FFFD}');
        if is_leading_vowel(a) && is_consonant(b, script) {
            infos.swap(i, i + 1);
            i += 2;
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::glyph_buffer::GlyphFlags;

    fn info(cp: u32, cluster: u32) -> GlyphInfo {
        GlyphInfo { glyph_id: cp, cluster, mask: 0, flags: GlyphFlags::empty(), combining_class: 0 }
    }

    #[test]
    fn sara_e_ko_kai_swaps_to_logical_order() {
        let mut infos = vec![info(0x0E40, 0), info(0x0E01, 1)];
        shape(&mut infos, Script::Thai);
        assert_eq!(infos[0].glyph_id, 0x0E01);
        assert_eq!(infos[1].glyph_id, 0x0E40);
        assert_eq!(infos[0].cluster, 1);
        assert_eq!(infos[1].cluster, 0);
    }

    #[test]
    fn non_thai_lao_script_is_no_op() {
        let mut infos = vec![info(0x0E40, 0), info(0x0E01, 1)];
        shape(&mut infos, Script::Latin);
        assert_eq!(infos[0].glyph_id, 0x0E40);
    }
}
