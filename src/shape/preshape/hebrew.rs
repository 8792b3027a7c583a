//! Hebrew pre-shaping: tag points/accents with the index of their base
//! letter so `ccmp`/`dlig` lookups (biblical cantillation ligatures) see the
//! pairing, even though the base and its marks sit at separate buffer
//! positions until GSUB runs.

use crate::buffer::GlyphInfo;

fn is_hebrew_point_or_accent(c: char) -> bool {
    matches!(c as u32, 0x0591..=0x05BD | 0x05BF | 0x05C1..=0x05C2 | 0x05C4..=0x05C5 | 0x05C7)
}

/// Stores the owning base letter's buffer index in the low 16 bits of each
/// mark's `mask`, leaving the high 16 bits free for feature-activation bits.
pub fn shape(infos: &mut [GlyphInfo]) {
    let mut last_base: Option<u16> = None;
    for i in 0..infos.len() {
        let c = char::from_u32(infos[i].glyph_id).unwrap_or('\u{FFFD}');
        if is_hebrew_point_or_accent(c) {
            if let Some(base) = last_base {
                infos[i].mask = (infos[i].mask & 0xFFFF_0000) | base as u32;
            }
        } else {
            last_base = Some(i as u16);
        }
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
    fn point_records_preceding_base_index() {
        let mut infos = vec![info(0x05D0), info(0x05B7)];
        shape(&mut infos);
        assert_eq!(infos[1].mask & 0xFFFF, 0);
    }

    #[test]
    fn non_point_letters_are_untouched() {
        let mut infos = vec![info(0x05D0), info(0x05D1)];
        shape(&mut infos);
        assert_eq!(infos[1].mask, 0);
    }
}
