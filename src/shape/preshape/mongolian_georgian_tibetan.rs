//! Mongolian, Georgian, Tibetan pre-shaping. Mongolian reuses the
//! isolated/initial/medial/final joining model from [`super::arabic`] over
//! its own letter range, treating Free Variation Selectors as transparent.
//! Georgian and Tibetan have no positional-form requirement at this layer
//! and are a documented no-op.

use crate::buffer::GlyphInfo;
use crate::shape::preshape::arabic::{FINA, INIT, ISOL, MEDI};
use crate::unicode::Script;

#[derive(PartialEq, Eq)]
enum Joining {
    Joining,
    Transparent,
    NonJoining,
}

fn mongolian_joining(c: char) -> Joining {
    match c as u32 {
        0x180B..=0x180D => Joining::Transparent,
        0x1820..=0x1842 | 0x1844..=0x1877 => Joining::Joining,
        _ => Joining::NonJoining,
    }
}

pub fn shape(infos: &mut [GlyphInfo], script: Script) {
    if script != Script::Mongolian {
        return;
    }

    let codepoints: Vec<char> = infos.iter().map(|i| char::from_u32(i.glyph_id).unwrap_or('\u{FFFD}')).collect();
    let joining: Vec<Joining> = codepoints.iter().map(|&c| mongolian_joining(c)).collect();

    for i in 0..infos.len() {
        if joining[i] != Joining::Joining {
            continue;
        }
        let joins_prev = (0..i)
            .rev()
            .find(|&j| joining[j] != Joining::Transparent)
            .is_some_and(|j| joining[j] == Joining::Joining);
        let joins_next = (i + 1..infos.len())
            .find(|&j| joining[j] != Joining::Transparent)
            .is_some_and(|j| joining[j] == Joining::Joining);

        infos[i].mask |= match (joins_prev, joins_next) {
            (false, false) => ISOL,
            (false, true) => INIT,
            (true, false) => FINA,
            (true, true) => MEDI,
        };
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
    fn two_joining_letters_get_init_fina() {
        let mut infos = vec![info(0x1820), info(0x1821)];
        shape(&mut infos, Script::Mongolian);
        assert_eq!(infos[0].mask & INIT, INIT);
        assert_eq!(infos[1].mask & FINA, FINA);
    }

    #[test]
    fn georgian_is_a_no_op() {
        let mut infos = vec![info(0x10A0)];
        shape(&mut infos, Script::Georgian);
        assert_eq!(infos[0].mask, 0);
    }
}
