//! Arabic-family joining shaping (Arabic, Syriac, Mandaic, N'Ko): classifies
//! joining behavior per codepoint, then walks the buffer choosing isolated/
//! initial/medial/final presentation forms.

use crate::buffer::GlyphInfo;

pub const ISOL: u32 = 0x1;
pub const FINA: u32 = 0x2;
pub const MEDI: u32 = 0x4;
pub const INIT: u32 = 0x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoiningType {
    NonJoining,
    RightJoining,
    DualJoining,
    JoinCausing,
    LeftJoining,
    Transparent,
}

fn joining_type(c: char) -> JoiningType {
    let code = c as u32;
    match code {
        0x0600..=0x0605 | 0x06DD | 0x08E2 => JoiningType::NonJoining,
        0x200C => JoiningType::NonJoining,
        0x200D => JoiningType::JoinCausing,
        0x0621 | 0x0674 | 0x06D5 => JoiningType::RightJoining,
        0x0622 | 0x0623 | 0x0624 | 0x0625 | 0x0627 | 0x0629 | 0x062F..=0x0632 | 0x0648 => JoiningType::RightJoining,
        0x0626 | 0x0628 | 0x062A..=0x062E | 0x0633..=0x063F | 0x0641..=0x0647 | 0x0649 | 0x064A => {
            JoiningType::DualJoining
        }
        0x0660..=0x0669 | 0x066A | 0x06F0..=0x06F9 => JoiningType::NonJoining,
        0x0610..=0x061A | 0x064B..=0x065F | 0x0670 | 0x06D6..=0x06DC | 0x06DF..=0x06E4 | 0x06E7..=0x06E8
        | 0x06EA..=0x06ED => JoiningType::Transparent,
        0x0710 => JoiningType::RightJoining,
        0x0712..=0x072C => JoiningType::DualJoining,
        0x0780..=0x07A5 => JoiningType::DualJoining,
        0x1807 | 0x1820..=0x1842 => JoiningType::DualJoining,
        0x07CA..=0x07EA => JoiningType::DualJoining,
        _ => JoiningType::NonJoining,
    }
}

/// Assigns Arabic-family joining form bits into each glyph's `mask`. Runs
/// before GSUB so the `isol`/`init`/`medi`/`fina` features can select the
/// right presentation-form alternates.
pub fn shape(infos: &mut [GlyphInfo]) {
    let codepoints: Vec<char> = infos.iter().map(|i| char::from_u32(i.glyph_id).unwrap_or('\u{FFFD}')).collect();
    let types: Vec<JoiningType> = codepoints.iter().map(|&c| joining_type(c)).collect();

    for i in 0..infos.len() {
        if types[i] == JoiningType::Transparent || types[i] == JoiningType::NonJoining {
            continue;
        }

        let prev_joins = (0..i).rev().find_map(|j| match types[j] {
            JoiningType::Transparent => None,
            JoiningType::DualJoining | JoiningType::LeftJoining | JoiningType::JoinCausing => Some(true),
            _ => Some(false),
        });
        let next_joins = (i + 1..infos.len()).find_map(|j| match types[j] {
            JoiningType::Transparent => None,
            JoiningType::DualJoining | JoiningType::RightJoining | JoiningType::JoinCausing => Some(true),
            _ => Some(false),
        });

        let joins_prev = prev_joins.unwrap_or(false) && matches!(types[i], JoiningType::DualJoining | JoiningType::RightJoining | JoiningType::LeftJoining);
        let joins_next = next_joins.unwrap_or(false) && matches!(types[i], JoiningType::DualJoining | JoiningType::LeftJoining);

        let bit = match (joins_prev, joins_next) {
            (false, false) => ISOL,
            (false, true) => INIT,
            (true, false) => FINA,
            (true, true) => MEDI,
        };
        infos[i].mask |= bit;
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
    fn beh_yeh_join_init_fina() {
        let mut infos = vec![info(0x0628), info(0x064A)];
        shape(&mut infos);
        assert_eq!(infos[0].mask & INIT, INIT);
        assert_eq!(infos[1].mask & FINA, FINA);
    }

    #[test]
    fn isolated_letter_gets_isol() {
        let mut infos = vec![info(0x0627)];
        shape(&mut infos);
        assert_eq!(infos[0].mask & ISOL, ISOL);
    }

    #[test]
    fn transparent_mark_does_not_break_join() {
        let mut infos = vec![info(0x0628), info(0x064B), info(0x064A)];
        shape(&mut infos);
        assert_eq!(infos[0].mask & INIT, INIT);
        assert_eq!(infos[2].mask & FINA, FINA);
    }
}
