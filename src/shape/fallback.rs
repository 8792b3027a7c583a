//! Positioning fallback for fonts that carry no usable `GPOS` lookups for
//! the active script: pair kerning from the legacy `kern` table, plus a
//! GDEF-class/combining-class heuristic that stacks combining marks onto
//! their base glyph instead of leaving them with their own (wrong) advance.

use crate::buffer::GlyphBuffer;
use crate::font::face::Face;
use crate::font::gdef::GdefTable;

/// Applies `kern`-table pair adjustments (skipping any pair touching a
/// mark) and a mark stacking heuristic. A no-op if the font has no `kern`
/// table and the buffer has no marks to stack.
pub fn apply(face: &Face, gdef: Option<&GdefTable>, buffer: &mut GlyphBuffer) {
    if let Some(kern) = face.font().kern() {
        apply_kerning(&kern, gdef, buffer);
    }
    let units_per_em = face.units_per_em().unwrap_or(1000);
    stack_marks(gdef, units_per_em, buffer);
}

fn apply_kerning(kern: &crate::font::kern::KernTable, gdef: Option<&GdefTable>, buffer: &mut GlyphBuffer) {
    let is_mark = |glyph: u16| gdef.map(|g| g.is_mark(glyph)).unwrap_or(false);
    for i in 0..buffer.len().saturating_sub(1) {
        let left = buffer.info()[i].glyph_id as u16;
        let right = buffer.info()[i + 1].glyph_id as u16;
        if is_mark(left) || is_mark(right) {
            continue;
        }
        let adjustment = kern.kerning(left, right);
        if adjustment != 0 {
            buffer.positions_mut()[i].x_advance += adjustment as i32;
        }
    }
}

/// Vertical offset, as a fraction of the em, for a mark of the given
/// canonical combining class. Hebrew points (`10..=26`) and Arabic vowel
/// marks (`27..=35`) get narrower bands than the generic above/below/overlay
/// buckets since they sit closer to the base glyph. `216..=229` covers the
/// below/below-left/below-right attachment classes; `1` is overlay; anything
/// else (230 and up, or a GDEF-only mark with no recorded combining class)
/// is treated as sitting above the base.
fn vertical_offset_fraction(ccc: u8) -> f32 {
    match ccc {
        10..=26 => 0.35,
        27..=35 => 0.25,
        1 => 0.30,
        200..=229 => -0.15,
        _ => 0.70,
    }
}

/// A glyph is a fallback-positioning mark if GDEF says so, or if its
/// original codepoint had a nonzero canonical combining class (for fonts
/// with no GDEF at all).
fn is_fallback_mark(gdef: Option<&GdefTable>, glyph: u16, combining_class: u8) -> bool {
    gdef.map(|g| g.is_mark(glyph)).unwrap_or(false) || combining_class != 0
}

/// Without real anchor data, a mark can't be placed exactly over its base;
/// this centers it horizontally over the base's advance and nudges it
/// vertically by a combining-class-keyed fraction of the em, which reads
/// correctly for a single accent and degrades gracefully (but not
/// correctly) for piled-up diacritics.
fn stack_marks(gdef: Option<&GdefTable>, units_per_em: u16, buffer: &mut GlyphBuffer) {
    let mut base_advance: i32 = 0;
    let mut stack_depth: i32 = 0;
    for i in 0..buffer.len() {
        let glyph = buffer.info()[i].glyph_id as u16;
        let combining_class = buffer.info()[i].combining_class;
        if is_fallback_mark(gdef, glyph, combining_class) {
            stack_depth += 1;
            let mark_advance = buffer.positions()[i].x_advance;
            let offset = (vertical_offset_fraction(combining_class) * units_per_em as f32) as i32;
            let p = &mut buffer.positions_mut()[i];
            p.x_offset = (base_advance - mark_advance) / 2 - base_advance;
            p.y_offset = offset * stack_depth;
            p.x_advance = 0;
        } else {
            stack_depth = 0;
            base_advance = buffer.positions()[i].x_advance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GlyphPosition;

    fn gdef_with_mark(glyph: u16) -> GdefTable {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&12u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&glyph.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        GdefTable::parse(&data).unwrap()
    }

    #[test]
    fn mark_advance_is_zeroed_after_stacking() {
        let gdef = gdef_with_mark(20);
        let mut buf = GlyphBuffer::from_codepoints([(10u32, 0u32), (20, 1)].into_iter());
        buf.positions_mut()[0] = GlyphPosition { x_advance: 600, ..GlyphPosition::default() };
        buf.positions_mut()[1] = GlyphPosition { x_advance: 300, ..GlyphPosition::default() };
        stack_marks(Some(&gdef), 1000, &mut buf);
        assert_eq!(buf.positions()[1].x_advance, 0);
        assert!(buf.positions()[1].y_offset > 0);
    }

    #[test]
    fn mark_stacks_from_combining_class_without_gdef() {
        // U+0301 COMBINING ACUTE ACCENT, ccc 230 ("above"), with no GDEF.
        let mut buf = GlyphBuffer::from_codepoints([('a' as u32, 0u32), (0x0301, 1)].into_iter());
        buf.positions_mut()[0] = GlyphPosition { x_advance: 600, ..GlyphPosition::default() };
        buf.positions_mut()[1] = GlyphPosition { x_advance: 300, ..GlyphPosition::default() };
        stack_marks(None, 1000, &mut buf);
        assert_eq!(buf.positions()[1].x_advance, 0);
        assert!(buf.positions()[1].y_offset > 0);
    }

    #[test]
    fn below_mark_is_offset_downward() {
        // U+0316 COMBINING GRAVE ACCENT BELOW, ccc 220 ("below").
        let mut buf = GlyphBuffer::from_codepoints([('a' as u32, 0u32), (0x0316, 1)].into_iter());
        buf.positions_mut()[0] = GlyphPosition { x_advance: 600, ..GlyphPosition::default() };
        buf.positions_mut()[1] = GlyphPosition { x_advance: 300, ..GlyphPosition::default() };
        stack_marks(None, 1000, &mut buf);
        assert!(buf.positions()[1].y_offset < 0);
    }

    #[test]
    fn kerning_adjusts_adjacent_pair() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&20u16.to_be_bytes());
        data.extend_from_slice(&0x0000u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&6u16.to_be_bytes());
        data.extend_from_slice(&(-40i16).to_be_bytes());
        let kern = crate::font::kern::KernTable::parse(&data).unwrap();
        let mut buf = GlyphBuffer::from_codepoints([(5u32, 0u32), (6, 1)].into_iter());
        buf.positions_mut()[0] = GlyphPosition { x_advance: 500, ..GlyphPosition::default() };
        apply_kerning(&kern, None, &mut buf);
        assert_eq!(buf.positions()[0].x_advance, 460);
    }

    #[test]
    fn kerning_skips_pair_touching_a_mark() {
        let gdef = gdef_with_mark(6);
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&20u16.to_be_bytes());
        data.extend_from_slice(&0x0000u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&6u16.to_be_bytes());
        data.extend_from_slice(&(-40i16).to_be_bytes());
        let kern = crate::font::kern::KernTable::parse(&data).unwrap();
        let mut buf = GlyphBuffer::from_codepoints([(5u32, 0u32), (6, 1)].into_iter());
        buf.positions_mut()[0] = GlyphPosition { x_advance: 500, ..GlyphPosition::default() };
        apply_kerning(&kern, Some(&gdef), &mut buf);
        assert_eq!(buf.positions()[0].x_advance, 500);
    }
}
