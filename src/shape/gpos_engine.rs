//! GPOS driver: mirrors [`crate::shape::gsub_engine`]'s buffer-wide loop but
//! accumulates into [`crate::buffer::GlyphPosition`] instead of substituting
//! glyphs. Mark attachment (to-base/to-ligature/to-mark) additionally
//! consults a precomputed `base_index` array so marks don't each rescan the
//! buffer backward for their anchor glyph.

use crate::buffer::GlyphBuffer;
use crate::digest::SetDigest;
use crate::font::gdef::GdefTable;
use crate::font::gpos::{GposLookup, GposSubtable, PosApply};
use crate::font::layout_common::{should_skip, Anchor, LookupFlag, SubstLookupRecord, ValueRecord};
use crate::font::LayoutTable;
use crate::shape::MAX_NESTING_DEPTH;

/// Applies every lookup in `lookup_indices`, in order, over `buffer`.
/// Positions must already be initialized (advances from `hmtx`/`HVAR`) —
/// see [`crate::shape::init_positions`].
pub fn apply(gdef: Option<&GdefTable>, table: &LayoutTable<GposLookup>, lookup_indices: &[u16], buffer: &mut GlyphBuffer) {
    let (base_index, ligature_component, has_marks) = compute_base_index(buffer, gdef);
    for &index in lookup_indices {
        let Some(lookup) = table.lookups.get(index as usize) else { continue };
        let is_mark_lookup =
            lookup.subtables.iter().any(|s| matches!(s, GposSubtable::MarkToBase(_) | GposSubtable::MarkToLigature(_) | GposSubtable::MarkToMark(_)));
        if is_mark_lookup && !has_marks {
            continue;
        }
        let buffer_digest = compute_digest(buffer);
        if !lookup.digest.may_intersect(&buffer_digest) {
            continue;
        }
        apply_lookup(gdef, table, lookup, buffer, &base_index, &ligature_component, 0);
    }
}

fn compute_digest(buffer: &GlyphBuffer) -> SetDigest {
    let mut digest = SetDigest::new();
    for info in buffer.info() {
        digest.add(info.glyph_id as u16);
    }
    digest
}

/// For each mark glyph, the nearest preceding non-mark (base, ligature or
/// component) position; `None` for non-marks and for a mark with nothing
/// preceding it. Also returns, per mark position, the count of other marks
/// already seen since that base (0 for the first mark after it, 1 for the
/// next, ...) — the componentIndex a mark-to-ligature lookup attaches with.
fn compute_base_index(buffer: &GlyphBuffer, gdef: Option<&GdefTable>) -> (Vec<Option<usize>>, Vec<usize>, bool) {
    let mut base_index = vec![None; buffer.len()];
    let mut ligature_component = vec![0; buffer.len()];
    let mut last_base = None;
    let mut marks_since_base = 0;
    let mut has_marks = false;
    for i in 0..buffer.len() {
        let glyph = buffer.info()[i].glyph_id as u16;
        if gdef.map(|g| g.is_mark(glyph)).unwrap_or(false) {
            has_marks = true;
            base_index[i] = last_base;
            ligature_component[i] = marks_since_base;
            marks_since_base += 1;
        } else {
            last_base = Some(i);
            marks_since_base = 0;
        }
    }
    (base_index, ligature_component, has_marks)
}

fn add_value(buffer: &mut GlyphBuffer, pos: usize, v: ValueRecord) {
    let p = &mut buffer.positions_mut()[pos];
    p.x_advance += v.x_advance as i32;
    p.y_advance += v.y_advance as i32;
    p.x_offset += v.x_placement as i32;
    p.y_offset += v.y_placement as i32;
}

/// Places `mark_pos`'s anchor point on `anchor_pos`'s anchor point and zeros
/// the mark's own advance. Assumes the mark directly follows its attachment
/// glyph in the buffer (true for every GDEF-marked combining mark that
/// hasn't been separated from its base by an intervening non-mark glyph);
/// offsets of glyphs between them are not folded in, which is exact for the
/// overwhelmingly common zero-or-only-marks-between case and an accepted
/// approximation otherwise.
fn attach_mark(buffer: &mut GlyphBuffer, mark_pos: usize, anchor_pos: usize, mark_anchor: Anchor, attach_anchor: Anchor) {
    let anchor_offset = buffer.positions()[anchor_pos];
    let p = &mut buffer.positions_mut()[mark_pos];
    p.x_offset = anchor_offset.x_offset + attach_anchor.x as i32 - mark_anchor.x as i32;
    p.y_offset = anchor_offset.y_offset + attach_anchor.y as i32 - mark_anchor.y as i32;
    p.x_advance = 0;
    p.y_advance = 0;
}

fn filtered_forward(buffer: &GlyphBuffer, gdef: Option<&GdefTable>, flag: LookupFlag, start: usize) -> Vec<(usize, u16)> {
    let mut out = Vec::new();
    for idx in start..buffer.len() {
        if buffer.is_deleted(idx) {
            continue;
        }
        let glyph = buffer.info()[idx].glyph_id as u16;
        if should_skip(gdef, flag, glyph) {
            continue;
        }
        out.push((idx, glyph));
    }
    out
}

fn filtered_backward(buffer: &GlyphBuffer, gdef: Option<&GdefTable>, flag: LookupFlag, before: usize) -> Vec<u16> {
    let mut out = Vec::new();
    for idx in (0..before).rev() {
        if buffer.is_deleted(idx) {
            continue;
        }
        let glyph = buffer.info()[idx].glyph_id as u16;
        if should_skip(gdef, flag, glyph) {
            continue;
        }
        out.push(glyph);
    }
    out
}

fn apply_lookup(
    gdef: Option<&GdefTable>,
    table: &LayoutTable<GposLookup>,
    lookup: &GposLookup,
    buffer: &mut GlyphBuffer,
    base_index: &[Option<usize>],
    ligature_component: &[usize],
    depth: u8,
) {
    if depth >= MAX_NESTING_DEPTH {
        return;
    }
    let mut i = 0;
    while i < buffer.len() {
        if buffer.is_deleted(i) {
            i += 1;
            continue;
        }
        let glyph = buffer.info()[i].glyph_id as u16;
        if should_skip(gdef, lookup.flag, glyph) {
            i += 1;
            continue;
        }
        match try_apply_subtables(gdef, table, lookup, buffer, i, base_index, ligature_component, depth) {
            Some(next) => i = next,
            None => i += 1,
        }
    }
}

fn try_apply_subtables(
    gdef: Option<&GdefTable>,
    table: &LayoutTable<GposLookup>,
    lookup: &GposLookup,
    buffer: &mut GlyphBuffer,
    pos: usize,
    base_index: &[Option<usize>],
    ligature_component: &[usize],
    depth: u8,
) -> Option<usize> {
    let fwd = filtered_forward(buffer, gdef, lookup.flag, pos);
    if fwd.first().map(|&(idx, _)| idx) != Some(pos) {
        return None;
    }
    let window: Vec<u16> = fwd.iter().map(|&(_, g)| g).collect();
    let backtrack = filtered_backward(buffer, gdef, lookup.flag, pos);

    for subtable in &lookup.subtables {
        match subtable {
            GposSubtable::Single(s) => {
                if let Some(v) = s.apply(window[0]) {
                    add_value(buffer, pos, v);
                    return Some(pos + 1);
                }
            }
            GposSubtable::Pair(s) => {
                let Some(&(second_pos, second_glyph)) = fwd.get(1) else { continue };
                if let Some((v1, v2)) = s.apply(window[0], second_glyph) {
                    add_value(buffer, pos, v1);
                    add_value(buffer, second_pos, v2);
                    return Some(second_pos + 1);
                }
            }
            GposSubtable::Cursive(s) => {
                let Some((_, Some(exit))) = s.entry_exit(window[0]) else { continue };
                let Some(&(next_pos, next_glyph)) = fwd.get(1) else { continue };
                let Some((Some(entry), _)) = s.entry_exit(next_glyph) else { continue };
                let cur_y_offset = buffer.positions()[pos].y_offset;
                buffer.positions_mut()[next_pos].y_offset = cur_y_offset + exit.y as i32 - entry.y as i32;
                return Some(pos + 1);
            }
            GposSubtable::MarkToBase(s) => {
                let Some(anchor_pos) = base_index.get(pos).copied().flatten() else { continue };
                let base_glyph = buffer.info()[anchor_pos].glyph_id as u16;
                if let Some((mark_anchor, base_anchor)) = s.apply(window[0], base_glyph) {
                    attach_mark(buffer, pos, anchor_pos, mark_anchor, base_anchor);
                    return Some(pos + 1);
                }
            }
            GposSubtable::MarkToLigature(s) => {
                let Some(anchor_pos) = base_index.get(pos).copied().flatten() else { continue };
                let ligature_glyph = buffer.info()[anchor_pos].glyph_id as u16;
                let component = ligature_component.get(pos).copied().unwrap_or(0);
                if let Some((mark_anchor, lig_anchor)) = s.apply(window[0], ligature_glyph, component) {
                    attach_mark(buffer, pos, anchor_pos, mark_anchor, lig_anchor);
                    return Some(pos + 1);
                }
            }
            GposSubtable::MarkToMark(s) => {
                let Some(prev_pos) = nearest_filtered_backward_index(buffer, gdef, lookup.flag, pos) else { continue };
                let prev = buffer.info()[prev_pos].glyph_id as u16;
                if let Some((mark_anchor, mark2_anchor)) = s.apply(window[0], prev) {
                    attach_mark(buffer, pos, prev_pos, mark_anchor, mark2_anchor);
                    return Some(pos + 1);
                }
            }
            GposSubtable::Context(s) => {
                if let Some(PosApply { lookup_records, input_len }) = s.apply(&window) {
                    let positions: Vec<usize> = fwd.iter().take(input_len).map(|&(idx, _)| idx).collect();
                    apply_nested(gdef, table, &lookup_records, buffer, &positions, base_index, ligature_component, depth);
                    return Some(positions.last().map(|&p| p + 1).unwrap_or(pos + 1));
                }
            }
            GposSubtable::Chained(s) => {
                if let Some(PosApply { lookup_records, input_len }) = s.apply(&backtrack, &window) {
                    let positions: Vec<usize> = fwd.iter().take(input_len).map(|&(idx, _)| idx).collect();
                    apply_nested(gdef, table, &lookup_records, buffer, &positions, base_index, ligature_component, depth);
                    return Some(positions.last().map(|&p| p + 1).unwrap_or(pos + 1));
                }
            }
        }
    }
    None
}

/// Buffer index of the nearest filtered glyph strictly before `before`.
fn nearest_filtered_backward_index(buffer: &GlyphBuffer, gdef: Option<&GdefTable>, flag: LookupFlag, before: usize) -> Option<usize> {
    for idx in (0..before).rev() {
        if buffer.is_deleted(idx) {
            continue;
        }
        let glyph = buffer.info()[idx].glyph_id as u16;
        if should_skip(gdef, flag, glyph) {
            continue;
        }
        return Some(idx);
    }
    None
}

fn apply_nested(
    gdef: Option<&GdefTable>,
    table: &LayoutTable<GposLookup>,
    lookup_records: &[SubstLookupRecord],
    buffer: &mut GlyphBuffer,
    positions: &[usize],
    base_index: &[Option<usize>],
    ligature_component: &[usize],
    depth: u8,
) {
    if depth + 1 >= MAX_NESTING_DEPTH {
        return;
    }
    let mut records: Vec<&SubstLookupRecord> = lookup_records.iter().collect();
    records.sort_by(|a, b| b.sequence_index.cmp(&a.sequence_index));
    for record in records {
        let Some(&pos) = positions.get(record.sequence_index as usize) else { continue };
        let Some(nested) = table.lookups.get(record.lookup_list_index as usize) else { continue };
        try_apply_subtables(gdef, table, nested, buffer, pos, base_index, ligature_component, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GlyphPosition;
    use crate::font::layout_common::{FeatureList, ScriptList};
    use crate::reader::Reader;

    fn buffer_with_positions(glyphs: &[(u32, i32)]) -> GlyphBuffer {
        let mut buf = GlyphBuffer::from_codepoints(glyphs.iter().enumerate().map(|(i, &(g, _))| (g, i as u32)));
        for (i, &(_, adv)) in glyphs.iter().enumerate() {
            buf.positions_mut()[i] = GlyphPosition { x_advance: adv, ..GlyphPosition::default() };
        }
        buf
    }

    fn table_with(lookups: Vec<GposLookup>) -> LayoutTable<GposLookup> {
        LayoutTable { scripts: ScriptList { scripts: Vec::new() }, features: FeatureList { features: Vec::new() }, lookups }
    }

    /// Wraps `subtable` bytes in a single-subtable lookup header (lookup
    /// type `lookup_type`, flag 0) the way `GposLookup::parse` expects.
    fn lookup_bytes(lookup_type: u16, subtable: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&lookup_type.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // flag
        data.extend_from_slice(&1u16.to_be_bytes()); // subtable count
        data.extend_from_slice(&8u16.to_be_bytes()); // subtable offset (right after this 8-byte header)
        data.extend_from_slice(subtable);
        data
    }

    fn single_pos_subtable(glyph: u16, x_advance: i16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // format 1
        data.extend_from_slice(&8u16.to_be_bytes()); // coverage offset
        data.extend_from_slice(&0x0004u16.to_be_bytes()); // XAdvance only
        data.extend_from_slice(&x_advance.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // coverage format 1
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&glyph.to_be_bytes());
        data
    }

    #[test]
    fn single_pos_adds_x_advance() {
        let data = lookup_bytes(1, &single_pos_subtable(5, 40));
        let lookup = GposLookup::parse(&Reader::new(&data, "GPOS")).unwrap();
        let table = table_with(vec![lookup]);
        let mut buf = buffer_with_positions(&[(5, 500)]);
        apply(None, &table, &[0], &mut buf);
        assert_eq!(buf.positions()[0].x_advance, 540);
    }

    /// One mark class, one mark glyph and one base glyph, base anchor at
    /// (500, 700), mark anchor at the origin.
    fn mark_to_base_subtable(mark_glyph: u16, base_glyph: u16) -> Vec<u8> {
        let mut data = vec![0u8; 12];
        data[0..2].copy_from_slice(&1u16.to_be_bytes()); // format
        data[6..8].copy_from_slice(&1u16.to_be_bytes()); // mark class count

        let mark_array_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes()); // mark count
        data.extend_from_slice(&0u16.to_be_bytes()); // mark class 0
        let mark_anchor_rel_pos = data.len();
        data.extend_from_slice(&0u16.to_be_bytes()); // anchor offset, patched below

        let mark_anchor_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes()); // anchor format 1
        data.extend_from_slice(&0i16.to_be_bytes());
        data.extend_from_slice(&0i16.to_be_bytes());

        let base_array_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes()); // base count
        let base_anchor_rel_pos = data.len();
        data.extend_from_slice(&0u16.to_be_bytes()); // anchor offset, patched below

        let base_anchor_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&500i16.to_be_bytes());
        data.extend_from_slice(&700i16.to_be_bytes());

        let mark_coverage_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&mark_glyph.to_be_bytes());

        let base_coverage_offset = data.len() as u16;
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&base_glyph.to_be_bytes());

        data[2..4].copy_from_slice(&mark_coverage_offset.to_be_bytes());
        data[4..6].copy_from_slice(&base_coverage_offset.to_be_bytes());
        data[8..10].copy_from_slice(&mark_array_offset.to_be_bytes());
        data[10..12].copy_from_slice(&base_array_offset.to_be_bytes());

        let mark_anchor_rel = mark_anchor_offset - mark_array_offset;
        data[mark_anchor_rel_pos..mark_anchor_rel_pos + 2].copy_from_slice(&mark_anchor_rel.to_be_bytes());
        let base_anchor_rel = base_anchor_offset - (base_array_offset + 2);
        data[base_anchor_rel_pos..base_anchor_rel_pos + 2].copy_from_slice(&base_anchor_rel.to_be_bytes());

        data
    }

    fn gdef_with_mark(glyph: u16) -> GdefTable {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
        data.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
        data.extend_from_slice(&12u16.to_be_bytes()); // glyphClassDefOffset
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // ClassDef format 1
        data.extend_from_slice(&glyph.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes()); // class = Mark
        GdefTable::parse(&data).unwrap()
    }

    #[test]
    fn mark_to_base_places_anchor_and_zeroes_advance() {
        let data = lookup_bytes(4, &mark_to_base_subtable(20, 10));
        let lookup = GposLookup::parse(&Reader::new(&data, "GPOS")).unwrap();
        let table = table_with(vec![lookup]);
        let mut buf = buffer_with_positions(&[(10, 600), (20, 0)]);
        let gdef = gdef_with_mark(20);
        apply(Some(&gdef), &table, &[0], &mut buf);
        assert_eq!(buf.positions()[1].x_offset, 500);
        assert_eq!(buf.positions()[1].y_offset, 700);
        assert_eq!(buf.positions()[1].x_advance, 0);
    }

    fn gdef_with_marks(glyphs: &[u16]) -> GdefTable {
        // Glyph class format 2 (glyph ranges), one single-glyph range per
        // mark, all class 3 (Mark).
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&12u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes()); // ClassDef format 2
        data.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        for &g in glyphs {
            data.extend_from_slice(&g.to_be_bytes());
            data.extend_from_slice(&g.to_be_bytes());
            data.extend_from_slice(&3u16.to_be_bytes());
        }
        GdefTable::parse(&data).unwrap()
    }

    #[test]
    fn second_mark_after_a_ligature_gets_component_index_one() {
        // Ligature at position 0, two marks at 1 and 2 both attaching to it;
        // the first should see component 0, the second component 1.
        let buf = buffer_with_positions(&[(99, 600), (20, 0), (21, 0)]);
        let gdef = gdef_with_marks(&[20, 21]);
        let (base_index, ligature_component, has_marks) = compute_base_index(&buf, Some(&gdef));
        assert!(has_marks);
        assert_eq!(base_index[1], Some(0));
        assert_eq!(base_index[2], Some(0));
        assert_eq!(ligature_component[1], 0);
        assert_eq!(ligature_component[2], 1);
    }
}
