//! GSUB driver: walks the plan's lookup list over a [`GlyphBuffer`],
//! building the flag-filtered window each subtable kind expects and
//! executing whatever [`SubstApply`] it returns.
//!
//! Lookup dispatch and subtable matching themselves live in
//! [`crate::font::gsub`]; this module owns the buffer-wide loop: digest
//! gating, lookup-flag filtering, ligature/context window assembly, nested
//! lookup application and final compaction.

use crate::buffer::glyph_buffer::GlyphFlags;
use crate::buffer::GlyphBuffer;
use crate::digest::SetDigest;
use crate::font::gdef::GdefTable;
use crate::font::gsub::{GsubLookup, GsubSubtable, SubstApply};
use crate::font::layout_common::{should_skip, LookupFlag, SubstLookupRecord};
use crate::font::LayoutTable;
use crate::shape::MAX_NESTING_DEPTH;

/// Applies every lookup in `lookup_indices`, in order, over `buffer`.
pub fn apply(gdef: Option<&GdefTable>, table: &LayoutTable<GsubLookup>, lookup_indices: &[u16], buffer: &mut GlyphBuffer) {
    for &index in lookup_indices {
        let Some(lookup) = table.lookups.get(index as usize) else { continue };
        let buffer_digest = compute_digest(buffer);
        if !lookup.digest.may_intersect(&buffer_digest) {
            continue;
        }
        if lookup.subtables.iter().any(|s| matches!(s, GsubSubtable::ReverseChainingSingle(_))) {
            apply_reverse_chaining(gdef, lookup, buffer);
        } else {
            apply_lookup_forward(gdef, table, lookup, buffer, 0);
        }
        buffer.compact();
    }
}

fn compute_digest(buffer: &GlyphBuffer) -> SetDigest {
    let mut digest = SetDigest::new();
    for info in buffer.info() {
        digest.add(info.glyph_id as u16);
    }
    digest
}

fn apply_lookup_forward(gdef: Option<&GdefTable>, table: &LayoutTable<GsubLookup>, lookup: &GsubLookup, buffer: &mut GlyphBuffer, depth: u8) {
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
        match try_apply_subtables(gdef, table, lookup, buffer, i, depth) {
            Some(advanced) => i += advanced.max(1),
            None => i += 1,
        }
    }
}

/// Collects filtered glyphs from `start` onward, `start` included, stopping
/// at the end of the buffer.
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

/// Filtered glyphs immediately preceding `before`, nearest first.
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

/// Tries each subtable of `lookup` at buffer position `pos`, applying the
/// first match. Returns how many filtered positions the match consumed.
fn try_apply_subtables(
    gdef: Option<&GdefTable>,
    table: &LayoutTable<GsubLookup>,
    lookup: &GsubLookup,
    buffer: &mut GlyphBuffer,
    pos: usize,
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
            GsubSubtable::Single(s) => {
                if let Some(g) = s.apply(window[0]) {
                    buffer.replace(pos, &[g as u32], GlyphFlags::SUBSTITUTED);
                    return Some(1);
                }
            }
            GsubSubtable::Multiple(s) => {
                if let Some(seq) = s.apply(window[0]) {
                    let seq: Vec<u32> = seq.iter().map(|&g| g as u32).collect();
                    let len = seq.len();
                    buffer.replace(pos, &seq, GlyphFlags::MULTIPLIED);
                    return Some(len.max(1));
                }
            }
            GsubSubtable::Alternate(s) => {
                if let Some(g) = s.apply(window[0], 0) {
                    buffer.replace(pos, &[g as u32], GlyphFlags::SUBSTITUTED);
                    return Some(1);
                }
            }
            GsubSubtable::Ligature(s) => {
                if let Some(SubstApply::Ligature { glyph, input_len }) = s.apply(&window) {
                    let positions: Vec<usize> = fwd.iter().take(input_len).map(|&(idx, _)| idx).collect();
                    buffer.ligate_positions(&positions, glyph as u32);
                    return Some(1);
                }
            }
            GsubSubtable::Context(s) => {
                if let Some(SubstApply::Context { lookup_records, input_len }) = s.apply(&window) {
                    let positions: Vec<usize> = fwd.iter().take(input_len).map(|&(idx, _)| idx).collect();
                    apply_nested(gdef, table, &lookup_records, buffer, &positions, depth);
                    return Some(input_len.max(1));
                }
            }
            GsubSubtable::Chained(s) => {
                if let Some(SubstApply::Context { lookup_records, input_len }) = s.apply(&backtrack, &window) {
                    let positions: Vec<usize> = fwd.iter().take(input_len).map(|&(idx, _)| idx).collect();
                    apply_nested(gdef, table, &lookup_records, buffer, &positions, depth);
                    return Some(input_len.max(1));
                }
            }
            GsubSubtable::ReverseChainingSingle(_) => {}
        }
    }
    None
}

/// Applies each nested lookup record in descending sequence-index order, so
/// an earlier record's substitution never shifts the buffer position a
/// later-indexed (but earlier-applied) record targets.
fn apply_nested(
    gdef: Option<&GdefTable>,
    table: &LayoutTable<GsubLookup>,
    lookup_records: &[SubstLookupRecord],
    buffer: &mut GlyphBuffer,
    positions: &[usize],
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
        try_apply_subtables(gdef, table, nested, buffer, pos, depth + 1);
    }
}

fn apply_reverse_chaining(gdef: Option<&GdefTable>, lookup: &GsubLookup, buffer: &mut GlyphBuffer) {
    let mut i = buffer.len();
    while i > 0 {
        i -= 1;
        if buffer.is_deleted(i) {
            continue;
        }
        let glyph = buffer.info()[i].glyph_id as u16;
        if should_skip(gdef, lookup.flag, glyph) {
            continue;
        }
        let backtrack = filtered_backward(buffer, gdef, lookup.flag, i);
        let lookahead: Vec<u16> = filtered_forward(buffer, gdef, lookup.flag, i + 1).into_iter().map(|(_, g)| g).collect();
        for subtable in &lookup.subtables {
            if let GsubSubtable::ReverseChainingSingle(s) = subtable {
                if let Some(g) = s.apply(glyph, &backtrack, &lookahead) {
                    buffer.replace(i, &[g as u32], GlyphFlags::SUBSTITUTED);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::Coverage;
    use crate::font::gsub::{Ligature, LigatureSubst, SingleSubst};

    fn buffer_from(glyphs: &[u32]) -> GlyphBuffer {
        GlyphBuffer::from_codepoints(glyphs.iter().enumerate().map(|(i, &g)| (g, i as u32)))
    }

    fn coverage_for(glyphs: &[u16]) -> Coverage {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        for g in glyphs {
            data.extend_from_slice(&g.to_be_bytes());
        }
        Coverage::parse(&crate::reader::Reader::new(&data, "coverage")).unwrap()
    }

    fn single_lookup(from: u16, to: u16) -> GsubLookup {
        let coverage = coverage_for(&[from]);
        let digest = coverage.digest();
        let single = SingleSubst::Format2 { coverage, substitutes: vec![to] };
        GsubLookup { flag: LookupFlag::empty(), mark_filtering_set: None, digest, subtables: vec![GsubSubtable::Single(single)] }
    }

    fn ligature_lookup(first: u16, rest: &[u16], result: u16) -> GsubLookup {
        let coverage = coverage_for(&[first]);
        let digest = coverage.digest();
        let ligature_sets = vec![vec![Ligature { glyph: result, components: rest.to_vec() }]];
        let ligature = LigatureSubst { coverage, ligature_sets };
        GsubLookup { flag: LookupFlag::empty(), mark_filtering_set: None, digest, subtables: vec![GsubSubtable::Ligature(ligature)] }
    }

    fn table_with(lookups: Vec<GsubLookup>) -> LayoutTable<GsubLookup> {
        LayoutTable {
            scripts: crate::font::layout_common::ScriptList { scripts: Vec::new() },
            features: crate::font::layout_common::FeatureList { features: Vec::new() },
            lookups,
        }
    }

    #[test]
    fn single_substitution_replaces_glyph() {
        let table = table_with(vec![single_lookup(5, 42)]);
        let mut buf = buffer_from(&[5]);
        apply(None, &table, &[0], &mut buf);
        assert_eq!(buf.info()[0].glyph_id, 42);
    }

    #[test]
    fn ligature_merges_components_and_sets_cluster() {
        let table = table_with(vec![ligature_lookup(10, &[11], 99)]);
        let mut buf = buffer_from(&[10, 11]);
        apply(None, &table, &[0], &mut buf);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.info()[0].glyph_id, 99);
        assert_eq!(buf.info()[0].cluster, 0);
        assert!(buf.info()[0].flags.contains(GlyphFlags::LIGATED));
    }

    #[test]
    fn non_intersecting_lookup_is_a_no_op() {
        let table = table_with(vec![single_lookup(5, 42)]);
        let mut buf = buffer_from(&[7]);
        apply(None, &table, &[0], &mut buf);
        assert_eq!(buf.info()[0].glyph_id, 7);
    }

    #[test]
    fn ligature_needing_more_than_sixteen_components_never_matches() {
        // 16 trailing components (17 total with the anchor) exceeds the
        // matching window cap, so this ligature can never fire no matter how
        // long a contiguous run of matchable glyphs the buffer has.
        let rest: Vec<u16> = (1..=16).collect();
        let table = table_with(vec![ligature_lookup(0, &rest, 99)]);
        let glyphs: Vec<u32> = (0..=16).collect();
        let mut buf = buffer_from(&glyphs);
        apply(None, &table, &[0], &mut buf);
        assert_eq!(buf.len(), 17);
        assert_eq!(buf.info()[0].glyph_id, 0);
    }
}
