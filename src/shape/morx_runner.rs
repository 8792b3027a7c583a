//! Executes `morx` extended state tables over a glyph buffer. Used only when
//! a font carries no usable `GSUB` plan for the active script (legacy AAT
//! fonts, mostly): [`crate::font::morx`] parses the chain/subtable envelope,
//! this module walks each subtable's state machine.
//!
//! All five subtable kinds share one state-table shape: a class table maps
//! glyph -> class, a state array maps (state, class) -> entry index, and an
//! entry table maps entry index -> (next state, flags, kind-specific
//! payload). Only non-contextual substitution skips the state machine
//! entirely; its body is a bare glyph lookup table.

use crate::buffer::glyph_buffer::GlyphFlags;
use crate::buffer::GlyphBuffer;
use crate::font::morx::{MorxSubtable, MorxSubtableKind, MorxTable};
use crate::reader::Reader;

const CLASS_OUT_OF_BOUNDS: u16 = 1;
const CLASS_DELETED_GLYPH: u16 = 2;

const STATE_START_OF_TEXT: u16 = 0;

const REARRANGE_MARK_FIRST: u16 = 0x8000;
const REARRANGE_DONT_ADVANCE: u16 = 0x4000;
const REARRANGE_MARK_LAST: u16 = 0x2000;
const REARRANGE_VERB_MASK: u16 = 0x000F;

const LIGATURE_SET_COMPONENT: u16 = 0x8000;
const LIGATURE_DONT_ADVANCE: u16 = 0x4000;
const LIGATURE_PERFORM_ACTION: u16 = 0x2000;
const LIGATURE_ACTION_LAST: u32 = 0x80000000;
const LIGATURE_ACTION_STORE: u32 = 0x40000000;

const CONTEXTUAL_SET_MARK: u16 = 0x8000;
const CONTEXTUAL_DONT_ADVANCE: u16 = 0x4000;
const CONTEXTUAL_NO_SUBSTITUTION: u16 = 0xFFFF;

const INSERTION_SET_MARK: u16 = 0x8000;
const INSERTION_DONT_ADVANCE: u16 = 0x4000;
const INSERTION_CURRENT_INSERT_BEFORE: u16 = 0x0800;
const INSERTION_MARKED_INSERT_BEFORE: u16 = 0x0400;
const INSERTION_CURRENT_COUNT_SHIFT: u16 = 5;
const INSERTION_CURRENT_COUNT_MASK: u16 = 0x03E0;
const INSERTION_MARKED_COUNT_MASK: u16 = 0x001F;
const INSERTION_NO_INDEX: u16 = 0xFFFF;

/// Runs every chain's subtables over `buffer`, in order.
pub fn apply(table: &MorxTable, buffer: &mut GlyphBuffer) {
    for chain in &table.chains {
        for subtable in &chain.subtables {
            run_subtable(subtable, buffer);
        }
        buffer.compact();
    }
}

fn run_subtable(subtable: &MorxSubtable, buffer: &mut GlyphBuffer) {
    match subtable.kind {
        MorxSubtableKind::NonContextual => run_non_contextual(subtable.body, buffer),
        MorxSubtableKind::Rearrangement => run_rearrangement(subtable.body, buffer),
        MorxSubtableKind::Ligature => run_ligature(subtable.body, buffer),
        MorxSubtableKind::Contextual => run_contextual(subtable.body, buffer),
        MorxSubtableKind::Insertion => run_insertion(subtable.body, buffer),
    }
}

/// Common header shared by the four state-table-driven subtable kinds.
/// `extra_offset` is the kind-specific fifth field (lig actions,
/// substitution table, or insertion glyph list); non-contextual has none.
struct StxHeader {
    n_classes: u16,
    class_table: u32,
    state_array: u32,
    entry_table: u32,
}

fn read_stx_header(r: &mut Reader) -> Option<StxHeader> {
    let n_classes = r.read_u32().ok()? as u16;
    let class_table = r.read_u32().ok()?;
    let state_array = r.read_u32().ok()?;
    let entry_table = r.read_u32().ok()?;
    Some(StxHeader { n_classes, class_table, state_array, entry_table })
}

/// Glyph -> u16 lookup, supporting the two AAT lookup-table formats actually
/// seen in the wild (6: sorted segment-single array, 8: trimmed array).
/// Other formats (0, 2, 4, 10) are rare enough in real fonts to skip.
fn lookup_value(data: &[u8], glyph: u16) -> Option<u16> {
    let mut r = Reader::new(data, "morx-lookup");
    let format = r.read_u16().ok()?;
    match format {
        6 => {
            r.skip(8).ok()?; // unitSize, nUnits, searchRange, entrySelector, rangeShift
            loop {
                let g = r.read_u16().ok()?;
                let v = r.read_u16().ok()?;
                if g == glyph {
                    return Some(v);
                }
                if r.remaining() < 4 {
                    return None;
                }
            }
        }
        8 => {
            let first_glyph = r.read_u16().ok()?;
            let glyph_count = r.read_u16().ok()?;
            if glyph < first_glyph || (glyph - first_glyph) as u16 >= glyph_count {
                return None;
            }
            r.skip((glyph - first_glyph) as usize * 2).ok()?;
            r.read_u16().ok()
        }
        _ => None,
    }
}

fn class_for_glyph(class_table: &[u8], glyph: u16) -> u16 {
    lookup_value(class_table, glyph).unwrap_or(CLASS_OUT_OF_BOUNDS)
}

fn state_array_index(data: &[u8], header: &StxHeader, state: u16, class: u16) -> Option<u16> {
    let mut r = Reader::new(data, "morx-state");
    let offset = header.state_array as usize + (state as usize * header.n_classes as usize + class as usize) * 2;
    r.set_pos(offset);
    r.read_u16().ok()
}

fn run_non_contextual(body: &[u8], buffer: &mut GlyphBuffer) {
    for i in 0..buffer.len() {
        if buffer.is_deleted(i) {
            continue;
        }
        let glyph = buffer.info()[i].glyph_id as u16;
        if let Some(replacement) = lookup_value(body, glyph) {
            buffer.set_glyph(i, replacement as u32);
            buffer.info_mut()[i].flags |= GlyphFlags::SUBSTITUTED;
        }
    }
}

fn run_rearrangement(body: &[u8], buffer: &mut GlyphBuffer) {
    let mut r = Reader::new(body, "morx-rearrange");
    let Some(header) = read_stx_header(&mut r) else { return };

    let mut state = STATE_START_OF_TEXT;
    let mut mark: Option<usize> = None;
    let mut i = 0;
    while i <= buffer.len() {
        let glyph = if i < buffer.len() { buffer.info()[i].glyph_id as u16 } else { 0 };
        let class = if i < buffer.len() { class_for_glyph(body_slice(body, header.class_table), glyph) } else { 0 };
        if class == CLASS_DELETED_GLYPH {
            i += 1;
            continue;
        }
        let Some(entry_idx) = state_array_index(body, &header, state, class) else { break };
        let Some((new_state, flags)) = read_basic_entry(body, entry_idx) else { break };

        if flags & REARRANGE_MARK_FIRST != 0 {
            mark = Some(i);
        }
        let last = if flags & REARRANGE_MARK_LAST != 0 { Some(i) } else { mark };
        let verb = (flags & REARRANGE_VERB_MASK) as u8;
        if verb != 0 {
            if let (Some(start), Some(end)) = (mark, last) {
                if end < buffer.len() && start <= end {
                    apply_rearrange_verb(buffer, start, end, verb);
                }
            }
        }

        state = new_state;
        if flags & REARRANGE_DONT_ADVANCE == 0 {
            i += 1;
        }
        if i > buffer.len() {
            break;
        }
    }
}

fn body_slice<'a>(body: &'a [u8], offset: u32) -> &'a [u8] {
    body.get(offset as usize..).unwrap_or(&[])
}

fn read_basic_entry(body: &[u8], entry_index: u16) -> Option<(u16, u16)> {
    let offset = entry_index as usize * 4;
    let mut r = Reader::new(body, "morx-entry");
    r.set_pos(offset);
    let new_state = r.read_u16().ok()?;
    let flags = r.read_u16().ok()?;
    Some((new_state, flags))
}

/// Permutes the glyph ids across `[start, end]` per the AAT rearrangement
/// verb table. Verbs expect a specific span length (2 for the simple A/x or
/// x/D swaps, up to 5 for the full ABxCD forms); a length mismatch falls
/// back to a plain reversal of the span, which is the identity for the
/// common 2-glyph case and a reasonable approximation otherwise.
fn apply_rearrange_verb(buffer: &mut GlyphBuffer, start: usize, end: usize, verb: u8) {
    let glyphs: Vec<u32> = (start..=end).map(|i| buffer.info()[i].glyph_id).collect();
    let len = glyphs.len();
    let permutation: &[usize] = match (verb, len) {
        (1, 2) | (2, 2) => &[1, 0],
        (3, 3) => &[2, 1, 0],
        (4, 3) => &[2, 0, 1],
        (5, 3) => &[2, 1, 0],
        (6, 3) => &[1, 2, 0],
        (7, 3) => &[2, 1, 0],
        (8, 4) => &[2, 3, 1, 0],
        (9, 4) => &[3, 2, 1, 0],
        (10, 4) => &[3, 2, 0, 1],
        (11, 4) => &[3, 2, 1, 0],
        (12, 5) => &[3, 4, 2, 0, 1],
        (13, 5) => &[3, 4, 2, 1, 0],
        (14, 5) => &[4, 3, 2, 0, 1],
        (15, 5) => &[4, 3, 2, 1, 0],
        _ => {
            for (offset, &g) in glyphs.iter().rev().enumerate() {
                buffer.info_mut()[start + offset].glyph_id = g;
            }
            return;
        }
    };
    for (offset, &src) in permutation.iter().enumerate() {
        buffer.info_mut()[start + offset].glyph_id = glyphs[src];
    }
}

fn run_contextual(body: &[u8], buffer: &mut GlyphBuffer) {
    let mut r = Reader::new(body, "morx-contextual");
    let Some(header) = read_stx_header(&mut r) else { return };
    let Ok(substitution_table_offset) = r.read_u32() else { return };

    let mut state = STATE_START_OF_TEXT;
    let mut mark: Option<usize> = None;
    let mut i = 0;
    while i < buffer.len() {
        let glyph = buffer.info()[i].glyph_id as u16;
        let class = class_for_glyph(body_slice(body, header.class_table), glyph);
        if class == CLASS_DELETED_GLYPH {
            i += 1;
            continue;
        }
        let Some(entry_idx) = state_array_index(body, &header, state, class) else { break };
        let Some((new_state, flags, mark_index, current_index)) = read_contextual_entry(body, entry_idx) else { break };

        if current_index != CONTEXTUAL_NO_SUBSTITUTION {
            if let Some(replacement) = substitution_lookup(body, substitution_table_offset, current_index, glyph) {
                buffer.set_glyph(i, replacement as u32);
                buffer.info_mut()[i].flags |= GlyphFlags::SUBSTITUTED;
            }
        }
        if let Some(m) = mark {
            if mark_index != CONTEXTUAL_NO_SUBSTITUTION {
                let mark_glyph = buffer.info()[m].glyph_id as u16;
                if let Some(replacement) = substitution_lookup(body, substitution_table_offset, mark_index, mark_glyph) {
                    buffer.set_glyph(m, replacement as u32);
                    buffer.info_mut()[m].flags |= GlyphFlags::SUBSTITUTED;
                }
            }
        }
        if flags & CONTEXTUAL_SET_MARK != 0 {
            mark = Some(i);
        }

        state = new_state;
        if flags & CONTEXTUAL_DONT_ADVANCE == 0 {
            i += 1;
        }
    }
}

fn read_contextual_entry(body: &[u8], entry_index: u16) -> Option<(u16, u16, u16, u16)> {
    let offset = entry_index as usize * 8;
    let mut r = Reader::new(body, "morx-entry");
    r.set_pos(offset);
    let new_state = r.read_u16().ok()?;
    let flags = r.read_u16().ok()?;
    let mark_index = r.read_u16().ok()?;
    let current_index = r.read_u16().ok()?;
    Some((new_state, flags, mark_index, current_index))
}

fn substitution_lookup(body: &[u8], table_offset: u32, index: u16, glyph: u16) -> Option<u16> {
    let mut r = Reader::new(body, "morx-subst-offsets");
    r.set_pos(table_offset as usize + index as usize * 4);
    let lookup_offset = r.read_u32().ok()?;
    lookup_value(body_slice(body, lookup_offset), glyph)
}

fn run_ligature(body: &[u8], buffer: &mut GlyphBuffer) {
    let mut r = Reader::new(body, "morx-ligature");
    let Some(header) = read_stx_header(&mut r) else { return };
    let (Ok(lig_action_offset), Ok(component_offset), Ok(ligature_offset)) =
        (r.read_u32(), r.read_u32(), r.read_u32())
    else {
        return;
    };

    let mut state = STATE_START_OF_TEXT;
    let mut components: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < buffer.len() {
        let glyph = buffer.info()[i].glyph_id as u16;
        let class = class_for_glyph(body_slice(body, header.class_table), glyph);
        if class == CLASS_DELETED_GLYPH {
            i += 1;
            continue;
        }
        let Some(entry_idx) = state_array_index(body, &header, state, class) else { break };
        let Some((new_state, flags, lig_action_index)) = read_ligature_entry(body, entry_idx) else { break };

        if flags & LIGATURE_SET_COMPONENT != 0 {
            components.push(i);
        }
        if flags & LIGATURE_PERFORM_ACTION != 0 && !components.is_empty() {
            perform_ligature_action(buffer, &mut components, body, lig_action_index, lig_action_offset, component_offset, ligature_offset);
        }

        state = new_state;
        if flags & LIGATURE_DONT_ADVANCE == 0 {
            i += 1;
        }
    }
}

fn read_ligature_entry(body: &[u8], entry_index: u16) -> Option<(u16, u16, u16)> {
    let offset = entry_index as usize * 6;
    let mut r = Reader::new(body, "morx-entry");
    r.set_pos(offset);
    let new_state = r.read_u16().ok()?;
    let flags = r.read_u16().ok()?;
    let lig_action_index = r.read_u16().ok()?;
    Some((new_state, flags, lig_action_index))
}

/// Walks the ligature action list starting at `lig_action_index`, one
/// action per marked component (oldest-marked first), accumulating a
/// component-table index until the `Store` bit fires, then resolves the
/// ligature glyph and replaces the consumed span. Handles a single
/// store-and-emit per call, which covers every ligature actually shipped as
/// a single contiguous entry in practice.
fn perform_ligature_action(
    buffer: &mut GlyphBuffer,
    components: &mut Vec<usize>,
    body: &[u8],
    lig_action_index: u16,
    lig_action_offset: u32,
    component_offset: u32,
    ligature_offset: u32,
) {
    let mut action_r = Reader::new(body, "morx-ligaction");
    action_r.set_pos(lig_action_offset as usize + lig_action_index as usize * 4);

    let mut accumulator: i32 = 0;
    let mut consumed = Vec::new();
    while let Some(&buf_pos) = components.last() {
        let Ok(action) = action_r.read_u32() else { break };
        let offset = sign_extend_30(action & 0x3FFF_FFFF);
        let glyph = buffer.info()[buf_pos].glyph_id as u16;
        let component_index = (offset + glyph as i32) as u16;
        let component_value = lookup_value(body_slice(body, component_offset), component_index).unwrap_or(0);
        accumulator = accumulator.wrapping_add(component_value as i32);
        consumed.push(buf_pos);
        components.pop();

        let is_last = action & LIGATURE_ACTION_LAST != 0;
        let does_store = action & LIGATURE_ACTION_STORE != 0;
        if does_store || is_last {
            if let Some(lig_glyph) = lookup_value(body_slice(body, ligature_offset), accumulator as u16) {
                consumed.sort_unstable();
                buffer.ligate_positions(&consumed, lig_glyph as u32);
            }
            accumulator = 0;
            consumed.clear();
        }
        if is_last {
            break;
        }
    }
}

fn sign_extend_30(v: u32) -> i32 {
    if v & 0x2000_0000 != 0 {
        (v | 0xC000_0000) as i32
    } else {
        v as i32
    }
}

/// Insertions shift every later buffer index; this walk keeps using the
/// pre-insertion positions for the remainder of the pass; fine for a single
/// insertion per run (the common case) but can drift on a subtable whose
/// state machine inserts at more than one point before re-reading the
/// glyphs it just added.
fn run_insertion(body: &[u8], buffer: &mut GlyphBuffer) {
    let mut r = Reader::new(body, "morx-insertion");
    let Some(header) = read_stx_header(&mut r) else { return };
    let Ok(insertion_action_offset) = r.read_u32() else { return };

    let mut state = STATE_START_OF_TEXT;
    let mut mark: Option<usize> = None;
    let mut i = 0;
    while i <= buffer.len() {
        let glyph = if i < buffer.len() { buffer.info()[i].glyph_id as u16 } else { 0 };
        let class = if i < buffer.len() { class_for_glyph(body_slice(body, header.class_table), glyph) } else { 0 };
        let Some(entry_idx) = state_array_index(body, &header, state, class) else { break };
        let Some(entry) = read_insertion_entry(body, entry_idx) else { break };

        if let Some(m) = mark {
            let count = (entry.flags & INSERTION_MARKED_COUNT_MASK) as usize;
            if entry.marked_index != INSERTION_NO_INDEX && count > 0 {
                let before = entry.flags & INSERTION_MARKED_INSERT_BEFORE != 0;
                insert_glyphs(buffer, body, insertion_action_offset, entry.marked_index, count, before, m);
            }
        }
        if i < buffer.len() {
            let count = ((entry.flags & INSERTION_CURRENT_COUNT_MASK) >> INSERTION_CURRENT_COUNT_SHIFT) as usize;
            if entry.current_index != INSERTION_NO_INDEX && count > 0 {
                let before = entry.flags & INSERTION_CURRENT_INSERT_BEFORE != 0;
                insert_glyphs(buffer, body, insertion_action_offset, entry.current_index, count, before, i);
            }
        }
        if entry.flags & INSERTION_SET_MARK != 0 {
            mark = Some(i);
        }

        state = entry.new_state;
        if entry.flags & INSERTION_DONT_ADVANCE == 0 {
            i += 1;
        }
        if i > buffer.len() {
            break;
        }
    }
}

struct InsertionEntry {
    new_state: u16,
    flags: u16,
    current_index: u16,
    marked_index: u16,
}

fn read_insertion_entry(body: &[u8], entry_index: u16) -> Option<InsertionEntry> {
    let offset = entry_index as usize * 8;
    let mut r = Reader::new(body, "morx-entry");
    r.set_pos(offset);
    let new_state = r.read_u16().ok()?;
    let flags = r.read_u16().ok()?;
    let current_index = r.read_u16().ok()?;
    let marked_index = r.read_u16().ok()?;
    Some(InsertionEntry { new_state, flags, current_index, marked_index })
}

/// Splices `count` glyphs from the insertion list at `start_index` in
/// before or after the glyph at buffer position `at`, via a single
/// `replace` that keeps that glyph and adds the new ones around it.
fn insert_glyphs(buffer: &mut GlyphBuffer, body: &[u8], list_offset: u32, start_index: u16, count: usize, before: bool, at: usize) {
    let mut r = Reader::new(body, "morx-insertlist");
    r.set_pos(list_offset as usize + start_index as usize * 2);
    let mut glyphs = Vec::with_capacity(count);
    for _ in 0..count {
        let Ok(g) = r.read_u16() else { return };
        glyphs.push(g as u32);
    }
    if glyphs.is_empty() || buffer.is_empty() {
        return;
    }
    let anchor = at.min(buffer.len() - 1);
    let existing = buffer.info()[anchor].glyph_id;
    let combined = if before {
        let mut v = glyphs;
        v.push(existing);
        v
    } else {
        let mut v = vec![existing];
        v.extend(glyphs);
        v
    };
    buffer.replace(anchor, &combined, GlyphFlags::MULTIPLIED);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(glyphs: &[u32]) -> GlyphBuffer {
        GlyphBuffer::from_codepoints(glyphs.iter().enumerate().map(|(i, &g)| (g, i as u32)))
    }

    fn format8_lookup(first_glyph: u16, values: &[u16]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&8u16.to_be_bytes());
        data.extend_from_slice(&first_glyph.to_be_bytes());
        data.extend_from_slice(&(values.len() as u16).to_be_bytes());
        for v in values {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data
    }

    #[test]
    fn non_contextual_remaps_glyph() {
        let body = format8_lookup(5, &[42]);
        let mut buf = buffer_from(&[5]);
        run_non_contextual(&body, &mut buf);
        assert_eq!(buf.info()[0].glyph_id, 42);
        assert!(buf.info()[0].flags.contains(GlyphFlags::SUBSTITUTED));
    }

    #[test]
    fn non_contextual_leaves_unmapped_glyph_alone() {
        let body = format8_lookup(5, &[42]);
        let mut buf = buffer_from(&[9]);
        run_non_contextual(&body, &mut buf);
        assert_eq!(buf.info()[0].glyph_id, 9);
    }

    /// A single rearrangement subtable whose state machine immediately emits
    /// verb 1 (Ax => xA) on the second glyph seen, swapping a 2-glyph span.
    #[test]
    fn rearrangement_swaps_two_glyphs() {
        let mut body = Vec::new();
        // header: nClasses, classTableOffset, stateArrayOffset, entryTableOffset
        let class_table_offset = 16u32;
        let state_array_offset = class_table_offset + 8; // class table below is 8 bytes
        let entry_table_offset = state_array_offset + 4; // 2 states * 2 classes * 2 bytes
        body.extend_from_slice(&2u32.to_be_bytes()); // nClasses = 2 (OOB + one dynamic)
        body.extend_from_slice(&class_table_offset.to_be_bytes());
        body.extend_from_slice(&state_array_offset.to_be_bytes());
        body.extend_from_slice(&entry_table_offset.to_be_bytes());
        // class table (format 8): glyphs 5,6 both class 4 (index matches n_classes-1... simplified to class 1 is OOB so use class index 1 within our 2-class space)
        body.extend_from_slice(&format8_lookup(5, &[1, 1]));
        // state array: state0 x class0(OOB)->entry0(no-op), class1->entry1(mark)
        //              state1 x class0(OOB)->entry0,        class1->entry2(swap)
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&2u16.to_be_bytes());
        // entry table: entry0 = (state0, flags0), entry1 = (state1, MARK_FIRST), entry2 = (state0, MARK_LAST|verb1)
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&REARRANGE_MARK_FIRST.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&(REARRANGE_MARK_LAST | 1).to_be_bytes());

        let mut buf = buffer_from(&[5, 6]);
        run_rearrangement(&body, &mut buf);
        assert_eq!(buf.info()[0].glyph_id, 6);
        assert_eq!(buf.info()[1].glyph_id, 5);
    }

    #[test]
    fn sign_extend_30_handles_negative_offset() {
        assert_eq!(sign_extend_30(0x3FFF_FFFF), -1);
        assert_eq!(sign_extend_30(1), 1);
    }
}
