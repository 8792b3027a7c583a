//! Output buffer: parallel glyph-info/glyph-position arrays plus deferred
//! deletion, the shape of every OpenType-class shaping engine's working set.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GlyphFlags: u8 {
        const MARK = 0x01;
        const LIGATED = 0x02;
        const MULTIPLIED = 0x04;
        const SUBSTITUTED = 0x08;
    }
}

/// Before GSUB runs, `glyph_id` holds the Unicode codepoint (as `u32`, same
/// field reused to avoid a second parallel array); after the first
/// substitution lookup it holds an actual glyph id.
#[derive(Debug, Clone, Copy)]
pub struct GlyphInfo {
    pub glyph_id: u32,
    pub cluster: u32,
    pub mask: u32,
    pub flags: GlyphFlags,
    /// Canonical combining class of the original codepoint (0 for base
    /// characters), stamped in before GSUB overwrites `glyph_id` with a real
    /// glyph id. Positioning fallback uses this to stack marks that a font's
    /// GDEF doesn't classify explicitly.
    pub combining_class: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

#[derive(Debug, Clone, Default)]
pub struct GlyphBuffer {
    info: Vec<GlyphInfo>,
    pos: Vec<GlyphPosition>,
    deleted: Vec<bool>,
}

impl GlyphBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_codepoints(items: impl Iterator<Item = (u32, u32)>) -> Self {
        let mut buf = GlyphBuffer::new();
        for (codepoint, cluster) in items {
            let combining_class = char::from_u32(codepoint).map(crate::unicode::canonical_combining_class).unwrap_or(0);
            buf.info.push(GlyphInfo { glyph_id: codepoint, cluster, mask: 0, flags: GlyphFlags::empty(), combining_class });
            buf.pos.push(GlyphPosition::default());
            buf.deleted.push(false);
        }
        buf
    }

    /// Builds a buffer from already-assembled [`GlyphInfo`]s (the shape
    /// pipeline's entry point, once pre-shaping has run).
    pub fn from_infos(info: Vec<GlyphInfo>) -> Self {
        let pos = vec![GlyphPosition::default(); info.len()];
        let deleted = vec![false; info.len()];
        GlyphBuffer { info, pos, deleted }
    }

    /// Reverses glyph order in place, for right-to-left runs once shaping
    /// has finished. Clusters are left untouched; they still point at the
    /// original logical-order source text.
    pub fn reverse(&mut self) {
        self.info.reverse();
        self.pos.reverse();
        self.deleted.reverse();
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn info(&self) -> &[GlyphInfo] {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info
    }

    pub fn positions(&self) -> &[GlyphPosition] {
        &self.pos
    }

    pub fn positions_mut(&mut self) -> &mut [GlyphPosition] {
        &mut self.pos
    }

    pub fn set_glyph(&mut self, i: usize, glyph_id: u32) {
        self.info[i].glyph_id = glyph_id;
    }

    /// Replaces position `i` with `glyphs`, all inheriting `i`'s cluster and
    /// flags (used by GSUB single/multiple/ligature substitution). Returns
    /// the number of positions now occupied (`glyphs.len()`, 0 means
    /// deletion).
    pub fn replace(&mut self, i: usize, glyphs: &[u32], extra_flags: GlyphFlags) {
        let cluster = self.info[i].cluster;
        let mask = self.info[i].mask;
        let flags = self.info[i].flags | extra_flags;
        if glyphs.is_empty() {
            self.mark_deleted(i);
            return;
        }
        // A substitution result is a real glyph, not the codepoint the
        // combining class was stamped from; it no longer carries that
        // meaning.
        self.info[i] = GlyphInfo { glyph_id: glyphs[0], cluster, mask, flags, combining_class: 0 };
        if glyphs.len() > 1 {
            let insert_at = i + 1;
            let new_infos = glyphs[1..].iter().map(|&g| GlyphInfo { glyph_id: g, cluster, mask, flags, combining_class: 0 });
            let new_pos = std::iter::repeat(GlyphPosition::default()).take(glyphs.len() - 1);
            for (offset, info) in new_infos.enumerate() {
                self.info.insert(insert_at + offset, info);
                self.deleted.insert(insert_at + offset, false);
            }
            for (offset, p) in new_pos.enumerate() {
                self.pos.insert(insert_at + offset, p);
            }
        }
    }

    /// Merges positions `[first, first+count)` into a single ligature glyph
    /// at `first`, marking the rest deleted.
    pub fn ligate(&mut self, first: usize, count: usize, glyph_id: u32) {
        self.info[first].glyph_id = glyph_id;
        self.info[first].flags |= GlyphFlags::LIGATED;
        self.info[first].combining_class = 0;
        for j in first + 1..first + count {
            self.mark_deleted(j);
        }
    }

    /// As [`Self::ligate`], but for a ligature whose matched components
    /// weren't contiguous (lookup-flag filtering skipped marks in between).
    /// `positions` is sorted ascending; everything in `positions[1..]` is
    /// deleted, anything between them that wasn't part of the match (a
    /// skipped mark) is left alone so it can still attach to the ligature
    /// via a later mark-to-ligature lookup.
    pub fn ligate_positions(&mut self, positions: &[usize], glyph_id: u32) {
        let Some((&first, rest)) = positions.split_first() else { return };
        self.info[first].glyph_id = glyph_id;
        self.info[first].flags |= GlyphFlags::LIGATED;
        self.info[first].combining_class = 0;
        for &j in rest {
            self.mark_deleted(j);
        }
    }

    pub fn mark_deleted(&mut self, i: usize) {
        self.deleted[i] = true;
    }

    pub fn is_deleted(&self, i: usize) -> bool {
        self.deleted[i]
    }

    /// Drops deleted positions, compacting `info`/`pos` in place.
    pub fn compact(&mut self) {
        if !self.deleted.iter().any(|&d| d) {
            return;
        }
        let mut write = 0;
        for read in 0..self.info.len() {
            if self.deleted[read] {
                continue;
            }
            if write != read {
                self.info[write] = self.info[read];
                self.pos[write] = self.pos[read];
            }
            write += 1;
        }
        self.info.truncate(write);
        self.pos.truncate(write);
        self.deleted.clear();
        self.deleted.resize(write, false);
    }

    pub fn clear(&mut self) {
        self.info.clear();
        self.pos.clear();
        self.deleted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ligate_deletes_consumed_components() {
        let mut buf = GlyphBuffer::from_codepoints([(1, 0), (2, 1), (3, 2)].into_iter());
        buf.ligate(0, 2, 99);
        buf.compact();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.info()[0].glyph_id, 99);
        assert!(buf.info()[0].flags.contains(GlyphFlags::LIGATED));
        assert_eq!(buf.info()[1].glyph_id, 3);
    }

    #[test]
    fn replace_with_multiple_inherits_cluster() {
        let mut buf = GlyphBuffer::from_codepoints([(1, 5)].into_iter());
        buf.replace(0, &[10, 11, 12], GlyphFlags::MULTIPLIED);
        assert_eq!(buf.len(), 3);
        assert!(buf.info().iter().all(|i| i.cluster == 5));
        assert!(buf.info().iter().all(|i| i.flags.contains(GlyphFlags::MULTIPLIED)));
    }

    #[test]
    fn replace_with_empty_deletes() {
        let mut buf = GlyphBuffer::from_codepoints([(1, 0), (2, 1)].into_iter());
        buf.replace(0, &[], GlyphFlags::empty());
        buf.compact();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.info()[0].glyph_id, 2);
    }
}
