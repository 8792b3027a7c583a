//! Shaping entry point: Unicode analysis → pre-shaping → GSUB → position
//! initialization → GPOS (or a fallback path for fonts without one) → RTL
//! reordering.

pub mod fallback;
pub mod gpos_engine;
pub mod gsub_engine;
pub mod morx_runner;
pub mod preshape;

use crate::buffer::glyph_buffer::GlyphFlags;
use crate::buffer::{GlyphBuffer, GlyphInfo, UnicodeBuffer};
use crate::error::ShapingError;
use crate::font::face::Face;
use crate::plan::{FeatureSetting, ShapePlan};
use crate::tag::Tag;
use crate::unicode::{self, Direction, Script};

/// Bloom-filter bank shift amounts shared by every [`crate::digest::SetDigest`].
pub const DIGEST_SHIFTS: [u32; 3] = [1, 5, 11];
/// Recursion bound for nested context/chaining lookups, both GSUB and GPOS.
pub const MAX_NESTING_DEPTH: u8 = 16;
/// Matches the ligature-component cap in [`crate::font::gsub`]; repeated
/// here as the shaping-level tunable the rest of this module's docs refer
/// to.
pub const MAX_LIGATURE_COMPONENTS: usize = 16;
/// Default capacity for a caller-held [`crate::plan::cache::PlanCache`].
pub const PLAN_CACHE_CAPACITY: usize = 32;
/// Default capacity for a caller-held [`crate::buffer::BufferPool`].
pub const BUFFER_POOL_CAPACITY: usize = 8;

/// Caller-selected script/language/direction/feature settings for one
/// `shape()` call. `script`/`language`/`direction` default to detection from
/// the text itself (via [`unicode::itemize`]) when left unset.
#[derive(Debug, Clone, Default)]
pub struct ShapeOptions {
    pub script: Option<Tag>,
    pub language: Option<Tag>,
    pub direction: Option<Direction>,
    pub features: Vec<FeatureSetting>,
}

/// Shapes `text` against `face`, returning a glyph buffer ready for
/// positioning-aware rendering. Never fails on the font's own account —
/// unsupported tables are skipped, not fatal — so the only errors possible
/// are caller-input mistakes surfaced through [`ShapingError`].
#[tracing::instrument(skip_all, fields(len = text.len()))]
pub fn shape(face: &Face, text: &str, options: &ShapeOptions) -> Result<GlyphBuffer, ShapingError> {
    let mut unicode_buffer = UnicodeBuffer::new();
    unicode_buffer.push_str(text);
    shape_buffer(face, unicode_buffer, options)
}

/// As [`shape`], but takes a pre-populated [`UnicodeBuffer`] so a caller
/// reusing a [`crate::buffer::BufferPool`] doesn't have to round-trip
/// through `&str` first.
pub fn shape_buffer(face: &Face, unicode_buffer: UnicodeBuffer, options: &ShapeOptions) -> Result<GlyphBuffer, ShapingError> {
    let text: String = unicode_buffer.items().iter().map(|item| item.codepoint).collect();
    let runs = unicode::itemize(&text);
    let script_enum = runs.first().map(|r| r.script).unwrap_or(Script::Latin);
    let direction = options.direction.unwrap_or_else(|| Direction::from_script(script_enum));
    let script_tag = options.script.unwrap_or_else(|| script_enum.tag());

    let mut infos: Vec<GlyphInfo> = unicode_buffer
        .items()
        .iter()
        .map(|item| GlyphInfo {
            glyph_id: item.codepoint as u32,
            cluster: item.cluster,
            mask: 0,
            flags: GlyphFlags::empty(),
            combining_class: char::from_u32(item.codepoint as u32).map(unicode::canonical_combining_class).unwrap_or(0),
        })
        .collect();
    preshape::apply(&mut infos, script_enum);

    let font = face.font();
    let gdef = font.gdef();
    let gsub = font.gsub();
    let gpos = font.gpos();

    let plan = ShapePlan::resolve(
        script_tag,
        options.language,
        &options.features,
        gsub.as_ref().map(|t| (&t.scripts, &t.features)),
        gpos.as_ref().map(|t| (&t.scripts, &t.features)),
    );

    let mut buffer = GlyphBuffer::from_infos(infos);

    match &gsub {
        Some(table) if !plan.gsub_lookup_indices.is_empty() => {
            gsub_engine::apply(gdef.as_ref(), table, &plan.gsub_lookup_indices, &mut buffer);
        }
        _ => {
            if let Some(morx) = font.morx() {
                tracing::debug!("no usable GSUB plan, falling back to morx for substitution");
                morx_runner::apply(&morx, &mut buffer);
            }
        }
    }

    // Any glyph GSUB/morx never touched still holds a raw codepoint in
    // `glyph_id`; resolve those through cmap now so position initialization
    // and GPOS/fallback see real glyph ids.
    resolve_remaining_codepoints(face, &mut buffer);

    // Advances are set from final (post-substitution) glyph ids, so a
    // ligature or multiple-substitution result gets its own metrics instead
    // of inheriting whatever its pre-substitution glyph had.
    init_positions(face, &mut buffer);

    match &gpos {
        Some(table) if !plan.gpos_lookup_indices.is_empty() => {
            gpos_engine::apply(gdef.as_ref(), table, &plan.gpos_lookup_indices, &mut buffer);
        }
        _ => {
            tracing::debug!("no usable GPOS plan, falling back to kern/combining-class positioning");
            fallback::apply(face, gdef.as_ref(), &mut buffer);
        }
    }

    if direction.is_rtl() {
        buffer.reverse();
    }

    Ok(buffer)
}

/// Initializes every position's horizontal advance from the face's metrics
/// (HVAR-adjusted). Offsets start at zero; GPOS/fallback positioning is what
/// moves glyphs off the baseline. Runs after GSUB/morx and
/// `resolve_remaining_codepoints`, so every `glyph_id` here is already a
/// real glyph id, not a codepoint.
fn init_positions(face: &Face, buffer: &mut GlyphBuffer) {
    for i in 0..buffer.len() {
        let glyph = buffer.info()[i].glyph_id as u16;
        buffer.positions_mut()[i].x_advance = face.glyph_h_advance(glyph).unwrap_or(0);
    }
}

/// Maps a raw codepoint (still sitting in `glyph_id` before cmap lookup) to
/// a real glyph id. An unassigned codepoint maps to `.notdef` (glyph 0)
/// rather than reinterpreting the codepoint as a glyph id, which could
/// otherwise collide with an unrelated valid glyph.
fn resolve_glyph_for_metrics(face: &Face, raw: u32) -> u16 {
    char::from_u32(raw).and_then(|c| face.glyph_index(c).ok().flatten()).unwrap_or(0)
}

fn resolve_remaining_codepoints(face: &Face, buffer: &mut GlyphBuffer) {
    const ALREADY_GLYPH: GlyphFlags = GlyphFlags::SUBSTITUTED.union(GlyphFlags::MULTIPLIED).union(GlyphFlags::LIGATED);
    for i in 0..buffer.len() {
        if buffer.info()[i].flags.intersects(ALREADY_GLYPH) {
            continue;
        }
        let glyph = resolve_glyph_for_metrics(face, buffer.info()[i].glyph_id);
        buffer.set_glyph(i, glyph as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_options_default_has_no_overrides() {
        let opts = ShapeOptions::default();
        assert!(opts.script.is_none());
        assert!(opts.language.is_none());
        assert!(opts.direction.is_none());
        assert!(opts.features.is_empty());
    }
}
