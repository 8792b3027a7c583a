//! `Face`: a font plus a chosen variation instance (normalized axis
//! coordinates), the unit shaping operates against.

use crate::error::FontParseError;
use crate::font::Font;
use crate::tag::Tag;

/// A variation axis setting supplied by the caller, in user-space units
/// (e.g. `wght` 625.0), before normalization against `fvar`/`avar`.
#[derive(Debug, Clone, Copy)]
pub struct VariationSetting {
    pub tag: Tag,
    pub value: f32,
}

pub struct Face<'a> {
    font: Font<'a>,
    /// Normalized (-1.0..=1.0) coordinates, one per `fvar` axis, after
    /// `avar` remapping; empty for a non-variable font or the default
    /// instance.
    normalized_coords: Vec<f32>,
}

impl<'a> Face<'a> {
    pub fn parse(data: &'a [u8], variations: &[VariationSetting]) -> Result<Self, FontParseError> {
        let font = Font::parse(data)?;
        let normalized_coords = match font.fvar() {
            Some(fvar) => {
                let avar = font.avar();
                fvar.axes
                    .iter()
                    .enumerate()
                    .map(|(i, axis)| {
                        let user_value =
                            variations.iter().find(|v| v.tag == axis.tag).map(|v| v.value).unwrap_or(axis.default_value.to_f32());
                        let normalized = fvar.normalize(i, user_value);
                        avar.as_ref().map(|a| a.remap(i, normalized)).unwrap_or(normalized)
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        Ok(Face { font, normalized_coords })
    }

    pub fn font(&self) -> &Font<'a> {
        &self.font
    }

    pub fn normalized_coords(&self) -> &[f32] {
        &self.normalized_coords
    }

    pub fn units_per_em(&self) -> Result<u16, FontParseError> {
        Ok(self.font.head()?.units_per_em)
    }

    pub fn ascender(&self) -> Result<i16, FontParseError> {
        Ok(self.font.hhea()?.ascender)
    }

    pub fn descender(&self) -> Result<i16, FontParseError> {
        Ok(self.font.hhea()?.descender)
    }

    pub fn line_gap(&self) -> Result<i16, FontParseError> {
        Ok(self.font.hhea()?.line_gap)
    }

    pub fn line_height(&self) -> Result<i16, FontParseError> {
        Ok(self.ascender()? - self.descender()? + self.line_gap()?)
    }

    pub fn glyph_index(&self, c: char) -> Result<Option<u16>, FontParseError> {
        Ok(self.font.cmap()?.lookup(c as u32))
    }

    pub fn number_of_glyphs(&self) -> Result<u16, FontParseError> {
        Ok(self.font.maxp()?.num_glyphs)
    }

    /// Horizontal advance in font units, with `HVAR` deltas applied when the
    /// face carries variation coordinates.
    pub fn glyph_h_advance(&self, glyph: u16) -> Result<i32, FontParseError> {
        let base = self.font.hmtx()?.advance_width(glyph);
        if self.normalized_coords.is_empty() {
            return Ok(base);
        }
        let delta = self.font.hvar().map(|hvar| hvar.advance_width_delta(glyph, &self.normalized_coords)).unwrap_or(0.0);
        Ok(base + delta.round() as i32)
    }

    pub fn has_char(&self, c: char) -> bool {
        matches!(self.glyph_index(c), Ok(Some(_)))
    }
}
