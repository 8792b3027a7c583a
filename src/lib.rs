//! otshape - OpenType text shaping engine
//!
//! Parses the OpenType tables a shaper needs (`cmap`, `GDEF`, `GSUB`,
//! `GPOS`, `kern`, `morx`, and the variable-font tables `fvar`/`avar`/`HVAR`/
//! `gvar`), itemizes text by script, and drives GSUB/GPOS (or the AAT `morx`
//! and legacy `kern` fallbacks) over a glyph buffer to produce positioned
//! glyphs ready for rendering.

pub mod buffer;
pub mod coverage;
pub mod digest;
pub mod error;
pub mod fixed_point;
pub mod font;
pub mod plan;
pub mod reader;
pub mod shape;
pub mod tag;
pub mod unicode;

pub use buffer::{GlyphBuffer, GlyphInfo, GlyphPosition, UnicodeBuffer};
pub use error::{FontParseError, ShapingError};
pub use font::face::Face;
pub use plan::{FeatureSetting, ShapePlan};
pub use shape::{shape, shape_buffer, ShapeOptions};
pub use tag::Tag;
pub use unicode::Direction;
