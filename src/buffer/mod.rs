//! Shaping buffers: the Unicode input buffer, the glyph output buffer, and
//! a pool that lets repeated `shape()` calls reuse their backing `Vec`s.

pub mod glyph_buffer;
pub mod pool;
pub mod unicode_buffer;

pub use glyph_buffer::{GlyphBuffer, GlyphInfo, GlyphPosition};
pub use pool::BufferPool;
pub use unicode_buffer::UnicodeBuffer;
