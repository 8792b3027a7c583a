//! Reuse pool for shaping buffers.
//!
//! Grounded on the reset-and-reuse pattern of the teacher's
//! `shaping/memory.rs` `BumpAllocator` (reset a chunk instead of
//! reallocating per call). Buffers here are homogeneous `Vec<T>`s rather
//! than the teacher's heterogeneous arena, so plain `Vec` capacity reuse
//! does the same job without raw pointers.

use super::{GlyphBuffer, UnicodeBuffer};

pub struct BufferPool {
    unicode_free: Vec<UnicodeBuffer>,
    glyph_free: Vec<GlyphBuffer>,
    capacity: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(crate::shape::BUFFER_POOL_CAPACITY)
    }
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        BufferPool { unicode_free: Vec::new(), glyph_free: Vec::new(), capacity }
    }

    pub fn acquire_unicode(&mut self) -> UnicodeBuffer {
        let mut buf = self.unicode_free.pop().unwrap_or_default();
        buf.clear();
        buf
    }

    /// Drops `buf` instead of pooling it once the free list is at capacity.
    pub fn release_unicode(&mut self, buf: UnicodeBuffer) {
        if self.unicode_free.len() < self.capacity {
            self.unicode_free.push(buf);
        }
    }

    pub fn acquire_glyph(&mut self) -> GlyphBuffer {
        let mut buf = self.glyph_free.pop().unwrap_or_default();
        buf.clear();
        buf
    }

    /// Drops `buf` instead of pooling it once the free list is at capacity.
    pub fn release_glyph(&mut self, buf: GlyphBuffer) {
        if self.glyph_free.len() < self.capacity {
            self.glyph_free.push(buf);
        }
    }

    pub fn len(&self) -> (usize, usize) {
        (self.unicode_free.len(), self.glyph_free.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquired_buffer_is_cleared() {
        let mut pool = BufferPool::new(8);
        let mut buf = pool.acquire_unicode();
        buf.push_str("hello");
        pool.release_unicode(buf);

        let buf2 = pool.acquire_unicode();
        assert!(buf2.is_empty());
        assert_eq!(pool.len(), (0, 0));
    }

    #[test]
    fn released_buffer_is_reused_not_reallocated() {
        let mut pool = BufferPool::new(8);
        let buf = pool.acquire_glyph();
        pool.release_glyph(buf);
        assert_eq!(pool.len(), (0, 1));
        let _ = pool.acquire_glyph();
        assert_eq!(pool.len(), (0, 0));
    }

    #[test]
    fn release_beyond_capacity_is_dropped() {
        let mut pool = BufferPool::new(1);
        pool.release_glyph(GlyphBuffer::default());
        pool.release_glyph(GlyphBuffer::default());
        assert_eq!(pool.len(), (0, 1));
    }
}
