//! Four-byte OpenType tags (table tags, script/language/feature tags).

use std::fmt;

use crate::error::FontParseError;

/// A packed 4-byte ASCII tag, e.g. `Tag::new(*b"GSUB")`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u32);

impl Tag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Tag(u32::from_be_bytes(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontParseError> {
        if bytes.len() != 4 {
            return Err(FontParseError::InvalidArgument(format!(
                "tag must be 4 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(Tag::new(arr))
    }

    pub fn from_str(s: &str) -> Result<Self, FontParseError> {
        Self::from_bytes(s.as_bytes())
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub const DFLT: Tag = Tag::new(*b"DFLT");
    pub const LATN: Tag = Tag::new(*b"latn");
    pub const ARAB: Tag = Tag::new(*b"arab");
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        for b in bytes {
            write!(f, "{}", if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let t = Tag::new(*b"GSUB");
        assert_eq!(t.to_string(), "GSUB");
        assert_eq!(Tag::from_str("GSUB").unwrap(), t);
    }

    #[test]
    fn rejects_bad_length() {
        assert!(Tag::from_str("abc").is_err());
    }
}
