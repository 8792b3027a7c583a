//! Unicode-level analysis that precedes font-specific shaping: script
//! itemization, bidi embedding, and canonical combining class lookup.

pub mod bidi;
pub mod combining_class;
pub mod script;

pub use bidi::{mirror_char, BidiClass, BidiParagraph, BidiRun, Level};
pub use combining_class::canonical_combining_class;
pub use script::{itemize, Script, ScriptRun};

/// Paragraph text direction, derived from the dominant script or an explicit
/// caller override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn from_script(script: Script) -> Self {
        if script.is_rtl() {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Direction::RightToLeft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_script_directionality() {
        assert_eq!(Direction::from_script(Script::Arabic), Direction::RightToLeft);
        assert_eq!(Direction::from_script(Script::Latin), Direction::LeftToRight);
    }
}
