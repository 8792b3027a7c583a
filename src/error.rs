//! Error taxonomy.
//!
//! Split across the two points of failure in the pipeline: loading a font
//! (binary parsing, table presence) and shaping (caller-input validation).
//! Shaping a successfully-loaded font never fails on the font's own account;
//! see [`ShapingError`].

/// Errors raised while parsing a font's binary tables.
#[derive(Debug, thiserror::Error)]
pub enum FontParseError {
    #[error("malformed font data")]
    MalformedFont,

    #[error("truncated table `{table}`: needed {needed} bytes at offset {offset}, had {available}")]
    TruncatedTable {
        table: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),

    #[error("unsupported format {format} in table `{table}`")]
    UnsupportedFormat { table: &'static str, format: u16 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors surfaced from the shaping entry point itself.
///
/// Shaping is total given a successfully-loaded font: the only way `shape()`
/// fails is a bad caller-supplied argument (e.g. an unparsable tag string).
#[derive(Debug, thiserror::Error)]
pub enum ShapingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type ParseResult<T> = std::result::Result<T, FontParseError>;
pub type ShapeResult<T> = std::result::Result<T, ShapingError>;
