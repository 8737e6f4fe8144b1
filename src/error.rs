use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors produced while using the glyphtools crate
#[derive(Debug, Error)]
pub enum GlyphToolsError {
    #[error("IO Error: {0}")]
    /// IO error
    IO(#[from] io::Error),

    #[error("Binary font reading error: {0}")]
    /// The input could be read but is not a font we understand
    BinaryFontRead(#[from] write_fonts::read::ReadError),

    #[error("Font {path:?} has no '{table}' table")]
    /// A table needed to build the glyph table is missing
    MissingTable {
        /// The path of the font, if it was loaded from disk
        path: Option<PathBuf>,
        /// The missing table tag
        table: &'static str,
    },

    #[error("Glyph id {gid} referenced by '{referrer}' is outside the glyph order")]
    /// A composite referenced a glyph id past the end of the font
    GlyphOutOfRange {
        /// The out-of-range glyph id
        gid: u16,
        /// The composite glyph which referenced it
        referrer: String,
    },

    #[error("Invalid regular expression: {0}")]
    /// A glyph-name regular expression failed to compile
    Regex(#[from] regex::Error),

    #[error("Error parsing feature file: {0}")]
    /// The rule source could not be parsed
    FeatureParse(String),

    #[error("unhandled glyph object \"{0}\" -- aborting.")]
    /// A glyph pattern of a shape the tracer does not handle
    UnsupportedGlyphPattern(String),

    #[error("Glyph class @{0} is used before it is defined")]
    /// A named glyph class with no definition
    UndefinedGlyphClass(String),

    #[error("{location}: backtrack (prefix) context is not supported: {statement}")]
    /// A chaining rule with a non-empty prefix sequence
    UnsupportedPrefix {
        /// Where the statement is, as `line <n>`
        location: String,
        /// The statement text
        statement: String,
    },

    #[error("lookup named \"{0}\" not found")]
    /// No lookup with the requested name
    LookupNotFound(String),

    #[error("more than one lookup named \"{name}\" found ({count})")]
    /// Several lookups share the requested name
    AmbiguousLookup {
        /// The lookup name
        name: String,
        /// How many lookups carry it
        count: usize,
    },

    #[error("Lookup nesting too deep while tracing \"{0}\"")]
    /// Nested lookup references recursed past the nesting limit
    LookupNestingTooDeep(String),

    #[error("Subsetter cannot honour option {option}: {reason}")]
    /// A subset option the bundled subsetter does not implement
    UnsupportedSubsetOption {
        /// The option name
        option: &'static str,
        /// Why it cannot be honoured
        reason: String,
    },

    #[error("Cannot renumber glyphs in the '{0}' table")]
    /// The font has a table holding glyph ids the subsetter cannot rewrite
    UnsupportedTable(String),

    #[error("Error compiling table: {0}")]
    /// A rewritten table failed to compile
    TableCompile(#[from] write_fonts::BuilderError),

    #[error("Conflicting cmap entries: {0}")]
    /// The rewritten character map maps a character to two glyphs
    Cmap(#[from] write_fonts::tables::cmap::CmapConflict),
}
