use std::fmt;

use smol_str::SmolStr;

use crate::GlyphToolsError;

/// A glyph position in a rule
///
/// The grammar is closed: feature-file shapes that cannot be lowered to
/// one of these variants are kept as [`MalformedPattern`] and rejected when
/// a trace reaches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphPattern {
    /// A single glyph name
    Glyph(SmolStr),
    /// A reference to a named class, `@name`, with its members resolved
    NamedClass {
        /// The class name without the `@`
        name: SmolStr,
        /// The class members
        glyphs: Vec<SmolStr>,
    },
    /// An unnamed class, `[a b c]`
    InlineClass(Vec<SmolStr>),
}

impl GlyphPattern {
    /// Does the pattern accept this glyph?
    pub fn matches(&self, glyph: &str) -> bool {
        match self {
            GlyphPattern::Glyph(name) => name == glyph,
            GlyphPattern::NamedClass { glyphs, .. } | GlyphPattern::InlineClass(glyphs) => {
                glyphs.iter().any(|g| g == glyph)
            }
        }
    }
}

impl fmt::Display for GlyphPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphPattern::Glyph(name) => write!(f, "{}", name),
            GlyphPattern::NamedClass { name, .. } => write!(f, "@{}", name),
            GlyphPattern::InlineClass(glyphs) => write!(f, "[{}]", glyphs.join(" ")),
        }
    }
}

/// A glyph position that could not be lowered to a [`GlyphPattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedPattern {
    /// A shape outside the pattern grammar, with its feature-file text
    Unrecognized(String),
    /// A class reference with no earlier definition
    UndefinedClass(SmolStr),
}

impl From<MalformedPattern> for GlyphToolsError {
    fn from(value: MalformedPattern) -> Self {
        match value {
            MalformedPattern::Unrecognized(text) => GlyphToolsError::UnsupportedGlyphPattern(text),
            MalformedPattern::UndefinedClass(name) => {
                GlyphToolsError::UndefinedGlyphClass(name.to_string())
            }
        }
    }
}
