use smol_str::SmolStr;

use crate::{
    layout::pattern::{GlyphPattern, MalformedPattern},
    GlyphToolsError,
};

/// Whether a chaining rule substitutes or positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// `sub ... ' lookup ...`
    Subst,
    /// `pos ... ' lookup ...`
    Pos,
}

/// The shape of a rule, as far as the tracer cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `pos a 10;` and `pos [a b] <10 0 10 0>;`
    SinglePos(Vec<(GlyphPattern, String)>),
    /// `pos a b -20;`
    PairPos {
        /// Pattern for the first glyph
        first: GlyphPattern,
        /// Pattern for the second glyph
        second: GlyphPattern,
    },
    /// A chaining contextual substitution or positioning rule
    ChainContext {
        /// Substitution or positioning
        kind: ChainKind,
        /// Backtrack sequence
        prefix: Vec<GlyphPattern>,
        /// Input sequence
        glyphs: Vec<GlyphPattern>,
        /// Lookahead sequence
        suffix: Vec<GlyphPattern>,
        /// Lookups applied at each input position
        lookups: Vec<Vec<SmolStr>>,
    },
    /// A single positioning rule written with context, `pos a' 10 b;`
    ForcedChainSinglePos {
        /// Backtrack sequence
        prefix: Vec<GlyphPattern>,
        /// Marked glyphs and their adjustments
        pos: Vec<(GlyphPattern, String)>,
        /// Lookahead sequence
        suffix: Vec<GlyphPattern>,
    },
    /// A supported rule with a glyph position outside the pattern grammar
    Malformed(MalformedPattern),
    /// Anything else; the name of the statement type
    Unsupported(&'static str),
}

/// One rule in a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based source line, when the statement carries a location
    pub line: Option<usize>,
    /// The statement as feature-file text
    pub text: String,
    /// What the statement does
    pub kind: StatementKind,
}

impl Statement {
    /// `line <n>` for reports
    pub fn location(&self) -> String {
        match self.line {
            Some(line) => format!("line {}", line),
            None => "line ?".to_string(),
        }
    }
}

/// A named, ordered list of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// The lookup name
    pub name: SmolStr,
    /// The rules, in source order
    pub statements: Vec<Statement>,
}

/// Every lookup block found in a rule source, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    /// The lookups; names are not necessarily unique
    pub lookups: Vec<Lookup>,
}

impl RuleSet {
    /// Find the single lookup with this name
    pub fn lookup(&self, name: &str) -> Result<&Lookup, GlyphToolsError> {
        let mut found = self.lookups.iter().filter(|l| l.name == name);
        let first = found
            .next()
            .ok_or_else(|| GlyphToolsError::LookupNotFound(name.to_string()))?;
        let others = found.count();
        if others > 0 {
            return Err(GlyphToolsError::AmbiguousLookup {
                name: name.to_string(),
                count: others + 1,
            });
        }
        Ok(first)
    }
}
