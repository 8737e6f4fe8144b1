use indexmap::IndexMap;
use smol_str::SmolStr;

/// How a glyph's outline is defined
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GlyphDefinition {
    /// A glyph with its own contours (or no outline at all)
    #[default]
    Simple,
    /// A glyph built by placing other glyphs
    ///
    /// The references are kept in the order the components appear.
    Composite(Vec<SmolStr>),
}

impl GlyphDefinition {
    /// Whether this is a composite definition
    pub fn is_composite(&self) -> bool {
        matches!(self, GlyphDefinition::Composite(_))
    }

    /// The glyphs referenced by this definition, in component order
    pub fn components(&self) -> &[SmolStr] {
        match self {
            GlyphDefinition::Simple => &[],
            GlyphDefinition::Composite(components) => components,
        }
    }
}

/// The glyph set of a font, in glyph order, keyed by (unique) glyph name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphTable(IndexMap<SmolStr, GlyphDefinition>);

impl GlyphTable {
    /// Create an empty glyph table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a glyph to the end of the glyph order
    ///
    /// Returns the previous definition if the name was already present; in
    /// that case the glyph keeps its original position.
    pub fn insert(
        &mut self,
        name: impl Into<SmolStr>,
        definition: GlyphDefinition,
    ) -> Option<GlyphDefinition> {
        self.0.insert(name.into(), definition)
    }

    /// Get a glyph definition by name
    pub fn get(&self, name: &str) -> Option<&GlyphDefinition> {
        self.0.get(name)
    }

    /// Whether the table has a glyph with this name
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of glyphs
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no glyphs
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Glyph names in glyph order
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    /// Glyphs and their definitions in glyph order
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &GlyphDefinition)> {
        self.0.iter()
    }
}

impl<N: Into<SmolStr>> FromIterator<(N, GlyphDefinition)> for GlyphTable {
    fn from_iter<T: IntoIterator<Item = (N, GlyphDefinition)>>(iter: T) -> Self {
        GlyphTable(iter.into_iter().map(|(n, d)| (n.into(), d)).collect())
    }
}
