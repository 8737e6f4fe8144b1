mod retainglyphs;
mod shakecomponents;

pub use retainglyphs::{RetainGlyphs, SubsetOptions};
pub use shakecomponents::{compute_deletable, ShakeComponents, ShakeReport};

/// A trait for filters that rewrite a font in place
pub trait FontFilter {
    /// Apply the filter to the given font
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::GlyphToolsError>;

    /// Parse a FontFilter from a string argument
    fn from_str(s: &str) -> Result<Self, crate::GlyphToolsError>
    where
        Self: Sized;
}
