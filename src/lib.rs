#![deny(clippy::unwrap_used, clippy::expect_used)]
//! Tools for looking inside compiled TrueType fonts
//!
//! Two independent pieces live here. [`filters::ShakeComponents`] finds
//! component glyphs that no other glyph uses and subsets them away, and
//! [`layout::Tracer`] replays a feature-file lookup against a glyph sequence
//! to show which rules match.

mod error;
pub mod filters;
mod font;
mod glyph;
pub mod kerndata;
pub mod layout;
mod subset;

pub use crate::{
    error::GlyphToolsError,
    font::Font,
    glyph::{GlyphDefinition, GlyphTable},
};
use std::path::PathBuf;

/// Load a binary font from disk
pub fn load(filename: impl Into<PathBuf>) -> Result<Font, GlyphToolsError> {
    Font::load(filename)
}
