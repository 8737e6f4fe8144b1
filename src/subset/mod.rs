//! Glyph renumbering for compiled TrueType fonts
//!
//! The subsetter keeps a set of glyph ids, gives them new contiguous ids in
//! font order and rewrites every table that refers to glyphs by id. Tables
//! that carry glyph ids in a layout we do not rewrite are refused, never
//! copied, so the output cannot point at the wrong glyphs.

mod glyf;
mod layout;
mod tables;

use std::collections::BTreeSet;

use write_fonts::{
    read::{FontRead, FontRef, TopLevelTable},
    tables::{gdef::Gdef, gpos::Gpos, gsub::Gsub, layout::ClassDef, layout::CoverageTable},
    types::{GlyphId16, Tag},
    validate::Validate,
    FontBuilder, FontWrite,
};

use crate::{Font, GlyphToolsError};

pub(crate) use glyf::empty_outlines;
use glyf::renumber_glyf;
use layout::Remap;

/// Tables holding glyph ids which are not rewritten
const UNSUPPORTED_TABLES: &[&[u8; 4]] = &[
    b"gvar", b"HVAR", b"VVAR", b"COLR", b"hdmx", b"LTSH", b"VORG", b"sbix", b"CBDT", b"CBLC",
    b"EBDT", b"EBLC", b"EBSC", b"MATH", b"JSTF", b"SVG ", b"morx", b"mort", b"kerx",
];

/// Tables which are meaningless once the font has been rewritten
const DROPPED_TABLES: &[&[u8; 4]] = &[b"DSIG"];

/// Old to new glyph id mapping
///
/// New ids follow the old ids' order, so anything sorted by glyph id stays
/// sorted after remapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlyphMap {
    new_ids: Vec<Option<GlyphId16>>,
    old_ids: Vec<GlyphId16>,
}

impl GlyphMap {
    pub(crate) fn new(num_glyphs: usize, retained: &BTreeSet<u16>) -> Self {
        let mut new_ids = vec![None; num_glyphs];
        let mut old_ids = Vec::with_capacity(retained.len());
        for &old in retained.iter().filter(|&&gid| (gid as usize) < num_glyphs) {
            new_ids[old as usize] = Some(GlyphId16::new(old_ids.len() as u16));
            old_ids.push(GlyphId16::new(old));
        }
        GlyphMap { new_ids, old_ids }
    }

    /// The new id of an old glyph, if it survives
    pub(crate) fn get(&self, old: GlyphId16) -> Option<GlyphId16> {
        self.new_ids.get(old.to_u16() as usize).copied().flatten()
    }

    /// Old glyph ids, indexed by new glyph id
    pub(crate) fn old_ids(&self) -> &[GlyphId16] {
        &self.old_ids
    }

    /// Number of glyphs in the output font
    pub(crate) fn len(&self) -> usize {
        self.old_ids.len()
    }

    /// Remap a sequence that is only meaningful as a whole
    ///
    /// Returns false, leaving the sequence untouched, if any glyph is gone.
    pub(crate) fn remap_all(&self, glyphs: &mut [GlyphId16]) -> bool {
        let Some(remapped) = glyphs
            .iter()
            .map(|&g| self.get(g))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };
        glyphs.copy_from_slice(&remapped);
        true
    }

    /// Remap a set of alternatives, dropping the glyphs that are gone
    pub(crate) fn remap_some(&self, glyphs: &mut Vec<GlyphId16>) {
        *glyphs = glyphs.iter().filter_map(|&g| self.get(g)).collect();
    }

    pub(crate) fn remap_coverage(&self, coverage: &mut CoverageTable) {
        let remapped: CoverageTable = coverage.iter().filter_map(|g| self.get(g)).collect();
        *coverage = remapped;
    }

    pub(crate) fn remap_class_def(&self, class_def: &mut ClassDef) {
        let remapped: ClassDef = class_def
            .iter()
            .filter_map(|(g, class)| self.get(g).map(|g| (g, class)))
            .collect();
        *class_def = remapped;
    }

    /// Remap a coverage table together with the records indexed by it
    ///
    /// A record survives if its glyph does and `keep` accepts it; `keep` may
    /// rewrite the record on the way.
    pub(crate) fn retain_covered<T>(
        &self,
        coverage: &mut CoverageTable,
        records: &mut Vec<T>,
        mut keep: impl FnMut(&mut T) -> bool,
    ) {
        let covered: Vec<GlyphId16> = coverage.iter().collect();
        if covered.len() != records.len() {
            log::warn!(
                "Coverage has {} glyphs but {} records",
                covered.len(),
                records.len()
            );
        }
        let mut glyphs = Vec::with_capacity(covered.len());
        let mut kept = Vec::with_capacity(covered.len());
        for (old, mut record) in covered.into_iter().zip(records.drain(..)) {
            if let Some(new) = self.get(old) {
                if keep(&mut record) {
                    glyphs.push(new);
                    kept.push(record);
                }
            }
        }
        *coverage = glyphs.into_iter().collect();
        *records = kept;
    }
}

/// Build a font holding only the retained glyphs, renumbered in font order
///
/// Glyph 0 must be retained. When `notdef_outline` is false it is kept as an
/// empty glyph.
pub(crate) fn renumber(
    font: &Font,
    retained: &BTreeSet<u16>,
    notdef_outline: bool,
) -> Result<Vec<u8>, GlyphToolsError> {
    let font_ref = font.font_ref()?;
    let present: Vec<Tag> = font_ref
        .table_directory()
        .table_records()
        .iter()
        .map(|record| record.tag())
        .collect();
    if let Some(tag) = present
        .iter()
        .find(|tag| UNSUPPORTED_TABLES.iter().any(|t| Tag::new(t) == **tag))
    {
        return Err(GlyphToolsError::UnsupportedTable(tag.to_string()));
    }

    let glyphs = GlyphMap::new(font.glyph_order().len(), retained);
    if glyphs.get(GlyphId16::NOTDEF).is_none() {
        return Err(GlyphToolsError::UnsupportedSubsetOption {
            option: "notdef_outline",
            reason: "glyph 0 is always retained".to_string(),
        });
    }
    log::debug!(
        "Renumbering {} of {} glyphs in {}",
        glyphs.len(),
        font.glyph_order().len(),
        font.display_name()
    );

    let mut builder = FontBuilder::new();
    renumber_glyf(font, &font_ref, &glyphs, notdef_outline, &mut builder)?;
    tables::maxp(&font_ref, &glyphs, &mut builder)?;
    tables::metrics(&font_ref, &glyphs, &mut builder)?;
    tables::post(&font_ref, font, &glyphs, &mut builder)?;
    tables::cmap(&font_ref, &glyphs, &mut builder)?;
    tables::kern(&font_ref, &glyphs, &mut builder)?;
    remap_layout::<Gdef>(&font_ref, &glyphs, &mut builder)?;
    remap_layout::<Gsub>(&font_ref, &glyphs, &mut builder)?;
    remap_layout::<Gpos>(&font_ref, &glyphs, &mut builder)?;

    for tag in present {
        if builder.contains(tag) || DROPPED_TABLES.iter().any(|t| Tag::new(t) == tag) {
            continue;
        }
        if let Some(data) = font_ref.table_data(tag) {
            builder.add_raw(tag, data.as_bytes());
        }
    }
    Ok(builder.build())
}

fn remap_layout<T>(
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError>
where
    T: for<'a> FontRead<'a> + Remap + FontWrite + Validate + TopLevelTable,
{
    let Some(data) = font_ref.table_data(T::TAG) else {
        return Ok(());
    };
    let mut table = T::read(data)?;
    table.remap(glyphs);
    builder.add_table(&table)?;
    Ok(())
}
