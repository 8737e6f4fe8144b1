use std::collections::{BTreeSet, HashSet};

use smol_str::SmolStr;
use write_fonts::FontBuilder;

use crate::{filters::FontFilter, subset, Font, GlyphDefinition, GlyphToolsError};

/// Configuration handed to the subsetter
///
/// The default is the configuration the glyph shaker uses: keep all layout
/// features, scripts and names, keep the `.notdef` outline, leave the OS/2
/// Unicode and codepage ranges alone and renumber the remaining glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetOptions {
    /// Layout feature tags to keep; `"*"` keeps all
    pub layout_features: Vec<String>,
    /// Layout script tags to keep; `"*"` keeps all
    pub layout_scripts: Vec<String>,
    /// Name table ids to keep; `"*"` keeps all
    pub name_ids: Vec<String>,
    /// Keep the outline of glyph 0 even if `.notdef` is not in the keep-set
    pub notdef_outline: bool,
    /// Recompute the OS/2 Unicode ranges from the remaining glyphs
    pub prune_unicode_ranges: bool,
    /// Recompute the OS/2 codepage ranges from the remaining glyphs
    pub prune_codepage_ranges: bool,
    /// Emit glyphs in canonical order (`.notdef` first, then font order)
    pub canonical_order: bool,
    /// Keep glyph ids stable, emptying dropped glyphs instead of removing them
    pub retain_gids: bool,
}

impl Default for SubsetOptions {
    fn default() -> Self {
        SubsetOptions {
            layout_features: vec!["*".to_string()],
            layout_scripts: vec!["*".to_string()],
            name_ids: vec!["*".to_string()],
            notdef_outline: true,
            prune_unicode_ranges: false,
            prune_codepage_ranges: false,
            canonical_order: true,
            retain_gids: false,
        }
    }
}

impl SubsetOptions {
    // Glyph ids are rewritten but features, scripts, names and OS/2 are not,
    // so anything that needs them filtered is refused up front.
    fn check(&self) -> Result<(), GlyphToolsError> {
        for (option, values) in [
            ("layout_features", &self.layout_features),
            ("layout_scripts", &self.layout_scripts),
            ("name_ids", &self.name_ids),
        ] {
            if values.iter().all(|v| v != "*") {
                return Err(GlyphToolsError::UnsupportedSubsetOption {
                    option,
                    reason: format!("only \"*\" is supported, got {:?}", values),
                });
            }
        }
        if self.prune_unicode_ranges {
            return Err(GlyphToolsError::UnsupportedSubsetOption {
                option: "prune_unicode_ranges",
                reason: "OS/2 is copied unchanged".to_string(),
            });
        }
        if self.prune_codepage_ranges {
            return Err(GlyphToolsError::UnsupportedSubsetOption {
                option: "prune_codepage_ranges",
                reason: "OS/2 is copied unchanged".to_string(),
            });
        }
        if !self.canonical_order {
            return Err(GlyphToolsError::UnsupportedSubsetOption {
                option: "canonical_order",
                reason: "glyphs always keep their font order".to_string(),
            });
        }
        Ok(())
    }
}

/// A filter that retains only the specified glyphs in a font
///
/// The remaining glyphs are renumbered in font order and every table that
/// refers to glyphs by id is rewritten. With
/// [`retain_gids`](SubsetOptions::retain_gids) the glyph ids stay put and
/// dropped glyphs are left without an outline instead.
///
/// Components of retained composites are always retained too.
pub struct RetainGlyphs {
    glyphs: HashSet<SmolStr>,
    options: SubsetOptions,
}

impl RetainGlyphs {
    /// Create a new RetainGlyphs filter with the default options
    pub fn new<T: Into<SmolStr>>(glyphs: impl IntoIterator<Item = T>) -> Self {
        RetainGlyphs {
            glyphs: glyphs.into_iter().map(|g| g.into()).collect(),
            options: SubsetOptions::default(),
        }
    }

    /// Replace the subsetter options
    pub fn with_options(mut self, options: SubsetOptions) -> Self {
        self.options = options;
        self
    }

    fn keeps_notdef_outline(&self, font: &Font) -> bool {
        self.options.notdef_outline
            || font
                .glyph_order()
                .first()
                .is_some_and(|notdef| self.glyphs.contains(notdef))
    }

    /// Glyph ids to keep: glyph 0, the requested glyphs and every glyph
    /// they use as a component
    fn retained_ids(&self, font: &Font) -> Result<BTreeSet<u16>, GlyphToolsError> {
        let reverse = font.reverse_glyph_map();
        let mut retained: BTreeSet<u16> = BTreeSet::from([0]);
        let mut todo: Vec<SmolStr> = Vec::new();
        for name in &self.glyphs {
            match reverse.get(name) {
                Some(gid) => {
                    retained.insert(gid.to_u16());
                    todo.push(name.clone());
                }
                None => log::warn!("Glyph {} asked to be retained is not in the font", name),
            }
        }
        if self.keeps_notdef_outline(font) {
            todo.extend(font.glyph_order().first().cloned());
        }

        let table = font.glyph_table()?;
        while let Some(name) = todo.pop() {
            let Some(GlyphDefinition::Composite(components)) = table.get(&name) else {
                continue;
            };
            for component in components {
                let Some(gid) = reverse.get(component) else {
                    continue;
                };
                if retained.insert(gid.to_u16()) {
                    if !self.glyphs.contains(component) {
                        log::warn!(
                            "Retaining {} because the retained glyph {} uses it as a component",
                            component,
                            name
                        );
                    }
                    todo.push(component.clone());
                }
            }
        }
        Ok(retained)
    }

    fn empty_dropped(
        &self,
        font: &Font,
        retained: &BTreeSet<u16>,
        notdef_outline: bool,
    ) -> Result<Vec<u8>, GlyphToolsError> {
        let font_ref = font.font_ref()?;
        let mut builder = FontBuilder::new();
        let keep = |gid: usize| {
            if gid == 0 {
                notdef_outline
            } else {
                retained.contains(&(gid as u16))
            }
        };
        let dropped = subset::empty_outlines(font, &font_ref, keep, &mut builder)?;
        log::debug!("Emptied {} glyphs", dropped);
        builder.copy_missing_tables(font_ref);
        Ok(builder.build())
    }
}

impl FontFilter for RetainGlyphs {
    fn apply(&self, font: &mut Font) -> Result<(), GlyphToolsError> {
        self.options.check()?;
        log::info!(
            "Retaining {} of {} glyphs in {}",
            self.glyphs.len(),
            font.glyph_order().len(),
            font.display_name()
        );
        let retained = self.retained_ids(font)?;
        let notdef_outline = self.keeps_notdef_outline(font);
        if retained.len() == font.glyph_order().len() && notdef_outline {
            log::info!("Nothing to remove from {}", font.display_name());
            return Ok(());
        }
        let data = if self.options.retain_gids {
            self.empty_dropped(font, &retained, notdef_outline)?
        } else {
            subset::renumber(font, &retained, notdef_outline)?
        };
        font.replace_data(data)?;
        log::info!(
            "{} has {} glyphs after subsetting",
            font.display_name(),
            font.glyph_order().len()
        );
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, GlyphToolsError>
    where
        Self: Sized,
    {
        Ok(RetainGlyphs::new(
            s.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()),
        ))
    }
}
