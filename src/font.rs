use crate::{GlyphDefinition, GlyphTable, GlyphToolsError};
use smol_str::SmolStr;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use write_fonts::{
    read::{tables::glyf::Glyph as RawGlyph, FontRef, ReadError, TableProvider},
    types::{GlyphId, GlyphId16},
};

/// A binary TrueType font together with its glyph order
///
/// The font owns its bytes; tables are parsed on demand from them. Filters
/// which rewrite the font replace the bytes, and the glyph order is read
/// again from the new binary.
#[derive(Debug, Clone)]
pub struct Font {
    /// The file this font was loaded from, if any
    pub source: Option<PathBuf>,
    data: Vec<u8>,
    glyph_order: Vec<SmolStr>,
}

impl Font {
    /// Load a font from a file
    ///
    /// An unreadable file is reported as [`GlyphToolsError::IO`]; a file which
    /// is not a font is reported as [`GlyphToolsError::BinaryFontRead`].
    pub fn load(path: impl Into<PathBuf>) -> Result<Font, GlyphToolsError> {
        let path = path.into();
        let data = std::fs::read(&path)?;
        let mut font = Font::from_bytes(data)?;
        font.source = Some(path);
        Ok(font)
    }

    /// Parse a font held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Font, GlyphToolsError> {
        let glyph_order = read_glyph_order(&FontRef::new(&data)?)?;
        Ok(Font {
            source: None,
            data,
            glyph_order,
        })
    }

    /// Borrow the font as a table provider
    pub fn font_ref(&self) -> Result<FontRef<'_>, GlyphToolsError> {
        Ok(FontRef::new(&self.data)?)
    }

    /// The raw font binary
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Glyph names, indexed by glyph id
    pub fn glyph_order(&self) -> &[SmolStr] {
        &self.glyph_order
    }

    /// Map from glyph name to glyph id
    pub fn reverse_glyph_map(&self) -> HashMap<SmolStr, GlyphId16> {
        self.glyph_order
            .iter()
            .enumerate()
            .map(|(gid, name)| (name.clone(), GlyphId16::new(gid as u16)))
            .collect()
    }

    /// Decode the `glyf` table into simple and composite glyph definitions
    pub fn glyph_table(&self) -> Result<GlyphTable, GlyphToolsError> {
        let font = self.font_ref()?;
        let is_long = self.required("head", font.head())?.index_to_loc_format() == 1;
        let loca = self.required("loca", font.loca(is_long))?;
        let glyf = self.required("glyf", font.glyf())?;

        let mut table = GlyphTable::new();
        for (gid, name) in self.glyph_order.iter().enumerate() {
            let definition = match loca.get_glyf(GlyphId::new(gid as u32), &glyf)? {
                Some(RawGlyph::Composite(composite)) => GlyphDefinition::Composite(
                    composite
                        .components()
                        .map(|component| self.name_for(component.glyph, name))
                        .collect::<Result<_, _>>()?,
                ),
                _ => GlyphDefinition::Simple,
            };
            table.insert(name.clone(), definition);
        }
        log::debug!(
            "Decoded {} glyphs from {}",
            table.len(),
            self.display_name()
        );
        Ok(table)
    }

    /// Swap in a rewritten binary
    pub(crate) fn replace_data(&mut self, data: Vec<u8>) -> Result<(), GlyphToolsError> {
        self.glyph_order = read_glyph_order(&FontRef::new(&data)?)?;
        self.data = data;
        Ok(())
    }

    /// Write the font binary to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GlyphToolsError> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    pub(crate) fn display_name(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    fn name_for(&self, gid: GlyphId16, referrer: &str) -> Result<SmolStr, GlyphToolsError> {
        self.glyph_order
            .get(gid.to_u16() as usize)
            .cloned()
            .ok_or_else(|| GlyphToolsError::GlyphOutOfRange {
                gid: gid.to_u16(),
                referrer: referrer.to_string(),
            })
    }

    pub(crate) fn required<T>(
        &self,
        table: &'static str,
        result: Result<T, ReadError>,
    ) -> Result<T, GlyphToolsError> {
        result.map_err(|e| match e {
            ReadError::TableIsMissing(_) => GlyphToolsError::MissingTable {
                path: self.source.clone(),
                table,
            },
            other => other.into(),
        })
    }
}

/// Names come from `post`; glyphs it cannot name get `glyphNNNNN`, and
/// repeated names get a `#n` suffix so that every name is unique.
fn read_glyph_order(font: &FontRef) -> Result<Vec<SmolStr>, GlyphToolsError> {
    let num_glyphs = font.maxp()?.num_glyphs();
    let post = font.post().ok();
    let mut used: HashSet<SmolStr> = HashSet::new();
    let mut order = Vec::with_capacity(num_glyphs as usize);
    for gid in 0..num_glyphs {
        let name = post
            .as_ref()
            .and_then(|post| post.glyph_name(GlyphId16::new(gid)))
            .filter(|name| !name.is_empty())
            .map(SmolStr::new)
            .unwrap_or_else(|| {
                if gid == 0 {
                    SmolStr::new_static(".notdef")
                } else {
                    SmolStr::from(format!("glyph{gid:05}"))
                }
            });
        let name = if used.contains(&name) {
            let mut n = 1;
            loop {
                let candidate = SmolStr::from(format!("{name}#{n}"));
                if !used.contains(&candidate) {
                    log::warn!("Duplicate glyph name {} renamed to {}", name, candidate);
                    break candidate;
                }
                n += 1;
            }
        } else {
            name
        };
        used.insert(name.clone());
        order.push(name);
    }
    Ok(order)
}
