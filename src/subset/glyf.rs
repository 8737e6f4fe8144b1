use write_fonts::{
    read::{FontRef, ReadError, TableProvider},
    types::{GlyphId16, Tag},
    FontBuilder,
};

use super::GlyphMap;
use crate::{Font, GlyphToolsError};

// Composite glyph component flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Largest glyf size a short loca can address
const MAX_SHORT_GLYF: usize = 0x1FFFE;

/// Raw outlines of a font, indexed by glyph id
struct Outlines<'a> {
    glyf: &'a [u8],
    offsets: Vec<usize>,
    is_long: bool,
}

impl<'a> Outlines<'a> {
    fn read(font: &Font, font_ref: &FontRef<'a>) -> Result<Self, GlyphToolsError> {
        let is_long = font.required("head", font_ref.head())?.index_to_loc_format() == 1;
        let loca = font.required("loca", font_ref.loca(is_long))?;
        let glyf = font_ref
            .table_data(Tag::new(b"glyf"))
            .ok_or_else(|| GlyphToolsError::MissingTable {
                path: font.source.clone(),
                table: "glyf",
            })?;
        let offsets = (0..=font.glyph_order().len())
            .map(|gid| loca.get_raw(gid).map(|o| o as usize))
            .collect::<Option<Vec<_>>>()
            .ok_or(ReadError::OutOfBounds)?;
        Ok(Outlines {
            glyf: glyf.as_bytes(),
            offsets,
            is_long,
        })
    }

    fn get(&self, gid: usize) -> Result<&'a [u8], ReadError> {
        let start = *self.offsets.get(gid).ok_or(ReadError::OutOfBounds)?;
        let end = *self.offsets.get(gid + 1).ok_or(ReadError::OutOfBounds)?;
        self.glyf.get(start..end).ok_or(ReadError::OutOfBounds)
    }
}

/// Lay outlines out as a glyf table and its loca
///
/// A short loca is kept if the result fits, otherwise the loca becomes
/// long. Returns the tables and whether the loca is long.
fn write_glyf_loca(outlines: &[Vec<u8>], is_long: bool) -> (Vec<u8>, Vec<u8>, bool) {
    let alignment = if is_long { 4 } else { 2 };
    let mut glyf: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(outlines.len() + 1);
    for outline in outlines {
        offsets.push(glyf.len());
        glyf.extend_from_slice(outline);
        while glyf.len() % alignment != 0 {
            glyf.push(0);
        }
    }
    offsets.push(glyf.len());

    let is_long = is_long || glyf.len() > MAX_SHORT_GLYF;
    let mut loca: Vec<u8> = Vec::with_capacity(offsets.len() * 4);
    for offset in offsets {
        if is_long {
            loca.extend_from_slice(&(offset as u32).to_be_bytes());
        } else {
            loca.extend_from_slice(&((offset / 2) as u16).to_be_bytes());
        }
    }
    (glyf, loca, is_long)
}

fn read_u16(outline: &[u8], pos: usize) -> Result<u16, ReadError> {
    outline
        .get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ReadError::OutOfBounds)
}

/// Point every component of a composite outline at its new glyph id
///
/// Simple and empty outlines are left alone.
fn renumber_components(
    outline: &mut [u8],
    glyphs: &GlyphMap,
    name: &str,
) -> Result<(), GlyphToolsError> {
    if outline.len() < 10 || (read_u16(outline, 0)? as i16) >= 0 {
        return Ok(());
    }
    let mut pos = 10;
    loop {
        let flags = read_u16(outline, pos)?;
        let old = read_u16(outline, pos + 2)?;
        let new = glyphs.get(GlyphId16::new(old)).ok_or_else(|| {
            GlyphToolsError::GlyphOutOfRange {
                gid: old,
                referrer: name.to_string(),
            }
        })?;
        outline[pos + 2..pos + 4].copy_from_slice(&new.to_u16().to_be_bytes());

        pos += 4;
        pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            pos += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            pos += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            pos += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            return Ok(());
        }
    }
}

/// Set the loca format in a copy of `head`
fn head_with_loca_format(font_ref: &FontRef, is_long: bool) -> Result<Vec<u8>, ReadError> {
    let mut head = font_ref
        .table_data(Tag::new(b"head"))
        .ok_or(ReadError::TableIsMissing(Tag::new(b"head")))?
        .as_bytes()
        .to_vec();
    head.get_mut(50..52)
        .ok_or(ReadError::OutOfBounds)?
        .copy_from_slice(&u16::from(is_long).to_be_bytes());
    Ok(head)
}

fn add_glyf_loca(
    font_ref: &FontRef,
    outlines: &[Vec<u8>],
    was_long: bool,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    let (glyf, loca, is_long) = write_glyf_loca(outlines, was_long);
    if is_long != was_long {
        log::info!("glyf outgrew a short loca, switching to long offsets");
        builder.add_raw(Tag::new(b"head"), head_with_loca_format(font_ref, is_long)?);
    }
    builder.add_raw(Tag::new(b"glyf"), glyf);
    builder.add_raw(Tag::new(b"loca"), loca);
    Ok(())
}

/// Rewrite glyf/loca keeping glyph ids, with the outlines of every glyph not
/// in `keep` emptied
///
/// Returns how many outlines were emptied.
pub(crate) fn empty_outlines(
    font: &Font,
    font_ref: &FontRef,
    keep: impl Fn(usize) -> bool,
    builder: &mut FontBuilder,
) -> Result<usize, GlyphToolsError> {
    let source = Outlines::read(font, font_ref)?;
    let mut dropped = 0;
    let mut outlines = Vec::with_capacity(font.glyph_order().len());
    for (gid, name) in font.glyph_order().iter().enumerate() {
        if keep(gid) {
            outlines.push(source.get(gid)?.to_vec());
        } else {
            log::debug!("Emptying glyph {} ({})", name, gid);
            dropped += 1;
            outlines.push(Vec::new());
        }
    }
    add_glyf_loca(font_ref, &outlines, source.is_long, builder)?;
    Ok(dropped)
}

/// Rewrite glyf/loca holding only the retained glyphs, renumbered
pub(crate) fn renumber_glyf(
    font: &Font,
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    notdef_outline: bool,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    let source = Outlines::read(font, font_ref)?;
    let mut outlines = Vec::with_capacity(glyphs.len());
    for old in glyphs.old_ids() {
        let gid = old.to_u16() as usize;
        if gid == 0 && !notdef_outline {
            outlines.push(Vec::new());
            continue;
        }
        let mut outline = source.get(gid)?.to_vec();
        let name = font.glyph_order().get(gid).map_or("", |n| n.as_str());
        renumber_components(&mut outline, glyphs, name)?;
        outlines.push(outline);
    }
    add_glyf_loca(font_ref, &outlines, source.is_long, builder)
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn composite(components: &[(u16, u16)]) -> Vec<u8> {
        let mut outline = vec![0xFF, 0xFF, 0, 0, 0, 0, 0, 10, 0, 10];
        for (i, &(flags, gid)) in components.iter().enumerate() {
            let more = if i + 1 < components.len() {
                MORE_COMPONENTS
            } else {
                0
            };
            outline.extend_from_slice(&(flags | more).to_be_bytes());
            outline.extend_from_slice(&gid.to_be_bytes());
            let args = if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
            outline.extend(std::iter::repeat(0).take(args));
            if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
                outline.extend([0x40, 0, 0, 0, 0, 0, 0x40, 0]);
            }
        }
        outline
    }

    fn component_ids(outline: &[u8], count: usize) -> Vec<u16> {
        let mut pos = 10;
        let mut ids = vec![];
        for _ in 0..count {
            let flags = read_u16(outline, pos).unwrap();
            ids.push(read_u16(outline, pos + 2).unwrap());
            pos += 4 + if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
            if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
                pos += 8;
            }
        }
        ids
    }

    #[test]
    fn test_components_follow_their_glyphs() {
        let glyphs = GlyphMap::new(8, &[0, 4, 6, 7].into_iter().collect());
        let mut outline = composite(&[
            (ARG_1_AND_2_ARE_WORDS, 6),
            (WE_HAVE_A_TWO_BY_TWO, 4),
            (0, 7),
        ]);
        renumber_components(&mut outline, &glyphs, "A").unwrap();
        assert_eq!(component_ids(&outline, 3), vec![2, 1, 3]);
    }

    #[test]
    fn test_dropped_component_is_an_error() {
        let glyphs = GlyphMap::new(8, &[0, 4].into_iter().collect());
        let mut outline = composite(&[(0, 5)]);
        assert!(matches!(
            renumber_components(&mut outline, &glyphs, "A"),
            Err(GlyphToolsError::GlyphOutOfRange { gid: 5, .. })
        ));
    }

    #[test]
    fn test_simple_outline_is_untouched() {
        let glyphs = GlyphMap::new(2, &[0].into_iter().collect());
        let mut outline = vec![0, 1, 0, 0, 0, 0, 0, 10, 0, 10, 0, 0];
        let before = outline.clone();
        renumber_components(&mut outline, &glyphs, "B").unwrap();
        assert_eq!(outline, before);
    }

    #[test]
    fn test_short_loca_is_padded() {
        let (glyf, loca, is_long) = write_glyf_loca(&[vec![1, 2, 3], vec![], vec![4, 5]], false);
        assert!(!is_long);
        assert_eq!(glyf, vec![1, 2, 3, 0, 4, 5]);
        assert_eq!(loca, vec![0, 0, 0, 2, 0, 2, 0, 3]);
    }

    #[test]
    fn test_oversized_glyf_switches_to_long_loca() {
        let outlines = vec![vec![0; 0x10000], vec![0; 0x10000]];
        let (glyf, loca, is_long) = write_glyf_loca(&outlines, false);
        assert!(is_long);
        assert_eq!(loca.len(), 12);
        assert_eq!(&loca[8..], &(glyf.len() as u32).to_be_bytes());
    }
}
