use std::collections::HashMap;

use write_fonts::{
    read::{tables::post::DEFAULT_GLYPH_NAMES, FontData, FontRef, ReadError, TableProvider},
    tables::cmap::Cmap,
    types::{GlyphId, GlyphId16, Tag, Version16Dot16},
    FontBuilder,
};

use super::GlyphMap;
use crate::{Font, GlyphToolsError};

const NUM_GLYPHS_OFFSET: usize = 4;
const NUMBER_OF_METRICS_OFFSET: usize = 34;
const POST_HEADER_LEN: usize = 32;

fn table_bytes(font_ref: &FontRef, tag: Tag) -> Result<Vec<u8>, ReadError> {
    font_ref
        .table_data(tag)
        .map(|data| data.as_bytes().to_vec())
        .ok_or(ReadError::TableIsMissing(tag))
}

fn set_u16(table: &mut [u8], pos: usize, value: u16) -> Result<(), ReadError> {
    table
        .get_mut(pos..pos + 2)
        .ok_or(ReadError::OutOfBounds)?
        .copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub(super) fn maxp(
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    let tag = Tag::new(b"maxp");
    let mut maxp = table_bytes(font_ref, tag)?;
    set_u16(&mut maxp, NUM_GLYPHS_OFFSET, glyphs.len() as u16)?;
    builder.add_raw(tag, maxp);
    Ok(())
}

/// Advance and side bearing pairs, written with trailing repeated advances
/// folded into the side-bearing-only array
fn write_metrics(metrics: &[(u16, i16)]) -> (Vec<u8>, u16) {
    let mut long = metrics.len();
    while long > 1 && metrics[long - 1].0 == metrics[long - 2].0 {
        long -= 1;
    }
    let mut table = Vec::with_capacity(long * 4 + (metrics.len() - long) * 2);
    for (i, (advance, bearing)) in metrics.iter().enumerate() {
        if i < long {
            table.extend_from_slice(&advance.to_be_bytes());
        }
        table.extend_from_slice(&bearing.to_be_bytes());
    }
    (table, long as u16)
}

/// Rewrite hmtx and vmtx, and the metric counts in their headers
pub(super) fn metrics(
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    if font_ref.table_data(Tag::new(b"hmtx")).is_some() {
        let hmtx = font_ref.hmtx()?;
        let metrics: Vec<(u16, i16)> = glyphs
            .old_ids()
            .iter()
            .map(|&gid| {
                let gid = GlyphId::from(gid);
                (
                    hmtx.advance(gid).unwrap_or_default(),
                    hmtx.side_bearing(gid).unwrap_or_default(),
                )
            })
            .collect();
        add_metrics(font_ref, builder, b"hmtx", b"hhea", &metrics)?;
    }
    if font_ref.table_data(Tag::new(b"vmtx")).is_some() {
        let vmtx = font_ref.vmtx()?;
        let metrics: Vec<(u16, i16)> = glyphs
            .old_ids()
            .iter()
            .map(|&gid| {
                let gid = GlyphId::from(gid);
                (
                    vmtx.advance(gid).unwrap_or_default(),
                    vmtx.side_bearing(gid).unwrap_or_default(),
                )
            })
            .collect();
        add_metrics(font_ref, builder, b"vmtx", b"vhea", &metrics)?;
    }
    Ok(())
}

fn add_metrics(
    font_ref: &FontRef,
    builder: &mut FontBuilder,
    table: &[u8; 4],
    header: &[u8; 4],
    metrics: &[(u16, i16)],
) -> Result<(), GlyphToolsError> {
    let (data, long) = write_metrics(metrics);
    let header_tag = Tag::new(header);
    let mut header = table_bytes(font_ref, header_tag)?;
    set_u16(&mut header, NUMBER_OF_METRICS_OFFSET, long)?;
    builder.add_raw(header_tag, header);
    builder.add_raw(Tag::new(table), data);
    Ok(())
}

/// Rewrite post as a version 2 table naming the retained glyphs
///
/// Version 3 tables carry no names and are copied as they are.
pub(super) fn post(
    font_ref: &FontRef,
    font: &Font,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    let tag = Tag::new(b"post");
    if font_ref.table_data(tag).is_none() {
        return Ok(());
    }
    let post = font_ref.post()?;
    if post.version() == Version16Dot16::VERSION_3_0 {
        return Ok(());
    }
    let original = table_bytes(font_ref, tag)?;
    let header = original
        .get(4..POST_HEADER_LEN)
        .ok_or(ReadError::OutOfBounds)?;

    let standard: HashMap<&str, u16> = DEFAULT_GLYPH_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i as u16))
        .collect();
    let mut custom: Vec<&str> = Vec::new();
    let mut custom_index: HashMap<&str, u16> = HashMap::new();
    let mut indices: Vec<u16> = Vec::with_capacity(glyphs.len());
    for &gid in glyphs.old_ids() {
        let name = post
            .glyph_name(gid)
            .or_else(|| font.glyph_order().get(gid.to_u16() as usize).map(|n| n.as_str()))
            .unwrap_or_default();
        let index = match standard.get(name) {
            Some(&index) => index,
            None => *custom_index.entry(name).or_insert_with(|| {
                custom.push(name);
                (DEFAULT_GLYPH_NAMES.len() + custom.len() - 1) as u16
            }),
        };
        indices.push(index);
    }

    let mut table: Vec<u8> = Vec::with_capacity(original.len());
    table.extend_from_slice(&Version16Dot16::VERSION_2_0.to_be_bytes());
    table.extend_from_slice(header);
    table.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
    for index in indices {
        table.extend_from_slice(&index.to_be_bytes());
    }
    for name in custom {
        let bytes = &name.as_bytes()[..name.len().min(255)];
        table.push(bytes.len() as u8);
        table.extend_from_slice(bytes);
    }
    builder.add_raw(tag, table);
    Ok(())
}

/// Rebuild cmap from the font's preferred subtable
pub(super) fn cmap(
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    if font_ref.table_data(Tag::new(b"cmap")).is_none() {
        return Ok(());
    }
    let cmap = font_ref.cmap()?;
    let Some((_, _, subtable)) = cmap.best_subtable() else {
        log::warn!("No usable cmap subtable, dropping cmap");
        return Ok(());
    };
    let mappings: Vec<(char, GlyphId)> = subtable
        .iter()
        .filter_map(|(codepoint, gid)| {
            let gid = GlyphId16::try_from(gid).ok()?;
            Some((char::from_u32(codepoint)?, GlyphId::from(glyphs.get(gid)?)))
        })
        .collect();
    builder.add_table(&Cmap::from_mappings(mappings)?)?;
    Ok(())
}

/// Rewrite a Microsoft style kern table, keeping pairs of retained glyphs
///
/// Only format 0 subtables can be renumbered; anything else is refused.
pub(super) fn kern(
    font_ref: &FontRef,
    glyphs: &GlyphMap,
    builder: &mut FontBuilder,
) -> Result<(), GlyphToolsError> {
    let tag = Tag::new(b"kern");
    let Some(data) = font_ref.table_data(tag) else {
        return Ok(());
    };
    let refuse = || GlyphToolsError::UnsupportedTable("kern".to_string());
    if data.read_at::<u16>(0)? != 0 {
        return Err(refuse());
    }
    let num_tables = data.read_at::<u16>(2)?;
    let mut table: Vec<u8> = Vec::with_capacity(data.len());
    table.extend_from_slice(&0u16.to_be_bytes());
    table.extend_from_slice(&num_tables.to_be_bytes());

    let mut pos = 4;
    for _ in 0..num_tables {
        let version = data.read_at::<u16>(pos)?;
        let length = data.read_at::<u16>(pos + 2)? as usize;
        let coverage = data.read_at::<u16>(pos + 4)?;
        if coverage >> 8 != 0 {
            return Err(refuse());
        }
        let pairs = kern_pairs(&data, pos + 6, glyphs)?;
        let (search_range, entry_selector, range_shift) = search_params(pairs.len());
        let new_length = 14 + pairs.len() * 6;
        table.extend_from_slice(&version.to_be_bytes());
        table.extend_from_slice(&((new_length & 0xFFFF) as u16).to_be_bytes());
        table.extend_from_slice(&coverage.to_be_bytes());
        for value in [pairs.len() as u16, search_range, entry_selector, range_shift] {
            table.extend_from_slice(&value.to_be_bytes());
        }
        for (left, right, value) in pairs {
            table.extend_from_slice(&left.to_be_bytes());
            table.extend_from_slice(&right.to_be_bytes());
            table.extend_from_slice(&value.to_be_bytes());
        }
        // The length field overflows on large subtables, so step over the
        // pairs actually present
        let old_pairs = data.read_at::<u16>(pos + 6)? as usize;
        pos += (14 + old_pairs * 6).max(length);
    }
    builder.add_raw(tag, table);
    Ok(())
}

fn kern_pairs(
    data: &FontData,
    start: usize,
    glyphs: &GlyphMap,
) -> Result<Vec<(u16, u16, i16)>, ReadError> {
    let count = data.read_at::<u16>(start)? as usize;
    let mut pairs = Vec::with_capacity(count);
    for i in 0..count {
        let at = start + 8 + i * 6;
        let left = GlyphId16::new(data.read_at::<u16>(at)?);
        let right = GlyphId16::new(data.read_at::<u16>(at + 2)?);
        let value = data.read_at::<i16>(at + 4)?;
        if let (Some(left), Some(right)) = (glyphs.get(left), glyphs.get(right)) {
            pairs.push((left.to_u16(), right.to_u16(), value));
        }
    }
    pairs.sort();
    Ok(pairs)
}

/// Binary search header fields for `count` six byte records
fn search_params(count: usize) -> (u16, u16, u16) {
    let mut power = 1usize;
    let mut selector = 0u16;
    while power * 2 <= count {
        power *= 2;
        selector += 1;
    }
    let search_range = power * 6;
    let range_shift = (count * 6).saturating_sub(search_range);
    (search_range as u16, selector, range_shift as u16)
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_trailing_advances_are_folded() {
        let (table, long) = write_metrics(&[(500, 10), (600, 20), (600, 30), (600, 40)]);
        assert_eq!(long, 2);
        assert_eq!(
            table,
            vec![1, 244, 0, 10, 2, 88, 0, 20, 0, 30, 0, 40]
        );
    }

    #[test]
    fn test_single_metric_stays_long() {
        let (table, long) = write_metrics(&[(500, -5)]);
        assert_eq!(long, 1);
        assert_eq!(table, vec![1, 244, 0xFF, 0xFB]);
    }

    #[rstest]
    #[case(0, (6, 0, 0))]
    #[case(1, (6, 0, 0))]
    #[case(5, (24, 2, 6))]
    #[case(8, (48, 3, 0))]
    fn test_search_params(#[case] count: usize, #[case] expected: (u16, u16, u16)) {
        assert_eq!(search_params(count), expected);
    }
}
