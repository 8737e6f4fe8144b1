#![allow(dead_code)]

use std::collections::BTreeMap;

use write_fonts::{
    tables::{
        cmap::Cmap,
        gpos::{Gpos, PairPos, PairSet, PairValueRecord, PositionLookup, PositionLookupList, ValueRecord},
        layout::{CoverageTable, Lookup, LookupFlag},
    },
    types::{GlyphId, GlyphId16, Tag},
    FontBuilder,
};

/// Characters and kerning added to a test font
#[derive(Default)]
pub struct Extras<'a> {
    /// Character to glyph id mappings for `cmap`
    pub cmap: &'a [(char, u16)],
    /// Left glyph, right glyph and advance adjustment, written both as a
    /// GPOS pair adjustment and as a `kern` table
    pub kerning: &'a [(u16, u16, i16)],
}

/// Outline shape of a glyph in a test font
pub enum TestGlyph {
    /// No outline data at all
    Empty,
    /// A one-point contour
    Simple,
    /// Components referring to these glyph ids
    Composite(Vec<u16>),
}

fn glyph_data(glyph: &TestGlyph) -> Vec<u8> {
    let mut data = vec![];
    match glyph {
        TestGlyph::Empty => {}
        TestGlyph::Simple => {
            data.extend_from_slice(&1i16.to_be_bytes());
            data.extend_from_slice(&[0; 8]);
            // endPtsOfContours, instructionLength, one on-curve point at 0,0
            data.extend_from_slice(&0u16.to_be_bytes());
            data.extend_from_slice(&0u16.to_be_bytes());
            data.push(0x31);
        }
        TestGlyph::Composite(components) => {
            data.extend_from_slice(&(-1i16).to_be_bytes());
            data.extend_from_slice(&[0; 8]);
            for (i, gid) in components.iter().enumerate() {
                // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES, plus MORE_COMPONENTS
                let mut flags: u16 = 0x0003;
                if i + 1 < components.len() {
                    flags |= 0x0020;
                }
                data.extend_from_slice(&flags.to_be_bytes());
                data.extend_from_slice(&gid.to_be_bytes());
                data.extend_from_slice(&[0; 4]);
            }
        }
    }
    while data.len() % 4 != 0 {
        data.push(0);
    }
    data
}

fn head(long_loca: bool) -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());
    head[50..52].copy_from_slice(&(long_loca as i16).to_be_bytes());
    head
}

fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut maxp = 0x0000_5000u32.to_be_bytes().to_vec();
    maxp.extend_from_slice(&num_glyphs.to_be_bytes());
    maxp
}

/// A version 2 `post` table; glyph 0 uses the standard `.notdef` name
fn post(names: &[&str]) -> Vec<u8> {
    let mut post = 0x0002_0000u32.to_be_bytes().to_vec();
    post.extend_from_slice(&[0; 28]);
    post.extend_from_slice(&(names.len() as u16).to_be_bytes());
    let mut strings = vec![];
    let mut custom = 0u16;
    for (gid, name) in names.iter().enumerate() {
        if gid == 0 && *name == ".notdef" {
            post.extend_from_slice(&0u16.to_be_bytes());
            continue;
        }
        post.extend_from_slice(&(258 + custom).to_be_bytes());
        custom += 1;
        strings.push(name.len() as u8);
        strings.extend_from_slice(name.as_bytes());
    }
    post.extend(strings);
    post
}

/// Advance of each glyph in test fonts
pub fn advance(gid: u16) -> u16 {
    100 * (gid + 1)
}

fn hhea(num_metrics: u16) -> Vec<u8> {
    let mut hhea = vec![0u8; 36];
    hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    hhea[34..36].copy_from_slice(&num_metrics.to_be_bytes());
    hhea
}

/// Every glyph gets its own advance, and its glyph id as side bearing
fn hmtx(num_glyphs: u16) -> Vec<u8> {
    let mut hmtx = vec![];
    for gid in 0..num_glyphs {
        hmtx.extend_from_slice(&advance(gid).to_be_bytes());
        hmtx.extend_from_slice(&(gid as i16).to_be_bytes());
    }
    hmtx
}

fn kern(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut kern = vec![0, 0, 0, 1];
    kern.extend_from_slice(&0u16.to_be_bytes());
    kern.extend_from_slice(&((14 + pairs.len() * 6) as u16).to_be_bytes());
    kern.extend_from_slice(&1u16.to_be_bytes());
    kern.extend_from_slice(&(pairs.len() as u16).to_be_bytes());
    kern.extend_from_slice(&[0; 6]);
    let mut pairs = pairs.to_vec();
    pairs.sort();
    for (left, right, value) in pairs {
        kern.extend_from_slice(&left.to_be_bytes());
        kern.extend_from_slice(&right.to_be_bytes());
        kern.extend_from_slice(&value.to_be_bytes());
    }
    kern
}

fn gpos(pairs: &[(u16, u16, i16)]) -> Gpos {
    let mut by_first: BTreeMap<u16, Vec<PairValueRecord>> = BTreeMap::new();
    for &(left, right, value) in pairs {
        by_first.entry(left).or_default().push(PairValueRecord::new(
            GlyphId16::new(right),
            ValueRecord::new().with_x_advance(value),
            ValueRecord::default(),
        ));
    }
    let coverage: CoverageTable = by_first.keys().map(|&g| GlyphId16::new(g)).collect();
    let sets = by_first
        .into_values()
        .map(|mut records| {
            records.sort_by_key(|r| r.second_glyph);
            PairSet::new(records)
        })
        .collect();
    Gpos::new(
        Default::default(),
        Default::default(),
        PositionLookupList::new(vec![PositionLookup::Pair(Lookup::new(
            LookupFlag::empty(),
            vec![PairPos::format_1(coverage, sets)],
        ))]),
    )
}

/// Build a minimal TrueType font with the given glyphs, in order
pub fn build_font(glyphs: &[(&str, TestGlyph)], long_loca: bool) -> Vec<u8> {
    build_font_with(glyphs, long_loca, Extras::default())
}

/// Build a minimal TrueType font with metrics, and optionally characters
/// and kerning
pub fn build_font_with(glyphs: &[(&str, TestGlyph)], long_loca: bool, extras: Extras) -> Vec<u8> {
    let mut glyf = vec![];
    let mut loca = vec![];
    let push_offset = |loca: &mut Vec<u8>, offset: usize| {
        if long_loca {
            loca.extend_from_slice(&(offset as u32).to_be_bytes());
        } else {
            loca.extend_from_slice(&((offset / 2) as u16).to_be_bytes());
        }
    };
    for (_, glyph) in glyphs {
        push_offset(&mut loca, glyf.len());
        glyf.extend(glyph_data(glyph));
    }
    push_offset(&mut loca, glyf.len());

    let names: Vec<&str> = glyphs.iter().map(|(name, _)| *name).collect();
    let mut builder = FontBuilder::new();
    builder.add_raw(Tag::new(b"head"), head(long_loca));
    builder.add_raw(Tag::new(b"maxp"), maxp(glyphs.len() as u16));
    builder.add_raw(Tag::new(b"post"), post(&names));
    builder.add_raw(Tag::new(b"glyf"), glyf);
    builder.add_raw(Tag::new(b"loca"), loca);
    builder.add_raw(Tag::new(b"hhea"), hhea(glyphs.len() as u16));
    builder.add_raw(Tag::new(b"hmtx"), hmtx(glyphs.len() as u16));
    if !extras.cmap.is_empty() {
        let cmap = Cmap::from_mappings(
            extras
                .cmap
                .iter()
                .map(|&(c, gid)| (c, GlyphId::new(gid as u32))),
        )
        .expect("cmap");
        builder.add_table(&cmap).expect("cmap");
    }
    if !extras.kerning.is_empty() {
        builder.add_table(&gpos(extras.kerning)).expect("GPOS");
        builder.add_raw(Tag::new(b"kern"), kern(extras.kerning));
    }
    builder.build()
}

/// `.notdef`, `A` built from `_comp1`, an unused `_comp2`, a simple `B`,
/// and `_comp1`
///
/// `A`, `B` and `_comp2` are mapped and kerned against each other.
pub fn shakeable_font(long_loca: bool) -> Vec<u8> {
    build_font_with(
        &[
            (".notdef", TestGlyph::Simple),
            ("A", TestGlyph::Composite(vec![4])),
            ("_comp2", TestGlyph::Simple),
            ("B", TestGlyph::Simple),
            ("_comp1", TestGlyph::Simple),
        ],
        long_loca,
        Extras {
            cmap: &[('A', 1), ('B', 3), ('\u{E000}', 2)],
            kerning: &[(1, 3, -50), (1, 2, -20), (2, 3, -10), (3, 1, -30)],
        },
    )
}
