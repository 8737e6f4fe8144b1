//! Glyph id remapping for the OpenType layout tables
//!
//! Lookups and subtables are never removed, even when they end up covering
//! nothing, so lookup indices in features and nested lookup records stay
//! valid. Class-indexed data is left alone: only the class definitions
//! change.

use write_fonts::{
    tables::{
        gdef::Gdef,
        gpos::{
            self, CursivePosFormat1, Gpos, MarkBasePosFormat1, MarkLigPosFormat1,
            MarkMarkPosFormat1, PairPos, PositionChainContext, PositionLookup,
            PositionSequenceContext, SinglePos,
        },
        gsub::{
            self, AlternateSubstFormat1, Gsub, LigatureSubstFormat1, MultipleSubstFormat1,
            ReverseChainSingleSubstFormat1, SingleSubst, SubstitutionChainContext,
            SubstitutionLookup, SubstitutionSequenceContext,
        },
        layout::{ChainedSequenceContext, CoverageTable, Lookup, SequenceContext},
    },
    types::GlyphId16,
};

use super::GlyphMap;

/// Tables and subtables which refer to glyphs by id
pub(crate) trait Remap {
    /// Rewrite every glyph id, forgetting data for glyphs that are gone
    fn remap(&mut self, glyphs: &GlyphMap);
}

fn remap_one(glyphs: &GlyphMap, glyph: &mut GlyphId16) -> bool {
    match glyphs.get(*glyph) {
        Some(new) => {
            *glyph = new;
            true
        }
        None => false,
    }
}

fn remap_coverages<'a>(
    glyphs: &GlyphMap,
    coverages: impl IntoIterator<Item = &'a mut CoverageTable>,
) {
    for coverage in coverages {
        glyphs.remap_coverage(coverage);
    }
}

impl Remap for Gdef {
    fn remap(&mut self, glyphs: &GlyphMap) {
        if let Some(class_def) = self.glyph_class_def.as_mut() {
            glyphs.remap_class_def(class_def);
        }
        if let Some(attach_list) = self.attach_list.as_mut() {
            glyphs.retain_covered(
                &mut attach_list.coverage,
                &mut attach_list.attach_points,
                |_| true,
            );
        }
        if let Some(lig_caret_list) = self.lig_caret_list.as_mut() {
            glyphs.retain_covered(
                &mut lig_caret_list.coverage,
                &mut lig_caret_list.lig_glyphs,
                |_| true,
            );
        }
        if let Some(class_def) = self.mark_attach_class_def.as_mut() {
            glyphs.remap_class_def(class_def);
        }
        if let Some(sets) = self.mark_glyph_sets_def.as_mut() {
            remap_coverages(glyphs, sets.coverages.iter_mut().map(|c| &mut **c));
        }
    }
}

impl<T: Remap> Remap for Lookup<T> {
    fn remap(&mut self, glyphs: &GlyphMap) {
        for subtable in self.subtables.iter_mut() {
            subtable.remap(glyphs);
        }
    }
}

impl Remap for Gsub {
    fn remap(&mut self, glyphs: &GlyphMap) {
        for lookup in self.lookup_list.lookups.iter_mut() {
            lookup.remap(glyphs);
        }
    }
}

impl Remap for Gpos {
    fn remap(&mut self, glyphs: &GlyphMap) {
        for lookup in self.lookup_list.lookups.iter_mut() {
            lookup.remap(glyphs);
        }
    }
}

impl Remap for SubstitutionLookup {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            SubstitutionLookup::Single(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Multiple(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Alternate(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Ligature(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Contextual(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::ChainContextual(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Extension(lookup) => lookup.remap(glyphs),
            SubstitutionLookup::Reverse(lookup) => lookup.remap(glyphs),
        }
    }
}

impl Remap for gsub::ExtensionSubtable {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            gsub::ExtensionSubtable::Single(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::Multiple(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::Alternate(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::Ligature(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::Contextual(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::ChainContextual(ext) => ext.extension.remap(glyphs),
            gsub::ExtensionSubtable::Reverse(ext) => ext.extension.remap(glyphs),
        }
    }
}

impl Remap for SingleSubst {
    /// The surviving pairs are written as format 1 if they share a delta,
    /// format 2 otherwise.
    fn remap(&mut self, glyphs: &GlyphMap) {
        let pairs: Vec<(GlyphId16, GlyphId16)> = match self {
            SingleSubst::Format1(sub) => sub
                .coverage
                .iter()
                .map(|g| {
                    let target = (g.to_u16() as i32 + sub.delta_glyph_id as i32) as u16;
                    (g, GlyphId16::new(target))
                })
                .collect(),
            SingleSubst::Format2(sub) => sub
                .coverage
                .iter()
                .zip(sub.substitute_glyph_ids.iter().copied())
                .collect(),
        };
        let pairs: Vec<(GlyphId16, GlyphId16)> = pairs
            .into_iter()
            .filter_map(|(from, to)| Some((glyphs.get(from)?, glyphs.get(to)?)))
            .collect();
        let delta = |(from, to): &(GlyphId16, GlyphId16)| to.to_u16().wrapping_sub(from.to_u16());
        let coverage: CoverageTable = pairs.iter().map(|(from, _)| *from).collect();
        *self = match pairs.first().map(delta) {
            Some(first) if pairs.iter().all(|p| delta(p) == first) => {
                SingleSubst::format_1(coverage, first as i16)
            }
            _ => SingleSubst::format_2(coverage, pairs.iter().map(|(_, to)| *to).collect()),
        };
    }
}

impl Remap for MultipleSubstFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(&mut self.coverage, &mut self.sequences, |sequence| {
            glyphs.remap_all(&mut sequence.substitute_glyph_ids)
        });
    }
}

impl Remap for AlternateSubstFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(&mut self.coverage, &mut self.alternate_sets, |set| {
            glyphs.remap_some(&mut set.alternate_glyph_ids);
            !set.alternate_glyph_ids.is_empty()
        });
    }
}

impl Remap for LigatureSubstFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(&mut self.coverage, &mut self.ligature_sets, |set| {
            set.ligatures.retain_mut(|ligature| {
                remap_one(glyphs, &mut ligature.ligature_glyph)
                    && glyphs.remap_all(&mut ligature.component_glyph_ids)
            });
            !set.ligatures.is_empty()
        });
    }
}

impl Remap for ReverseChainSingleSubstFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(
            &mut self.coverage,
            &mut self.substitute_glyph_ids,
            |substitute| remap_one(glyphs, substitute),
        );
        remap_coverages(
            glyphs,
            self.backtrack_coverages
                .iter_mut()
                .chain(self.lookahead_coverages.iter_mut())
                .map(|c| &mut **c),
        );
    }
}

impl Remap for SequenceContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            SequenceContext::Format1(context) => {
                glyphs.retain_covered(&mut context.coverage, &mut context.seq_rule_sets, |set| {
                    if let Some(set) = set.as_mut() {
                        set.seq_rules
                            .retain_mut(|rule| glyphs.remap_all(&mut rule.input_sequence));
                    }
                    true
                });
            }
            SequenceContext::Format2(context) => {
                glyphs.remap_coverage(&mut context.coverage);
                glyphs.remap_class_def(&mut context.class_def);
            }
            SequenceContext::Format3(context) => {
                remap_coverages(glyphs, context.coverages.iter_mut().map(|c| &mut **c));
            }
        }
    }
}

impl Remap for ChainedSequenceContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            ChainedSequenceContext::Format1(context) => {
                glyphs.retain_covered(
                    &mut context.coverage,
                    &mut context.chained_seq_rule_sets,
                    |set| {
                        if let Some(set) = set.as_mut() {
                            set.chained_seq_rules.retain_mut(|rule| {
                                glyphs.remap_all(&mut rule.backtrack_sequence)
                                    && glyphs.remap_all(&mut rule.input_sequence)
                                    && glyphs.remap_all(&mut rule.lookahead_sequence)
                            });
                        }
                        true
                    },
                );
            }
            ChainedSequenceContext::Format2(context) => {
                glyphs.remap_coverage(&mut context.coverage);
                glyphs.remap_class_def(&mut context.backtrack_class_def);
                glyphs.remap_class_def(&mut context.input_class_def);
                glyphs.remap_class_def(&mut context.lookahead_class_def);
            }
            ChainedSequenceContext::Format3(context) => {
                remap_coverages(
                    glyphs,
                    context
                        .backtrack_coverages
                        .iter_mut()
                        .chain(context.input_coverages.iter_mut())
                        .chain(context.lookahead_coverages.iter_mut())
                        .map(|c| &mut **c),
                );
            }
        }
    }
}

impl Remap for SubstitutionSequenceContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        (**self).remap(glyphs)
    }
}

impl Remap for SubstitutionChainContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        (**self).remap(glyphs)
    }
}

impl Remap for PositionSequenceContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        (**self).remap(glyphs)
    }
}

impl Remap for PositionChainContext {
    fn remap(&mut self, glyphs: &GlyphMap) {
        (**self).remap(glyphs)
    }
}

impl Remap for PositionLookup {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            PositionLookup::Single(lookup) => lookup.remap(glyphs),
            PositionLookup::Pair(lookup) => lookup.remap(glyphs),
            PositionLookup::Cursive(lookup) => lookup.remap(glyphs),
            PositionLookup::MarkToBase(lookup) => lookup.remap(glyphs),
            PositionLookup::MarkToLig(lookup) => lookup.remap(glyphs),
            PositionLookup::MarkToMark(lookup) => lookup.remap(glyphs),
            PositionLookup::Contextual(lookup) => lookup.remap(glyphs),
            PositionLookup::ChainContextual(lookup) => lookup.remap(glyphs),
            PositionLookup::Extension(lookup) => lookup.remap(glyphs),
        }
    }
}

impl Remap for gpos::ExtensionSubtable {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            gpos::ExtensionSubtable::Single(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::Pair(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::Cursive(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::MarkToBase(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::MarkToLig(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::MarkToMark(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::Contextual(ext) => ext.extension.remap(glyphs),
            gpos::ExtensionSubtable::ChainContextual(ext) => ext.extension.remap(glyphs),
        }
    }
}

impl Remap for SinglePos {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            SinglePos::Format1(pos) => glyphs.remap_coverage(&mut pos.coverage),
            SinglePos::Format2(pos) => {
                glyphs.retain_covered(&mut pos.coverage, &mut pos.value_records, |_| true)
            }
        }
    }
}

impl Remap for PairPos {
    fn remap(&mut self, glyphs: &GlyphMap) {
        match self {
            PairPos::Format1(pos) => {
                glyphs.retain_covered(&mut pos.coverage, &mut pos.pair_sets, |set| {
                    set.pair_value_records
                        .retain_mut(|record| remap_one(glyphs, &mut record.second_glyph));
                    !set.pair_value_records.is_empty()
                });
            }
            PairPos::Format2(pos) => {
                glyphs.remap_coverage(&mut pos.coverage);
                glyphs.remap_class_def(&mut pos.class_def1);
                glyphs.remap_class_def(&mut pos.class_def2);
            }
        }
    }
}

impl Remap for CursivePosFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(&mut self.coverage, &mut self.entry_exit_record, |_| true);
    }
}

impl Remap for MarkBasePosFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(
            &mut self.mark_coverage,
            &mut self.mark_array.mark_records,
            |_| true,
        );
        glyphs.retain_covered(
            &mut self.base_coverage,
            &mut self.base_array.base_records,
            |_| true,
        );
    }
}

impl Remap for MarkLigPosFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(
            &mut self.mark_coverage,
            &mut self.mark_array.mark_records,
            |_| true,
        );
        glyphs.retain_covered(
            &mut self.ligature_coverage,
            &mut self.ligature_array.ligature_attaches,
            |_| true,
        );
    }
}

impl Remap for MarkMarkPosFormat1 {
    fn remap(&mut self, glyphs: &GlyphMap) {
        glyphs.retain_covered(
            &mut self.mark1_coverage,
            &mut self.mark1_array.mark_records,
            |_| true,
        );
        glyphs.retain_covered(
            &mut self.mark2_coverage,
            &mut self.mark2_array.mark2_records,
            |_| true,
        );
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use write_fonts::tables::{
        gpos::{PairSet, PairValueRecord, ValueRecord},
        gsub::{Ligature, LigatureSet},
        layout::LookupFlag,
    };

    fn gid(id: u16) -> GlyphId16 {
        GlyphId16::new(id)
    }

    fn coverage(ids: &[u16]) -> CoverageTable {
        ids.iter().map(|&g| gid(g)).collect()
    }

    fn covered(coverage: &CoverageTable) -> Vec<u16> {
        coverage.iter().map(|g| g.to_u16()).collect()
    }

    // Glyphs 1, 3 and 6 are dropped from a nine glyph font
    fn shaken() -> GlyphMap {
        GlyphMap::new(9, &[0, 2, 4, 5, 7, 8].into_iter().collect())
    }

    #[test]
    fn test_single_subst_keeps_shared_delta() {
        // 2->4 and 5->7 become 1->2 and 3->4
        let mut subst = SingleSubst::format_2(coverage(&[2, 3, 5]), vec![gid(4), gid(4), gid(7)]);
        subst.remap(&shaken());
        match subst {
            SingleSubst::Format1(sub) => {
                assert_eq!(covered(&sub.coverage), vec![1, 3]);
                assert_eq!(sub.delta_glyph_id, 1);
            }
            other => panic!("expected format 1, got {other:?}"),
        }
    }

    #[test]
    fn test_single_subst_is_reencoded_by_delta() {
        // 2->5 survives as 1->3 and 4->7 as 2->4, while 6 is gone
        let mut subst = SingleSubst::format_1(coverage(&[2, 4, 6]), 3);
        subst.remap(&shaken());
        match subst {
            SingleSubst::Format1(sub) => {
                assert_eq!(covered(&sub.coverage), vec![1, 2]);
                assert_eq!(sub.delta_glyph_id, 2);
            }
            other => panic!("expected format 1, got {other:?}"),
        }
        let mut subst = SingleSubst::format_2(coverage(&[2, 4]), vec![gid(8), gid(5)]);
        subst.remap(&shaken());
        match subst {
            SingleSubst::Format2(sub) => {
                assert_eq!(covered(&sub.coverage), vec![1, 2]);
                assert_eq!(sub.substitute_glyph_ids, vec![gid(5), gid(3)]);
            }
            other => panic!("expected format 2, got {other:?}"),
        }
    }

    #[test]
    fn test_ligatures_with_dropped_components_go() {
        let mut subst = LigatureSubstFormat1::new(
            coverage(&[2, 3]),
            vec![
                LigatureSet::new(vec![
                    Ligature::new(gid(8), vec![gid(4)]),
                    Ligature::new(gid(8), vec![gid(6)]),
                ]),
                LigatureSet::new(vec![Ligature::new(gid(7), vec![gid(2)])]),
            ],
        );
        subst.remap(&shaken());
        assert_eq!(covered(&subst.coverage), vec![1]);
        assert_eq!(subst.ligature_sets.len(), 1);
        let ligatures = &subst.ligature_sets[0].ligatures;
        assert_eq!(ligatures.len(), 1);
        assert_eq!(ligatures[0].ligature_glyph, gid(5));
        assert_eq!(ligatures[0].component_glyph_ids, vec![gid(2)]);
    }

    #[test]
    fn test_pair_pos_drops_pairs_with_either_glyph() {
        let kern = |second: u16| {
            PairValueRecord::new(
                gid(second),
                ValueRecord::new().with_x_advance(-50),
                ValueRecord::default(),
            )
        };
        let mut pos = PairPos::format_1(
            coverage(&[1, 2, 4]),
            vec![
                PairSet::new(vec![kern(2)]),
                PairSet::new(vec![kern(3), kern(4)]),
                PairSet::new(vec![kern(6)]),
            ],
        );
        pos.remap(&shaken());
        match pos {
            PairPos::Format1(pos) => {
                assert_eq!(covered(&pos.coverage), vec![1]);
                assert_eq!(pos.pair_sets.len(), 1);
                let seconds: Vec<GlyphId16> = pos.pair_sets[0]
                    .pair_value_records
                    .iter()
                    .map(|r| r.second_glyph)
                    .collect();
                assert_eq!(seconds, vec![gid(2)]);
            }
            other => panic!("expected format 1, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_lookups_are_kept() {
        let mut gsub = Gsub::new(
            Default::default(),
            Default::default(),
            gsub::SubstitutionLookupList::new(vec![
                SubstitutionLookup::Single(Lookup::new(
                    LookupFlag::empty(),
                    vec![SingleSubst::format_1(coverage(&[1]), 2)],
                )),
                SubstitutionLookup::Single(Lookup::new(
                    LookupFlag::empty(),
                    vec![SingleSubst::format_1(coverage(&[2]), 2)],
                )),
            ]),
        );
        gsub.remap(&shaken());
        assert_eq!(gsub.lookup_list.lookups.len(), 2);
        match &*gsub.lookup_list.lookups[1] {
            SubstitutionLookup::Single(lookup) => match &*lookup.subtables[0] {
                SingleSubst::Format1(sub) => {
                    assert_eq!(covered(&sub.coverage), vec![1]);
                    assert_eq!(sub.delta_glyph_id, 1);
                }
                other => panic!("expected format 1, got {other:?}"),
            },
            other => panic!("expected a single lookup, got {other:?}"),
        }
    }
}
