use std::{collections::BTreeSet, collections::HashSet, fmt};

use regex::Regex;
use smol_str::SmolStr;

use crate::{
    filters::{FontFilter, RetainGlyphs, SubsetOptions},
    Font, GlyphTable, GlyphToolsError,
};

/// The outcome of a reachability analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShakeReport {
    /// Number of glyphs in the font
    pub total: usize,
    /// Number of glyphs matching the component predicate
    pub candidates: usize,
    /// Candidates which no non-candidate glyph reaches
    pub deletable: BTreeSet<SmolStr>,
    /// Everything else
    pub keep: BTreeSet<SmolStr>,
    /// Number of glyphs in the font after shaking
    ///
    /// This is the size of `keep` until the font is subset, and the glyph
    /// count of the subset font afterwards.
    pub remaining: usize,
}

impl fmt::Display for ShakeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total glyphs: {}", self.total)?;
        writeln!(f, "Component glyphs matched: {}", self.candidates)?;
        writeln!(f, "Deletable glyphs: {}", self.deletable.len())?;
        for glyph in &self.deletable {
            writeln!(f, "    {}", glyph)?;
        }
        write!(f, "Glyphs after shaking: {}", self.remaining)
    }
}

/// Work out which candidate glyphs no non-candidate glyph uses
///
/// Every non-candidate glyph is the root of a walk through its composite
/// references. Candidates met on the way are needed; the rest can go. Each
/// glyph is expanded at most once, so cyclic composites terminate.
pub fn compute_deletable(glyphs: &GlyphTable, is_candidate: impl Fn(&str) -> bool) -> ShakeReport {
    let candidates: BTreeSet<SmolStr> = glyphs
        .names()
        .filter(|name| is_candidate(name))
        .cloned()
        .collect();

    let mut needed: HashSet<&SmolStr> = HashSet::new();
    let mut visited: HashSet<&SmolStr> = HashSet::new();
    let mut stack: Vec<&SmolStr> = Vec::new();
    for root in glyphs.names().filter(|name| !candidates.contains(*name)) {
        stack.push(root);
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if candidates.contains(current) {
                needed.insert(current);
            }
            let Some(definition) = glyphs.get(current) else {
                log::warn!("Component {} is not in the glyph set, ignoring", current);
                continue;
            };
            for component in definition.components().iter().rev() {
                log::debug!("{} uses {}", current, component);
                if !visited.contains(component) {
                    stack.push(component);
                }
            }
        }
    }

    let deletable: BTreeSet<SmolStr> = candidates
        .iter()
        .filter(|name| !needed.contains(name))
        .cloned()
        .collect();
    let keep: BTreeSet<SmolStr> = glyphs
        .names()
        .filter(|name| !deletable.contains(*name))
        .cloned()
        .collect();
    ShakeReport {
        total: glyphs.len(),
        candidates: candidates.len(),
        remaining: keep.len(),
        deletable,
        keep,
    }
}

/// A filter that removes component glyphs no other glyph refers to
pub struct ShakeComponents {
    component_pattern: Regex,
    options: SubsetOptions,
}

impl ShakeComponents {
    /// Create a new filter; glyphs whose names match `component_pattern`
    /// anywhere are the candidates for removal
    pub fn new(component_pattern: Regex) -> Self {
        ShakeComponents {
            component_pattern,
            options: SubsetOptions::default(),
        }
    }

    /// Replace the options handed on to the subsetter
    pub fn with_options(mut self, options: SubsetOptions) -> Self {
        self.options = options;
        self
    }

    /// Analyse a font without changing it
    pub fn shake(&self, font: &Font) -> Result<ShakeReport, GlyphToolsError> {
        let glyphs = font.glyph_table()?;
        let report = compute_deletable(&glyphs, |name| self.component_pattern.is_match(name));
        log::info!(
            "{}: {} of {} component glyphs are unreferenced",
            font.display_name(),
            report.deletable.len(),
            report.candidates
        );
        Ok(report)
    }

    /// Analyse a font and subset it down to the glyphs it still needs
    pub fn shake_and_apply(&self, font: &mut Font) -> Result<ShakeReport, GlyphToolsError> {
        let mut report = self.shake(font)?;
        RetainGlyphs::new(report.keep.iter().cloned())
            .with_options(self.options.clone())
            .apply(font)?;
        report.remaining = font.glyph_order().len();
        Ok(report)
    }
}

impl FontFilter for ShakeComponents {
    fn apply(&self, font: &mut Font) -> Result<(), GlyphToolsError> {
        self.shake_and_apply(font).map(|_| ())
    }

    fn from_str(s: &str) -> Result<Self, GlyphToolsError>
    where
        Self: Sized,
    {
        Ok(ShakeComponents::new(Regex::new(s)?))
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlyphDefinition;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn composite(components: &[&str]) -> GlyphDefinition {
        GlyphDefinition::Composite(components.iter().map(|c| SmolStr::new(c)).collect())
    }

    fn underscore(name: &str) -> bool {
        name.starts_with('_')
    }

    fn set(names: &[&str]) -> BTreeSet<SmolStr> {
        names.iter().map(|n| SmolStr::new(n)).collect()
    }

    #[test]
    fn test_unreferenced_component_is_deletable() {
        let glyphs: GlyphTable = [
            ("A", composite(&["_comp1"])),
            ("B", GlyphDefinition::Simple),
            ("_comp1", GlyphDefinition::Simple),
            ("_comp2", GlyphDefinition::Simple),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(report.deletable, set(&["_comp2"]));
        assert_eq!(report.keep, set(&["A", "B", "_comp1"]));
        assert_eq!(report.total, 4);
        assert_eq!(report.candidates, 2);
    }

    #[test]
    fn test_nested_components_are_followed() {
        let glyphs: GlyphTable = [
            ("Aacute", composite(&["A", "_acute"])),
            ("A", composite(&["_stem", "_bar"])),
            ("_acute", composite(&["_dot"])),
            ("_stem", GlyphDefinition::Simple),
            ("_bar", composite(&["_serif"])),
            ("_serif", GlyphDefinition::Simple),
            ("_dot", GlyphDefinition::Simple),
            ("_orphan", composite(&["_orphan2"])),
            ("_orphan2", GlyphDefinition::Simple),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(report.deletable, set(&["_orphan", "_orphan2"]));
    }

    #[test]
    fn test_candidate_only_reachable_from_candidate_is_deletable() {
        let glyphs: GlyphTable = [
            ("_a", composite(&["_b"])),
            ("_b", GlyphDefinition::Simple),
            ("c", GlyphDefinition::Simple),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(report.deletable, set(&["_a", "_b"]));
        assert_eq!(report.keep, set(&["c"]));
    }

    #[test]
    fn test_cycles_terminate() {
        let glyphs: GlyphTable = [
            ("A", composite(&["_x"])),
            ("_x", composite(&["_y", "_x"])),
            ("_y", composite(&["_x", "A"])),
            ("_z", composite(&["_z"])),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(report.deletable, set(&["_z"]));
        assert_eq!(report.keep, set(&["A", "_x", "_y"]));
    }

    #[test]
    fn test_dangling_reference_is_ignored() {
        let glyphs: GlyphTable = [("A", composite(&["_missing"])), ("_c", GlyphDefinition::Simple)]
            .into_iter()
            .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(report.deletable, set(&["_c"]));
        assert_eq!(report.keep, set(&["A"]));
    }

    #[rstest]
    #[case("^_")]
    #[case("comp")]
    #[case("^[AB]$")]
    #[case("^$")]
    fn test_partition_and_idempotence(#[case] pattern: &str) {
        let regex = Regex::new(pattern).unwrap();
        let glyphs: GlyphTable = [
            ("A", composite(&["_comp1"])),
            ("B", composite(&["A"])),
            ("_comp1", composite(&["_comp3"])),
            ("_comp2", GlyphDefinition::Simple),
            ("_comp3", GlyphDefinition::Simple),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, |n| regex.is_match(n));
        let all: BTreeSet<SmolStr> = glyphs.names().cloned().collect();
        assert!(report.keep.is_disjoint(&report.deletable));
        assert_eq!(
            report.keep.union(&report.deletable).cloned().collect::<BTreeSet<_>>(),
            all
        );
        assert!(report.deletable.iter().all(|g| regex.is_match(g)));
        assert_eq!(report, compute_deletable(&glyphs, |n| regex.is_match(n)));
    }

    #[test]
    fn test_report_display() {
        let glyphs: GlyphTable = [
            ("A", GlyphDefinition::Simple),
            ("_b", GlyphDefinition::Simple),
            ("_a", GlyphDefinition::Simple),
        ]
        .into_iter()
        .collect();
        let report = compute_deletable(&glyphs, underscore);
        assert_eq!(
            report.to_string(),
            "Total glyphs: 3\nComponent glyphs matched: 2\nDeletable glyphs: 2\n    _a\n    _b\nGlyphs after shaking: 1"
        );
    }

    #[test]
    fn test_from_str_rejects_bad_regex() {
        assert!(matches!(
            ShakeComponents::from_str("("),
            Err(GlyphToolsError::Regex(_))
        ));
    }
}
