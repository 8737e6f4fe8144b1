use std::{
    collections::HashMap,
    ops::Range,
    path::{Path, PathBuf},
};

use fea_rs_ast::{AsFea, FeatureFile, GlyphContainer, LayoutVisitor, Statement as FeaStatement, SubOrPos};
use smol_str::SmolStr;

use crate::{
    layout::{
        pattern::{GlyphPattern, MalformedPattern},
        rules::{ChainKind, Lookup, RuleSet, Statement, StatementKind},
    },
    Font, GlyphToolsError,
};

/// Parse feature-file source into lookups the tracer can replay
///
/// `glyph_names` lets the parser tell hyphenated glyph names from glyph
/// ranges; `path` is used to resolve `include` statements.
pub fn parse_rules(
    source: &str,
    glyph_names: Option<&[&str]>,
    path: Option<PathBuf>,
) -> Result<RuleSet, GlyphToolsError> {
    let mut feature_file = FeatureFile::new_from_fea(source, glyph_names, path)
        .map_err(|e| GlyphToolsError::FeatureParse(e.to_string()))?;
    let mut collector = RuleCollector::new(source);
    collector.visit(&mut feature_file).map_err(|e| {
        GlyphToolsError::FeatureParse(format!("Error while collecting lookups: {}", e))
    })?;
    log::debug!("Found {} lookups", collector.lookups.len());
    Ok(RuleSet {
        lookups: collector.lookups,
    })
}

/// Read and parse a feature file, naming glyphs after `font` if given
pub fn load_rules(path: &Path, font: Option<&Font>) -> Result<RuleSet, GlyphToolsError> {
    let source = std::fs::read_to_string(path)?;
    let reverse_map = font.map(Font::reverse_glyph_map);
    let glyph_names: Option<Vec<&str>> = reverse_map
        .as_ref()
        .map(|names| names.keys().map(|g| g.as_str()).collect());
    parse_rules(&source, glyph_names.as_deref(), Some(path.to_path_buf()))
}

struct RuleCollector {
    line_starts: Vec<usize>,
    classes: HashMap<SmolStr, Result<Vec<SmolStr>, MalformedPattern>>,
    lookups: Vec<Lookup>,
}

impl RuleCollector {
    fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        RuleCollector {
            line_starts,
            classes: HashMap::new(),
            lookups: vec![],
        }
    }

    fn line(&self, location: &Range<usize>) -> Option<usize> {
        if location.is_empty() {
            return None;
        }
        Some(self.line_starts.partition_point(|&start| start <= location.start))
    }

    fn class(&self, name: &str) -> Result<Vec<SmolStr>, MalformedPattern> {
        let name = name.trim_start_matches('@');
        self.classes
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(MalformedPattern::UndefinedClass(name.into())))
    }

    fn members(&self, container: &GlyphContainer) -> Result<Vec<SmolStr>, MalformedPattern> {
        match container {
            GlyphContainer::GlyphName(glyph_name) => Ok(vec![glyph_name.name.clone()]),
            GlyphContainer::GlyphNameOrRange(name) => Ok(vec![name.clone()]),
            GlyphContainer::GlyphRange(range) => Ok(range.glyphset().collect()),
            GlyphContainer::GlyphClassName(name) => self.class(name),
            GlyphContainer::GlyphClass(glyph_class) => {
                let mut glyphs = vec![];
                for gc in glyph_class.glyphs.iter() {
                    glyphs.extend(self.members(gc)?);
                }
                Ok(glyphs)
            }
        }
    }

    fn pattern(&self, container: &GlyphContainer) -> Result<GlyphPattern, MalformedPattern> {
        match container {
            GlyphContainer::GlyphName(glyph_name) => Ok(GlyphPattern::Glyph(glyph_name.name.clone())),
            // Treated as a literal glyph name
            GlyphContainer::GlyphNameOrRange(name) => Ok(GlyphPattern::Glyph(name.clone())),
            GlyphContainer::GlyphClassName(name) => Ok(GlyphPattern::NamedClass {
                name: name.trim_start_matches('@').into(),
                glyphs: self.class(name)?,
            }),
            GlyphContainer::GlyphClass(_) => Ok(GlyphPattern::InlineClass(self.members(container)?)),
            GlyphContainer::GlyphRange(_) => {
                Err(MalformedPattern::Unrecognized(container.as_fea("")))
            }
        }
    }

    fn patterns(&self, containers: &[GlyphContainer]) -> Result<Vec<GlyphPattern>, MalformedPattern> {
        containers.iter().map(|gc| self.pattern(gc)).collect()
    }

    fn single_pos(
        &self,
        statement: &fea_rs_ast::SinglePosStatement,
    ) -> Result<StatementKind, MalformedPattern> {
        let pos = statement
            .pos
            .iter()
            .map(|(gc, value_record)| {
                let adjustment = value_record
                    .as_ref()
                    .map(|vr| vr.as_fea(""))
                    .unwrap_or_else(|| "<NULL>".to_string());
                Ok((self.pattern(gc)?, adjustment))
            })
            .collect::<Result<Vec<_>, MalformedPattern>>()?;
        if statement.force_chain || !statement.prefix.is_empty() || !statement.suffix.is_empty() {
            Ok(StatementKind::ForcedChainSinglePos {
                prefix: self.patterns(&statement.prefix)?,
                pos,
                suffix: self.patterns(&statement.suffix)?,
            })
        } else {
            Ok(StatementKind::SinglePos(pos))
        }
    }

    fn pair_pos(
        &self,
        statement: &fea_rs_ast::PairPosStatement,
    ) -> Result<StatementKind, MalformedPattern> {
        Ok(StatementKind::PairPos {
            first: self.pattern(&statement.glyphs_1)?,
            second: self.pattern(&statement.glyphs_2)?,
        })
    }

    fn chained_context<T: SubOrPos>(
        &self,
        kind: ChainKind,
        statement: &fea_rs_ast::ChainedContextStatement<T>,
    ) -> Result<StatementKind, MalformedPattern> {
        Ok(StatementKind::ChainContext {
            kind,
            prefix: self.patterns(&statement.prefix)?,
            glyphs: self.patterns(&statement.glyphs)?,
            suffix: self.patterns(&statement.suffix)?,
            lookups: statement
                .lookups
                .iter()
                .map(|lookupset| lookupset.iter().cloned().collect())
                .collect(),
        })
    }

    fn lower(&self, statement: &FeaStatement) -> Option<Statement> {
        let (location, kind) = match statement {
            FeaStatement::SinglePos(sp) => (Some(&sp.location), self.single_pos(sp)),
            FeaStatement::PairPos(pp) => (Some(&pp.location), self.pair_pos(pp)),
            FeaStatement::ChainedContextSubst(cc) => {
                (Some(&cc.location), self.chained_context(ChainKind::Subst, cc))
            }
            FeaStatement::ChainedContextPos(cc) => {
                (Some(&cc.location), self.chained_context(ChainKind::Pos, cc))
            }
            FeaStatement::Comment(_) | FeaStatement::GlyphClassDefinition(_) => return None,
            other => (None, Ok(StatementKind::Unsupported(statement_type(other)))),
        };
        Some(Statement {
            line: location.and_then(|l| self.line(l)),
            text: statement.as_fea(""),
            kind: kind.unwrap_or_else(StatementKind::Malformed),
        })
    }

    fn collect_class(&mut self, definition: &fea_rs_ast::GlyphClassDefinition) {
        let name = SmolStr::new(definition.name.trim_start_matches('@'));
        let mut members = Ok(vec![]);
        for gc in definition.glyphs.glyphs.iter() {
            members = members.and_then(|mut glyphs: Vec<SmolStr>| {
                glyphs.extend(self.members(gc)?);
                Ok(glyphs)
            });
        }
        self.classes.insert(name, members);
    }

    fn collect_lookup(&mut self, block: &fea_rs_ast::LookupBlock) {
        let statements: Vec<Statement> = block
            .statements
            .iter()
            .filter_map(|statement| self.lower(statement))
            .collect();
        log::debug!(
            "Lookup {} has {} statements",
            block.name,
            statements.len()
        );
        self.lookups.push(Lookup {
            name: block.name.clone(),
            statements,
        });
    }
}

fn statement_type(statement: &FeaStatement) -> &'static str {
    match statement {
        FeaStatement::SingleSubst(_) => "SingleSubst",
        FeaStatement::MultipleSubst(_) => "MultipleSubst",
        FeaStatement::AlternateSubst(_) => "AlternateSubst",
        FeaStatement::LigatureSubst(_) => "LigatureSubst",
        FeaStatement::ReverseChainSubst(_) => "ReverseChainSubst",
        FeaStatement::IgnoreSubst(_) => "IgnoreSubst",
        FeaStatement::IgnorePos(_) => "IgnorePos",
        FeaStatement::CursivePos(_) => "CursivePos",
        FeaStatement::MarkBasePos(_) => "MarkBasePos",
        FeaStatement::MarkLigPos(_) => "MarkLigPos",
        FeaStatement::MarkMarkPos(_) => "MarkMarkPos",
        FeaStatement::LookupFlag(_) => "LookupFlag",
        FeaStatement::LookupReference(_) => "LookupReference",
        FeaStatement::Subtable(_) => "Subtable",
        FeaStatement::MarkClassDefinition(_) => "MarkClassDefinition",
        FeaStatement::LookupBlock(_) => "LookupBlock",
        _ => "other",
    }
}

impl LayoutVisitor for RuleCollector {
    // Children first, so a lookup's own class definitions are known before
    // its statements are lowered.
    fn depth_first(&self) -> bool {
        true
    }
    fn visit_statement(&mut self, statement: &mut FeaStatement) -> bool {
        match statement {
            FeaStatement::GlyphClassDefinition(definition) => self.collect_class(definition),
            FeaStatement::LookupBlock(block) => self.collect_lookup(block),
            _ => {}
        }
        true
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lowering() {
        let rules = parse_rules(
            "@caps = [A B];\n\
             lookup other {\n\
             \x20 sub a by b;\n\
             } other;\n\
             lookup kern {\n\
             \x20 pos x 10;\n\
             \x20 pos @caps [a b] -20;\n\
             \x20 sub a' lookup other b;\n\
             \x20 sub a by b;\n\
             } kern;\n",
            None,
            None,
        )
        .unwrap();
        let names: Vec<&str> = rules.lookups.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["other", "kern"]);

        let kern = rules.lookup("kern").unwrap();
        assert_eq!(kern.statements.len(), 4);
        assert_eq!(kern.statements[0].line, Some(6));
        assert!(matches!(
            &kern.statements[0].kind,
            StatementKind::SinglePos(pos)
                if pos.len() == 1 && pos[0].0 == GlyphPattern::Glyph("x".into())
        ));
        assert_eq!(
            kern.statements[1].kind,
            StatementKind::PairPos {
                first: GlyphPattern::NamedClass {
                    name: "caps".into(),
                    glyphs: vec!["A".into(), "B".into()],
                },
                second: GlyphPattern::InlineClass(vec!["a".into(), "b".into()]),
            }
        );
        assert_eq!(kern.statements[2].line, Some(8));
        assert_eq!(
            kern.statements[2].kind,
            StatementKind::ChainContext {
                kind: ChainKind::Subst,
                prefix: vec![],
                glyphs: vec![GlyphPattern::Glyph("a".into())],
                suffix: vec![GlyphPattern::Glyph("b".into())],
                lookups: vec![vec!["other".into()]],
            }
        );
        assert_eq!(
            kern.statements[3].kind,
            StatementKind::Unsupported("SingleSubst")
        );
    }

    #[test]
    fn test_lookups_inside_features_are_collected() {
        let rules = parse_rules(
            "feature kern {\n  lookup inner {\n    pos a b 5;\n  } inner;\n} kern;\n",
            None,
            None,
        )
        .unwrap();
        assert_eq!(rules.lookup("inner").unwrap().statements.len(), 1);
    }

    #[test]
    fn test_nested_class_definitions_are_flattened() {
        let rules = parse_rules(
            "@a = [a b];\n@ab = [@a c];\nlookup l {\n  pos @ab 10;\n} l;\n",
            None,
            None,
        )
        .unwrap();
        let lookup = rules.lookup("l").unwrap();
        match &lookup.statements[0].kind {
            StatementKind::SinglePos(pos) => {
                assert!(pos[0].0.matches("c"));
                assert!(pos[0].0.matches("a"));
                assert!(!pos[0].0.matches("d"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_line_numbers() {
        let collector = RuleCollector::new("a\nbb\n\nc");
        assert_eq!(collector.line(&(0..1)), Some(1));
        assert_eq!(collector.line(&(2..3)), Some(2));
        assert_eq!(collector.line(&(6..7)), Some(4));
        assert_eq!(collector.line(&(0..0)), None);
    }
}
