use std::fmt;

use smol_str::SmolStr;

use crate::{
    layout::{
        pattern::GlyphPattern,
        rules::{Lookup, RuleSet, Statement, StatementKind},
    },
    GlyphToolsError,
};

/// How deep nested lookup references may go before the trace gives up
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What kind of match a report describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDetail {
    /// A single positioning rule matched `glyph`
    SinglePos {
        /// The probed glyph
        glyph: SmolStr,
        /// The adjustment, as feature-file text
        adjustment: String,
    },
    /// A pair positioning rule matched the probe and the following glyph
    PairPos {
        /// The probed glyph
        first: SmolStr,
        /// The glyph after it
        second: SmolStr,
        /// The rule, as feature-file text
        statement: String,
    },
    /// A contextual rule matched
    Context {
        /// The rule, as feature-file text
        statement: String,
    },
}

/// One rule that matched during a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    /// Source line of the rule
    pub line: Option<usize>,
    /// The lookup the rule belongs to
    pub lookup: SmolStr,
    /// The position in the glyph sequence the rule was probed at
    pub offset: usize,
    /// 0 for the traced lookup, 1 for lookups it calls, and so on
    pub depth: usize,
    /// An earlier report in the same lookup already matched this probe
    pub masked: bool,
    /// What matched
    pub detail: MatchDetail,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}", line)?,
            None => write!(f, "line ?")?,
        }
        write!(f, " Lookup {} ", self.lookup)?;
        match &self.detail {
            MatchDetail::SinglePos { glyph, adjustment } => {
                write!(f, "SinglePos {} --> {}", glyph, adjustment)?
            }
            MatchDetail::PairPos {
                first,
                second,
                statement,
            } => write!(f, "PairPos {},{} --> {}", first, second, statement)?,
            MatchDetail::Context { statement } => write!(f, "Context match --> {}", statement)?,
        }
        if self.masked {
            write!(f, "  # (MASKED)")?;
        }
        Ok(())
    }
}

/// Replays lookups against a glyph sequence
///
/// Every rule that matches is reported, in rule order; all but the first
/// are marked as masked. When the first match is a chaining rule, the
/// lookups it calls are traced at their positions and their reports follow
/// it.
pub struct Tracer<'a> {
    rules: &'a RuleSet,
    max_depth: usize,
}

impl<'a> Tracer<'a> {
    /// Create a tracer which resolves nested lookups in `rules`
    pub fn new(rules: &'a RuleSet) -> Self {
        Tracer {
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Change the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Trace `lookup` against `glyphs`, probing at `offset`
    pub fn trace(
        &self,
        lookup: &Lookup,
        glyphs: &[SmolStr],
        offset: usize,
    ) -> Result<Vec<MatchReport>, GlyphToolsError> {
        self.trace_at(lookup, glyphs, offset, 0)
    }

    /// Trace the lookup called `name`
    pub fn trace_named(
        &self,
        name: &str,
        glyphs: &[SmolStr],
        offset: usize,
    ) -> Result<Vec<MatchReport>, GlyphToolsError> {
        self.trace(self.rules.lookup(name)?, glyphs, offset)
    }

    fn trace_at(
        &self,
        lookup: &Lookup,
        glyphs: &[SmolStr],
        offset: usize,
        depth: usize,
    ) -> Result<Vec<MatchReport>, GlyphToolsError> {
        if depth > self.max_depth {
            return Err(GlyphToolsError::LookupNestingTooDeep(lookup.name.to_string()));
        }
        let mut reports: Vec<MatchReport> = vec![];
        let Some(probe) = glyphs.get(offset) else {
            log::debug!(
                "Lookup {}: offset {} is past the end of the sequence",
                lookup.name,
                offset
            );
            return Ok(reports);
        };
        for statement in &lookup.statements {
            let report = |detail: MatchDetail, masked: bool| MatchReport {
                line: statement.line,
                lookup: lookup.name.clone(),
                offset,
                depth,
                masked,
                detail,
            };
            match &statement.kind {
                StatementKind::SinglePos(pos) => {
                    for (pattern, adjustment) in pos {
                        if pattern.matches(probe) {
                            let detail = MatchDetail::SinglePos {
                                glyph: probe.clone(),
                                adjustment: adjustment.clone(),
                            };
                            reports.push(report(detail, !reports.is_empty()));
                        }
                    }
                }
                StatementKind::PairPos { first, second } => {
                    let Some(next) = glyphs.get(offset + 1) else {
                        continue;
                    };
                    if first.matches(probe) && second.matches(next) {
                        let detail = MatchDetail::PairPos {
                            first: probe.clone(),
                            second: next.clone(),
                            statement: statement.text.clone(),
                        };
                        reports.push(report(detail, !reports.is_empty()));
                    }
                }
                StatementKind::ChainContext {
                    prefix,
                    glyphs: input,
                    suffix,
                    lookups,
                    ..
                } => {
                    reject_prefix(statement, prefix)?;
                    if !sequence_matches(glyphs, offset, input.iter().chain(suffix)) {
                        continue;
                    }
                    let first_match = reports.is_empty();
                    let detail = MatchDetail::Context {
                        statement: statement.text.clone(),
                    };
                    reports.push(report(detail, !first_match));
                    if first_match {
                        for (position, names) in lookups.iter().enumerate() {
                            for name in names {
                                let nested = self.rules.lookup(name)?;
                                log::debug!(
                                    "Lookup {} calls {} at offset {}",
                                    lookup.name,
                                    name,
                                    offset + position
                                );
                                reports.extend(self.trace_at(
                                    nested,
                                    glyphs,
                                    offset + position,
                                    depth + 1,
                                )?);
                            }
                        }
                    }
                }
                // With several marked glyphs I'm just going to match them one
                // after another from the offset, like a chain rule's input, for now
                StatementKind::ForcedChainSinglePos { prefix, pos, suffix } => {
                    reject_prefix(statement, prefix)?;
                    let marked = pos.iter().map(|(pattern, _)| pattern);
                    if !sequence_matches(glyphs, offset, marked.chain(suffix)) {
                        continue;
                    }
                    let detail = MatchDetail::Context {
                        statement: statement.text.clone(),
                    };
                    reports.push(report(detail, !reports.is_empty()));
                }
                StatementKind::Malformed(malformed) => return Err(malformed.clone().into()),
                StatementKind::Unsupported(kind) => {
                    log::debug!("{} is of unimplemented statement type {}", statement.location(), kind)
                }
            }
        }
        Ok(reports)
    }
}

fn reject_prefix(statement: &Statement, prefix: &[GlyphPattern]) -> Result<(), GlyphToolsError> {
    if prefix.is_empty() {
        return Ok(());
    }
    Err(GlyphToolsError::UnsupportedPrefix {
        location: statement.location(),
        statement: statement.text.clone(),
    })
}

/// Do `patterns` match consecutive glyphs starting at `offset`?
fn sequence_matches<'p>(
    glyphs: &[SmolStr],
    offset: usize,
    patterns: impl Iterator<Item = &'p GlyphPattern>,
) -> bool {
    let patterns: Vec<&GlyphPattern> = patterns.collect();
    match glyphs.get(offset..offset + patterns.len()) {
        Some(window) => window
            .iter()
            .zip(patterns)
            .all(|(glyph, pattern)| pattern.matches(glyph)),
        None => false,
    }
}
