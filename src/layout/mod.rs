//! Lookup tracing: which rule fires for a glyph sequence, and why

pub mod fea;
pub mod pattern;
pub mod rules;
pub mod tracer;

pub use fea::{load_rules, parse_rules};
pub use pattern::{GlyphPattern, MalformedPattern};
pub use rules::{ChainKind, Lookup, RuleSet, Statement, StatementKind};
pub use tracer::{MatchDetail, MatchReport, Tracer, DEFAULT_MAX_DEPTH};
