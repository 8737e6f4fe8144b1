//! Cross-checking a trace against raw kern data
//!
//! Raw kern data is line-oriented text where each glyph is written in
//! square brackets and the kern value in braces, e.g.
//! `[T] [o] {-80}`. Anything else on the line is ignored.

use std::{fmt, io::BufRead};

use regex::Regex;
use smol_str::SmolStr;

use crate::GlyphToolsError;

/// A line of kern data whose glyphs match the traced sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernMatch {
    /// Exactly one kern value was found
    Value {
        /// 1-based line number
        line: usize,
        /// The kern value as written
        value: String,
    },
    /// The glyphs matched but the line held zero or several values
    Unexpected {
        /// 1-based line number
        line: usize,
        /// How many values were found
        count: usize,
        /// The whole line
        text: String,
    },
}

impl fmt::Display for KernMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernMatch::Value { line, value } => {
                write!(f, "raw data line {}: Desired kern value = {}", line, value)
            }
            KernMatch::Unexpected { line, count, text } => write!(
                f,
                "raw data line {}: Unexpected count of kern values ({}) in kerndata, data ignored: {}",
                line, count, text
            ),
        }
    }
}

/// Finds the kern value recorded for a glyph sequence
pub struct KernData {
    glyph_names: Regex,
    kern_value: Regex,
}

impl KernData {
    /// Create a scanner
    pub fn new() -> Result<Self, GlyphToolsError> {
        Ok(KernData {
            glyph_names: Regex::new(r"\[([^\]]+)\]")?,
            kern_value: Regex::new(r"\{([^}]+)\}")?,
        })
    }

    /// The glyph names on a line, in order
    pub fn glyphs<'l>(&self, line: &'l str) -> Vec<&'l str> {
        captures(&self.glyph_names, line)
    }

    /// The kern values on a line, in order
    pub fn values<'l>(&self, line: &'l str) -> Vec<&'l str> {
        captures(&self.kern_value, line)
    }

    /// Scan `reader` for lines whose glyphs are exactly `glyphs`
    ///
    /// Lines with the wrong number of values are reported and skipped; the
    /// scan stops at the first line with exactly one value. If the result
    /// holds no [`KernMatch::Value`], nothing usable was found.
    pub fn search(
        &self,
        reader: impl BufRead,
        glyphs: &[SmolStr],
    ) -> Result<Vec<KernMatch>, GlyphToolsError> {
        let mut matches = vec![];
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let found = self.glyphs(&line);
            if found.len() != glyphs.len() || found.iter().zip(glyphs).any(|(a, b)| *a != b.as_str()) {
                continue;
            }
            let values = self.values(&line);
            if let [value] = values.as_slice() {
                matches.push(KernMatch::Value {
                    line: index + 1,
                    value: value.to_string(),
                });
                break;
            }
            log::debug!("Kern data line {} has {} values", index + 1, values.len());
            matches.push(KernMatch::Unexpected {
                line: index + 1,
                count: values.len(),
                text: line.clone(),
            });
        }
        Ok(matches)
    }
}

fn captures<'l>(regex: &Regex, line: &'l str) -> Vec<&'l str> {
    regex
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}
