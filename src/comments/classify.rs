use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::StripOptions;
use super::grammar::Grammar;
use super::span::{Classified, Disposition, Span, SpanKind};

/// How much to remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Line comments only; block and doc comments stay.
    #[default]
    Light,
    /// Every comment that is not a directive or explicitly preserved.
    Aggressive,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Mode::Light),
            "aggressive" => Ok(Mode::Aggressive),
            other => Err(format!(
                "unknown mode '{other}' (expected 'light' or 'aggressive')"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Light => "light",
            Mode::Aggressive => "aggressive",
        })
    }
}

/// Caller-supplied rule that keeps a matching comment regardless of mode.
#[derive(Debug, Clone)]
pub enum PreservePattern {
    /// Substring anywhere in the comment text.
    Contains(String),
    /// Prefix of the raw comment text, delimiter included (`// keep`).
    Prefix(String),
    Regex(Regex),
}

impl PreservePattern {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            PreservePattern::Contains(needle) => text.contains(needle.as_str()),
            PreservePattern::Prefix(prefix) => text.starts_with(prefix.as_str()),
            PreservePattern::Regex(re) => re.is_match(text),
        }
    }
}

impl PartialEq for PreservePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PreservePattern::Contains(a), PreservePattern::Contains(b))
            | (PreservePattern::Prefix(a), PreservePattern::Prefix(b)) => a == b,
            (PreservePattern::Regex(a), PreservePattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Assigns a [`Disposition`] to every span of one scan.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'c> {
    grammar: &'c Grammar,
    mode: Mode,
    patterns: &'c [PreservePattern],
    builtin_preserve: bool,
}

impl<'c> Classifier<'c> {
    pub fn new(grammar: &'c Grammar, options: &'c StripOptions) -> Self {
        Self {
            grammar,
            mode: options.mode,
            patterns: &options.preserve,
            builtin_preserve: options.builtin_preserve,
        }
    }

    /// First matching rule wins: directives, preserve patterns, then the mode.
    pub fn disposition(&self, span: &Span<'_>) -> Disposition {
        match span.kind {
            SpanKind::Directive => Disposition::Preserved,
            kind if kind.is_comment() && self.is_preserved(span.text) => Disposition::Preserved,
            SpanKind::DocComment | SpanKind::BlockComment => match self.mode {
                Mode::Light => Disposition::Preserved,
                Mode::Aggressive => Disposition::Removable,
            },
            SpanKind::LineComment => Disposition::Removable,
            _ => Disposition::Preserved,
        }
    }

    pub fn classify<'a>(&self, spans: Vec<Span<'a>>) -> Vec<Classified<'a>> {
        spans
            .into_iter()
            .map(|span| Classified {
                disposition: self.disposition(&span),
                span,
            })
            .collect()
    }

    fn is_preserved(&self, text: &str) -> bool {
        (self.builtin_preserve && self.grammar.preserve.iter().any(|m| m.matches(text)))
            || self.patterns.iter().any(|p| p.matches(text))
    }
}
