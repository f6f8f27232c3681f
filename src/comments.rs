//! Comment stripping pipeline.
//!
//! `source → scanner::scan → classify::Classifier → strip::rebuild`.
//! Each call is pure and synchronous; the only shared state is the static
//! grammar registry.

pub mod classify;
pub mod grammar;
pub mod scanner;
pub mod span;
pub mod strip;

use tracing::debug;

pub use classify::{Classifier, Mode, PreservePattern};
pub use grammar::{Grammar, languages, lookup};
pub use scanner::{Scan, scan};
pub use span::{Classified, Disposition, Span, SpanKind, Warning};
pub use strip::rebuild;

use crate::error::Result;

/// Knobs for one stripping run.
#[derive(Debug, Clone, PartialEq)]
pub struct StripOptions {
    pub mode: Mode,
    /// Extra caller patterns, checked after the grammar's own markers.
    pub preserve: Vec<PreservePattern>,
    /// Keep comments matching the grammar's built-in markers (`@ts-ignore`,
    /// `eslint-disable`, `#!`, ...).
    pub builtin_preserve: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Light,
            preserve: Vec::new(),
            builtin_preserve: true,
        }
    }
}

/// Result of a stripping run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub text: String,
    pub warnings: Vec<Warning>,
    /// Number of comment spans that were removed.
    pub removed: usize,
}

impl Stripped {
    pub fn changed(&self, source: &str) -> bool {
        self.removed > 0 && self.text != source
    }
}

/// Remove comments from `source` written in `language`.
///
/// `language` is any registry identifier or alias (`"ts"`, `"C#"`, ...).
/// Unterminated constructs never fail the call: the open construct absorbs
/// the rest of the input and is reported in [`Stripped::warnings`].
pub fn strip_comments(source: &str, language: &str, options: &StripOptions) -> Result<Stripped> {
    let grammar = lookup(language)?;
    let Scan { spans, warnings } = scan(source, grammar);
    let classified = Classifier::new(grammar, options).classify(spans);
    let removed = classified.iter().filter(|c| c.is_removable()).count();
    let text = rebuild(source, &classified);

    debug!(
        language = grammar.name,
        mode = %options.mode,
        removed,
        warnings = warnings.len(),
        "stripped comments"
    );

    Ok(Stripped {
        text,
        warnings,
        removed,
    })
}
