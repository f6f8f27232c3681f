use serde::Serialize;

/// Lexical category of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Code,
    StringLiteral,
    TemplateLiteral,
    RegexLiteral,
    LineComment,
    BlockComment,
    DocComment,
    Directive,
}

impl SpanKind {
    /// Comment and directive spans are the only ones the classifier looks at.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            SpanKind::LineComment
                | SpanKind::BlockComment
                | SpanKind::DocComment
                | SpanKind::Directive
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            SpanKind::Code => "code",
            SpanKind::StringLiteral => "string literal",
            SpanKind::TemplateLiteral => "template literal",
            SpanKind::RegexLiteral => "regex literal",
            SpanKind::LineComment => "line comment",
            SpanKind::BlockComment => "block comment",
            SpanKind::DocComment => "doc comment",
            SpanKind::Directive => "directive",
        }
    }
}

/// A contiguous slice of the input. Offsets are byte offsets, lines are 1-based
/// and `end_line` is the line holding the last byte of the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Whether a span survives stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Preserved,
    Removable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub span: Span<'a>,
    pub disposition: Disposition,
}

impl Classified<'_> {
    pub fn is_removable(&self) -> bool {
        self.disposition == Disposition::Removable
    }
}

/// Non-fatal anomaly found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Warning {
    /// A literal, comment or markup block was still open at end of input and
    /// absorbed the rest of the text.
    UnterminatedConstruct {
        kind: SpanKind,
        offset: usize,
        line: usize,
    },
    /// An interpolation hole was never closed; everything after its opener was
    /// scanned as plain code.
    UnbalancedInterpolation { offset: usize, line: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnterminatedConstruct { kind, offset, line } => write!(
                f,
                "unterminated {} starting at line {line} (offset {offset})",
                kind.describe()
            ),
            Warning::UnbalancedInterpolation { offset, line } => write!(
                f,
                "unclosed interpolation starting at line {line} (offset {offset})"
            ),
        }
    }
}
