//! Span scanner.
//!
//! A single forward pass over the source driven by an explicit frame stack.
//! The bottom frame is plain code; literals with interpolation holes, the holes
//! themselves and JSX markup push further frames, so arbitrarily nested
//! templates never recurse on the call stack.
//!
//! Comments, regex literals, heredocs and directive lines cannot contain holes
//! and are consumed whole in one step.

use tracing::trace;

use super::grammar::{BlockRule, Escape, Grammar, Hole, LiteralRule};
use super::span::{Span, SpanKind, Warning};

/// Scanner output: the span partition of the input plus any warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<'a> {
    pub spans: Vec<Span<'a>>,
    pub warnings: Vec<Warning>,
}

impl Scan<'_> {
    /// Concatenation of all span texts. Always equal to the scanned input.
    pub fn reassemble(&self) -> String {
        self.spans.iter().map(|s| s.text).collect()
    }
}

/// Split `source` into spans according to `grammar`.
pub fn scan<'a>(source: &'a str, grammar: &Grammar) -> Scan<'a> {
    let scan = Scanner::new(source, grammar).run();
    trace!(
        language = grammar.name,
        spans = scan.spans.len(),
        warnings = scan.warnings.len(),
        "scanned source"
    );
    scan
}

const MARKUP_HOLE: Hole = Hole {
    open: "{",
    nest: b'{',
    close: b'}',
    escaped_open: None,
};

/// Words after which a `/` starts a regex and `<` may start markup.
const OPERATOR_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Class of the last significant token in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Operator,
    Operand,
}

impl Prev {
    fn expects_operand(self) -> bool {
        self != Prev::Operand
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy)]
enum Frame<'g> {
    Code,
    Literal {
        rule: &'g LiteralRule,
        start: usize,
    },
    Hole {
        hole: &'g Hole,
        depth: usize,
        open_at: usize,
    },
    Markup {
        depth: usize,
        tag: Option<TagKind>,
        start: usize,
    },
}

struct Scanner<'a, 'g> {
    src: &'a str,
    bytes: &'a [u8],
    grammar: &'g Grammar,
    pos: usize,
    /// Start of the region not yet emitted as a span.
    mark: usize,
    /// Line number at `mark`.
    line: usize,
    prev: Prev,
    /// Outside the code islands of an embedded grammar (PHP inline HTML).
    host: bool,
    /// Bytes before this offset have been searched for line breaks.
    seen: usize,
    /// End of the indentation of the line containing `seen`.
    indent_end: usize,
    stack: Vec<Frame<'g>>,
    spans: Vec<Span<'a>>,
    warnings: Vec<Warning>,
}

impl<'a, 'g> Scanner<'a, 'g> {
    fn new(src: &'a str, grammar: &'g Grammar) -> Self {
        let mut scanner = Self {
            src,
            bytes: src.as_bytes(),
            grammar,
            pos: 0,
            mark: 0,
            line: 1,
            prev: Prev::Start,
            host: grammar.embedding.is_some(),
            seen: 0,
            indent_end: 0,
            stack: vec![Frame::Code],
            spans: Vec::new(),
            warnings: Vec::new(),
        };
        scanner.indent_end = scanner.skip_blanks(0);
        scanner
    }

    fn run(mut self) -> Scan<'a> {
        if self.grammar.shebang && self.starts_with("#!") {
            self.directive();
        }
        while self.pos < self.bytes.len() {
            match self.stack.last().copied() {
                Some(Frame::Literal { rule, .. }) => self.literal_body(rule),
                Some(Frame::Markup { depth, tag, .. }) => self.markup_step(depth, tag),
                _ if self.host => self.host_text(),
                _ => self.code_step(),
            }
        }
        self.finish()
    }

    /// Text outside the code islands of an embedded grammar, up to and
    /// including the next island opener.
    fn host_text(&mut self) {
        let grammar = self.grammar;
        let Some(embedding) = &grammar.embedding else {
            self.host = false;
            return;
        };
        let rest = &self.src[self.pos..];
        let next = embedding
            .open
            .iter()
            .filter_map(|open| rest.find(open).map(|at| self.pos + at + open.len()))
            .min();
        match next {
            Some(end) => {
                self.pos = end;
                self.emit(SpanKind::TemplateLiteral, end);
                self.host = false;
                self.prev = Prev::Start;
            }
            None => self.pos = self.bytes.len(),
        }
    }

    fn finish(mut self) -> Scan<'a> {
        let end = self.bytes.len();
        match self.stack.last().copied() {
            Some(Frame::Literal { rule, .. }) => self.emit(rule.kind, end),
            Some(Frame::Markup { .. }) => self.emit(SpanKind::TemplateLiteral, end),
            _ if self.host => self.emit(SpanKind::TemplateLiteral, end),
            _ => self.emit(SpanKind::Code, end),
        }

        let open: Vec<Frame<'g>> = self.stack.drain(1..).collect();
        for frame in open {
            let warning = match frame {
                Frame::Literal { rule, start } => Warning::UnterminatedConstruct {
                    kind: rule.kind,
                    offset: start,
                    line: self.line_at(start),
                },
                Frame::Markup { start, .. } => Warning::UnterminatedConstruct {
                    kind: SpanKind::TemplateLiteral,
                    offset: start,
                    line: self.line_at(start),
                },
                Frame::Hole { open_at, .. } => Warning::UnbalancedInterpolation {
                    offset: open_at,
                    line: self.line_at(open_at),
                },
                Frame::Code => continue,
            };
            self.warnings.push(warning);
        }
        self.warnings.sort_by_key(|w| match w {
            Warning::UnterminatedConstruct { offset, .. }
            | Warning::UnbalancedInterpolation { offset, .. } => *offset,
        });

        Scan {
            spans: self.spans,
            warnings: self.warnings,
        }
    }

    // ----- code -----

    fn code_step(&mut self) {
        let g = self.grammar;
        let b = self.bytes[self.pos];

        if self.stack.len() == 1 && self.directive_here() {
            self.directive();
            return;
        }
        if let Some(prefix) = self.line_comment_here() {
            self.emit(SpanKind::Code, self.pos);
            self.line_comment(prefix);
            return;
        }
        if let Some(rule) = self.block_comment_here() {
            self.emit(SpanKind::Code, self.pos);
            self.block_comment(rule);
            return;
        }
        if g.heredoc && self.starts_with("<<<") && self.heredoc() {
            return;
        }
        if let Some(rule) = self.literal_here() {
            self.emit(SpanKind::Code, self.pos);
            self.stack.push(Frame::Literal {
                rule,
                start: self.pos,
            });
            self.pos += rule.open.len();
            return;
        }
        if g.regex_literals && b == b'/' && self.prev.expects_operand() && self.regex() {
            return;
        }
        if g.markup && b == b'<' && self.prev.expects_operand() && self.markup_opens() {
            self.emit(SpanKind::Code, self.pos);
            self.stack.push(Frame::Markup {
                depth: 0,
                tag: Some(TagKind::Open),
                start: self.pos,
            });
            self.pos += 1;
            return;
        }
        let mut closes_hole = false;
        if let Some(Frame::Hole { hole, depth, .. }) = self.stack.last_mut() {
            if b == hole.close {
                match depth.checked_sub(1) {
                    Some(outer) => *depth = outer,
                    None => closes_hole = true,
                }
            } else if b == hole.nest {
                *depth += 1;
            }
        }
        if closes_hole {
            self.close_hole();
            return;
        }
        if self.stack.len() == 1
            && let Some(embedding) = &g.embedding
            && self.starts_with(embedding.close)
        {
            self.emit(SpanKind::Code, self.pos);
            self.pos += embedding.close.len();
            self.host = true;
            return;
        }
        self.plain_code(b);
    }

    /// Advance over one ordinary code token, tracking operand position.
    fn plain_code(&mut self, b: u8) {
        if is_ident(b) {
            let end = self.skip_ident(self.pos);
            let word = &self.src[self.pos..end];
            self.prev = if OPERATOR_KEYWORDS.contains(&word) {
                Prev::Operator
            } else {
                Prev::Operand
            };
            self.pos = end;
            return;
        }
        match b {
            b' ' | b'\t' | b'\r' | b'\n' | 0x0c => {}
            b')' | b']' | b'}' => self.prev = Prev::Operand,
            b'+' | b'-' if self.bytes.get(self.pos + 1) == Some(&b) => {
                // Postfix after an operand, prefix otherwise.
                if self.prev != Prev::Operand {
                    self.prev = Prev::Operator;
                }
                self.pos += 2;
                return;
            }
            _ => self.prev = Prev::Operator,
        }
        self.pos += 1;
    }

    fn close_hole(&mut self) {
        self.emit(SpanKind::Code, self.pos);
        self.stack.pop();
        // The closer opens the resumed literal or markup span.
        self.pos += 1;
    }

    fn directive_here(&mut self) -> bool {
        let matched = self.grammar.directive_prefixes.iter().any(|p| {
            self.starts_with(p) && !self.bytes.get(self.pos + p.len()).is_some_and(|&c| is_ident(c))
        });
        matched && self.at_line_start()
    }

    fn directive(&mut self) {
        self.emit(SpanKind::Code, self.pos);
        let end = self.line_end(self.pos);
        self.pos = end;
        self.emit(SpanKind::Directive, end);
        self.prev = Prev::Start;
    }

    fn line_comment_here(&self) -> Option<&'static str> {
        let g = self.grammar;
        if g.line_comment_exclusions.iter().any(|x| self.starts_with(x)) {
            return None;
        }
        g.line_comments.iter().copied().find(|p| self.starts_with(p))
    }

    fn line_comment(&mut self, prefix: &str) {
        let start = self.pos;
        let mut end = self.line_end(start);
        for terminator in self.grammar.line_comment_terminators {
            if let Some(found) = self.src[start + prefix.len()..end].find(terminator) {
                end = end.min(start + prefix.len() + found);
            }
        }
        let text = &self.src[start..end];
        let kind = if self
            .grammar
            .doc_line_markers
            .iter()
            .any(|m| is_doc_marker(text, m))
        {
            SpanKind::DocComment
        } else {
            SpanKind::LineComment
        };
        self.pos = end;
        self.emit(kind, end);
    }

    fn block_comment_here(&self) -> Option<&'g BlockRule> {
        self.grammar
            .block_comments
            .iter()
            .find(|r| self.starts_with(r.open))
    }

    fn block_comment(&mut self, rule: &BlockRule) {
        let start = self.pos;
        self.pos += rule.open.len();
        let mut depth = 1usize;
        loop {
            if self.pos >= self.bytes.len() {
                self.warn_unterminated(SpanKind::BlockComment, start);
                break;
            }
            if self.starts_with(rule.close) {
                self.pos += rule.close.len();
                depth -= 1;
                if depth == 0 {
                    break;
                }
            } else if rule.nestable && self.starts_with(rule.open) {
                self.pos += rule.open.len();
                depth += 1;
            } else {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        let kind = match rule.doc_open {
            Some(doc) if is_doc_block(text, doc) => SpanKind::DocComment,
            _ => SpanKind::BlockComment,
        };
        self.emit(kind, self.pos);
    }

    fn literal_here(&self) -> Option<&'g LiteralRule> {
        self.grammar
            .literals
            .iter()
            .find(|r| self.starts_with(r.open))
    }

    /// PHP heredoc / nowdoc. Returns false when `<<<` is not followed by a
    /// well-formed label line, leaving the bytes to ordinary code.
    fn heredoc(&mut self) -> bool {
        let start = self.pos;
        let mut i = self.skip_blanks(start + 3);
        let quote = match self.bytes.get(i) {
            Some(&q @ (b'\'' | b'"')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };
        if !self.bytes.get(i).is_some_and(|&c| is_ident(c) && !c.is_ascii_digit()) {
            return false;
        }
        let label_end = self.skip_ident(i);
        let label = &self.src[i..label_end];
        i = label_end;
        if let Some(q) = quote {
            if self.bytes.get(i) != Some(&q) {
                return false;
            }
            i += 1;
        }
        if self.bytes.get(i) == Some(&b'\r') {
            i += 1;
        }
        if self.bytes.get(i) != Some(&b'\n') {
            return false;
        }

        let mut line_start = i + 1;
        let end = loop {
            if line_start >= self.bytes.len() {
                self.warn_unterminated(SpanKind::StringLiteral, start);
                break self.bytes.len();
            }
            let t = self.skip_blanks(line_start);
            if self.bytes[t..].starts_with(label.as_bytes())
                && !self.bytes.get(t + label.len()).is_some_and(|&c| is_ident(c))
            {
                break t + label.len();
            }
            line_start = self.line_end(line_start) + 1;
            while line_start < self.bytes.len() && self.bytes[line_start - 1] != b'\n' {
                line_start += 1;
            }
        };

        self.emit(SpanKind::Code, start);
        self.pos = end;
        self.emit(SpanKind::StringLiteral, end);
        self.prev = Prev::Operand;
        true
    }

    /// Regex literal at a `/` in operand position. A candidate that runs into
    /// a line end is a division after all.
    fn regex(&mut self) -> bool {
        let start = self.pos;
        let mut i = start + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(i) {
                None | Some(b'\n') | Some(b'\r') => return false,
                Some(b'\\') => {
                    if matches!(self.bytes.get(i + 1), None | Some(b'\n') | Some(b'\r')) {
                        return false;
                    }
                    i += 2;
                }
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => break,
                Some(_) => i += 1,
            }
        }
        i += 1;
        while self.bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
        }
        self.emit(SpanKind::Code, start);
        self.pos = i;
        self.emit(SpanKind::RegexLiteral, i);
        self.prev = Prev::Operand;
        true
    }

    // ----- literals -----

    fn literal_body(&mut self, rule: &'g LiteralRule) {
        let close = rule.close;
        while self.pos < self.bytes.len() {
            if self.starts_with(close) {
                if rule.escape == Escape::Doubled && self.starts_with_at(self.pos + close.len(), close)
                {
                    self.pos += 2 * close.len();
                    continue;
                }
                self.pos += close.len();
                if let Some(q) = repeated_quote(close) {
                    // `""""` closes on the last three quotes.
                    while self.bytes.get(self.pos) == Some(&q) {
                        self.pos += 1;
                    }
                }
                self.emit(rule.kind, self.pos);
                self.stack.pop();
                self.prev = Prev::Operand;
                return;
            }
            if let Some(hole) = &rule.hole {
                if let Some(escaped) = hole.escaped_open
                    && self.starts_with(escaped)
                {
                    self.pos += escaped.len();
                    continue;
                }
                if self.starts_with(hole.open) {
                    let open_at = self.pos;
                    self.pos += hole.open.len();
                    self.emit(rule.kind, self.pos);
                    self.stack.push(Frame::Hole {
                        hole,
                        depth: 0,
                        open_at,
                    });
                    self.prev = Prev::Start;
                    return;
                }
            }
            if rule.escape == Escape::Backslash && self.bytes[self.pos] == b'\\' {
                self.pos = (self.pos + 2).min(self.bytes.len());
                continue;
            }
            self.pos += 1;
        }
    }

    // ----- markup -----

    fn markup_opens(&self) -> bool {
        match self.bytes.get(self.pos + 1) {
            Some(b'>') => return true,
            Some(&c) if is_ident(c) && !c.is_ascii_digit() => {}
            _ => return false,
        }
        let mut i = self.pos + 1;
        while self
            .bytes
            .get(i)
            .is_some_and(|&c| is_ident(c) || matches!(c, b'.' | b':' | b'-'))
        {
            i += 1;
        }
        let i = self.skip_blanks(i);
        // `<T,>` and `<T extends U>` are generic parameter lists.
        if self.bytes.get(i) == Some(&b',') {
            return false;
        }
        !(self.starts_with_at(i, "extends")
            && !self.bytes.get(i + "extends".len()).is_some_and(|&c| is_ident(c)))
    }

    fn markup_step(&mut self, depth: usize, tag: Option<TagKind>) {
        let b = self.bytes[self.pos];
        match tag {
            Some(kind) => match b {
                b'"' | b'\'' => {
                    let close = self.bytes[self.pos + 1..]
                        .iter()
                        .position(|&c| c == b)
                        .map_or(self.bytes.len(), |p| self.pos + 1 + p + 1);
                    self.pos = close;
                }
                b'{' => self.open_markup_hole(),
                b'/' if self.starts_with("/*") || self.starts_with("//") => {
                    self.emit(SpanKind::TemplateLiteral, self.pos);
                    if let Some(rule) = self.block_comment_here() {
                        self.block_comment(rule);
                    } else {
                        self.line_comment("//");
                    }
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'>') => {
                    self.pos += 2;
                    if depth == 0 {
                        self.close_markup();
                    } else {
                        self.set_markup(depth, None);
                    }
                }
                b'>' => {
                    self.pos += 1;
                    let depth = match kind {
                        TagKind::Open => depth + 1,
                        TagKind::Close => depth.saturating_sub(1),
                    };
                    if depth == 0 {
                        self.close_markup();
                    } else {
                        self.set_markup(depth, None);
                    }
                }
                _ => self.pos += 1,
            },
            None => match b {
                b'{' => match self.markup_comment_end() {
                    Some(end) => {
                        self.emit(SpanKind::TemplateLiteral, self.pos);
                        self.pos = end;
                        self.emit(SpanKind::BlockComment, end);
                    }
                    None => self.open_markup_hole(),
                },
                b'<' => {
                    if self.bytes.get(self.pos + 1) == Some(&b'/') {
                        self.pos += 2;
                        self.set_markup(depth, Some(TagKind::Close));
                    } else {
                        self.pos += 1;
                        self.set_markup(depth, Some(TagKind::Open));
                    }
                }
                _ => self.pos += 1,
            },
        }
    }

    fn set_markup(&mut self, new_depth: usize, new_tag: Option<TagKind>) {
        if let Some(Frame::Markup { depth, tag, .. }) = self.stack.last_mut() {
            *depth = new_depth;
            *tag = new_tag;
        }
    }

    fn open_markup_hole(&mut self) {
        let open_at = self.pos;
        self.pos += 1;
        self.emit(SpanKind::TemplateLiteral, self.pos);
        self.stack.push(Frame::Hole {
            hole: &MARKUP_HOLE,
            depth: 0,
            open_at,
        });
        self.prev = Prev::Start;
    }

    fn close_markup(&mut self) {
        self.emit(SpanKind::TemplateLiteral, self.pos);
        self.stack.pop();
        self.prev = Prev::Operand;
    }

    /// End offset of a `{/* ... */}` child comment starting at `pos`.
    fn markup_comment_end(&self) -> Option<usize> {
        let i = self.skip_space(self.pos + 1);
        if !self.starts_with_at(i, "/*") {
            return None;
        }
        let close = self.src[i + 2..].find("*/")? + i + 2;
        let j = self.skip_space(close + 2);
        (self.bytes.get(j) == Some(&b'}')).then_some(j + 1)
    }

    // ----- helpers -----

    fn emit(&mut self, kind: SpanKind, end: usize) {
        if end <= self.mark {
            return;
        }
        let text = &self.src[self.mark..end];
        let newlines = count_newlines(text);
        let end_line = self.line + newlines - usize::from(text.ends_with('\n'));
        self.spans.push(Span {
            kind,
            start: self.mark,
            end,
            text,
            start_line: self.line,
            end_line,
        });
        self.line += newlines;
        self.mark = end;
    }

    fn warn_unterminated(&mut self, kind: SpanKind, offset: usize) {
        let line = self.line_at(offset);
        self.warnings
            .push(Warning::UnterminatedConstruct { kind, offset, line });
    }

    fn line_at(&self, offset: usize) -> usize {
        1 + count_newlines(&self.src[..offset])
    }

    /// Offset of the line terminator at or after `from`, excluding a `\r` that
    /// belongs to a `\r\n` pair.
    fn line_end(&self, from: usize) -> usize {
        match self.bytes[from..].iter().position(|&b| b == b'\n') {
            Some(p) => {
                let nl = from + p;
                if nl > from && self.bytes[nl - 1] == b'\r' {
                    nl - 1
                } else {
                    nl
                }
            }
            None => self.bytes.len(),
        }
    }

    /// Whether only blanks precede `pos` on its line. `pos` never moves
    /// backwards, so each byte is searched for a line break once.
    fn at_line_start(&mut self) -> bool {
        if let Some(nl) = self.bytes[self.seen..self.pos].iter().rposition(|&b| b == b'\n') {
            self.indent_end = self.skip_blanks(self.seen + nl + 1);
        }
        self.seen = self.pos;
        self.indent_end >= self.pos
    }

    fn starts_with(&self, s: &str) -> bool {
        self.starts_with_at(self.pos, s)
    }

    fn starts_with_at(&self, at: usize, s: &str) -> bool {
        self.bytes
            .get(at..)
            .is_some_and(|rest| rest.starts_with(s.as_bytes()))
    }

    fn skip_ident(&self, mut i: usize) -> usize {
        while self.bytes.get(i).is_some_and(|&c| is_ident(c)) {
            i += 1;
        }
        i
    }

    fn skip_blanks(&self, mut i: usize) -> usize {
        while matches!(self.bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        i
    }

    fn skip_space(&self, mut i: usize) -> usize {
        while self.bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        i
    }
}

/// Identifier byte. Non-ASCII bytes count so that Unicode identifiers are
/// consumed whole and never split.
fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// `///` is a doc marker, `////` is not.
fn is_doc_marker(text: &str, marker: &str) -> bool {
    text.starts_with(marker) && text.as_bytes().get(marker.len()) != marker.as_bytes().last()
}

/// `/** ... */` is documentation, `/**/` and `/*** ... */` banners are not.
fn is_doc_block(text: &str, doc_open: &str) -> bool {
    text.starts_with(doc_open) && !matches!(text.as_bytes().get(doc_open.len()), Some(b'*' | b'/'))
}

fn repeated_quote(close: &str) -> Option<u8> {
    let first = *close.as_bytes().first()?;
    (close.len() >= 3 && close.bytes().all(|b| b == first)).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::grammar::{CSHARP, JAVASCRIPT, KOTLIN, PHP, SWIFT, TSX, TYPESCRIPT};

    fn kinds<'a>(scan: &Scan<'a>) -> Vec<(SpanKind, &'a str)> {
        scan.spans.iter().map(|s| (s.kind, s.text)).collect()
    }

    fn comments<'a>(scan: &Scan<'a>) -> Vec<(SpanKind, &'a str)> {
        kinds(scan)
            .into_iter()
            .filter(|(k, _)| k.is_comment())
            .collect()
    }

    #[test]
    fn spans_partition_the_input() {
        let src = "let a = `x ${b /* c */} y`; // d\n/** e */\nconst r = /f\\/g/i;\n";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(scan.reassemble(), src);
        let mut offset = 0;
        for span in &scan.spans {
            assert_eq!(span.start, offset);
            assert!(span.end > span.start);
            offset = span.end;
        }
        assert_eq!(offset, src.len());
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn comment_markers_inside_strings_stay_in_the_string() {
        let src = r#"var s = "not // a comment"; var t = '/* nor this */';"#;
        let scan = scan(src, &JAVASCRIPT);
        assert!(comments(&scan).is_empty());
        assert!(kinds(&scan).contains(&(SpanKind::StringLiteral, r#""not // a comment""#)));
    }

    #[test]
    fn escaped_quotes_do_not_close_strings() {
        let src = r#"s = "a \" // b"; // real"#;
        let scan = scan(src, &CSHARP);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// real")]);
    }

    #[test]
    fn template_holes_are_scanned_as_code() {
        let src = "t = `a ${ x /* c */ + `in ${y}` } b // no`;";
        let scan = scan(src, &TYPESCRIPT);
        assert_eq!(
            kinds(&scan),
            [
                (SpanKind::Code, "t = "),
                (SpanKind::TemplateLiteral, "`a ${"),
                (SpanKind::Code, " x "),
                (SpanKind::BlockComment, "/* c */"),
                (SpanKind::Code, " + "),
                (SpanKind::TemplateLiteral, "`in ${"),
                (SpanKind::Code, "y"),
                (SpanKind::TemplateLiteral, "}`"),
                (SpanKind::Code, " "),
                (SpanKind::TemplateLiteral, "} b // no`"),
                (SpanKind::Code, ";"),
            ]
        );
    }

    #[test]
    fn braces_inside_holes_nest() {
        let src = "t = `${ {a: 1}.a }`; // x";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// x")]);
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn slash_after_operand_is_division() {
        let src = "a = b / c / d;\nx = (y) / 2 / z;\nn = i++ / 2;\n";
        let scan = scan(src, &JAVASCRIPT);
        assert!(kinds(&scan).iter().all(|(k, _)| *k == SpanKind::Code));
    }

    #[test]
    fn slash_in_operand_position_is_regex() {
        let src = "x = /ab+c\\/[/]d/gi.test(s); // tail\nif (ok) return /\\/\\//;";
        let scan = scan(src, &JAVASCRIPT);
        let regexes: Vec<_> = kinds(&scan)
            .into_iter()
            .filter(|(k, _)| *k == SpanKind::RegexLiteral)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(regexes, ["/ab+c\\/[/]d/gi", "/\\/\\//"]);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// tail")]);
    }

    #[test]
    fn regex_candidate_without_close_on_line_is_code() {
        let src = "x = (/ 2\n";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(kinds(&scan), [(SpanKind::Code, src)]);
    }

    #[test]
    fn nestable_block_comments_track_depth() {
        let src = "/* a /* b */ c */ val x = 1";
        let kotlin = scan(src, &KOTLIN);
        assert_eq!(comments(&kotlin), [(SpanKind::BlockComment, "/* a /* b */ c */")]);

        let csharp = scan(src, &CSHARP);
        assert_eq!(comments(&csharp), [(SpanKind::BlockComment, "/* a /* b */")]);
    }

    #[test]
    fn directive_lines_are_atomic() {
        let src = "#pragma warning disable CS1591 // why\n  #region Main /* x */\nint a;\n";
        let scan = scan(src, &CSHARP);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::Directive, "#pragma warning disable CS1591 // why"),
                (SpanKind::Directive, "#region Main /* x */"),
            ]
        );
        assert_eq!(scan.spans[0].start_line, 1);
        assert_eq!(scan.spans[2].start_line, 2);
    }

    #[test]
    fn directive_prefix_needs_a_word_boundary_and_line_start() {
        let src = "#ifdef X\nx = 1; #if Y\n";
        let scan = scan(src, &CSHARP);
        assert!(comments(&scan).is_empty());
    }

    #[test]
    fn line_start_tracks_each_line() {
        let src = "x = 1; #if Y\n  #region R\nint a; /* c */ #endregion\n\t#endregion\n";
        let lines = scan(src, &CSHARP);
        assert_eq!(
            comments(&lines),
            [
                (SpanKind::Directive, "#region R"),
                (SpanKind::BlockComment, "/* c */"),
                (SpanKind::Directive, "#endregion"),
            ]
        );

        let long = format!("{}\n  #endif\n", "x #if ".repeat(20_000));
        let many = scan(&long, &CSHARP);
        assert_eq!(comments(&many), [(SpanKind::Directive, "#endif")]);
        assert_eq!(many.reassemble(), long);
    }

    #[test]
    fn shebang_only_at_offset_zero() {
        let src = "#!/usr/bin/env node\n// c\n";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::Directive, "#!/usr/bin/env node"),
                (SpanKind::LineComment, "// c"),
            ]
        );
    }

    #[test]
    fn doc_comments_are_tagged() {
        let src = "/// doc\n//// rule\n/** d */\n/**/\n/*** banner */\n";
        let scan = scan(src, &SWIFT);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::DocComment, "/// doc"),
                (SpanKind::LineComment, "//// rule"),
                (SpanKind::DocComment, "/** d */"),
                (SpanKind::BlockComment, "/**/"),
                (SpanKind::BlockComment, "/*** banner */"),
            ]
        );
    }

    #[test]
    fn line_comments_exclude_carriage_returns() {
        let src = "a(); // x\r\nb();\r\n";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// x")]);
        assert_eq!(scan.reassemble(), src);
    }

    #[test]
    fn unterminated_string_absorbs_the_rest() {
        let src = "x = \"open // not a comment\ny();";
        let scan = scan(src, &JAVASCRIPT);
        let last = scan.spans.last().unwrap();
        assert_eq!(last.kind, SpanKind::StringLiteral);
        assert_eq!(last.end, src.len());
        assert_eq!(
            scan.warnings,
            [Warning::UnterminatedConstruct {
                kind: SpanKind::StringLiteral,
                offset: 4,
                line: 1
            }]
        );
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let src = "a;\n/* never closed\nb;";
        let scan = scan(src, &KOTLIN);
        assert_eq!(scan.spans.last().unwrap().kind, SpanKind::BlockComment);
        assert_eq!(
            scan.warnings,
            [Warning::UnterminatedConstruct {
                kind: SpanKind::BlockComment,
                offset: 3,
                line: 2
            }]
        );
    }

    #[test]
    fn unclosed_hole_degrades_to_code() {
        let src = "t = `a ${b\n// c\n";
        let scan = scan(src, &JAVASCRIPT);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// c")]);
        assert_eq!(scan.reassemble(), src);
        assert_eq!(
            scan.warnings,
            [
                Warning::UnterminatedConstruct {
                    kind: SpanKind::TemplateLiteral,
                    offset: 4,
                    line: 1
                },
                Warning::UnbalancedInterpolation { offset: 7, line: 1 },
            ]
        );
    }

    #[test]
    fn csharp_string_forms() {
        let src = concat!(
            "var a = @\"C:\\dir\\\"\"// x\"\"\";\n",
            "var b = $\"{{not}} {x /* c */} // y\";\n",
            "var c = \"\"\"\n  /* raw */ \"quoted\"\n  \"\"\";\n",
            "var d = '\\'';\n",
        );
        let scan = scan(src, &CSHARP);
        assert_eq!(comments(&scan), [(SpanKind::BlockComment, "/* c */")]);
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn kotlin_raw_strings_are_opaque_and_close_greedily() {
        let src = "val s = \"\"\"// not \"quoted\"\"\"\"\nval t = 1 // yes\n";
        let scan = scan(src, &KOTLIN);
        assert!(kinds(&scan).contains(&(SpanKind::StringLiteral, "\"\"\"// not \"quoted\"\"\"\"")));
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// yes")]);
    }

    #[test]
    fn swift_interpolation_nests_parentheses() {
        let src = "let s = \"a \\(f(x) /* c */) // no\" // yes\n";
        let scan = scan(src, &SWIFT);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::BlockComment, "/* c */"),
                (SpanKind::LineComment, "// yes"),
            ]
        );
    }

    #[test]
    fn swift_compiler_directives_and_raw_strings() {
        let src = "#if DEBUG // dbg\nlet r = #\"raw \" // still\"#\n#endif\n";
        let scan = scan(src, &SWIFT);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::Directive, "#if DEBUG // dbg"),
                (SpanKind::Directive, "#endif"),
            ]
        );
    }

    #[test]
    fn php_hash_comments_attributes_and_close_tags() {
        let src = "<?php\n#[Attr] # note\n$a = 1; // x ?> <b>// html</b>\n";
        let scan = scan(src, &PHP);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::LineComment, "# note"),
                (SpanKind::LineComment, "// x "),
            ]
        );
    }

    #[test]
    fn php_inline_html_is_opaque() {
        let src = "<p>// not php</p>\n<?php $a = 1; # x\n?>\n<!-- html --> // text\n<?= $b /* y */ ?>\n";
        let scan = scan(src, &PHP);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::LineComment, "# x"),
                (SpanKind::BlockComment, "/* y */"),
            ]
        );
        assert_eq!(scan.spans[0].kind, SpanKind::TemplateLiteral);
        assert_eq!(scan.reassemble(), src);
    }

    #[test]
    fn php_heredoc_bodies_are_opaque() {
        let src = "<?php\n$s = <<<EOT\n// inside\n/* also */\n  EOT;\n// outside\n$n = <<<'RAW'\n# x\nRAW;\n";
        let scan = scan(src, &PHP);
        assert_eq!(comments(&scan), [(SpanKind::LineComment, "// outside")]);
        assert!(kinds(&scan).contains(&(SpanKind::StringLiteral, "<<<EOT\n// inside\n/* also */\n  EOT")));
    }

    #[test]
    fn jsx_markup_is_opaque_and_brace_comments_are_blocks() {
        let src = concat!(
            "const el = (\n",
            "  <div className=\"a // b\">\n",
            "    {/* Logo */}\n",
            "    <p>Don't // panic</p>\n",
            "    {items.map(i => <li key={i}>{i}</li>) /* inner */}\n",
            "  </div>\n",
            ");\n",
            "// after\n",
        );
        let scan = scan(src, &TSX);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::BlockComment, "{/* Logo */}"),
                (SpanKind::BlockComment, "/* inner */"),
                (SpanKind::LineComment, "// after"),
            ]
        );
        assert!(scan.warnings.is_empty());
        assert_eq!(scan.reassemble(), src);
    }

    #[test]
    fn comparison_is_not_markup() {
        let src = "if (a < b) { c(); } // x\nconst f = <T,>(v: T) => v; // y\n";
        let scan = scan(src, &TSX);
        assert_eq!(
            comments(&scan),
            [
                (SpanKind::LineComment, "// x"),
                (SpanKind::LineComment, "// y"),
            ]
        );
    }

    #[test]
    fn line_numbers_follow_the_text() {
        let src = "a\n/* b\nc */\nd // e\n";
        let scan = scan(src, &JAVASCRIPT);
        let block = scan
            .spans
            .iter()
            .find(|s| s.kind == SpanKind::BlockComment)
            .unwrap();
        assert_eq!((block.start_line, block.end_line), (2, 3));
        let line = scan
            .spans
            .iter()
            .find(|s| s.kind == SpanKind::LineComment)
            .unwrap();
        assert_eq!((line.start_line, line.end_line), (4, 4));
    }
}
