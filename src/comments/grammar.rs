use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::span::SpanKind;
use crate::error::{Result, StripError};

/// How a quoted literal escapes its own closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// `\"`: a backslash escapes the following character.
    Backslash,
    /// `""`: the closer is repeated to stand for itself.
    Doubled,
    /// Opaque until the closer, no escapes at all.
    None,
}

/// Interpolation hole inside a literal, e.g. `${ ... }` or `\( ... )`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole {
    pub open: &'static str,
    /// Bracket that nests inside the hole (`{` for `${`, `(` for `\(`).
    pub nest: u8,
    pub close: u8,
    /// Sequence that looks like the opener but is a literal escape (`{{`).
    pub escaped_open: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralRule {
    pub open: &'static str,
    pub close: &'static str,
    pub escape: Escape,
    pub kind: SpanKind,
    pub hole: Option<Hole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRule {
    pub open: &'static str,
    pub close: &'static str,
    pub nestable: bool,
    /// Opener that marks a documentation block (`/**`).
    pub doc_open: Option<&'static str>,
}

/// Built-in preserve marker matched against the raw comment text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Contains(&'static str),
    Prefix(&'static str),
}

impl Marker {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Marker::Contains(needle) => text.contains(needle),
            Marker::Prefix(prefix) => text.starts_with(prefix),
        }
    }
}

/// Code islands inside host text, e.g. PHP's `<?php ... ?>` in HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embedding {
    pub open: &'static [&'static str],
    pub close: &'static str,
}

#[derive(Debug)]
pub struct Grammar {
    pub name: &'static str,
    pub line_comments: &'static [&'static str],
    /// Sequences starting with a line-comment prefix that are code (`#[`).
    pub line_comment_exclusions: &'static [&'static str],
    /// Sequences that end a line comment before the line does (`?>`).
    pub line_comment_terminators: &'static [&'static str],
    pub doc_line_markers: &'static [&'static str],
    pub block_comments: &'static [BlockRule],
    /// Ordered longest opener first.
    pub literals: &'static [LiteralRule],
    pub heredoc: bool,
    /// When set, scanning starts in host text and only island contents are code.
    pub embedding: Option<Embedding>,
    pub regex_literals: bool,
    pub markup: bool,
    pub shebang: bool,
    pub directive_prefixes: &'static [&'static str],
    pub preserve: &'static [Marker],
}

const fn lit(open: &'static str, close: &'static str, escape: Escape) -> LiteralRule {
    LiteralRule {
        open,
        close,
        escape,
        kind: SpanKind::StringLiteral,
        hole: None,
    }
}

const fn interpolated(
    open: &'static str,
    close: &'static str,
    escape: Escape,
    kind: SpanKind,
    hole: Hole,
) -> LiteralRule {
    LiteralRule {
        open,
        close,
        escape,
        kind,
        hole: Some(hole),
    }
}

const DOLLAR_BRACE: Hole = Hole {
    open: "${",
    nest: b'{',
    close: b'}',
    escaped_open: None,
};

const CSHARP_BRACE: Hole = Hole {
    open: "{",
    nest: b'{',
    close: b'}',
    escaped_open: Some("{{"),
};

const SWIFT_PAREN: Hole = Hole {
    open: "\\(",
    nest: b'(',
    close: b')',
    escaped_open: None,
};

const PHP_BRACE: Hole = Hole {
    open: "{$",
    nest: b'{',
    close: b'}',
    escaped_open: None,
};

const C_BLOCK: BlockRule = BlockRule {
    open: "/*",
    close: "*/",
    nestable: false,
    doc_open: Some("/**"),
};

const NESTED_C_BLOCK: BlockRule = BlockRule {
    open: "/*",
    close: "*/",
    nestable: true,
    doc_open: Some("/**"),
};

const JS_LITERALS: &[LiteralRule] = &[
    interpolated(
        "`",
        "`",
        Escape::Backslash,
        SpanKind::TemplateLiteral,
        DOLLAR_BRACE,
    ),
    lit("\"", "\"", Escape::Backslash),
    lit("'", "'", Escape::Backslash),
];

const JS_PRESERVE: &[Marker] = &[
    Marker::Prefix("/*!"),
    Marker::Prefix("// @"),
    Marker::Prefix("/* @"),
    Marker::Prefix("//#"),
    Marker::Prefix("//@ sourceMappingURL="),
    Marker::Contains("@preserve"),
    Marker::Contains("@license"),
    Marker::Contains("eslint-disable"),
    Marker::Contains("eslint-enable"),
    Marker::Prefix("/* eslint "),
    Marker::Prefix("/* global "),
    Marker::Prefix("/* jshint "),
    Marker::Contains("istanbul ignore"),
    Marker::Contains("c8 ignore"),
    Marker::Contains("prettier-ignore"),
    Marker::Contains("webpackChunkName"),
    Marker::Contains("#__PURE__"),
    Marker::Contains("@__PURE__"),
];

const TS_PRESERVE: &[Marker] = &[
    Marker::Prefix("/*!"),
    Marker::Prefix("// @"),
    Marker::Prefix("/* @"),
    Marker::Prefix("//#"),
    Marker::Prefix("//@ sourceMappingURL="),
    Marker::Prefix("/// <reference"),
    Marker::Prefix("/// <amd-"),
    Marker::Contains("@preserve"),
    Marker::Contains("@license"),
    Marker::Contains("@ts-ignore"),
    Marker::Contains("@ts-nocheck"),
    Marker::Contains("@ts-check"),
    Marker::Contains("@ts-expect-error"),
    Marker::Contains("@jsx "),
    Marker::Contains("@jsxImportSource"),
    Marker::Contains("@jsxRuntime"),
    Marker::Contains("eslint-disable"),
    Marker::Contains("eslint-enable"),
    Marker::Prefix("/* eslint "),
    Marker::Contains("istanbul ignore"),
    Marker::Contains("c8 ignore"),
    Marker::Contains("prettier-ignore"),
    Marker::Contains("webpackChunkName"),
    Marker::Contains("#__PURE__"),
    Marker::Contains("@__PURE__"),
];

pub static CSHARP: Grammar = Grammar {
    name: "csharp",
    line_comments: &["//"],
    line_comment_exclusions: &[],
    line_comment_terminators: &[],
    doc_line_markers: &["///"],
    block_comments: &[C_BLOCK],
    literals: &[
        interpolated(
            "$@\"",
            "\"",
            Escape::Doubled,
            SpanKind::StringLiteral,
            CSHARP_BRACE,
        ),
        interpolated(
            "@$\"",
            "\"",
            Escape::Doubled,
            SpanKind::StringLiteral,
            CSHARP_BRACE,
        ),
        interpolated(
            "$\"\"\"",
            "\"\"\"",
            Escape::None,
            SpanKind::StringLiteral,
            CSHARP_BRACE,
        ),
        lit("\"\"\"", "\"\"\"", Escape::None),
        interpolated(
            "$\"",
            "\"",
            Escape::Backslash,
            SpanKind::StringLiteral,
            CSHARP_BRACE,
        ),
        lit("@\"", "\"", Escape::Doubled),
        lit("\"", "\"", Escape::Backslash),
        lit("'", "'", Escape::Backslash),
    ],
    heredoc: false,
    embedding: None,
    regex_literals: false,
    markup: false,
    shebang: true,
    directive_prefixes: &[
        "#if",
        "#else",
        "#elif",
        "#endif",
        "#define",
        "#undef",
        "#region",
        "#endregion",
        "#pragma",
        "#nullable",
        "#line",
        "#error",
        "#warning",
    ],
    preserve: &[
        Marker::Contains("ReSharper disable"),
        Marker::Contains("ReSharper restore"),
        Marker::Contains("<auto-generated"),
        Marker::Contains("@license"),
        Marker::Contains("@preserve"),
    ],
};

pub static KOTLIN: Grammar = Grammar {
    name: "kotlin",
    line_comments: &["//"],
    line_comment_exclusions: &[],
    line_comment_terminators: &[],
    doc_line_markers: &[],
    block_comments: &[NESTED_C_BLOCK],
    literals: &[
        interpolated(
            "\"\"\"",
            "\"\"\"",
            Escape::None,
            SpanKind::StringLiteral,
            DOLLAR_BRACE,
        ),
        interpolated(
            "\"",
            "\"",
            Escape::Backslash,
            SpanKind::StringLiteral,
            DOLLAR_BRACE,
        ),
        lit("'", "'", Escape::Backslash),
        lit("`", "`", Escape::None),
    ],
    heredoc: false,
    embedding: None,
    regex_literals: false,
    markup: false,
    shebang: true,
    directive_prefixes: &[],
    preserve: &[
        Marker::Prefix("// @"),
        Marker::Contains("@file:"),
        Marker::Contains("@Suppress"),
        Marker::Contains("@OptIn"),
        Marker::Contains("ktlint-disable"),
        Marker::Contains("ktlint-enable"),
        Marker::Contains("noinspection"),
        Marker::Contains("@license"),
        Marker::Contains("@preserve"),
    ],
};

pub static PHP: Grammar = Grammar {
    name: "php",
    line_comments: &["//", "#"],
    line_comment_exclusions: &["#["],
    line_comment_terminators: &["?>"],
    doc_line_markers: &[],
    block_comments: &[C_BLOCK],
    literals: &[
        interpolated(
            "\"",
            "\"",
            Escape::Backslash,
            SpanKind::StringLiteral,
            PHP_BRACE,
        ),
        lit("'", "'", Escape::Backslash),
        lit("`", "`", Escape::Backslash),
    ],
    heredoc: true,
    embedding: Some(Embedding {
        open: &["<?php", "<?="],
        close: "?>",
    }),
    regex_literals: false,
    markup: false,
    shebang: true,
    directive_prefixes: &[],
    preserve: &[
        Marker::Prefix("#!"),
        Marker::Prefix("// @"),
        Marker::Prefix("/* @"),
        Marker::Prefix("# @"),
        Marker::Contains("@preserve"),
        Marker::Contains("@license"),
        Marker::Contains("@codingStandardsIgnore"),
        Marker::Contains("phpcs:"),
        Marker::Contains("@phan-"),
        Marker::Contains("@phpstan-"),
        Marker::Contains("@psalm-"),
    ],
};

pub static SWIFT: Grammar = Grammar {
    name: "swift",
    line_comments: &["//"],
    line_comment_exclusions: &[],
    line_comment_terminators: &[],
    doc_line_markers: &["///"],
    block_comments: &[NESTED_C_BLOCK],
    literals: &[
        lit("#\"\"\"", "\"\"\"#", Escape::None),
        lit("##\"", "\"##", Escape::None),
        lit("#\"", "\"#", Escape::None),
        interpolated(
            "\"\"\"",
            "\"\"\"",
            Escape::Backslash,
            SpanKind::StringLiteral,
            SWIFT_PAREN,
        ),
        interpolated(
            "\"",
            "\"",
            Escape::Backslash,
            SpanKind::StringLiteral,
            SWIFT_PAREN,
        ),
        lit("`", "`", Escape::None),
    ],
    heredoc: false,
    embedding: None,
    regex_literals: false,
    markup: false,
    shebang: true,
    directive_prefixes: &[
        "#if",
        "#elseif",
        "#else",
        "#endif",
        "#sourceLocation",
        "#warning",
        "#error",
    ],
    preserve: &[
        Marker::Prefix("// @"),
        Marker::Prefix("// MARK:"),
        Marker::Prefix("// TODO:"),
        Marker::Prefix("// FIXME:"),
        Marker::Prefix("// WARNING:"),
        Marker::Prefix("// NOTE:"),
        Marker::Contains("swiftlint:"),
        Marker::Contains("sourcery:"),
        Marker::Contains("@license"),
        Marker::Contains("@preserve"),
    ],
};

pub static JAVASCRIPT: Grammar = JAVASCRIPT_FIELDS;

pub static JSX: Grammar = Grammar {
    name: "jsx",
    markup: true,
    ..JAVASCRIPT_FIELDS
};

pub static TYPESCRIPT: Grammar = Grammar {
    name: "typescript",
    preserve: TS_PRESERVE,
    ..JAVASCRIPT_FIELDS
};

pub static TSX: Grammar = Grammar {
    name: "tsx",
    preserve: TS_PRESERVE,
    markup: true,
    ..JAVASCRIPT_FIELDS
};

// Struct update syntax needs a const source, statics cannot be copied from.
const JAVASCRIPT_FIELDS: Grammar = Grammar {
    name: "javascript",
    line_comments: &["//"],
    line_comment_exclusions: &[],
    line_comment_terminators: &[],
    doc_line_markers: &[],
    block_comments: &[C_BLOCK],
    literals: JS_LITERALS,
    heredoc: false,
    embedding: None,
    regex_literals: true,
    markup: false,
    shebang: true,
    directive_prefixes: &[],
    preserve: JS_PRESERVE,
};

static GRAMMARS: &[&Grammar] = &[
    &CSHARP,
    &KOTLIN,
    &PHP,
    &SWIFT,
    &JAVASCRIPT,
    &TYPESCRIPT,
    &JSX,
    &TSX,
];

static ALIASES: &[(&str, &str)] = &[
    ("cs", "csharp"),
    ("c#", "csharp"),
    ("kt", "kotlin"),
    ("js", "javascript"),
    ("ts", "typescript"),
];

static REGISTRY: Lazy<HashMap<&'static str, &'static Grammar>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static Grammar> =
        GRAMMARS.iter().map(|g| (g.name, *g)).collect();
    for (alias, target) in ALIASES {
        if let Some(grammar) = map.get(target).copied() {
            map.insert(*alias, grammar);
        }
    }
    map
});

/// Resolve a language identifier (case-insensitive, aliases allowed).
pub fn lookup(language: &str) -> Result<&'static Grammar> {
    let key = language.trim().to_ascii_lowercase();
    REGISTRY
        .get(key.as_str())
        .copied()
        .ok_or_else(|| StripError::UnsupportedLanguage(language.to_string()))
}

/// Canonical identifiers of every registered grammar.
pub fn languages() -> impl Iterator<Item = &'static str> {
    GRAMMARS.iter().map(|g| g.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_aliases_case_insensitively() {
        assert_eq!(lookup("CSharp").unwrap().name, "csharp");
        assert_eq!(lookup("c#").unwrap().name, "csharp");
        assert_eq!(lookup(" kt ").unwrap().name, "kotlin");
        assert_eq!(lookup("TS").unwrap().name, "typescript");
        assert_eq!(lookup("tsx").unwrap().name, "tsx");
    }

    #[test]
    fn lookup_rejects_unknown_languages_without_fallback() {
        let err = lookup("cobol").unwrap_err();
        assert_eq!(err, StripError::UnsupportedLanguage("cobol".to_string()));
        assert_eq!(err.to_string(), "Unsupported language: cobol");
    }

    #[test]
    fn every_grammar_is_listed_once() {
        let names: Vec<_> = languages().collect();
        assert_eq!(
            names,
            [
                "csharp",
                "kotlin",
                "php",
                "swift",
                "javascript",
                "typescript",
                "jsx",
                "tsx"
            ]
        );
    }

    #[test]
    fn markup_grammars_extend_their_base() {
        assert!(JSX.markup && TSX.markup);
        assert!(!JAVASCRIPT.markup && !TYPESCRIPT.markup);
        assert!(TSX.regex_literals);
        assert!(TSX.preserve.contains(&Marker::Contains("@ts-ignore")));
        assert!(!JSX.preserve.contains(&Marker::Contains("@ts-ignore")));
    }

    #[test]
    fn literal_openers_are_ordered_longest_first_where_they_overlap() {
        for grammar in GRAMMARS {
            for (i, earlier) in grammar.literals.iter().enumerate() {
                for later in &grammar.literals[i + 1..] {
                    assert!(
                        !later.open.starts_with(earlier.open) || later.open == earlier.open,
                        "{}: {:?} shadows {:?}",
                        grammar.name,
                        earlier.open,
                        later.open
                    );
                }
            }
        }
    }

    #[test]
    fn markers_match_prefix_or_substring() {
        assert!(Marker::Prefix("//#").matches("//# sourceMappingURL=a.map"));
        assert!(!Marker::Prefix("//#").matches("// #"));
        assert!(Marker::Contains("@license").matches("/* @license MIT */"));
    }
}
