use decomment::comments::{languages, lookup, scan};
use decomment::{Mode, StripOptions, strip_comments};
use proptest::prelude::*;

/// Arbitrary text rich in delimiters, including some non-ASCII.
fn noisy_source() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop::sample::select(vec![
            "/", "*", "//", "/*", "*/", "#", "#[", "#!", "#if ", "#pragma ", "\"", "'", "`",
            "\"\"\"", "${", "{", "}", "(", ")", "\\(", "\\", "<", ">", "</", "<?php", "?>",
            "<<<EOT\n", "EOT", "@\"", "$\"", "{{", "=", "return", "x", "1", " ", "\t", "\n",
            "\r\n", "é", "字",
        ]),
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

const CODE_TOKENS: &[&str] = &[
    "foo", "bar1", "42", " ", "\n", "\t", "=", "+", "-", "*", "(", ")", "{", "}", "[", "]", ";",
    ",", ".",
];

const LITERAL_TOKENS: &[&str] = &["\"a // b\"", "'c /* d */'", "`e ${foo} // f`"];

const COMMENT_TOKENS: &[&str] = &["// x\n", "/* y */", "/** z */"];

fn program(comments: bool) -> impl Strategy<Value = String> {
    let mut tokens: Vec<&'static str> = CODE_TOKENS.to_vec();
    tokens.extend_from_slice(LITERAL_TOKENS);
    if comments {
        tokens.extend_from_slice(COMMENT_TOKENS);
    }
    proptest::collection::vec(prop::sample::select(tokens), 0..60).prop_map(|parts| parts.concat())
}

fn js_family() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["javascript", "typescript", "jsx", "tsx"])
}

fn aggressive() -> StripOptions {
    StripOptions {
        mode: Mode::Aggressive,
        ..StripOptions::default()
    }
}

proptest! {
    #[test]
    fn spans_reassemble_the_input(input in noisy_source()) {
        for language in languages() {
            let grammar = lookup(language).expect("registered");
            let scan = scan(&input, grammar);
            prop_assert_eq!(scan.reassemble(), input.as_str());

            let mut offset = 0;
            for span in &scan.spans {
                prop_assert_eq!(span.start, offset);
                prop_assert!(!span.is_empty());
                prop_assert_eq!(span.start_line, 1 + input[..span.start].matches('\n').count());
                offset = span.end;
            }
            prop_assert_eq!(offset, input.len());
        }
    }

    #[test]
    fn stripping_never_panics(input in noisy_source()) {
        for language in languages() {
            let out = strip_comments(&input, language, &aggressive()).expect("registered");
            prop_assert!(out.text.len() <= input.len() + out.removed);
        }
    }

    #[test]
    fn comment_free_code_is_unchanged(input in program(false), language in js_family()) {
        let out = strip_comments(&input, language, &aggressive()).expect("registered");
        prop_assert_eq!(out.removed, 0);
        prop_assert_eq!(out.text, input);
    }

    #[test]
    fn literals_survive_comment_removal(input in program(true), language in js_family()) {
        let out = strip_comments(&input, language, &aggressive()).expect("registered");
        for literal in LITERAL_TOKENS {
            prop_assert_eq!(out.text.matches(literal).count(), input.matches(literal).count());
        }
        for comment in ["// x", "/* y */", "/** z */"] {
            prop_assert!(!out.text.contains(comment));
        }
        prop_assert!(out.warnings.is_empty());
    }
}
