use super::span::{Classified, SpanKind};

/// Rebuild `source` without its removable spans.
///
/// A line holding nothing but comments disappears with its terminator, a
/// trailing comment takes the gap before it and a leading comment the gap
/// after it. Only whitespace inside neighbouring code spans is swallowed.
/// `spans` must be the classified partition of `source`.
pub fn rebuild(source: &str, spans: &[Classified<'_>]) -> String {
    let removals = removals(spans);
    if removals.is_empty() {
        return source.to_string();
    }

    let src = source.as_bytes();
    let mut edits: Vec<Edit> = removals
        .iter()
        .zip(surroundings(src, &removals))
        .map(|(removal, around)| edit_for(src, removal, &around))
        .collect();
    edits.sort_by_key(|e| e.start);
    let mut edits = merge(edits);
    keep_missing_final_newline(src, &mut edits);

    let mut out = String::with_capacity(source.len());
    let mut at = 0;
    for edit in &edits {
        out.push_str(&source[at..edit.start]);
        if edit.space {
            out.push(' ');
        }
        at = edit.end;
    }
    out.push_str(&source[at..]);
    out
}

/// Replace `start..end` with nothing, or with one space when `space` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    space: bool,
}

/// A removable span and how far whitespace around it may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Removal {
    start: usize,
    end: usize,
    /// Start of the code span right before, else `start`.
    back: usize,
    /// End of the code span right after, else `end`.
    ahead: usize,
}

/// Line context of one removal. Other removals count as blank and are
/// skipped when looking for neighbouring bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Surroundings {
    line_start: usize,
    /// Offset of the next line feed, or the input length.
    eol: usize,
    blank_before: bool,
    blank_after: bool,
    byte_before: Option<u8>,
    byte_after: Option<u8>,
}

fn removals(spans: &[Classified<'_>]) -> Vec<Removal> {
    let is_code = |c: &Classified<'_>| c.span.kind == SpanKind::Code;
    spans
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_removable() && !c.span.is_empty())
        .map(|(i, c)| {
            let (start, end) = (c.span.start, c.span.end);
            let back = match i.checked_sub(1).map(|j| &spans[j]) {
                Some(prev) if is_code(prev) => prev.span.start,
                _ => start,
            };
            let ahead = match spans.get(i + 1) {
                Some(next) if is_code(next) => next.span.end,
                _ => end,
            };
            Removal {
                start,
                end,
                back,
                ahead,
            }
        })
        .collect()
}

/// One forward and one backward sweep over the sorted removals, each byte
/// visited once per direction.
fn surroundings(src: &[u8], removals: &[Removal]) -> Vec<Surroundings> {
    let mut out = Vec::with_capacity(removals.len());

    let mut pos = 0;
    let mut line_start = 0;
    let mut blank = true;
    let mut kept = None;
    for r in removals {
        for (i, &b) in src[pos..r.start].iter().enumerate() {
            if b == b'\n' {
                line_start = pos + i + 1;
                blank = true;
            } else if !is_space(b) {
                blank = false;
            }
            kept = Some(b);
        }
        out.push(Surroundings {
            line_start,
            eol: src.len(),
            blank_before: blank,
            blank_after: true,
            byte_before: kept,
            byte_after: None,
        });
        if let Some(i) = src[r.start..r.end].iter().rposition(|&b| b == b'\n') {
            line_start = r.start + i + 1;
            blank = true;
        }
        pos = r.end;
    }

    let mut pos = src.len();
    let mut eol = src.len();
    let mut blank = true;
    let mut kept = None;
    for (r, around) in removals.iter().zip(out.iter_mut()).rev() {
        for (i, &b) in src[r.end..pos].iter().enumerate().rev() {
            if b == b'\n' {
                eol = r.end + i;
                blank = true;
            } else if !is_space(b) {
                blank = false;
            }
            kept = Some(b);
        }
        around.eol = eol;
        around.blank_after = blank;
        around.byte_after = kept;
        if let Some(i) = src[r.start..r.end].iter().position(|&b| b == b'\n') {
            eol = r.start + i;
            blank = true;
        }
        pos = r.start;
    }

    out
}

fn edit_for(src: &[u8], r: &Removal, around: &Surroundings) -> Edit {
    match (around.blank_before, around.blank_after) {
        // Nothing but comments on the line(s): drop them whole.
        (true, true) => Edit {
            start: around.line_start,
            end: (around.eol + 1).min(src.len()),
            space: false,
        },
        // Trailing: take the gap back to the code.
        (false, true) => Edit {
            start: skip_spaces_back(src, r.start, r.back),
            end: r.end,
            space: false,
        },
        // Leading: keep the indentation, take the gap up to the code.
        (true, false) => Edit {
            start: r.start,
            end: skip_spaces(src, r.end, r.ahead),
            space: false,
        },
        (false, false) => middle(src, r, around),
    }
}

fn middle(src: &[u8], r: &Removal, around: &Surroundings) -> Edit {
    let left_ws = around.byte_before.is_some_and(is_space);
    let right_ws = around.byte_after.is_some_and(is_space);
    match (around.byte_before, around.byte_after) {
        _ if left_ws && right_ws => Edit {
            start: r.start,
            end: skip_spaces(src, r.end, r.ahead),
            space: false,
        },
        (Some(l), Some(r_byte)) if !left_ws && !right_ws => Edit {
            start: r.start,
            end: r.end,
            space: would_fuse(l, r_byte),
        },
        _ => Edit {
            start: r.start,
            end: r.end,
            space: false,
        },
    }
}

fn skip_spaces(src: &[u8], mut pos: usize, limit: usize) -> usize {
    while pos < limit && is_space(src[pos]) {
        pos += 1;
    }
    pos
}

fn skip_spaces_back(src: &[u8], mut pos: usize, floor: usize) -> usize {
    while pos > floor && is_space(src[pos - 1]) {
        pos -= 1;
    }
    pos
}

/// A removed unterminated last line takes the preceding line break with
/// it, so the output ends the way the input did.
fn keep_missing_final_newline(src: &[u8], edits: &mut [Edit]) {
    if src.last() == Some(&b'\n') {
        return;
    }
    let floor = match &*edits {
        [.., prev, _] => prev.end,
        _ => 0,
    };
    let Some(last) = edits.last_mut() else {
        return;
    };
    if last.end != src.len() || last.start <= floor || src[last.start - 1] != b'\n' {
        return;
    }
    last.start -= 1;
    if last.start > floor && src[last.start - 1] == b'\r' {
        last.start -= 1;
    }
}

fn merge(edits: Vec<Edit>) -> Vec<Edit> {
    let mut merged: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        match merged.last_mut() {
            Some(prev) if edit.start <= prev.end => {
                prev.end = prev.end.max(edit.end);
                prev.space |= edit.space;
            }
            _ => merged.push(edit),
        }
    }
    merged
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c')
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || !b.is_ascii()
}

fn is_operator(b: u8) -> bool {
    b"+-*/%&|^!~<>=?:.#@".contains(&b)
}

/// Whether `l` and `r` written side by side would read as one token.
fn would_fuse(l: u8, r: u8) -> bool {
    (is_word(l) && is_word(r)) || (is_operator(l) && is_operator(r))
}
