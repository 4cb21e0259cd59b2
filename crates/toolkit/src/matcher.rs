//! Line Matcher
//!
//! Locates the before-value of an operation inside a file's lines. Matching is
//! always literal: surrounding whitespace of the expected value is ignored,
//! nothing else is. When the value is not on the requested line the search
//! widens one line at a time up to the fallback window, nearest lines first,
//! and gives up rather than guess when two lines at the same distance match.

use std::ops::Range;

use crate::error::MutationError;
use crate::operation::MutationOperation;

/// Default ±N lines searched when the value is not on the requested line.
pub const DEFAULT_FALLBACK_WINDOW: usize = 5;

/// Where an operation's before-value was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved 1-based line number
    pub line: usize,
    /// Byte span of the matched value within that line (line ending excluded)
    pub span: Range<usize>,
    /// `resolved - requested`; zero when found on the requested line
    pub offset: i64,
}

/// What to look for on a line.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    /// Whole token, bounded by non-token characters
    Token(&'a str),
    /// Literal substring
    Text(&'a str),
    /// Value of a `name: value` / `name="value"` pair; the span covers the value only
    Property { name: &'a str, value: &'a str },
}

impl<'a> Target<'a> {
    pub(crate) fn from_operation(op: &'a MutationOperation) -> Self {
        match op {
            MutationOperation::SetLineToken { old_token, .. } => Target::Token(old_token.trim()),
            MutationOperation::AppendToken { anchor_token, .. } => {
                Target::Token(anchor_token.trim())
            }
            MutationOperation::SetTextRun { old_text, .. } => Target::Text(old_text.trim()),
            MutationOperation::SetPropertyValue {
                property,
                old_value,
                ..
            } => Target::Property {
                name: property.trim(),
                value: old_value.trim(),
            },
        }
    }

    fn needle(&self) -> &'a str {
        match self {
            Target::Token(s) | Target::Text(s) => s,
            Target::Property { value, .. } => value,
        }
    }
}

/// Characters that continue a token (class names, CSS values, identifiers).
pub(crate) fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '/' | '.' | '[' | ']' | '#' | '%')
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '$')
}

fn is_value_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '%' | '#')
}

/// Byte spans of every non-overlapping whole-token occurrence of `token`.
pub(crate) fn token_spans(line: &str, token: &str) -> Vec<Range<usize>> {
    if token.is_empty() {
        return Vec::new();
    }
    let starts_with_token_char = token.chars().next().is_some_and(is_token_char);
    let ends_with_token_char = token.chars().next_back().is_some_and(is_token_char);

    line.match_indices(token)
        .filter(|(start, _)| {
            let end = start + token.len();
            let before_ok = !starts_with_token_char
                || !line[..*start].chars().next_back().is_some_and(is_token_char);
            let after_ok =
                !ends_with_token_char || !line[end..].chars().next().is_some_and(is_token_char);
            before_ok && after_ok
        })
        .map(|(start, _)| start..start + token.len())
        .collect()
}

fn text_spans(line: &str, text: &str) -> Vec<Range<usize>> {
    if text.is_empty() {
        return Vec::new();
    }
    line.match_indices(text)
        .map(|(start, _)| start..start + text.len())
        .collect()
}

fn skip_whitespace(line: &str, mut pos: usize) -> usize {
    while let Some(c) = line[pos..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

fn property_spans(line: &str, name: &str, value: &str) -> Vec<Range<usize>> {
    if name.is_empty() || value.is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();

    for (start, _) in line.match_indices(name) {
        let prev = line[..start].chars().next_back();
        if prev.is_some_and(is_ident_char) {
            continue;
        }
        let mut pos = start + name.len();
        if line[pos..].chars().next().is_some_and(is_ident_char) {
            continue;
        }
        // Closing quote of a quoted key: "color": ...
        if let Some(q @ ('"' | '\'')) = prev {
            if line[pos..].starts_with(q) {
                pos += 1;
            }
        }
        pos = skip_whitespace(line, pos);
        match line[pos..].chars().next() {
            Some(':') | Some('=') => pos += 1,
            _ => continue,
        }
        pos = skip_whitespace(line, pos);

        // Unquoted value
        if line[pos..].starts_with(value) {
            let end = pos + value.len();
            let bounded = !value.chars().next_back().is_some_and(is_value_char)
                || !line[end..].chars().next().is_some_and(is_value_char);
            if bounded {
                spans.push(pos..end);
                continue;
            }
        }

        // Quoted or braced value
        let closer = match line[pos..].chars().next() {
            Some('"') => '"',
            Some('\'') => '\'',
            Some('`') => '`',
            Some('{') => '}',
            _ => continue,
        };
        let inner = pos + 1;
        if line[inner..].starts_with(value) {
            let end = inner + value.len();
            if line[end..].starts_with(closer) {
                spans.push(inner..end);
            }
        }
    }
    spans
}

/// All candidate spans of `target` on a single line.
pub(crate) fn find_spans(line: &str, target: Target<'_>) -> Vec<Range<usize>> {
    match target {
        Target::Token(token) => token_spans(line, token),
        Target::Text(text) => text_spans(line, text),
        Target::Property { name, value } => property_spans(line, name, value),
    }
}

enum LineHit {
    Miss,
    Unique(Range<usize>),
    Ambiguous(usize),
}

fn select(spans: Vec<Range<usize>>, occurrence: Option<usize>) -> LineHit {
    match occurrence {
        Some(n) if n >= 1 && n <= spans.len() => LineHit::Unique(spans[n - 1].clone()),
        Some(_) => LineHit::Miss,
        None => match spans.len() {
            0 => LineHit::Miss,
            1 => LineHit::Unique(spans[0].clone()),
            n => LineHit::Ambiguous(n),
        },
    }
}

/// Resolve an operation against already-split lines (line endings stripped).
pub(crate) fn locate_in_lines(
    lines: &[&str],
    op: &MutationOperation,
    window: usize,
) -> Result<Resolution, MutationError> {
    let target = Target::from_operation(op);
    let needle = target.needle();
    if needle.is_empty() {
        return Err(MutationError::InvalidOperation(
            "expected before-value is empty".to_string(),
        ));
    }
    if let Target::Property { name, .. } = target {
        if name.is_empty() {
            return Err(MutationError::InvalidOperation(
                "property name is empty".to_string(),
            ));
        }
    }

    let requested = op.line();
    if requested == 0 || requested > lines.len() {
        return Err(MutationError::LineOutOfRange {
            line: requested,
            len: lines.len(),
        });
    }

    let hit_at = |line_no: usize| select(find_spans(lines[line_no - 1], target), op.occurrence());

    match hit_at(requested) {
        LineHit::Unique(span) => {
            return Ok(Resolution {
                line: requested,
                span,
                offset: 0,
            })
        }
        LineHit::Ambiguous(count) => {
            return Err(MutationError::AmbiguousMatch {
                needle: needle.to_string(),
                line: requested,
                count,
            })
        }
        LineHit::Miss => {}
    }

    for distance in 1..=window {
        let mut found: Vec<(usize, Range<usize>)> = Vec::new();
        let mut ambiguous = 0usize;

        let above = requested.checked_sub(distance).filter(|l| *l >= 1);
        let below = Some(requested + distance).filter(|l| *l <= lines.len());

        for line_no in [above, below].into_iter().flatten() {
            match hit_at(line_no) {
                LineHit::Unique(span) => found.push((line_no, span)),
                LineHit::Ambiguous(count) => ambiguous += count,
                LineHit::Miss => {}
            }
        }

        if found.len() == 1 && ambiguous == 0 {
            let (line, span) = found.remove(0);
            return Ok(Resolution {
                line,
                span,
                offset: line as i64 - requested as i64,
            });
        }
        if !found.is_empty() || ambiguous > 0 {
            return Err(MutationError::AmbiguousMatch {
                needle: needle.to_string(),
                line: requested,
                count: found.len() + ambiguous,
            });
        }
    }

    Err(MutationError::TokenNotFound {
        needle: needle.to_string(),
        line: requested,
        window,
    })
}

/// Resolve an operation's before-value inside `text` without touching disk.
pub fn locate(
    text: &str,
    op: &MutationOperation,
    window: usize,
) -> Result<Resolution, MutationError> {
    let lines: Vec<&str> = text.lines().collect();
    locate_in_lines(&lines, op, window)
}

/// Lines (1-based) holding the operation's before-value anywhere in `text`,
/// with the number of matches on each. Ignores the requested line.
pub fn matching_lines(text: &str, op: &MutationOperation) -> Vec<(usize, usize)> {
    let target = Target::from_operation(op);
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let count = find_spans(line, target).len();
            (count > 0).then_some((i + 1, count))
        })
        .collect()
}
