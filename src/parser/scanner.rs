//! Delimiter scanning for `<% ... %>` tags
//!
//! Tags nest: an attribute value may itself be a tag, so the closing `%>` of
//! the outer tag is found by counting delimiters rather than by searching for
//! the first `%>`. All spans are byte offsets into the complete skin source.

use crate::error::ParseError;
use crate::parser::ast::Span;

pub(crate) const OPEN: &str = "<%";
pub(crate) const CLOSE: &str = "%>";

/// Top-level piece of a source range
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(Span),
    /// `outer` includes the delimiters, `body` is what lies between them
    Tag { outer: Span, body: Span },
}

/// Piece of a tag body, as seen by the tag lexer
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Chunk {
    /// Plain tokens: words, `=`, `|`
    Flat(Span),
    /// Quoted string; `inner` excludes the quotes
    Quoted {
        span: Span,
        inner: Span,
        has_tags: bool,
    },
    /// A complete nested tag including its delimiters
    Nested(Span),
}

/// Split `source[range]` into literal text and tags
pub(crate) fn segments(source: &str, range: Span) -> Result<Vec<Segment>, ParseError> {
    let mut out = Vec::new();
    let mut pos = range.start;

    while pos < range.end {
        let Some(open) = find(source, OPEN, pos, range.end) else {
            out.push(Segment::Text(pos..range.end));
            break;
        };
        if open > pos {
            out.push(Segment::Text(pos..open));
        }
        let close = find_tag_end(source, open + OPEN.len(), range.end)
            .ok_or(ParseError::UnterminatedTag {
                span: open..range.end,
            })?;
        out.push(Segment::Tag {
            outer: open..close + CLOSE.len(),
            body: open + OPEN.len()..close,
        });
        pos = close + CLOSE.len();
    }

    Ok(out)
}

/// Position of the `%>` closing a tag whose body starts at `from`
pub(crate) fn find_tag_end(source: &str, from: usize, limit: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 1usize;
    let mut i = from;

    while i + 1 < limit {
        match (bytes[i], bytes[i + 1]) {
            (b'<', b'%') => {
                depth += 1;
                i += 2;
            }
            (b'%', b'>') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    None
}

/// Split a tag body into flat stretches, quoted strings and nested tags
pub(crate) fn chunk_body(source: &str, body: Span) -> Result<Vec<Chunk>, ParseError> {
    let bytes = source.as_bytes();
    let mut chunks = Vec::new();
    let mut flat_start = body.start;
    let mut i = body.start;

    let flush = |chunks: &mut Vec<Chunk>, start: usize, end: usize| {
        if end > start {
            chunks.push(Chunk::Flat(start..end));
        }
    };

    while i < body.end {
        match bytes[i] {
            b'<' if i + 1 < body.end && bytes[i + 1] == b'%' => {
                flush(&mut chunks, flat_start, i);
                let close = find_tag_end(source, i + OPEN.len(), body.end)
                    .ok_or(ParseError::UnterminatedTag { span: i..body.end })?;
                chunks.push(Chunk::Nested(i..close + CLOSE.len()));
                i = close + CLOSE.len();
                flat_start = i;
            }
            b'"' | b'\'' => {
                flush(&mut chunks, flat_start, i);
                let (end, has_tags) = scan_quoted(source, i, body.end)?;
                chunks.push(Chunk::Quoted {
                    span: i..end + 1,
                    inner: i + 1..end,
                    has_tags,
                });
                i = end + 1;
                flat_start = i;
            }
            _ => i += 1,
        }
    }
    flush(&mut chunks, flat_start, body.end);

    Ok(chunks)
}

/// Returns the index of the closing quote and whether the string holds tags
fn scan_quoted(source: &str, start: usize, limit: usize) -> Result<(usize, bool), ParseError> {
    let bytes = source.as_bytes();
    let quote = bytes[start];
    let mut has_tags = false;
    let mut i = start + 1;

    while i < limit {
        match bytes[i] {
            b'\\' => i += 2,
            b'<' if i + 1 < limit && bytes[i + 1] == b'%' => {
                let close = find_tag_end(source, i + OPEN.len(), limit)
                    .ok_or(ParseError::UnterminatedTag { span: i..limit })?;
                has_tags = true;
                i = close + CLOSE.len();
            }
            c if c == quote => return Ok((i, has_tags)),
            _ => i += 1,
        }
    }

    Err(ParseError::UnterminatedString { span: start..limit })
}

/// Resolve backslash escapes in a quoted attribute value
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(n @ ('"' | '\'' | '\\')) => out.push(n),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn find(source: &str, pat: &str, from: usize, to: usize) -> Option<usize> {
    source[from..to].find(pat).map(|i| i + from)
}
