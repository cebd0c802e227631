//! Parser implementation using chumsky
//!
//! Skin text is first cut into literal text and tags by the scanner. Each tag
//! body is then tokenized and parsed on its own, so a malformed tag never
//! swallows the literal text around it.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};
use crate::parser::scanner::{self, Chunk, Segment};

/// Result of parsing a complete skin source
#[derive(Debug)]
pub(crate) struct Parsed {
    pub nodes: Vec<Node>,
    pub subskins: SubskinMap,
}

/// What a single tag turned out to be
enum TagKind {
    Comment,
    Subskin(String),
    Macro(MacroTag),
}

struct TagParts {
    path: Spanned<MacroPath>,
    attributes: Vec<Spanned<Attribute>>,
    filters: Vec<Spanned<FilterCall>>,
}

/// Parse a skin source into nodes and subskin sections
pub(crate) fn parse_document(source: &str) -> Result<Parsed, Vec<ParseError>> {
    let segments = scanner::segments(source, 0..source.len()).map_err(|e| vec![e])?;

    let mut errors = Vec::new();
    let mut nodes = Vec::new();
    let mut subskins = SubskinMap::new();
    let mut current = MAIN_SUBSKIN.to_string();
    let mut section_start = 0;

    for segment in segments {
        match segment {
            Segment::Text(span) => nodes.push(literal(source, span)),
            Segment::Tag { outer, body } => match parse_tag(source, outer, body) {
                Ok(TagKind::Comment) => {}
                Ok(TagKind::Subskin(name)) => {
                    close_section(&mut subskins, &current, section_start..nodes.len());
                    current = name;
                    section_start = nodes.len();
                }
                Ok(TagKind::Macro(tag)) => nodes.push(Node::Macro(tag)),
                Err(mut errs) => errors.append(&mut errs),
            },
        }
    }
    close_section(&mut subskins, &current, section_start..nodes.len());
    subskins.entry(MAIN_SUBSKIN.to_string()).or_default();

    if errors.is_empty() {
        Ok(Parsed { nodes, subskins })
    } else {
        Err(errors)
    }
}

/// Parse a nested node list, as found inside attribute values
fn parse_fragment(source: &str, range: Span) -> Result<Fragment, Vec<ParseError>> {
    let segments = scanner::segments(source, range).map_err(|e| vec![e])?;
    let mut nodes = Vec::new();

    for segment in segments {
        match segment {
            Segment::Text(span) => nodes.push(literal(source, span)),
            Segment::Tag { outer, body } => match parse_tag(source, outer.clone(), body)? {
                TagKind::Comment => {}
                TagKind::Subskin(_) => {
                    return Err(vec![ParseError::InvalidSubskin {
                        span: outer,
                        message: "subskin markers are not allowed inside macro tags".to_string(),
                    }])
                }
                TagKind::Macro(tag) => nodes.push(Node::Macro(tag)),
            },
        }
    }

    Ok(Fragment { nodes })
}

fn literal(source: &str, span: Span) -> Node {
    Node::Literal(Spanned::new(source[span.clone()].to_string(), span))
}

fn close_section(subskins: &mut SubskinMap, name: &str, range: std::ops::Range<usize>) {
    let ranges = subskins.entry(name.to_string()).or_default();
    if !range.is_empty() {
        ranges.push(range);
    }
}

fn parse_tag(source: &str, outer: Span, body: Span) -> Result<TagKind, Vec<ParseError>> {
    let text = &source[body.clone()];
    let trimmed = text.trim_start();

    if trimmed.starts_with("//") {
        return Ok(TagKind::Comment);
    }

    if let Some(rest) = trimmed.strip_prefix('#') {
        let name = rest.trim();
        if !is_path_segment(name) {
            return Err(vec![ParseError::InvalidSubskin {
                span: outer,
                message: format!("'{}' is not a valid subskin name", name),
            }]);
        }
        return Ok(TagKind::Subskin(name.to_string()));
    }

    if trimmed.trim_end().is_empty() {
        return Err(vec![ParseError::EmptyTag { span: outer }]);
    }

    let tokens = tag_tokens(source, body.clone())?;
    let end = body.end;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream =
        Stream::from_iter(token_iter).map((end..end).into(), |(t, s): (_, _)| (t, s));

    let parts = tag_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(ParseError::from).collect::<Vec<_>>())?;

    Ok(TagKind::Macro(MacroTag {
        path: parts.path,
        attributes: parts.attributes,
        filters: parts.filters,
        raw: source[outer.clone()].to_string(),
        span: outer,
    }))
}

/// Tokenize a tag body, turning quoted strings and nested tags into tokens
fn tag_tokens(source: &str, body: Span) -> Result<Vec<(Token, Span)>, Vec<ParseError>> {
    let mut tokens = Vec::new();

    for chunk in scanner::chunk_body(source, body).map_err(|e| vec![e])? {
        match chunk {
            Chunk::Flat(span) => {
                tokens.extend(lexer::lex(source, span).map_err(|e| vec![e])?);
            }
            Chunk::Quoted {
                span,
                inner,
                has_tags: false,
            } => tokens.push((Token::Str(scanner::unescape(&source[inner])), span)),
            Chunk::Quoted {
                span,
                inner,
                has_tags: true,
            } => tokens.push((Token::Fragment(parse_fragment(source, inner)?), span)),
            Chunk::Nested(span) => {
                tokens.push((Token::Fragment(parse_fragment(source, span.clone())?), span))
            }
        }
    }

    Ok(tokens)
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn tag_parser<'a, I>() -> impl Parser<'a, I, TagParts, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let path = select! {
        Token::Word(w) => w,
    }
    .try_map(|w, span| MacroPath::parse(&w).map_err(|msg| Rich::custom(span, msg)))
    .map_with(|p, e| Spanned::new(p, span_range(&e.span())))
    .labelled("macro name");

    let value = select! {
        Token::Word(w) => AttrValue::Literal(w),
        Token::Str(s) => AttrValue::Literal(s),
        Token::Fragment(f) => AttrValue::Fragment(f),
    }
    .labelled("attribute value");

    // name=value
    let named = select! {
        Token::Word(w) => w,
    }
    .then_ignore(just(Token::Equals))
    .then(value.clone())
    .map(|(name, value)| Attribute {
        name: Some(name),
        value,
    });

    // Bare value: positional argument or flag
    let positional = value.map(|value| Attribute { name: None, value });

    let attributes = choice((named, positional))
        .map_with(|a, e| Spanned::new(a, span_range(&e.span())))
        .repeated()
        .collect::<Vec<_>>();

    let filter = just(Token::Pipe)
        .ignore_then(path.clone())
        .then(attributes.clone())
        .map_with(|(path, attributes), e| {
            Spanned::new(FilterCall { path, attributes }, span_range(&e.span()))
        });

    path.then(attributes)
        .then(filter.repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|((path, attributes), filters)| TagParts {
            path,
            attributes,
            filters,
        })
}
