//! Lexer for macro tag bodies using logos
//!
//! Only the flat stretches of a tag body go through logos. Quoted strings and
//! nested tags are cut out beforehand by the scanner and enter the token stream
//! as [`Token::Str`] and [`Token::Fragment`].

use logos::Logos;

use crate::error::ParseError;
use crate::parser::ast::{Fragment, Span};

/// Tokens of a macro tag body
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Macro path, attribute name or bare attribute value
    Word(String),
    /// `=`
    Equals,
    /// `|` introducing a filter
    Pipe,
    /// Quoted string without tags, escapes resolved
    Str(String),
    /// Nested tag, or quoted string containing tags
    Fragment(Fragment),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum FlatToken {
    #[token("=")]
    Equals,

    #[token("|")]
    Pipe,

    #[regex(r#"[^ \t\n\r=|"']+"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Lex `source[span]` into tokens whose spans are offsets into `source`
pub fn lex(source: &str, span: Span) -> Result<Vec<(Token, Span)>, ParseError> {
    let offset = span.start;
    let mut tokens = Vec::new();

    for (tok, range) in FlatToken::lexer(&source[span]).spanned() {
        let range = range.start + offset..range.end + offset;
        let tok = tok.map_err(|_| ParseError::Syntax {
            span: range.clone(),
            message: format!("Unexpected character '{}'", &source[range.clone()]),
            expected: vec![],
        })?;
        let token = match tok {
            FlatToken::Equals => Token::Equals,
            FlatToken::Pipe => Token::Pipe,
            FlatToken::Word(w) => Token::Word(w),
        };
        tokens.push((token, range));
    }

    Ok(tokens)
}
