//! Error types for skin parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("Unterminated macro tag at {span:?}")]
    UnterminatedTag { span: Span },

    #[error("Unterminated string at {span:?}")]
    UnterminatedString { span: Span },

    #[error("Empty macro tag at {span:?}")]
    EmptyTag { span: Span },

    #[error("Invalid subskin marker at {span:?}: {message}")]
    InvalidSubskin { span: Span, message: String },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. }
            | ParseError::UnterminatedTag { span }
            | ParseError::UnterminatedString { span }
            | ParseError::EmptyTag { span }
            | ParseError::InvalidSubskin { span, .. } => span,
        }
    }

    fn message(&self) -> String {
        match self {
            ParseError::Syntax {
                message, expected, ..
            } => {
                if expected.is_empty() {
                    message.clone()
                } else {
                    format!("{}\nExpected: {}", message, expected.join(", "))
                }
            }
            ParseError::UnterminatedTag { .. } => "macro tag is never closed with '%>'".to_string(),
            ParseError::UnterminatedString { .. } => "string is never closed".to_string(),
            ParseError::EmptyTag { .. } => "macro tag has no macro name".to_string(),
            ParseError::InvalidSubskin { message, .. } => message.clone(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let span = self.span().clone();
        let title = self.to_string();

        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&title)
            .with_label(
                Label::new((filename, span))
                    .with_message(self.message())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => title,
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of macro tag".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of macro tag".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Word(s) => format!("word '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Fragment(_) => "nested macro tag".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Pipe => "'|'".to_string(),
    }
}
