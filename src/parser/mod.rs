//! Parser for skin sources

pub mod ast;
mod grammar;
pub mod lexer;
mod scanner;

pub use ast::*;
pub(crate) use grammar::parse_document;
