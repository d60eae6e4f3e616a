//! steward-lang: manifest language frontend
//!
//! This crate turns manifest text into an abstract syntax tree. It knows
//! nothing about resource types, scopes, or the host system; those live in
//! steward-core and steward-resource.

pub mod ast;
mod error;
mod lexer;
mod parser;

pub use error::ParseError;
pub use lexer::{lex, Spanned, Token};
pub use parser::parse;

/// Result type for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;
