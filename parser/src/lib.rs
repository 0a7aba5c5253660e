//! Parser for the SPPL probabilistic programming language.
//!
//! SPPL programs are a sequence of statements (random draws, assignments,
//! observations, control flow, marginalization operators) terminated by a
//! single `return` expression. This crate turns program text into the
//! [`ast::Program`] consumed by the inference engine.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use self::{
    lexer::{Lexer, LexicalError, Token},
    parser::{ParseError, Parser},
};

/// Parses a complete SPPL program from source text.
pub fn parse(source: &str) -> Result<ast::Program, ParseError> {
    Parser::new(source)?.parse_program()
}
