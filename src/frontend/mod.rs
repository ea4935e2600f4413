//! Frontend module - Lexer, Preprocessor, Parser, Symbol table

pub mod token;
pub mod lexer;
pub mod preprocessor;
pub mod const_eval;
pub mod ast;
pub mod parser;
mod parser_expr;
pub mod symbols;
