//! C++ front end
//!
//! Scanner with an embedded preprocessor, recursive-descent parser and a
//! flat symbol table. The output is a [`TranslationUnit`] meant to be
//! handed to a source-to-source generator.

pub mod frontend;
pub mod utils;

use serde::Serialize;

use frontend::ast::Program;
use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::preprocessor::Diagnostic;
use frontend::symbols::SymbolTable;

pub use utils::{Error, Result, Span};

/// Everything the front end produces for one source file
#[derive(Debug, Clone, Serialize)]
pub struct TranslationUnit {
    pub program: Program,
    pub symbols: SymbolTable,
    /// Preprocessor warnings, in source order
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a complete source file
pub fn parse_source(source: &str) -> Result<TranslationUnit> {
    parse_lexer(Lexer::new(source))
}

/// Parse with object-like macros predefined, as if by `#define` lines
/// ahead of the source
pub fn parse_with_defines<I, K, V>(source: &str, defines: I) -> Result<TranslationUnit>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    parse_lexer(Lexer::with_defines(source, defines))
}

fn parse_lexer(lexer: Lexer) -> Result<TranslationUnit> {
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program()?;
    let (symbols, diagnostics) = parser.into_parts();
    Ok(TranslationUnit {
        program,
        symbols,
        diagnostics,
    })
}
