//! Error handling for the front end

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal front-end error. Any of these aborts the parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Parser Errors ====================
    #[error("{span}: expected {expected}, found {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("{span}: expected identifier, found {got}")]
    ExpectedIdent { got: String, span: Span },

    #[error("{span}: expected type, found {got}")]
    ExpectedType { got: String, span: Span },

    #[error("{span}: expected expression, found {got}")]
    ExpectedExpr { got: String, span: Span },

    // ==================== Lexical Errors ====================
    /// An error-kind token reached the parser
    #[error("{span}: {message}")]
    Lexical { message: String, span: Span },
}

impl Error {
    /// Position of the offending token
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::ExpectedIdent { span, .. }
            | Self::ExpectedType { span, .. }
            | Self::ExpectedExpr { span, .. }
            | Self::Lexical { span, .. } => *span,
        }
    }
}
