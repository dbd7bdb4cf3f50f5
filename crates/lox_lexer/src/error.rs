use crate::token::Span;
use std::fmt;

/// Lexical errors are also surfaced inline as `TokenKind::Error` tokens so the
/// compiler can report them at the point of use without aborting the token
/// stream; this type exists for callers (tests, tooling) that want to collect
/// them separately via [`crate::tokenize`].
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.span.line, self.message)
    }
}

impl std::error::Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;
