use lpc_source::Range;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unexpected {found}, expected {expected}")]
    #[diagnostic(code(lpc_syntax::unexpected_token))]
    Unexpected {
        expected: String,
        found: String,
        #[label("here")]
        span: SourceSpan,
        range: Range,
    },

    #[error("invalid character `{text}`")]
    #[diagnostic(code(lpc_syntax::invalid_token))]
    InvalidToken {
        text: String,
        #[label("not valid LPC")]
        span: SourceSpan,
        range: Range,
    },

    #[error("unterminated {construct}")]
    #[diagnostic(code(lpc_syntax::unterminated), help("add the closing `{closer}`"))]
    Unterminated {
        construct: &'static str,
        closer: &'static str,
        #[label("opened here")]
        span: SourceSpan,
        range: Range,
    },
}

impl SyntaxError {
    pub fn range(&self) -> Range {
        match self {
            SyntaxError::Unexpected { range, .. }
            | SyntaxError::InvalidToken { range, .. }
            | SyntaxError::Unterminated { range, .. } => *range,
        }
    }
}

/// Raised by the fast prediction tier when it cannot decide between two
/// readings without looking at declarations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ParseAbort {
    #[error("ambiguous construct at token {token}")]
    Ambiguity { token: usize },
}
