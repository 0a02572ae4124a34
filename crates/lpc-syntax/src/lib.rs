//! LPC lexer, parser and concrete syntax tree.
//!
//! [`parse_source`] is the entry point used by source units: it lexes the
//! text and parses with the fast prediction strategy, re-running the
//! exhaustive one if the fast one reports an ambiguity. The resulting
//! [`SyntaxTree`] keeps every significant token so positions can be mapped
//! back to grammar rules, which is what [`collect_candidates`] builds on.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use error::{ParseAbort, SyntaxError};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{
    collect_candidates, parse_expression, parse_source, parse_tokens, parse_two_tier,
    CandidateSet, ParseOutput, PredictionMode,
};
pub use tree::{token_index_at, Element, NodeData, NodeId, RuleKind, SyntaxTree};
