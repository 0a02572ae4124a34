use lpc_source::Range;
use miette::Diagnostic;
use thiserror::Error;

use crate::symbol::SymbolId;

/// Errors reported by [`SymbolTable`](crate::SymbolTable) mutations. None of
/// them leave the table in a partial state.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SymbolError {
    /// A second top-level symbol with the same name in a table that
    /// rejects duplicates.
    #[error("`{name}` is already declared")]
    #[diagnostic(
        code(lpc_symbols::duplicate_declaration),
        help("shared tables keep the first declaration of a name")
    )]
    DuplicateDeclaration {
        name: String,
        range: Range,
        previous: Range,
    },

    #[error("symbol {0:?} does not belong to this table")]
    #[diagnostic(code(lpc_symbols::unknown_parent))]
    UnknownParent(SymbolId),
}
