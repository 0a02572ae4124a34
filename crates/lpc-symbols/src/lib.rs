//! Scoped symbol tables for LPC source units.
//!
//! Each source unit owns one [`SymbolTable`]. Tables refer to each other
//! only by [`TableId`] and find one another through a [`TableProvider`], so
//! a table can depend on tables owned elsewhere (builtin tables, included
//! or inherited files) and dependency cycles stay harmless.

pub mod collector;
pub mod error;
pub mod symbol;
pub mod table;

pub use collector::{collect, CollectOptions, CollectOutput, Import, ImportKind, ImportTarget};
pub use error::SymbolError;
pub use symbol::{Symbol, SymbolData, SymbolId, SymbolKind, SymbolRef, TableId};
pub use table::{AllSymbols, SymbolTable, TableProvider};
