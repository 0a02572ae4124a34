//! Cross-file semantic analysis for LPC.
//!
//! This crate is responsible for:
//! - Source units: per-file text, tree, symbol table and diagnostics
//! - The [`Workspace`] registry that loads units on demand and wires their
//!   tables together through includes, inherits and call-others
//! - The reference mesh recording which unit sees which
//! - Partial evaluation, which tells remote calls from struct member access
//! - Editor queries: definitions, completion candidates, folding ranges
//!
//! ```no_run
//! use std::path::Path;
//! use lpc_analysis::Workspace;
//!
//! let mut ws = Workspace::load(Path::new("/mud/lib"))?;
//! let room = ws.open(Path::new("/mud/lib/room/start.c"))?;
//! for diagnostic in ws.diagnostics(room) {
//!     println!("{diagnostic:?}");
//! }
//! # Ok::<(), lpc_analysis::AnalysisError>(())
//! ```

mod completion;
mod error;
pub mod eval;
mod folding;
pub mod mesh;
mod navigate;
mod semantic;
mod unit;
mod workspace;

pub use completion::CompletionCandidate;
pub use error::{AnalysisError, AnalysisResult};
pub use eval::{ArrowResolution, Value, MAX_CALL_DEPTH};
pub use folding::{folding_ranges, FoldingKind, FoldingRange};
pub use mesh::ReferenceMesh;
pub use navigate::Definition;
pub use unit::{ParseSummary, SourceUnit, UnitId, UnitState};
pub use workspace::Workspace;
