//! Source-level plumbing for the LPC semantic core.
//!
//! This crate is responsible for:
//! - Line/column positions and the byte-offset index behind them
//! - The diagnostic record every analysis phase produces, and its miette rendering
//! - Loading the workspace configuration (`lpc.toml`)
//! - Resolving `#include`/`inherit` names against the local directory,
//!   the configured import directories and the workspace root

mod config;
mod diagnostic;
mod error;
mod file;
mod position;

pub use config::{default_extensions, WorkspaceConfig};
pub use diagnostic::{Diagnostic, Report, Severity};
pub use error::ConfigError;
pub use file::{
    absolute_in_root, classify, normalize_path, resolve_filename, resolve_filename_with,
    search_candidates, ResolvedFilename, SearchKind,
};
pub use position::{LineIndex, Position, Range};
