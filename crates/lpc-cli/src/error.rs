use std::path::PathBuf;

use lpc_analysis::AnalysisError;
use miette::Diagnostic;
use thiserror::Error;

/// CLI-specific error type that provides rich diagnostics
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("I/O error while {operation} {}", .path.display())]
    #[diagnostic(code(lpc::cli::io_error))]
    IoError {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no line {line}", .path.display())]
    #[diagnostic(
        code(lpc::cli::bad_position),
        help("Lines are counted from 1 and columns from 0")
    )]
    BadPosition { path: PathBuf, line: u32 },

    #[error("{count} error(s) found")]
    #[diagnostic(code(lpc::cli::check_failed))]
    CheckFailed { count: usize },
}
