use std::path::PathBuf;

use lpc_source::ConfigError;
use miette::Diagnostic;
use thiserror::Error;

/// Failures the workspace reports to its caller. Everything that goes wrong
/// inside a source file becomes a [`lpc_source::Diagnostic`] instead.
#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("could not read {}", .path.display())]
    #[diagnostic(
        code("ANALYSIS-001"),
        help("Check that the file exists and is readable")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is outside the workspace root {}", .path.display(), .root.display())]
    #[diagnostic(
        code("ANALYSIS-002"),
        help("Pass a --root that contains the file")
    )]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
