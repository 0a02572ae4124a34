use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while loading the workspace configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Error reading workspace configuration {}", .path.display())]
    #[diagnostic(
        code("CONFIG-001"),
        help("Check file permissions and ensure the file is not corrupted")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unexpected keys.
    #[error("Invalid workspace configuration {}: {message}", .path.display())]
    #[diagnostic(
        code("CONFIG-002"),
        help("Check your lpc.toml syntax; known sections are [workspace] and [defines]")
    )]
    Parse { path: PathBuf, message: String },

    /// The workspace root does not exist or is not a directory.
    #[error("Workspace root does not exist: {}", .0.display())]
    #[diagnostic(
        code("CONFIG-003"),
        help("Pass an existing directory with --root or run from inside the mudlib")
    )]
    MissingRoot(PathBuf),
}
