use std::fs;
use std::path::{Path, PathBuf};

use lpc_analysis::Workspace;
use lpc_source::Severity;

use crate::error::CliError;
use crate::utils::{absolute, find_workspace_root};

/// Analyse `files` (every source file under the root when empty) and print
/// their diagnostics. Fails when any error was reported.
pub fn handle_check(root: Option<PathBuf>, files: Vec<PathBuf>, warnings: bool) -> Result<(), CliError> {
    let root = find_workspace_root(root)?;
    let mut ws = Workspace::load(&root)?;
    log::info!("checking workspace at {}", root.display());

    let files = if files.is_empty() {
        let mut found = Vec::new();
        collect_sources(&ws, &root, &mut found)?;
        found.sort();
        found
    } else {
        files
            .iter()
            .map(|file| absolute(file))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut errors = 0;
    for file in &files {
        let unit = ws.open(file)?;
        let name = ws.display_path(unit);
        let text = ws.unit(unit).text().to_string();
        let diagnostics = ws.diagnostics(unit).to_vec();
        for diagnostic in diagnostics {
            if diagnostic.severity != Severity::Error && !warnings {
                continue;
            }
            if diagnostic.is_error() {
                errors += 1;
            }
            eprintln!("{:?}", miette::Report::new(diagnostic.report(&name, &text)));
        }
    }

    if errors > 0 {
        return Err(CliError::CheckFailed { count: errors });
    }
    println!("checked {} file(s)", files.len());
    Ok(())
}

fn collect_sources(ws: &Workspace, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CliError> {
    let entries = fs::read_dir(dir).map_err(|e| CliError::IoError {
        path: dir.to_path_buf(),
        operation: "listing".to_string(),
        source: e,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_sources(ws, &path, out)?;
        } else if ws.config().is_source_file(&path) && !is_header(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Headers are analysed through the files that include them.
fn is_header(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "h")
}
