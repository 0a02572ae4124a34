use std::env;
use std::path::{Path, PathBuf};

use lpc_analysis::{UnitId, Workspace};
use lpc_source::{Position, WorkspaceConfig};

use crate::error::CliError;

/// The workspace root: an explicit `--root`, else the nearest directory
/// holding `lpc.toml` above the current directory, else the current directory.
pub fn find_workspace_root(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(root) = explicit {
        return absolute(&root);
    }
    let current_dir = env::current_dir().map_err(|e| CliError::IoError {
        path: PathBuf::from("."),
        operation: "getting current directory".to_string(),
        source: e,
    })?;
    Ok(WorkspaceConfig::find_root(&current_dir).unwrap_or(current_dir))
}

pub fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    path.canonicalize().map_err(|e| CliError::IoError {
        path: path.to_path_buf(),
        operation: "resolving".to_string(),
        source: e,
    })
}

/// Load the workspace and open `file` in it.
pub fn open_unit(root: Option<PathBuf>, file: &Path) -> Result<(Workspace, UnitId), CliError> {
    let root = find_workspace_root(root)?;
    let file = absolute(file)?;
    let mut ws = Workspace::load(&root)?;
    let unit = ws.open(&file)?;
    Ok((ws, unit))
}

/// Reject positions past the end of the file before querying.
pub fn check_position(ws: &Workspace, unit: UnitId, pos: Position) -> Result<Position, CliError> {
    let lines = ws.unit(unit).text().matches('\n').count() as u32 + 1;
    if pos.line == 0 || pos.line > lines {
        return Err(CliError::BadPosition {
            path: ws.unit(unit).path().to_path_buf(),
            line: pos.line,
        });
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_explicit_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let root = find_workspace_root(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_position_past_the_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("room.c");
        fs::write(&file, "void create() {\n}\n").unwrap();
        let (ws, unit) = open_unit(Some(dir.path().to_path_buf()), &file).unwrap();

        assert!(check_position(&ws, unit, Position::new(3, 0)).is_ok());
        assert!(matches!(
            check_position(&ws, unit, Position::new(4, 0)),
            Err(CliError::BadPosition { line: 4, .. })
        ));
        assert!(check_position(&ws, unit, Position::new(0, 0)).is_err());
    }
}
