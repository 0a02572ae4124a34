//! Shared helpers: throwaway mudlibs on disk.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use lpc_analysis::{UnitId, Workspace};
use lpc_source::{Position, Severity};
use tempfile::TempDir;

pub struct Mudlib {
    dir: TempDir,
}

impl Mudlib {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, text).unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::load(self.root()).unwrap()
    }

    pub fn open(&self, ws: &mut Workspace, name: &str) -> UnitId {
        ws.open(&self.path(name)).unwrap()
    }
}

pub fn messages(ws: &mut Workspace, unit: UnitId) -> Vec<String> {
    ws.diagnostics(unit).iter().map(|d| d.message.clone()).collect()
}

pub fn warnings(ws: &mut Workspace, unit: UnitId) -> Vec<String> {
    ws.diagnostics(unit)
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message.clone())
        .collect()
}

/// Position of the first occurrence of `needle`, moved `offset` characters
/// into it.
pub fn position_of(text: &str, needle: &str, offset: u32) -> Position {
    let at = text.find(needle).unwrap();
    let before = &text[..at];
    let line = before.matches('\n').count() as u32 + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) as u32;
    Position::new(line, column + offset)
}
