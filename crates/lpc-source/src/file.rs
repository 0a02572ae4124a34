//! Include/inherit filename resolution.

use std::path::{Component, Path, PathBuf};

use crate::config::WorkspaceConfig;

/// How an include name was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    /// `"file.h"`: the including file's directory is searched first.
    Local,
    /// `<file.h>`: import directories are searched first.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilename {
    pub normalized: String,
    /// First existing candidate on disk; `None` is a soft failure.
    pub full_path: Option<PathBuf>,
    pub search_kind: SearchKind,
}

impl ResolvedFilename {
    pub fn is_resolved(&self) -> bool {
        self.full_path.is_some()
    }
}

/// Strip quotes or angle brackets and normalize separators.
pub fn classify(raw: &str) -> (String, SearchKind) {
    let raw = raw.trim();
    let (inner, kind) = if raw.len() >= 2 && raw.starts_with('<') && raw.ends_with('>') {
        (&raw[1..raw.len() - 1], SearchKind::Global)
    } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        (&raw[1..raw.len() - 1], SearchKind::Local)
    } else {
        (raw, SearchKind::Local)
    };
    let normalized = inner.trim().replace('\\', "/");
    let normalized = normalized.trim_start_matches('/').to_string();
    (normalized, kind)
}

/// Lexically normalize a path, folding `.` and `..` without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Candidate paths for `normalized`, in search order.
pub fn search_candidates(
    normalized: &str,
    kind: SearchKind,
    current_dir: &Path,
    import_dirs: &[PathBuf],
    root: &Path,
) -> Vec<PathBuf> {
    let mut dirs: Vec<&Path> = Vec::with_capacity(import_dirs.len() + 2);
    match kind {
        SearchKind::Local => {
            dirs.push(current_dir);
            dirs.extend(import_dirs.iter().map(PathBuf::as_path));
        }
        SearchKind::Global => {
            dirs.extend(import_dirs.iter().map(PathBuf::as_path));
            dirs.push(current_dir);
        }
    }
    if normalized.contains('/') {
        dirs.push(root);
    }
    dirs.into_iter()
        .map(|dir| normalize_path(&dir.join(normalized)))
        .collect()
}

/// Resolve an include or inherit name against the file system.
///
/// `default_extension` is appended when the name has none (`inherit "std/room"`).
pub fn resolve_filename(
    raw: &str,
    current_dir: &Path,
    config: &WorkspaceConfig,
    default_extension: Option<&str>,
) -> ResolvedFilename {
    resolve_filename_with(raw, current_dir, config, default_extension, |p| p.is_file())
}

pub fn resolve_filename_with(
    raw: &str,
    current_dir: &Path,
    config: &WorkspaceConfig,
    default_extension: Option<&str>,
    exists: impl Fn(&Path) -> bool,
) -> ResolvedFilename {
    let (mut normalized, search_kind) = classify(raw);
    if let Some(ext) = default_extension {
        if Path::new(&normalized).extension().is_none() && !normalized.is_empty() {
            normalized = format!("{normalized}.{ext}");
        }
    }

    let full_path = if normalized.is_empty() {
        None
    } else {
        search_candidates(
            &normalized,
            search_kind,
            current_dir,
            &config.include_dirs,
            &config.root,
        )
        .into_iter()
        .find(|candidate| exists(candidate))
    };

    if full_path.is_none() {
        log::debug!("could not resolve `{raw}` from {}", current_dir.display());
    }

    ResolvedFilename {
        normalized,
        full_path,
        search_kind,
    }
}

/// Absolute path for a mudlib-relative name such as `/obj/torch.c`.
pub fn absolute_in_root(root: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim().replace('\\', "/");
    normalize_path(&root.join(relative.trim_start_matches('/')))
}
