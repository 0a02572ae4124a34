//! The registry of source units.
//!
//! A [`Workspace`] owns every loaded unit, the two builtin tables and the
//! reference mesh. Units and tables refer to each other by id only, and the
//! workspace is the [`TableProvider`] through which resolution finds them.

use std::fs;
use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use lpc_efuns::{efun_table, global_table};
use lpc_source::{
    absolute_in_root, normalize_path, resolve_filename, Diagnostic, ResolvedFilename, WorkspaceConfig,
};
use lpc_symbols::{
    Import, ImportKind, ImportTarget, Symbol, SymbolKind, SymbolRef, SymbolTable, TableId, TableProvider,
};

use crate::error::{AnalysisError, AnalysisResult};
use crate::mesh::ReferenceMesh;
use crate::semantic;
use crate::unit::{ParseSummary, SourceUnit, UnitId, UnitState};

pub struct Workspace {
    config: WorkspaceConfig,
    global: SymbolTable,
    efuns: SymbolTable,
    units: Vec<SourceUnit>,
    by_path: FxHashMap<PathBuf, UnitId>,
    mesh: ReferenceMesh,
}

impl TableProvider for Workspace {
    fn table(&self, id: TableId) -> Option<&SymbolTable> {
        match id {
            TableId::GLOBAL => Some(&self.global),
            TableId::EFUNS => Some(&self.efuns),
            other => UnitId::from_table(other)
                .and_then(|unit| self.units.get(unit.index()))
                .map(|unit| &unit.table),
        }
    }
}

impl Workspace {
    /// Build the builtin tables once; every unit table depends on them.
    pub fn new(config: WorkspaceConfig) -> Self {
        let global = global_table(&config);
        let efuns = efun_table();
        Self {
            config,
            global,
            efuns,
            units: Vec::new(),
            by_path: FxHashMap::default(),
            mesh: ReferenceMesh::new(),
        }
    }

    /// Workspace rooted at `root`, configured by its `lpc.toml` if any.
    pub fn load(root: &Path) -> AnalysisResult<Self> {
        let config = WorkspaceConfig::load(root)?;
        Ok(Self::new(config))
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn global_table(&self) -> &SymbolTable {
        &self.global
    }

    pub fn efun_table(&self) -> &SymbolTable {
        &self.efuns
    }

    // ---- units ----------------------------------------------------------

    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.iter()
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.index()]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut SourceUnit {
        &mut self.units[id.index()]
    }

    pub fn unit_id(&self, path: &Path) -> Option<UnitId> {
        self.by_path.get(&normalize_path(path)).copied()
    }

    /// Mudlib name such as `/obj/torch.c` to an absolute path.
    pub fn filename_to_absolute_path(&self, name: &str) -> PathBuf {
        absolute_in_root(&self.config.root, name)
    }

    /// Path of a unit as the mudlib sees it: `/obj/torch.c`.
    pub fn display_path(&self, id: UnitId) -> String {
        let path = self.unit(id).path();
        match path.strip_prefix(&self.config.root) {
            Ok(relative) => format!("/{}", relative.display()),
            Err(_) => path.display().to_string(),
        }
    }

    /// Path of the unit owning a table; builtin tables have none.
    pub fn table_path(&self, table: TableId) -> Option<&Path> {
        UnitId::from_table(table)
            .and_then(|unit| self.units.get(unit.index()))
            .map(SourceUnit::path)
    }

    pub fn symbol(&self, symbol: SymbolRef) -> Option<&Symbol> {
        self.table(symbol.table)?.get(symbol.symbol)
    }

    /// Unit for `path`, created empty if it is new.
    pub fn ensure_unit(&mut self, path: &Path) -> UnitId {
        let path = normalize_path(path);
        if let Some(id) = self.by_path.get(&path) {
            return *id;
        }
        let id = UnitId(self.units.len() as u32);
        self.units.push(SourceUnit::new(id, path.clone()));
        self.by_path.insert(path, id);
        id
    }

    /// Read a file from disk into its unit and parse it.
    pub fn open(&mut self, path: &Path) -> AnalysisResult<UnitId> {
        let path = normalize_path(path);
        if !path.starts_with(&self.config.root) {
            return Err(AnalysisError::OutsideRoot {
                path,
                root: self.config.root.clone(),
            });
        }
        let text = fs::read_to_string(&path).map_err(|source| AnalysisError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(self.open_text(&path, text))
    }

    /// Replace a unit's text (an editor buffer) and parse it.
    pub fn open_text(&mut self, path: &Path, text: impl Into<String>) -> UnitId {
        let id = self.ensure_unit(path);
        self.set_text(id, text);
        self.parse(id);
        id
    }

    pub fn set_text(&mut self, id: UnitId, text: impl Into<String>) {
        self.unit_mut(id).set_text(text);
    }

    /// Unit for an absolute path, loading and parsing it from disk the
    /// first time. A unit that is being parsed or analysed is returned as
    /// it is.
    pub fn load_unit(&mut self, path: &Path) -> Option<UnitId> {
        let path = normalize_path(path);
        if let Some(id) = self.by_path.get(&path).copied() {
            let unit = self.unit(id);
            if unit.busy || unit.state() != UnitState::Empty {
                return Some(id);
            }
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("could not load {}: {err}", path.display());
                return None;
            }
        };
        let id = self.ensure_unit(&path);
        self.set_text(id, text);
        self.parse(id);
        Some(id)
    }

    /// Load the object a call-other path names; `.c` is implied.
    pub fn load_object(&mut self, name: &str) -> Option<UnitId> {
        let mut path = self.filename_to_absolute_path(name);
        if path.extension().is_none() {
            path.set_extension("c");
        }
        self.load_unit(&path)
    }

    // ---- parsing --------------------------------------------------------

    /// Parse a unit's current text, then resolve and load its imports.
    ///
    /// Clears diagnostics and invalidates analysis. Returns `None` when the
    /// unit is already being parsed further up the stack.
    pub fn parse(&mut self, id: UnitId) -> Option<ParseSummary> {
        if self.unit(id).busy {
            log::debug!("{} is already being processed", self.unit(id).path().display());
            return None;
        }
        self.unit_mut(id).busy = true;

        for (dep, merged) in self.mesh.clear_references(id) {
            if merged {
                self.unit_mut(dep).table.remove_dependency(id.table_id());
            }
        }
        let summary = self.unit_mut(id).parse_text();
        for (referrer, merged) in self.mesh.referrers(id) {
            if merged {
                self.unit_mut(id).table.add_dependency(referrer.table_id());
            }
        }
        self.resolve_imports(id);

        self.unit_mut(id).busy = false;
        Some(summary)
    }

    fn resolve_imports(&mut self, id: UnitId) {
        let imports = self.unit(id).imports().to_vec();
        for import in imports {
            let what = match import.kind {
                ImportKind::Include => "include",
                ImportKind::Inherit => "inherit",
            };
            let Some(resolved) = self.resolve_import(id, &import) else {
                self.unit_mut(id).add_diagnostic(Diagnostic::warning(
                    import.range,
                    format!("could not resolve {what}: macro is not a path"),
                ));
                continue;
            };
            let Some(full_path) = resolved.full_path else {
                self.unit_mut(id).add_diagnostic(Diagnostic::warning(
                    import.range,
                    format!("could not resolve {what} {}", resolved.normalized),
                ));
                continue;
            };
            let Some(dep) = self.load_unit(&full_path) else {
                self.unit_mut(id).add_diagnostic(Diagnostic::warning(
                    import.range,
                    format!("could not load source: {}", resolved.normalized),
                ));
                continue;
            };
            if dep != id {
                self.add_as_reference_to(dep, id, true);
            }
        }
    }

    /// Search the disk for an include or inherit of unit `id`. Inherits
    /// imply `.c`. `None` when a macro target does not expand to a path.
    pub(crate) fn resolve_import(&self, id: UnitId, import: &Import) -> Option<ResolvedFilename> {
        let raw = match &import.target {
            ImportTarget::Path(raw) => raw.clone(),
            ImportTarget::Macro(name) => self.macro_value(id, name)?,
        };
        let default_extension = match import.kind {
            ImportKind::Include => None,
            ImportKind::Inherit => Some("c"),
        };
        Some(resolve_filename(
            &raw,
            self.unit(id).directory(),
            &self.config,
            default_extension,
        ))
    }

    /// Replacement text of an object-like define visible from the unit.
    fn macro_value(&self, id: UnitId, name: &str) -> Option<String> {
        let found = self.unit(id).table.resolve(self, name, false)?;
        let symbol = self.symbol(found)?;
        if symbol.kind() != SymbolKind::Define || !symbol.children.is_empty() {
            return None;
        }
        symbol.value.clone()
    }

    // ---- mesh -----------------------------------------------------------

    /// Record that `other` references `this`. With `merge_symbols` both
    /// tables gain each other as dependencies. Returns `false` when `this`
    /// was already reachable from `other`.
    pub fn add_as_reference_to(&mut self, this: UnitId, other: UnitId, merge_symbols: bool) -> bool {
        if this == other || !self.mesh.add_edge(other, this, merge_symbols) {
            return false;
        }
        if merge_symbols {
            self.unit_mut(other).table.add_dependency(this.table_id());
            self.unit_mut(this).table.add_dependency(other.table_id());
        }
        true
    }

    /// Units `id` references directly.
    pub fn references(&self, id: UnitId) -> Vec<UnitId> {
        self.mesh.references(id).map(|(unit, _)| unit).collect()
    }

    pub fn mesh(&self) -> &ReferenceMesh {
        &self.mesh
    }

    // ---- analysis -------------------------------------------------------

    /// Run semantic analysis once per parse generation.
    pub fn analyze(&mut self, id: UnitId) {
        let unit = self.unit(id);
        if unit.state() != UnitState::Parsed || unit.busy {
            return;
        }
        self.unit_mut(id).busy = true;
        self.unit_mut(id).table.clear_references();
        let found = semantic::analyze(self, id);
        let unit = self.unit_mut(id);
        unit.diagnostics.extend(found);
        unit.diagnostics.sort_by_key(|d| d.range.start);
        unit.state = UnitState::Analyzed;
        unit.busy = false;
    }

    /// Syntax and semantic diagnostics, analysing the unit if needed.
    pub fn diagnostics(&mut self, id: UnitId) -> &[Diagnostic] {
        self.analyze(id);
        &self.unit(id).diagnostics
    }

    pub fn add_diagnostic(&mut self, id: UnitId, diagnostic: Diagnostic) {
        self.unit_mut(id).add_diagnostic(diagnostic);
    }

    // ---- queries --------------------------------------------------------

    pub fn list_top_level_symbols(&self, id: UnitId, include_dependencies: bool) -> Vec<SymbolRef> {
        self.unit(id)
            .table
            .get_all_symbols(self, None, include_dependencies)
            .map(|(found, _)| found)
            .collect()
    }

    pub fn resolve_symbol(&self, id: UnitId, name: &str) -> Option<SymbolRef> {
        self.unit(id).table.resolve(self, name, false)
    }

    /// Uses of `name` in the unit and in every unit it reaches through the
    /// mesh, analysing them as needed.
    pub fn reference_count(&mut self, id: UnitId, name: &str) -> u32 {
        loop {
            let pending: Vec<UnitId> = self
                .mesh
                .reachable(id)
                .into_iter()
                .filter(|unit| self.unit(*unit).state() == UnitState::Parsed)
                .collect();
            if pending.is_empty() {
                break;
            }
            for unit in pending {
                self.analyze(unit);
            }
        }
        self.mesh
            .reachable(id)
            .into_iter()
            .map(|unit| self.unit(unit).table.local_reference_count(name))
            .sum()
    }
}
