//! Per-file compilation state.

use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use lpc_source::Diagnostic;
use lpc_symbols::{collect, CollectOptions, Import, SymbolTable, TableId};
use lpc_syntax::{parse_source, NodeId, PredictionMode, SyntaxTree};
use triomphe::Arc;

use crate::eval::ArrowResolution;

/// Index of a unit in the workspace arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Id of the unit's symbol table. The two builtin tables come first.
    pub fn table_id(self) -> TableId {
        TableId(self.0 + 2)
    }

    pub fn from_table(table: TableId) -> Option<UnitId> {
        table.0.checked_sub(2).map(UnitId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Created, never parsed.
    Empty,
    /// Tree and symbols are current; semantic analysis has not run.
    Parsed,
    /// Semantic analysis ran for the current parse.
    Analyzed,
}

/// What a parse produced, before any analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    pub mode: PredictionMode,
    pub symbols: usize,
    pub imports: usize,
    pub syntax_errors: usize,
}

#[derive(Debug)]
pub struct SourceUnit {
    id: UnitId,
    path: PathBuf,
    text: String,
    tree: Option<Arc<SyntaxTree>>,
    pub(crate) table: SymbolTable,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) state: UnitState,
    pub(crate) imports: Vec<Import>,
    /// Set while the unit is parsed or analysed; loads hitting a busy unit
    /// get it back as-is.
    pub(crate) busy: bool,
    pub(crate) arrows: FxHashMap<NodeId, ArrowResolution>,
    /// Values of `ob->(expr)` method expressions for this generation.
    pub(crate) targets: FxHashMap<NodeId, Option<String>>,
}

impl SourceUnit {
    pub(crate) fn new(id: UnitId, path: PathBuf) -> Self {
        Self {
            id,
            path,
            text: String::new(),
            tree: None,
            table: SymbolTable::new(id.table_id(), true),
            diagnostics: Vec::new(),
            state: UnitState::Empty,
            imports: Vec::new(),
            busy: false,
            arrows: FxHashMap::default(),
            targets: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Normalized absolute path, the unit's identity.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory searched first for quoted includes.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Only stores the text; nothing is invalidated until the next parse.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn tree(&self) -> Option<Arc<SyntaxTree>> {
        self.tree.clone()
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_analyzed(&self) -> bool {
        self.state == UnitState::Analyzed
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Diagnostics collected so far, without triggering analysis.
    pub fn current_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn arrow_resolution(&self, arrow: NodeId) -> Option<&ArrowResolution> {
        self.arrows.get(&arrow)
    }

    /// Lex, parse and collect symbols. Resets the unit to `Parsed`; the
    /// workspace re-attaches dependencies and imports afterwards.
    pub(crate) fn parse_text(&mut self) -> ParseSummary {
        self.diagnostics.clear();
        self.arrows.clear();
        self.targets.clear();
        self.table.clear();
        self.table.add_dependency(TableId::GLOBAL);
        self.table.add_dependency(TableId::EFUNS);

        let output = parse_source(&self.text);
        for error in &output.errors {
            self.diagnostics
                .push(Diagnostic::error(error.range(), error.to_string()).with_code("syntax"));
        }

        let collected = collect(&output.tree, &mut self.table, &CollectOptions::default());
        self.imports = collected.imports;
        self.tree = Some(Arc::new(output.tree));
        self.state = UnitState::Parsed;

        log::debug!(
            "parsed {} ({:?}): {} symbols, {} syntax errors",
            self.path.display(),
            output.mode,
            self.table.len(),
            output.errors.len()
        );

        ParseSummary {
            mode: output.mode,
            symbols: self.table.len(),
            imports: self.imports.len(),
            syntax_errors: output.errors.len(),
        }
    }
}
