//! Go-to-definition: from a caret position to the declarations it may
//! refer to.

use std::path::PathBuf;

use lpc_source::{Position, Range};
use lpc_symbols::{ImportKind, Symbol, SymbolKind, SymbolRef, TableProvider};
use lpc_syntax::{NodeId, RuleKind, SyntaxTree, TokenKind};

use crate::eval::ArrowResolution;
use crate::unit::UnitId;
use crate::workspace::Workspace;

/// A place the caret may refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub kind: SymbolKind,
    /// File holding the declaration; `None` for builtins.
    pub path: Option<PathBuf>,
    pub range: Range,
    pub symbol: Option<SymbolRef>,
}

/// First line of a whole file, the target of include and object jumps.
fn file_start() -> Range {
    Range::new(Position::new(1, 0), Position::new(2, 0))
}

/// Function kinds tried for a call, in order of preference.
const CALLEE_KINDS: [SymbolKind; 3] = [
    SymbolKind::Method,
    SymbolKind::MethodDeclaration,
    SymbolKind::Efun,
];

impl Workspace {
    /// Declarations the identifier, path or literal at `pos` refers to.
    ///
    /// With `limit_to_children` only the unit's own table is searched.
    /// Analysis runs first so arrow expressions are resolved.
    pub fn symbol_at_position(
        &mut self,
        unit: UnitId,
        pos: Position,
        limit_to_children: bool,
    ) -> Vec<Definition> {
        self.analyze(unit);
        let found = self.definitions_at(unit, pos, limit_to_children);
        if found.is_empty() {
            log::debug!("nothing to resolve at {}:{}", pos.line, pos.column);
        }
        found
    }

    fn definitions_at(&self, unit: UnitId, pos: Position, limit_to_children: bool) -> Vec<Definition> {
        if let Some(import) = self.unit(unit).imports().iter().find(|i| i.range.contains(pos)) {
            let kind = match import.kind {
                ImportKind::Include => SymbolKind::Include,
                ImportKind::Inherit => SymbolKind::Inherit,
            };
            return self
                .resolve_import(unit, import)
                .and_then(|resolved| {
                    let path = resolved.full_path?;
                    Some(Definition {
                        name: resolved.normalized,
                        kind,
                        path: Some(path),
                        range: file_start(),
                        symbol: None,
                    })
                })
                .into_iter()
                .collect();
        }

        let Some(tree) = self.unit(unit).tree() else {
            return Vec::new();
        };
        let Some(token) = caret_token(&tree, pos) else {
            return Vec::new();
        };
        let Some(node) = tree.token_parent(token) else {
            return Vec::new();
        };

        if tree.kind(node) == RuleKind::Literal {
            return self.literal_target(unit, &tree, node).into_iter().collect();
        }
        if tree.token(token).kind != TokenKind::Ident {
            return Vec::new();
        }
        let name = tree.token(token).text.as_str();
        let table = self.unit(unit).table();

        // The caret is on a declaration name.
        if let Some((id, _)) = table
            .iter()
            .find(|(_, symbol)| symbol.name == name && symbol.name_range.contains(pos))
        {
            return self.definition(table.symbol_ref(id)).into_iter().collect();
        }

        let found = match tree.kind(node) {
            RuleKind::MemberName => tree
                .parent(node)
                .and_then(|arrow| self.unit(unit).arrow_resolution(arrow))
                .and_then(ArrowResolution::function),
            RuleKind::NameRef | RuleKind::ScopedName if is_callee(&tree, node) => {
                let inherited_only = tree.kind(node) == RuleKind::ScopedName;
                self.resolve_callee(unit, name, limit_to_children, inherited_only)
            }
            RuleKind::NameRef => {
                let scope = table.scope_at(pos);
                table.resolve_in_scope(self, scope, name)
            }
            _ => None,
        };

        found
            .filter(|found| !limit_to_children || found.table == unit.table_id())
            .and_then(|found| self.definition(found))
            .into_iter()
            .collect()
    }

    /// Method, then prototype, then efun. `::name` skips the unit itself.
    fn resolve_callee(
        &self,
        unit: UnitId,
        name: &str,
        local_only: bool,
        inherited_only: bool,
    ) -> Option<SymbolRef> {
        let table = self.unit(unit).table();
        CALLEE_KINDS.iter().find_map(|kind| {
            let accept = |symbol: &Symbol| symbol.kind() == *kind;
            if inherited_only {
                table
                    .dependencies()
                    .filter_map(|dep| self.table(dep))
                    .find_map(|dep| dep.resolve_matching(self, name, false, accept))
            } else {
                table.resolve_matching(self, name, local_only, accept)
            }
        })
    }

    /// A string literal used as an arrow source points at the loaded object.
    fn literal_target(&self, unit: UnitId, tree: &SyntaxTree, literal: NodeId) -> Option<Definition> {
        let outermost = tree
            .ancestors(literal)
            .take_while(|node| tree.kind(*node) == RuleKind::Literal)
            .last()?;
        let arrow = tree.parent(outermost)?;
        if tree.arrow(arrow)?.source != Some(outermost) {
            return None;
        }
        let object = self.unit(unit).arrow_resolution(arrow)?.object()?;
        Some(Definition {
            name: self.display_path(object),
            kind: SymbolKind::Inherit,
            path: Some(self.unit(object).path().to_path_buf()),
            range: file_start(),
            symbol: None,
        })
    }

    fn definition(&self, found: SymbolRef) -> Option<Definition> {
        let symbol = self.symbol(found)?;
        Some(Definition {
            name: symbol.name.clone(),
            kind: symbol.kind(),
            path: self.table_path(found.table).map(|p| p.to_path_buf()),
            range: symbol.name_range,
            symbol: Some(found),
        })
    }
}

/// Token under the caret, preferring an identifier that ends at `pos`.
fn caret_token(tree: &SyntaxTree, pos: Position) -> Option<usize> {
    let token = tree.token_at(pos)?;
    if tree.token(token).kind != TokenKind::Ident && token > 0 {
        let previous = tree.token(token - 1);
        if previous.kind == TokenKind::Ident && previous.range.end == pos {
            return Some(token - 1);
        }
    }
    Some(token)
}

fn is_callee(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.parent(node)
        .and_then(|parent| tree.call(parent))
        .map_or(false, |call| call.callee == node)
}
