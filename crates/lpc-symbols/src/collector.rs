//! Structural symbol collection.
//!
//! Walks a parse tree once and records declarations: directives, inherits,
//! structs, functions with their parameters and nested blocks, variables and
//! inline closures. Expressions are left to semantic analysis.

use lpc_source::{classify, Range};
use lpc_syntax::ast::{include_target, parse_define};
use lpc_syntax::{NodeId, RuleKind, SyntaxTree};

use crate::error::SymbolError;
use crate::symbol::{SymbolData, SymbolId, SymbolKind};
use crate::table::SymbolTable;

/// Kinds given to function symbols. Builtin tables collect both prototypes
/// and definitions as [`SymbolKind::Efun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    pub prototype_kind: SymbolKind,
    pub definition_kind: SymbolKind,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            prototype_kind: SymbolKind::MethodDeclaration,
            definition_kind: SymbolKind::Method,
        }
    }
}

impl CollectOptions {
    pub fn builtin() -> Self {
        Self {
            prototype_kind: SymbolKind::Efun,
            definition_kind: SymbolKind::Efun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Include,
    Inherit,
}

/// What an include or inherit names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Path as written, delimiters kept: `"room.h"`, `<lib.h>`.
    Path(String),
    /// A macro expected to expand to a path string: `inherit ROOM;`.
    Macro(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub target: ImportTarget,
    /// Range of the path text, used for diagnostics and go-to-definition.
    pub range: Range,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOutput {
    pub imports: Vec<Import>,
    /// Declarations refused by a table that rejects duplicates.
    pub conflicts: Vec<SymbolError>,
}

pub fn collect(tree: &SyntaxTree, table: &mut SymbolTable, options: &CollectOptions) -> CollectOutput {
    let mut collector = Collector {
        tree,
        table,
        options,
        output: CollectOutput::default(),
    };
    for item in tree.child_nodes(tree.root()) {
        collector.item(item);
    }
    collector.output
}

struct Collector<'a> {
    tree: &'a SyntaxTree,
    table: &'a mut SymbolTable,
    options: &'a CollectOptions,
    output: CollectOutput,
}

impl Collector<'_> {
    fn add(&mut self, parent: Option<SymbolId>, data: SymbolData) -> Option<SymbolId> {
        match self.table.add_symbol(parent, data) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("table {:?}: {err}", self.table.id());
                self.output.conflicts.push(err);
                None
            }
        }
    }

    fn name_range(&self, node: NodeId) -> Range {
        self.tree
            .name_token(node)
            .map(|idx| self.tree.token_range(idx))
            .unwrap_or_else(|| self.tree.range(node))
    }

    fn item(&mut self, node: NodeId) {
        let tree = self.tree;
        match tree.kind(node) {
            RuleKind::IncludeDirective => self.include(node),
            RuleKind::DefineDirective => self.define(node),
            RuleKind::InheritDecl => self.inherit(node),
            RuleKind::VariableDecl => self.variables(node, None),
            RuleKind::FunctionDef => {
                let kind = self.options.definition_kind;
                self.function(node, kind, None);
            }
            RuleKind::FunctionDecl => {
                let kind = self.options.prototype_kind;
                self.function(node, kind, None);
            }
            RuleKind::StructDef => self.struct_def(node),
            _ => {}
        }
    }

    fn include(&mut self, node: NodeId) {
        let Some(token) = self.tree.child_tokens(node).next() else {
            return;
        };
        let Some(raw) = include_target(&self.tree.token(token).text) else {
            return;
        };
        let range = self.tree.range(node);
        let data = SymbolData::new(classify(&raw).0, SymbolKind::Include, range)
            .with_value(raw.clone())
            .with_node(node);
        if let Some(symbol) = self.add(None, data) {
            let target = if raw.starts_with('"') || raw.starts_with('<') {
                ImportTarget::Path(raw)
            } else {
                ImportTarget::Macro(raw)
            };
            self.output.imports.push(Import {
                kind: ImportKind::Include,
                target,
                range,
                symbol,
            });
        }
    }

    fn define(&mut self, node: NodeId) {
        let Some(token) = self.tree.child_tokens(node).next() else {
            return;
        };
        let Some(define) = parse_define(&self.tree.token(token).text) else {
            return;
        };
        let range = self.tree.range(node);
        let data = SymbolData::new(define.name, SymbolKind::Define, range)
            .with_value(define.body)
            .with_node(node);
        let Some(id) = self.add(None, data) else {
            return;
        };
        for param in define.params.unwrap_or_default() {
            self.add(Some(id), SymbolData::new(param, SymbolKind::Parameter, range));
        }
    }

    fn inherit(&mut self, node: NodeId) {
        let tree = self.tree;
        let Some(expr) = tree.child_nodes(node).find(|n| tree.kind(*n) != RuleKind::Modifiers) else {
            return;
        };
        let range = tree.range(expr);
        let target = match tree.kind(expr) {
            RuleKind::NameRef => match tree.name_text(expr) {
                Some(name) => ImportTarget::Macro(name.to_string()),
                None => return,
            },
            _ => match tree.string_value(expr) {
                Some(path) => ImportTarget::Path(format!("\"{path}\"")),
                None => return,
            },
        };
        let (name, raw) = match &target {
            ImportTarget::Path(raw) => (classify(raw).0, raw.clone()),
            ImportTarget::Macro(name) => (name.clone(), name.clone()),
        };
        let data = SymbolData::new(name, SymbolKind::Inherit, tree.range(node))
            .with_name_range(range)
            .with_value(raw)
            .with_modifiers(tree.modifiers(node))
            .with_node(node);
        if let Some(symbol) = self.add(None, data) {
            self.output.imports.push(Import {
                kind: ImportKind::Inherit,
                target,
                range,
                symbol,
            });
        }
    }

    fn variables(&mut self, decl: NodeId, parent: Option<SymbolId>) {
        let tree = self.tree;
        let modifiers = tree.modifiers(decl);
        for declarator in tree.declarators(decl) {
            let Some(name) = tree.name_text(declarator) else {
                continue;
            };
            let data = SymbolData::new(name, SymbolKind::Variable, tree.range(declarator))
                .with_type(tree.type_text(declarator))
                .with_name_range(self.name_range(declarator))
                .with_modifiers(modifiers.clone())
                .with_node(declarator);
            self.add(parent, data);
            if let (Some(init), Some(scope)) = (tree.initializer(declarator), parent) {
                self.expression(init, scope);
            }
        }
    }

    fn function(&mut self, node: NodeId, kind: SymbolKind, parent: Option<SymbolId>) {
        let tree = self.tree;
        let Some(name) = tree.name_text(node) else {
            return;
        };
        let data = SymbolData::new(name, kind, tree.range(node))
            .with_type(tree.type_text(node))
            .with_name_range(self.name_range(node))
            .with_modifiers(tree.modifiers(node))
            .with_node(node);
        let Some(id) = self.add(parent, data) else {
            return;
        };
        self.params(node, id);
        if let Some(body) = tree.body(node) {
            self.block(body, id);
        }
    }

    fn params(&mut self, node: NodeId, owner: SymbolId) {
        let tree = self.tree;
        for param in tree.params(node) {
            let Some(name) = tree.name_text(param) else {
                continue;
            };
            let data = SymbolData::new(name, SymbolKind::Parameter, tree.range(param))
                .with_type(tree.type_text(param))
                .with_name_range(self.name_range(param))
                .with_node(param);
            self.add(Some(owner), data);
        }
    }

    fn struct_def(&mut self, node: NodeId) {
        let tree = self.tree;
        let Some(name) = tree.name_text(node) else {
            return;
        };
        let data = SymbolData::new(name, SymbolKind::Struct, tree.range(node))
            .with_name_range(self.name_range(node))
            .with_modifiers(tree.modifiers(node))
            .with_node(node);
        let Some(id) = self.add(None, data) else {
            return;
        };
        for member in tree.child_nodes(node).filter(|n| tree.kind(*n) == RuleKind::StructMember) {
            for declarator in tree.declarators(member) {
                let Some(member_name) = tree.name_text(declarator) else {
                    continue;
                };
                let data = SymbolData::new(member_name, SymbolKind::StructMember, tree.range(declarator))
                    .with_type(tree.type_text(declarator))
                    .with_name_range(self.name_range(declarator))
                    .with_node(declarator);
                self.add(Some(id), data);
            }
        }
    }

    /// A `{ }` block, or the implicit scope of a `for`/`foreach` header.
    fn block(&mut self, node: NodeId, parent: SymbolId) {
        let data = SymbolData::new("", SymbolKind::Block, self.tree.range(node)).with_node(node);
        let Some(id) = self.add(Some(parent), data) else {
            return;
        };
        let children: Vec<NodeId> = self.tree.child_nodes(node).collect();
        for child in children {
            self.statement(child, id);
        }
    }

    fn statement(&mut self, node: NodeId, scope: SymbolId) {
        match self.tree.kind(node) {
            RuleKind::VariableDecl => self.variables(node, Some(scope)),
            RuleKind::Block | RuleKind::ForStmt | RuleKind::ForeachStmt => self.block(node, scope),
            RuleKind::ClosureExpr => self.closure(node, scope),
            _ => {
                let children: Vec<NodeId> = self.tree.child_nodes(node).collect();
                for child in children {
                    self.statement(child, scope);
                }
            }
        }
    }

    fn expression(&mut self, node: NodeId, scope: SymbolId) {
        self.statement(node, scope);
    }

    fn closure(&mut self, node: NodeId, scope: SymbolId) {
        let tree = self.tree;
        let data = SymbolData::new("", SymbolKind::InlineClosure, tree.range(node)).with_node(node);
        let Some(id) = self.add(Some(scope), data) else {
            return;
        };
        self.params(node, id);
        match tree.body(node) {
            Some(body) => self.block(body, id),
            None => {
                let children: Vec<NodeId> = tree.child_nodes(node).collect();
                for child in children {
                    self.statement(child, id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::TableId;
    use lpc_syntax::parse_source;

    fn collect_text(text: &str) -> (SymbolTable, CollectOutput) {
        let output = parse_source(text);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        let mut table = SymbolTable::new(TableId(2), true);
        let collected = collect(&output.tree, &mut table, &CollectOptions::default());
        (table, collected)
    }

    #[test]
    fn test_top_level_kinds() {
        let (table, output) = collect_text(
            "#include \"room.h\"\n\
             #define MAX(a, b) ((a) > (b) ? (a) : (b))\n\
             inherit \"/std/room\";\n\
             inherit BASE;\n\
             struct pair { int a; mixed b; };\n\
             int count, *list;\n\
             varargs void init(int x);\n\
             void init(int x) { }\n",
        );
        let kinds: Vec<(SymbolKind, &str)> = table
            .top_level()
            .iter()
            .map(|id| (table.symbol(*id).kind(), table.symbol(*id).name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (SymbolKind::Include, "room.h"),
                (SymbolKind::Define, "MAX"),
                (SymbolKind::Inherit, "std/room"),
                (SymbolKind::Inherit, "BASE"),
                (SymbolKind::Struct, "pair"),
                (SymbolKind::Variable, "count"),
                (SymbolKind::Variable, "list"),
                (SymbolKind::MethodDeclaration, "init"),
                (SymbolKind::Method, "init"),
            ]
        );
        assert_eq!(output.imports.len(), 3);
        assert_eq!(output.imports[1].target, ImportTarget::Path("\"/std/room\"".into()));
        assert_eq!(output.imports[2].target, ImportTarget::Macro("BASE".into()));

        let list = table.lookup_local("list")[0];
        assert_eq!(table.symbol(list).type_name.as_deref(), Some("int *"));
        let max = table.lookup_local("MAX")[0];
        assert_eq!(table.children(max).len(), 2);
    }

    #[test]
    fn test_nested_scopes_contain_their_children() {
        let (table, _) = collect_text(
            "void f(int n) {\n\
             \x20   int i;\n\
             \x20   for (int j = 0; j < n; j++) { string s; }\n\
             \x20   mixed g = function(int k) { return k; };\n\
             }\n",
        );
        for (id, symbol) in table.iter() {
            if let Some(parent) = symbol.parent {
                assert!(
                    table.symbol(parent).range.contains_range(&symbol.range),
                    "{:?} escapes its parent",
                    table.symbol(id).name
                );
            }
        }
        let names: Vec<(SymbolKind, String)> = table
            .iter()
            .map(|(_, s)| (s.kind(), s.name.clone()))
            .collect();
        assert!(names.contains(&(SymbolKind::Parameter, "n".to_string())));
        assert!(names.contains(&(SymbolKind::Variable, "j".to_string())));
        assert!(names.contains(&(SymbolKind::Variable, "s".to_string())));
        assert!(names.contains(&(SymbolKind::InlineClosure, String::new())));
        assert!(names.contains(&(SymbolKind::Parameter, "k".to_string())));
    }

    #[test]
    fn test_builtin_table_reports_conflicts() {
        let output = parse_source("void write(mixed x);\nvoid write(mixed y);\n");
        let mut table = SymbolTable::new(TableId::EFUNS, false);
        let collected = collect(&output.tree, &mut table, &CollectOptions::builtin());
        assert_eq!(collected.conflicts.len(), 1);
        assert_eq!(table.top_level().len(), 1);
        assert_eq!(table.symbol(table.top_level()[0]).kind(), SymbolKind::Efun);
    }
}
