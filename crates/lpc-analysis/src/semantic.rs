//! Semantic analysis of one unit: redeclarations, then a walk over global
//! initializers and every function body through the evaluator.

use fxhash::FxHashSet;
use lpc_source::Diagnostic;
use lpc_symbols::{SymbolId, SymbolKind, SymbolTable};
use lpc_syntax::{NodeId, RuleKind};

use crate::eval::{CallStack, Evaluator, StackFrame};
use crate::unit::UnitId;
use crate::workspace::Workspace;

pub(crate) fn analyze(ws: &mut Workspace, unit: UnitId) -> Vec<Diagnostic> {
    let mut diagnostics = redeclarations(ws.unit(unit).table());
    let Some(tree) = ws.unit(unit).tree() else {
        return diagnostics;
    };

    let globals: Vec<NodeId> = tree
        .child_nodes(tree.root())
        .filter(|node| tree.kind(*node) == RuleKind::VariableDecl)
        .collect();
    let functions: Vec<SymbolId> = {
        let table = ws.unit(unit).table();
        table
            .top_level()
            .iter()
            .copied()
            .filter(|id| table.symbol(*id).kind() == SymbolKind::Method)
            .collect()
    };

    let mut evaluator = Evaluator::new(ws, unit);
    let mut stack = CallStack::new();
    {
        let mut root = stack.enter(StackFrame::root(unit));
        for decl in globals {
            evaluator.exec(&mut root, &tree, decl);
        }
    }
    for function in functions {
        evaluator.walk_function(&mut stack, unit, function);
    }
    diagnostics.extend(evaluator.finish());

    log::debug!(
        "analysed {}: {} diagnostics",
        ws.unit(unit).path().display(),
        diagnostics.len()
    );
    diagnostics
}

/// Names declared twice at top level or within one scope. A prototype
/// followed by its definition is not a redeclaration.
fn redeclarations(table: &SymbolTable) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
    for id in table.top_level() {
        let symbol = table.symbol(*id);
        let what = match symbol.kind() {
            SymbolKind::Method => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Struct => "struct",
            _ => continue,
        };
        if !symbol.name.is_empty() && !seen.insert((what, symbol.name.as_str())) {
            out.push(Diagnostic::error(
                symbol.name_range,
                format!("redeclaration of {what} `{}`", symbol.name),
            ));
        }
    }

    for (scope, symbol) in table.iter() {
        if !symbol.kind().is_scope() {
            continue;
        }
        let mut locals: FxHashSet<&str> = FxHashSet::default();
        // A function body shares its scope with the parameters.
        if let Some(function) = body_owner(table, scope) {
            locals.extend(
                table
                    .children(function)
                    .iter()
                    .map(|id| table.symbol(*id))
                    .filter(|param| param.kind() == SymbolKind::Parameter)
                    .map(|param| param.name.as_str()),
            );
        }
        for child in table.children(scope) {
            let child = table.symbol(*child);
            let what = match child.kind() {
                SymbolKind::Variable | SymbolKind::Parameter => "local",
                SymbolKind::StructMember => "member",
                _ => continue,
            };
            if !child.name.is_empty() && !locals.insert(child.name.as_str()) {
                out.push(Diagnostic::error(
                    child.name_range,
                    format!("redeclaration of {what} `{}`", child.name),
                ));
            }
        }
    }
    out
}

fn body_owner(table: &SymbolTable, block: SymbolId) -> Option<SymbolId> {
    let symbol = table.symbol(block);
    if symbol.kind() != SymbolKind::Block {
        return None;
    }
    let owner = symbol.parent?;
    let is_function = matches!(
        table.symbol(owner).kind(),
        SymbolKind::Method | SymbolKind::MethodDeclaration | SymbolKind::InlineClosure
    );
    let first_block = table
        .children(owner)
        .iter()
        .copied()
        .find(|child| table.symbol(*child).kind() == SymbolKind::Block);
    (is_function && first_block == Some(block)).then_some(owner)
}
