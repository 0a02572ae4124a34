//! Foldable regions of a parse tree.

use lpc_syntax::{RuleKind, SyntaxTree};

use crate::unit::UnitId;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FoldingKind {
    Region,
    Imports,
}

/// Lines are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoldingRange {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: FoldingKind,
}

const FOLDED_RULES: [RuleKind; 6] = [
    RuleKind::Block,
    RuleKind::StructDef,
    RuleKind::ArrayLiteral,
    RuleKind::MappingLiteral,
    RuleKind::SwitchStmt,
    RuleKind::ClosureExpr,
];

/// Multi-line bodies and literals, plus runs of two or more `#include`
/// lines. Sorted by start line; a range already produced by an enclosing
/// rule is not repeated.
pub fn folding_ranges(tree: &SyntaxTree) -> Vec<FoldingRange> {
    let mut out: Vec<FoldingRange> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|node| FOLDED_RULES.contains(&tree.kind(*node)))
        .map(|node| tree.range(node))
        .filter(|range| range.is_multiline())
        .map(|range| FoldingRange {
            start_line: range.start.line,
            end_line: range.end.line,
            kind: FoldingKind::Region,
        })
        .collect();

    let mut run: Option<(u32, u32)> = None;
    for node in tree.child_nodes(tree.root()) {
        if tree.kind(node) != RuleKind::IncludeDirective {
            close_run(run.take(), &mut out);
            continue;
        }
        let line = tree.range(node).start.line;
        run = match run {
            Some((start, end)) if line == end + 1 => Some((start, line)),
            previous => {
                close_run(previous, &mut out);
                Some((line, line))
            }
        };
    }
    close_run(run, &mut out);

    out.sort();
    out.dedup_by(|a, b| a.start_line == b.start_line && a.end_line == b.end_line);
    out
}

fn close_run(run: Option<(u32, u32)>, out: &mut Vec<FoldingRange>) {
    if let Some((start, end)) = run.filter(|(start, end)| end > start) {
        out.push(FoldingRange {
            start_line: start,
            end_line: end,
            kind: FoldingKind::Imports,
        });
    }
}

impl Workspace {
    pub fn folding_ranges(&self, unit: UnitId) -> Vec<FoldingRange> {
        self.unit(unit)
            .tree()
            .map(|tree| folding_ranges(&tree))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use lpc_syntax::parse_source;

    use super::*;

    fn ranges(text: &str) -> Vec<(u32, u32, FoldingKind)> {
        folding_ranges(&parse_source(text).tree)
            .into_iter()
            .map(|r| (r.start_line, r.end_line, r.kind))
            .collect()
    }

    #[test]
    fn test_function_body_and_include_run() {
        let text = "#include \"a.h\"\n#include \"b.h\"\n#include \"c.h\"\n\nvoid create() {\n  int x;\n}\n";
        assert_eq!(
            ranges(text),
            vec![(1, 3, FoldingKind::Imports), (5, 7, FoldingKind::Region)]
        );
    }

    #[test]
    fn test_single_line_constructs_do_not_fold() {
        let text = "#include \"a.h\"\nint *list = ({ 1, 2 });\nvoid f() { }\n";
        assert!(ranges(text).is_empty());
    }

    #[test]
    fn test_nested_multiline_literal() {
        let text = "void f() {\n  mapping m = ([\n    \"a\": 1\n  ]);\n}\n";
        assert_eq!(
            ranges(text),
            vec![(1, 5, FoldingKind::Region), (2, 4, FoldingKind::Region)]
        );
    }
}
