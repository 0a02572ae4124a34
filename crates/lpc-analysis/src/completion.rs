//! Completion candidates at a caret position.
//!
//! The parser reports which token kinds and grammar rules it would accept
//! at the caret. Token kinds become operator suggestions; rules become
//! symbol queries that run concurrently and are merged in the order they
//! were registered, the first candidate of each label winning.

use fxhash::FxHashSet;
use futures::future::join_all;
use lpc_source::Position;
use lpc_symbols::{SymbolId, SymbolKind, SymbolRef, SymbolTable};
use lpc_syntax::{collect_candidates, CandidateSet, RuleKind, SyntaxTree, TokenKind};

use crate::unit::UnitId;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    /// `Operator` for punctuation, otherwise the kind of the symbol.
    pub kind: SymbolKind,
    /// Declared type, when there is one.
    pub detail: Option<String>,
    pub symbol: Option<SymbolRef>,
}

impl CompletionCandidate {
    fn operator(text: &str) -> Self {
        Self {
            label: text.to_string(),
            kind: SymbolKind::Operator,
            detail: None,
            symbol: None,
        }
    }
}

/// One symbol lookup of the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolQuery {
    Efuns,
    Variables,
    Methods,
    MethodDeclarations,
    /// Functions of an object a `->` resolved to, builtins excluded.
    MembersOf(UnitId),
}

impl SymbolQuery {
    async fn run(self, ws: &Workspace, unit: UnitId, pos: Position) -> Vec<CompletionCandidate> {
        let table = ws.unit(unit).table();
        match self {
            SymbolQuery::Efuns => {
                let mut out = kind_in(ws, ws.efun_table(), SymbolKind::Efun, false);
                out.extend(kind_in(ws, ws.global_table(), SymbolKind::Efun, false));
                out
            }
            SymbolQuery::Variables => {
                let scope = table.scope_at(pos);
                let mut out: Vec<CompletionCandidate> = table
                    .visible_in_scope(scope)
                    .into_iter()
                    .filter(|id| {
                        matches!(
                            table.symbol(*id).kind(),
                            SymbolKind::Variable | SymbolKind::Parameter
                        )
                    })
                    .map(|id| local(table, id))
                    .collect();
                out.extend(kind_in(ws, table, SymbolKind::Variable, true));
                out.extend(kind_in(ws, table, SymbolKind::Define, true));
                out
            }
            SymbolQuery::Methods => kind_in(ws, table, SymbolKind::Method, true),
            SymbolQuery::MethodDeclarations => kind_in(ws, table, SymbolKind::MethodDeclaration, true),
            SymbolQuery::MembersOf(object) => {
                let table = ws.unit(object).table();
                let mut out = kind_in(ws, table, SymbolKind::Method, true);
                out.extend(kind_in(ws, table, SymbolKind::MethodDeclaration, true));
                out
            }
        }
    }
}

fn candidate(found: SymbolRef, name: &str, kind: SymbolKind, type_name: Option<&String>) -> CompletionCandidate {
    CompletionCandidate {
        label: name.to_string(),
        kind,
        detail: type_name.cloned(),
        symbol: Some(found),
    }
}

fn local(table: &SymbolTable, id: SymbolId) -> CompletionCandidate {
    let symbol = table.symbol(id);
    candidate(table.symbol_ref(id), &symbol.name, symbol.kind(), symbol.type_name.as_ref())
}

/// Top-level symbols of one kind. With dependencies, the builtin tables are
/// left out; efuns have their own query.
fn kind_in(ws: &Workspace, table: &SymbolTable, kind: SymbolKind, with_dependencies: bool) -> Vec<CompletionCandidate> {
    table
        .get_all_symbols(ws, Some(kind), with_dependencies)
        .filter(|(found, _)| !with_dependencies || !found.table.is_builtin() || kind == SymbolKind::Define)
        .map(|(found, symbol)| candidate(found, &symbol.name, symbol.kind(), symbol.type_name.as_ref()))
        .collect()
}

/// Tokens that close or separate rather than start something.
fn is_closer(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::ClosureClose
            | TokenKind::Semi
            | TokenKind::Comma
            | TokenKind::Colon
    )
}

/// Index of the token being completed: an identifier under or right
/// before the caret, else the first token after it.
fn caret_index(tree: &SyntaxTree, pos: Position) -> usize {
    let tokens = tree.tokens();
    let index = tokens.partition_point(|t| t.range.end < pos);
    match tokens.get(index) {
        Some(token) if token.range.end == pos && token.kind != TokenKind::Ident => index + 1,
        _ => index,
    }
}

impl Workspace {
    /// Suggestions at `pos`: operators the grammar accepts there, and the
    /// symbols of every expression-level category.
    ///
    /// Members of a remote object are only offered once the unit has been
    /// analysed, since that is when arrow expressions get resolved.
    pub async fn completion_candidates(&self, unit: UnitId, pos: Position) -> Vec<CompletionCandidate> {
        let Some(tree) = self.unit(unit).tree() else {
            return Vec::new();
        };
        let caret = caret_index(&tree, pos);
        let expected = collect_candidates(tree.tokens(), caret);
        log::trace!(
            "completion at {}:{}: tokens {:?}, rules {:?}",
            pos.line,
            pos.column,
            expected.tokens,
            expected.rules
        );

        let mut candidates: Vec<CompletionCandidate> = expected
            .tokens
            .iter()
            .filter(|kind| !is_closer(**kind))
            .filter_map(|kind| kind.fixed_text())
            .map(CompletionCandidate::operator)
            .collect();

        let queries = self.queries(unit, &tree, caret, &expected);
        let results = join_all(queries.into_iter().map(|query| query.run(self, unit, pos))).await;
        candidates.extend(results.into_iter().flatten());

        let mut seen = FxHashSet::default();
        candidates.retain(|c| seen.insert(c.label.clone()));
        candidates
    }

    fn queries(&self, unit: UnitId, tree: &SyntaxTree, caret: usize, expected: &CandidateSet) -> Vec<SymbolQuery> {
        if expected.has_rule(RuleKind::MemberName) && caret > 0 {
            let arrow_token = caret - 1;
            let remote = (tree.token(arrow_token).kind == TokenKind::Arrow)
                .then(|| tree.token_parent(arrow_token))
                .flatten()
                .and_then(|arrow| self.unit(unit).arrow_resolution(arrow))
                .and_then(|resolution| resolution.object());
            if let Some(object) = remote {
                return vec![SymbolQuery::MembersOf(object)];
            }
        }
        let in_code = expected
            .rules
            .iter()
            .any(|rule| rule.is_expression() || rule.is_statement());
        if !in_code {
            return Vec::new();
        }
        vec![
            SymbolQuery::Efuns,
            SymbolQuery::Variables,
            SymbolQuery::Methods,
            SymbolQuery::MethodDeclarations,
        ]
    }
}

#[cfg(test)]
mod tests {
    use lpc_syntax::parse_source;

    use super::*;

    #[test]
    fn test_caret_index_after_arrow_moves_past_operator() {
        let output = parse_source("void f() { ob->; }");
        let tree = &output.tree;
        let arrow = tree.tokens().iter().position(|t| t.kind == TokenKind::Arrow).unwrap();
        let end = tree.token(arrow).range.end;
        assert_eq!(caret_index(tree, end), arrow + 1);
    }

    #[test]
    fn test_caret_index_stays_on_identifier() {
        let output = parse_source("void f() { wri }");
        let tree = &output.tree;
        let ident = tree.tokens().iter().position(|t| t.text == "wri").unwrap();
        let end = tree.token(ident).range.end;
        assert_eq!(caret_index(tree, end), ident);
    }

    #[test]
    fn test_closers_are_not_offered() {
        assert!(is_closer(TokenKind::RParen));
        assert!(!is_closer(TokenKind::Arrow));
        assert!(!is_closer(TokenKind::ArrayOpen));
    }
}
