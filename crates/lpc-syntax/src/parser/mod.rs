//! Recursive-descent LPC parser.
//!
//! The parser emits a flat list of [`Event`]s that is replayed into a
//! [`SyntaxTree`] once parsing is done. Working on events rather than nodes
//! makes two things cheap: wrapping an already parsed operand into a binary
//! or postfix node (insert a `Start` at a checkpoint) and rolling back a
//! speculative parse (truncate events and errors).

mod expr;
mod items;
mod stmt;

use fxhash::FxHashSet;
use lpc_source::Range;
use miette::SourceSpan;

use crate::error::{ParseAbort, SyntaxError};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::tree::{Event, RuleKind, SyntaxTree};

/// How the parser decides ambiguous positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionMode {
    /// Bounded lookahead only; gives up on genuinely ambiguous input.
    Fast,
    /// Resolves every position, speculating and rolling back where needed.
    Exhaustive,
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub errors: Vec<SyntaxError>,
    /// Strategy that produced the tree.
    pub mode: PredictionMode,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Token kinds and grammar rules the parser would accept at a caret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub tokens: Vec<TokenKind>,
    /// Rules open at the caret, outermost first, followed by rules that
    /// could start there.
    pub rules: Vec<RuleKind>,
}

impl CandidateSet {
    pub fn has_rule(&self, rule: RuleKind) -> bool {
        self.rules.contains(&rule)
    }

    fn add_token(&mut self, kind: TokenKind) {
        if !self.tokens.contains(&kind) {
            self.tokens.push(kind);
        }
    }

    fn add_rule(&mut self, rule: RuleKind) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }
}

/// Lex and parse a file, escalating from the fast to the exhaustive
/// strategy when the fast one hits an ambiguity.
pub fn parse_source(text: &str) -> ParseOutput {
    parse_two_tier(tokenize(text))
}

/// Run the two-tier strategy over an existing token stream.
pub fn parse_two_tier(tokens: Vec<Token>) -> ParseOutput {
    let (tokens, lex_errors) = split_invalid(tokens);
    let (events, errors, mode) = match run(&tokens, PredictionMode::Fast, None) {
        Ok((events, errors, _)) => (events, errors, PredictionMode::Fast),
        Err(ParseAbort::Ambiguity { token }) => {
            log::info!("fast prediction aborted at token {token}, retrying exhaustively");
            match run(&tokens, PredictionMode::Exhaustive, None) {
                Ok((events, errors, _)) => (events, errors, PredictionMode::Exhaustive),
                // The exhaustive tier never aborts.
                Err(_) => (Vec::new(), Vec::new(), PredictionMode::Exhaustive),
            }
        }
    };
    finish_output(tokens, lex_errors, events, errors, mode)
}

/// Parse with a fixed strategy. `Fast` may fail with [`ParseAbort`].
pub fn parse_tokens(tokens: Vec<Token>, mode: PredictionMode) -> Result<ParseOutput, ParseAbort> {
    let (tokens, lex_errors) = split_invalid(tokens);
    let (events, errors, _) = run(&tokens, mode, None)?;
    Ok(finish_output(tokens, lex_errors, events, errors, mode))
}

/// Parse a standalone expression, such as the body of a `#define`.
///
/// The root node is a `SourceFile` whose first child is the expression.
pub fn parse_expression(text: &str) -> ParseOutput {
    let (tokens, lex_errors) = split_invalid(tokenize(text));
    let mut parser = Parser::new(&tokens, PredictionMode::Exhaustive, None);
    parser.start(RuleKind::SourceFile);
    if !parser.at_eof() {
        parser.parse_expr();
    }
    while !parser.at_eof() {
        parser.error_unexpected("end of expression");
        parser.bump_into_error();
    }
    parser.finish();
    let events = std::mem::take(&mut parser.events);
    let errors = std::mem::take(&mut parser.errors);
    finish_output(tokens, lex_errors, events, errors, PredictionMode::Exhaustive)
}

/// Expected tokens and rules at token index `caret`.
///
/// `tokens` must be the stream stored in a [`SyntaxTree`], so indices agree.
pub fn collect_candidates(tokens: &[Token], caret: usize) -> CandidateSet {
    match run(tokens, PredictionMode::Exhaustive, Some(caret)) {
        Ok((_, _, candidates)) => candidates,
        Err(_) => CandidateSet::default(),
    }
}

fn split_invalid(tokens: Vec<Token>) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut valid = Vec::with_capacity(tokens.len());
    let mut errors = Vec::new();
    for token in tokens {
        let unterminated = match token.kind {
            TokenKind::UnterminatedString => Some(("string literal", "\"")),
            TokenKind::UnterminatedComment => Some(("comment", "*/")),
            _ => None,
        };
        if let Some((construct, closer)) = unterminated {
            errors.push(SyntaxError::Unterminated {
                construct,
                closer,
                span: token.span,
                range: token.range,
            });
        } else if token.kind == TokenKind::Error {
            errors.push(SyntaxError::InvalidToken {
                text: token.text.clone(),
                span: token.span,
                range: token.range,
            });
        } else {
            valid.push(token);
        }
    }
    (valid, errors)
}

fn finish_output(
    tokens: Vec<Token>,
    mut lex_errors: Vec<SyntaxError>,
    events: Vec<Event>,
    errors: Vec<SyntaxError>,
    mode: PredictionMode,
) -> ParseOutput {
    lex_errors.extend(errors);
    lex_errors.sort_by_key(|err| err.range().start);
    ParseOutput {
        tree: SyntaxTree::build(tokens, &events),
        errors: lex_errors,
        mode,
    }
}

type RunResult = Result<(Vec<Event>, Vec<SyntaxError>, CandidateSet), ParseAbort>;

fn run(tokens: &[Token], mode: PredictionMode, caret: Option<usize>) -> RunResult {
    let mut parser = Parser::new(tokens, mode, caret);
    parser.parse_source_file();
    if let Some(abort) = parser.abort {
        return Err(abort);
    }
    Ok((parser.events, parser.errors, parser.candidates))
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    event: usize,
    pos: usize,
    errors: usize,
    caret_closed: bool,
}

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    events: Vec<Event>,
    errors: Vec<SyntaxError>,
    mode: PredictionMode,
    abort: Option<ParseAbort>,
    /// Struct and class names declared so far, used to prefer casts.
    struct_names: FxHashSet<String>,
    caret: Option<usize>,
    candidates: CandidateSet,
    caret_reached: bool,
    /// Set once the caret token has been rejected; later alternatives tried
    /// by error recovery are not candidates.
    caret_closed: bool,
    open_rules: Vec<RuleKind>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], mode: PredictionMode, caret: Option<usize>) -> Self {
        Self {
            tokens,
            pos: 0,
            events: Vec::with_capacity(tokens.len() * 2),
            errors: Vec::new(),
            mode,
            abort: None,
            struct_names: FxHashSet::default(),
            caret,
            candidates: CandidateSet::default(),
            caret_reached: false,
            caret_closed: false,
            open_rules: Vec::new(),
        }
    }

    // ---- token access -------------------------------------------------

    /// Kind of the token `n` ahead. An aborted parse sees only `Eof` so every
    /// loop unwinds.
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        if self.abort.is_some() {
            return TokenKind::Eof;
        }
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    pub(crate) fn nth_text(&self, n: usize) -> &str {
        self.tokens
            .get(self.pos + n)
            .map_or("", |t| t.text.as_str())
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.current() == TokenKind::Eof
    }

    /// Check the current token and record it as expected at the caret.
    pub(crate) fn at(&mut self, kind: TokenKind) -> bool {
        self.note_expected(&[kind]);
        self.current() == kind
    }

    pub(crate) fn at_any(&mut self, kinds: &[TokenKind]) -> bool {
        self.note_expected(kinds);
        kinds.contains(&self.current())
    }

    pub(crate) fn bump(&mut self) {
        if self.at_eof() {
            return;
        }
        self.events.push(Event::Token);
        self.pos += 1;
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or report it missing without consuming anything.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let expected = kind
            .fixed_text()
            .map(|t| format!("`{t}`"))
            .unwrap_or_else(|| match kind {
                TokenKind::Ident => "identifier".to_string(),
                other => format!("`{other:?}`").to_lowercase(),
            });
        self.error_unexpected(&expected);
        false
    }

    // ---- nodes --------------------------------------------------------

    pub(crate) fn start(&mut self, kind: RuleKind) {
        if self.at_caret() {
            self.capture_caret();
            self.candidates.add_rule(kind);
        }
        self.open_rules.push(kind);
        self.events.push(Event::Start(kind));
    }

    pub(crate) fn finish(&mut self) {
        self.open_rules.pop();
        self.events.push(Event::Finish);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            event: self.events.len(),
            pos: self.pos,
            errors: self.errors.len(),
            caret_closed: self.caret_closed,
        }
    }

    /// Open a node that retroactively starts at `cp`.
    pub(crate) fn start_at(&mut self, cp: Checkpoint, kind: RuleKind) {
        self.events.insert(cp.event, Event::Start(kind));
        self.open_rules.push(kind);
    }

    /// Discard everything parsed since `cp`.
    pub(crate) fn rewind(&mut self, cp: Checkpoint, open_rules: usize) {
        self.events.truncate(cp.event);
        self.errors.truncate(cp.errors);
        self.pos = cp.pos;
        self.caret_closed = cp.caret_closed;
        self.open_rules.truncate(open_rules);
    }

    // ---- errors -------------------------------------------------------

    pub(crate) fn error_unexpected(&mut self, expected: &str) {
        let (found, span, range) = match self.tokens.get(self.pos) {
            Some(token) if self.abort.is_none() => {
                (format!("`{}`", token.text), token.span, token.range)
            }
            _ => {
                let (span, range) = self.end_location();
                ("end of file".to_string(), span, range)
            }
        };
        self.close_caret();
        // One error per location keeps recovery from cascading.
        if self.errors.last().map(|e| e.range()) == Some(range) {
            return;
        }
        self.errors.push(SyntaxError::Unexpected {
            expected: expected.to_string(),
            found,
            span,
            range,
        });
    }

    pub(crate) fn error_unterminated(
        &mut self,
        construct: &'static str,
        closer: &'static str,
        opener: usize,
    ) {
        if let Some(token) = self.tokens.get(opener) {
            self.errors.push(SyntaxError::Unterminated {
                construct,
                closer,
                span: token.span,
                range: token.range,
            });
        }
    }

    fn end_location(&self) -> (SourceSpan, Range) {
        match self.tokens.last() {
            Some(last) => (
                SourceSpan::from((last.span.offset() + last.span.len(), 0)),
                Range::new(last.range.end, last.range.end),
            ),
            None => (SourceSpan::from((0, 0)), Range::at(1, 0)),
        }
    }

    /// Wrap the current token into an `Error` node.
    pub(crate) fn bump_into_error(&mut self) {
        if self.at_eof() {
            return;
        }
        self.start(RuleKind::Error);
        self.bump();
        self.finish();
    }

    pub(crate) fn abort_ambiguity(&mut self) {
        if self.abort.is_none() {
            log::debug!("ambiguous construct at token {}", self.pos);
            self.abort = Some(ParseAbort::Ambiguity { token: self.pos });
        }
    }

    pub(crate) fn mode(&self) -> PredictionMode {
        self.mode
    }

    pub(crate) fn is_struct_name(&self, name: &str) -> bool {
        self.struct_names.contains(name)
    }

    pub(crate) fn declare_struct(&mut self, name: &str) {
        self.struct_names.insert(name.to_string());
    }

    pub(crate) fn open_rule_count(&self) -> usize {
        self.open_rules.len()
    }

    // ---- caret recording ----------------------------------------------

    fn at_caret(&self) -> bool {
        self.caret == Some(self.pos) && self.abort.is_none() && !self.caret_closed
    }

    /// Stop recording if the current token is the caret and was rejected.
    pub(crate) fn close_caret(&mut self) {
        if self.at_caret() {
            self.caret_closed = true;
        }
    }

    fn capture_caret(&mut self) {
        if !self.caret_reached {
            self.caret_reached = true;
            for rule in self.open_rules.clone() {
                self.candidates.add_rule(rule);
            }
        }
    }

    pub(crate) fn note_expected(&mut self, kinds: &[TokenKind]) {
        if self.at_caret() {
            self.capture_caret();
            for kind in kinds {
                self.candidates.add_token(*kind);
            }
        }
    }

    /// Record a rule that may start at the caret without opening it.
    pub(crate) fn note_rule(&mut self, rule: RuleKind) {
        if self.at_caret() {
            self.capture_caret();
            self.candidates.add_rule(rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeId;

    fn kinds_below(output: &ParseOutput, node: NodeId) -> Vec<RuleKind> {
        output
            .tree
            .descendants(node)
            .into_iter()
            .map(|n| output.tree.kind(n))
            .collect()
    }

    #[test]
    fn test_unambiguous_file_uses_fast_mode() {
        let output = parse_source("int x;\nvoid create() { x = 1; }\n");
        assert_eq!(output.mode, PredictionMode::Fast);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
    }

    #[test]
    fn test_fast_mode_aborts_on_cast_or_group() {
        let tokens = tokenize("void f() { int y = (x) - 1; }");
        let result = parse_tokens(tokens, PredictionMode::Fast);
        assert!(matches!(result, Err(ParseAbort::Ambiguity { .. })));
    }

    #[test]
    fn test_escalation_prefers_cast_for_declared_struct() {
        let output = parse_source(
            "struct point { int x; };\nvoid f(mixed p) { mixed q = (point) - p; }\n",
        );
        assert_eq!(output.mode, PredictionMode::Exhaustive);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert!(kinds_below(&output, output.tree.root()).contains(&RuleKind::CastExpr));
    }

    #[test]
    fn test_escalation_groups_unknown_identifier() {
        let output = parse_source("void f(int x) { int y = (x) - 1; }\n");
        assert_eq!(output.mode, PredictionMode::Exhaustive);
        let kinds = kinds_below(&output, output.tree.root());
        assert!(kinds.contains(&RuleKind::ParenExpr));
        assert!(!kinds.contains(&RuleKind::CastExpr));
    }

    #[test]
    fn test_errors_do_not_abort() {
        let output = parse_source("void f() { x = ; }\nint y;\n");
        assert!(output.has_errors());
        let top: Vec<RuleKind> = output
            .tree
            .child_nodes(output.tree.root())
            .map(|n| output.tree.kind(n))
            .collect();
        assert_eq!(top, vec![RuleKind::FunctionDef, RuleKind::VariableDecl]);
    }

    #[test]
    fn test_invalid_character_is_reported() {
        let output = parse_source("int x; @\n");
        assert!(matches!(output.errors[0], SyntaxError::InvalidToken { .. }));
    }

    #[test]
    fn test_unterminated_string_is_reported_as_such() {
        let output = parse_source("void f() { write(\"abc); }\n/* trailing");
        let messages: Vec<String> = output.errors.iter().map(|e| e.to_string()).collect();
        assert!(messages.contains(&"unterminated string literal".to_string()), "{messages:?}");
        assert!(messages.contains(&"unterminated comment".to_string()), "{messages:?}");
        assert!(!messages.iter().any(|m| m.starts_with("invalid character")));
    }

    #[test]
    fn test_parse_expression_root_child() {
        let output = parse_expression("\"/obj/\" + \"torch\"");
        let expr = output.tree.child_nodes(output.tree.root()).next();
        assert_eq!(expr.map(|n| output.tree.kind(n)), Some(RuleKind::BinaryExpr));
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_candidates_after_arrow() {
        let output = parse_source("void f() { ob->; }");
        let caret = output
            .tree
            .tokens()
            .iter()
            .position(|t| t.kind == TokenKind::Semi)
            .unwrap();
        let candidates = collect_candidates(output.tree.tokens(), caret);
        assert!(candidates.has_rule(RuleKind::ArrowExpr));
        assert!(candidates.has_rule(RuleKind::MemberName));
        // Recovery after the missing name must not add postfix, binary or
        // assignment operators.
        assert_eq!(candidates.tokens, vec![TokenKind::Ident, TokenKind::LParen]);
    }

    #[test]
    fn test_rejected_caret_token_stops_recording() {
        let output = parse_source("void f() { int x = ; }");
        let caret = output
            .tree
            .tokens()
            .iter()
            .position(|t| t.kind == TokenKind::Semi)
            .unwrap();
        let candidates = collect_candidates(output.tree.tokens(), caret);
        assert!(candidates.tokens.contains(&TokenKind::Ident));
        assert!(!candidates.tokens.contains(&TokenKind::Semi));
        assert!(!candidates.tokens.contains(&TokenKind::Comma));
    }

    #[test]
    fn test_candidates_in_statement_position() {
        let output = parse_source("void f() { wri }");
        let caret = output
            .tree
            .tokens()
            .iter()
            .position(|t| t.text == "wri")
            .unwrap();
        let candidates = collect_candidates(output.tree.tokens(), caret);
        assert!(candidates.has_rule(RuleKind::Block));
        assert!(candidates.has_rule(RuleKind::NameRef));
        assert!(!candidates.has_rule(RuleKind::MemberName));
    }
}
