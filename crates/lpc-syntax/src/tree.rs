//! Concrete syntax tree.
//!
//! Nodes live in an arena owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. Every token of the stream is attached to exactly one node, so
//! the tree covers the whole file and maps positions back to grammar rules.

use lpc_source::{Position, Range};

use crate::lexer::{Token, TokenKind};

/// Grammar rules that produce nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    SourceFile,

    // Preprocessor
    IncludeDirective,
    DefineDirective,
    Directive,

    // Declarations
    InheritDecl,
    FunctionDef,
    FunctionDecl,
    ParamList,
    Param,
    VariableDecl,
    Declarator,
    StructDef,
    StructMember,
    TypeSpec,
    Modifiers,

    // Statements
    Block,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    ForeachStmt,
    SwitchStmt,
    CaseLabel,
    DefaultLabel,
    ReturnStmt,
    BreakStmt,
    ContinueStmt,
    ExprStmt,
    EmptyStmt,

    // Expressions
    AssignExpr,
    TernaryExpr,
    BinaryExpr,
    UnaryExpr,
    PostfixExpr,
    CastExpr,
    CallExpr,
    ArgList,
    IndexExpr,
    ArrowExpr,
    /// Method or member name after `->`.
    MemberName,
    /// `::create` or `efun::write`.
    ScopedName,
    ParenExpr,
    ArrayLiteral,
    MappingLiteral,
    MappingEntry,
    ClosureExpr,
    /// `catch(expr)` or `catch { ... }`.
    CatchExpr,
    FunctionRef,
    NameRef,
    Literal,

    Error,
}

impl RuleKind {
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            RuleKind::AssignExpr
                | RuleKind::TernaryExpr
                | RuleKind::BinaryExpr
                | RuleKind::UnaryExpr
                | RuleKind::PostfixExpr
                | RuleKind::CastExpr
                | RuleKind::CallExpr
                | RuleKind::IndexExpr
                | RuleKind::ArrowExpr
                | RuleKind::ScopedName
                | RuleKind::ParenExpr
                | RuleKind::ArrayLiteral
                | RuleKind::MappingLiteral
                | RuleKind::ClosureExpr
                | RuleKind::CatchExpr
                | RuleKind::FunctionRef
                | RuleKind::NameRef
                | RuleKind::Literal
        )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            RuleKind::Block
                | RuleKind::IfStmt
                | RuleKind::WhileStmt
                | RuleKind::DoStmt
                | RuleKind::ForStmt
                | RuleKind::ForeachStmt
                | RuleKind::SwitchStmt
                | RuleKind::ReturnStmt
                | RuleKind::BreakStmt
                | RuleKind::ContinueStmt
                | RuleKind::ExprStmt
                | RuleKind::EmptyStmt
                | RuleKind::VariableDecl
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Node(NodeId),
    /// Index into [`SyntaxTree::tokens`].
    Token(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub kind: RuleKind,
    pub parent: Option<NodeId>,
    pub children: Vec<Element>,
    /// Half-open range of token indices covered by the node.
    pub first_token: usize,
    pub end_token: usize,
}

/// Events emitted by the parser, replayed into a tree by [`SyntaxTree::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Start(RuleKind),
    Token,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    tokens: Vec<Token>,
    token_parents: Vec<NodeId>,
}

impl SyntaxTree {
    pub(crate) fn build(tokens: Vec<Token>, events: &[Event]) -> Self {
        let mut tree = SyntaxTree {
            nodes: Vec::new(),
            token_parents: Vec::with_capacity(tokens.len()),
            tokens,
        };
        let mut stack: Vec<NodeId> = Vec::new();
        let mut cursor = 0usize;

        for event in events {
            match *event {
                Event::Start(kind) => {
                    let id = NodeId(tree.nodes.len() as u32);
                    let parent = stack.last().copied();
                    tree.nodes.push(NodeData {
                        kind,
                        parent,
                        children: Vec::new(),
                        first_token: cursor,
                        end_token: cursor,
                    });
                    if let Some(parent) = parent {
                        tree.nodes[parent.index()].children.push(Element::Node(id));
                    }
                    stack.push(id);
                }
                Event::Token => {
                    if let Some(&top) = stack.last() {
                        tree.nodes[top.index()].children.push(Element::Token(cursor));
                        tree.token_parents.push(top);
                    }
                    cursor += 1;
                }
                Event::Finish => {
                    if let Some(id) = stack.pop() {
                        tree.nodes[id.index()].end_token = cursor;
                    }
                }
            }
        }

        if tree.nodes.is_empty() {
            tree.nodes.push(NodeData {
                kind: RuleKind::SourceFile,
                parent: None,
                children: Vec::new(),
                first_token: 0,
                end_token: 0,
            });
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> RuleKind {
        self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[Element] {
        &self.nodes[id.index()].children
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(|el| match el {
            Element::Node(node) => Some(*node),
            Element::Token(_) => None,
        })
    }

    pub fn child_tokens(&self, id: NodeId) -> impl Iterator<Item = usize> + '_ {
        self.children(id).iter().filter_map(|el| match el {
            Element::Token(idx) => Some(*idx),
            Element::Node(_) => None,
        })
    }

    pub fn find_child(&self, id: NodeId, kind: RuleKind) -> Option<NodeId> {
        self.child_nodes(id).find(|child| self.kind(*child) == kind)
    }

    /// First direct child token of the given kind.
    pub fn child_token(&self, id: NodeId, kind: TokenKind) -> Option<usize> {
        self.child_tokens(id)
            .find(|idx| self.tokens[*idx].kind == kind)
    }

    pub fn has_child_token(&self, id: NodeId, kind: TokenKind) -> bool {
        self.child_token(id, kind).is_some()
    }

    /// Node that directly owns the token.
    pub fn token_parent(&self, index: usize) -> Option<NodeId> {
        self.token_parents.get(index).copied()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |node| self.parent(*node))
    }

    /// Pre-order walk below and including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            let children: Vec<NodeId> = self.child_nodes(node).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Source range of a node. Empty nodes sit at the start of the next token.
    pub fn range(&self, id: NodeId) -> Range {
        let data = &self.nodes[id.index()];
        if data.first_token < data.end_token {
            Range::new(
                self.tokens[data.first_token].range.start,
                self.tokens[data.end_token - 1].range.end,
            )
        } else {
            let pos = self
                .tokens
                .get(data.first_token)
                .map(|t| t.range.start)
                .or_else(|| self.tokens.last().map(|t| t.range.end))
                .unwrap_or(Position::new(1, 0));
            Range::new(pos, pos)
        }
    }

    pub fn token_range(&self, index: usize) -> Range {
        self.tokens[index].range
    }

    /// Token texts of the node separated by single spaces where the source
    /// had any gap, e.g. `string *`.
    pub fn text(&self, id: NodeId) -> String {
        let data = &self.nodes[id.index()];
        let mut out = String::new();
        let mut prev_end: Option<usize> = None;
        for token in &self.tokens[data.first_token..data.end_token] {
            if let Some(end) = prev_end {
                if token.span.offset() > end {
                    out.push(' ');
                }
            }
            out.push_str(&token.text);
            prev_end = Some(token.span.offset() + token.span.len());
        }
        out
    }

    pub fn is_empty_node(&self, id: NodeId) -> bool {
        let data = &self.nodes[id.index()];
        data.first_token == data.end_token
    }

    /// Index of the token whose range contains `pos`, preferring the later
    /// token when the caret sits between two adjacent tokens.
    pub fn token_at(&self, pos: Position) -> Option<usize> {
        token_index_at(&self.tokens, pos)
    }

    /// Innermost node whose range contains `pos`.
    pub fn node_at(&self, pos: Position) -> NodeId {
        let mut current = self.root();
        'descend: loop {
            for child in self.child_nodes(current) {
                if !self.is_empty_node(child) && self.range(child).contains(pos) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

/// Token containing `pos`, shared with candidate collection which works on
/// the raw stream.
pub fn token_index_at(tokens: &[Token], pos: Position) -> Option<usize> {
    let idx = tokens.partition_point(|t| t.range.end < pos);
    let token = tokens.get(idx)?;
    if token.range.start <= pos {
        if token.range.end == pos {
            if let Some(next) = tokens.get(idx + 1) {
                if next.range.start == pos {
                    return Some(idx + 1);
                }
            }
        }
        Some(idx)
    } else {
        None
    }
}
