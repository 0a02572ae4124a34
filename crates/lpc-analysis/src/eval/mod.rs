//! Partial evaluation of LPC expressions.
//!
//! Evaluation only goes as far as needed to tell what an expression refers
//! to: string paths, loaded objects and struct-typed values. It is what
//! decides whether `a->b` is a call into another object or a struct member
//! access, and it doubles as the semantic walk over function bodies.

mod arrow;
mod call_stack;
mod value;

pub use arrow::ArrowResolution;
pub use call_stack::{CallStack, FrameGuard, StackFrame};
pub use value::Value;

use fxhash::{FxHashMap, FxHashSet};
use lpc_source::{Diagnostic, Position};
use lpc_symbols::{Symbol, SymbolId, SymbolKind, SymbolRef, TableId, TableProvider};
use lpc_syntax::{parse_expression, NodeId, RuleKind, SyntaxTree, TokenKind};

use crate::unit::UnitId;
use crate::workspace::Workspace;

/// Nested function evaluations before giving up on a value.
pub const MAX_CALL_DEPTH: u32 = 8;

pub(crate) fn is_function(symbol: &Symbol) -> bool {
    matches!(symbol.kind(), SymbolKind::Method | SymbolKind::MethodDeclaration)
}

pub(crate) struct Evaluator<'w> {
    pub(crate) ws: &'w mut Workspace,
    /// Unit whose diagnostics are collected.
    unit: UnitId,
    diagnostics: Vec<Diagnostic>,
    /// Diagnostics are dropped while non-zero.
    quiet: u32,
    calls: u32,
    /// Values of function bodies and global initializers already evaluated.
    memo: FxHashMap<(UnitId, SymbolId), Value>,
    in_progress: FxHashSet<(UnitId, SymbolId)>,
    /// Defines whose body is being evaluated.
    expanding: FxHashSet<SymbolRef>,
}

impl<'w> Evaluator<'w> {
    pub(crate) fn new(ws: &'w mut Workspace, unit: UnitId) -> Self {
        Self {
            ws,
            unit,
            diagnostics: Vec::new(),
            quiet: 0,
            calls: 0,
            memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            expanding: FxHashSet::default(),
        }
    }

    pub(crate) fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if self.quiet == 0 {
            self.diagnostics.push(diagnostic);
        }
    }

    fn quietly<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.quiet += 1;
        let result = f(self);
        self.quiet -= 1;
        result
    }

    fn current_unit(&self, stack: &CallStack) -> UnitId {
        stack.top().map_or(self.unit, |frame| frame.unit)
    }

    fn record_reference(&mut self, unit: UnitId, name: &str) {
        if self.quiet == 0 {
            self.ws.unit_mut(unit).table.record_reference(name);
        }
    }

    /// Resolve `name` as seen from `pos` in `unit`.
    fn resolve_at(
        &self,
        unit: UnitId,
        pos: Position,
        name: &str,
        accept: impl Fn(&Symbol) -> bool,
    ) -> Option<SymbolRef> {
        let ws: &Workspace = &*self.ws;
        let table = &ws.unit(unit).table;
        let scope = table.scope_at(pos);
        match table.resolve_in_scope(ws, scope, name) {
            Some(found) if ws.symbol(found).map_or(false, &accept) => Some(found),
            _ => table.resolve_matching(ws, name, false, accept),
        }
    }

    // ---- functions ------------------------------------------------------

    /// Walk a function body with diagnostics enabled. Used by semantic
    /// analysis for every function of the analysed unit.
    pub(crate) fn walk_function(&mut self, stack: &mut CallStack, unit: UnitId, function: SymbolId) {
        let value = self.run_function(stack, unit, function, Vec::new());
        self.memo.insert((unit, function), value);
    }

    /// Value of a call to `function`, evaluated once per analysis with
    /// diagnostics suppressed.
    pub(crate) fn call_function(
        &mut self,
        stack: &mut CallStack,
        unit: UnitId,
        function: SymbolId,
        args: Vec<Value>,
    ) -> Value {
        let key = (unit, function);
        if let Some(value) = self.memo.get(&key) {
            return value.clone();
        }
        if self.calls >= MAX_CALL_DEPTH || self.in_progress.contains(&key) {
            log::debug!("not evaluating {function:?} in {unit:?}: depth {}", self.calls);
            return Value::Unknown;
        }
        self.in_progress.insert(key);
        let value = self.quietly(|ev| ev.run_function(stack, unit, function, args));
        self.in_progress.remove(&key);
        self.memo.insert(key, value.clone());
        value
    }

    /// Push a root frame over the callee's unit and a child frame over the
    /// function, bind arguments positionally and run the body.
    fn run_function(
        &mut self,
        stack: &mut CallStack,
        unit: UnitId,
        function: SymbolId,
        args: Vec<Value>,
    ) -> Value {
        let Some(tree) = self.ws.unit(unit).tree() else {
            return Value::Unknown;
        };
        let (node, params) = {
            let table = &self.ws.unit(unit).table;
            let Some(symbol) = table.get(function) else {
                return Value::Unknown;
            };
            let params: Vec<(String, Value)> = table
                .children(function)
                .iter()
                .map(|child| table.symbol(*child))
                .filter(|child| child.kind() == SymbolKind::Parameter)
                .map(|param| (param.name.clone(), Value::of_type(param.type_name.as_deref())))
                .collect();
            (symbol.node, params)
        };
        let Some(body) = node.and_then(|node| tree.body(node)) else {
            return Value::Unknown;
        };

        let mut root = stack.enter(StackFrame::root(unit));
        let mut frame = StackFrame::child(unit, function, root.next_index() - 1);
        let mut args = args.into_iter();
        for (name, declared) in params {
            let value = match args.next() {
                Some(Value::Unknown) | None => declared,
                Some(value) => value,
            };
            frame.params.insert(name, value);
        }
        let mut guard = root.enter(frame);

        self.calls += 1;
        let value = self.exec(&mut guard, &tree, body);
        self.calls -= 1;
        value.unwrap_or_default()
    }

    // ---- statements -----------------------------------------------------

    /// Execute every statement below `node`; the first `return` value wins.
    pub(crate) fn exec(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Option<Value> {
        log::trace!("exec {:?} at {:?}", tree.kind(node), tree.range(node).start);
        match tree.kind(node) {
            RuleKind::VariableDecl => {
                self.declare(stack, tree, node);
                None
            }
            RuleKind::ReturnStmt => Some(
                tree.child_nodes(node)
                    .next()
                    .map(|expr| self.eval(stack, tree, expr))
                    .unwrap_or_default(),
            ),
            kind if kind.is_expression() => {
                self.eval(stack, tree, node);
                None
            }
            _ => {
                let mut result = None;
                let children: Vec<NodeId> = tree.child_nodes(node).collect();
                for child in children {
                    let value = self.exec(stack, tree, child);
                    if result.is_none() {
                        result = value;
                    }
                }
                result
            }
        }
    }

    fn declare(&mut self, stack: &mut CallStack, tree: &SyntaxTree, decl: NodeId) {
        for declarator in tree.declarators(decl) {
            let value = match tree.initializer(declarator) {
                Some(init) => self.eval(stack, tree, init),
                None => Value::Unknown,
            };
            let value = match value {
                Value::Unknown => Value::of_type(tree.type_text(declarator).as_deref()),
                known => known,
            };
            if let Some(name) = tree.name_text(declarator) {
                stack.declare(name, value);
            }
        }
    }

    // ---- expressions ----------------------------------------------------

    pub(crate) fn eval(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        match tree.kind(node) {
            RuleKind::Literal => literal(tree, node),
            RuleKind::NameRef => self.identifier(stack, tree, node),
            RuleKind::ParenExpr => match tree.inner_expr(node) {
                Some(inner) => self.eval(stack, tree, inner),
                None => Value::Unknown,
            },
            RuleKind::BinaryExpr => self.binary(stack, tree, node),
            RuleKind::AssignExpr => self.assign(stack, tree, node),
            RuleKind::TernaryExpr => {
                let values: Vec<Value> = self.eval_children(stack, tree, node);
                match values.as_slice() {
                    [_, then, other] if *then == Value::Unknown => other.clone(),
                    [_, then, _] => then.clone(),
                    _ => Value::Unknown,
                }
            }
            RuleKind::UnaryExpr => {
                let operand = self.eval_children(stack, tree, node).pop().unwrap_or_default();
                match (tree.operator(node), operand) {
                    (Some(TokenKind::Minus), Value::Int(v)) => Value::Int(v.wrapping_neg()),
                    (Some(TokenKind::Minus), Value::Float(v)) => Value::Float(-v),
                    _ => Value::Unknown,
                }
            }
            RuleKind::CastExpr => self.cast(stack, tree, node),
            RuleKind::CallExpr => self.call(stack, tree, node),
            RuleKind::ArrowExpr => self.arrow(stack, tree, node),
            RuleKind::ArrayLiteral => Value::Array(self.eval_children(stack, tree, node)),
            RuleKind::ClosureExpr => {
                let children: Vec<NodeId> = tree.child_nodes(node).collect();
                for child in children {
                    self.exec(stack, tree, child);
                }
                Value::Closure
            }
            RuleKind::CatchExpr => {
                let children: Vec<NodeId> = tree.child_nodes(node).collect();
                for child in children {
                    self.exec(stack, tree, child);
                }
                // Either 0 or an error string, never an object.
                Value::Unknown
            }
            RuleKind::FunctionRef => Value::Closure,
            _ => {
                self.eval_children(stack, tree, node);
                Value::Unknown
            }
        }
    }

    fn eval_children(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Vec<Value> {
        let children: Vec<NodeId> = tree.child_nodes(node).collect();
        children
            .into_iter()
            .map(|child| {
                if tree.kind(child) == RuleKind::MappingEntry {
                    self.eval_children(stack, tree, child);
                    Value::Unknown
                } else {
                    self.eval(stack, tree, child)
                }
            })
            .collect()
    }

    fn binary(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let values = self.eval_children(stack, tree, node);
        let [lhs, rhs] = values.as_slice() else {
            return Value::Unknown;
        };
        match tree.operator(node) {
            Some(TokenKind::Plus) => lhs.add(rhs),
            Some(TokenKind::Minus) => lhs.arithmetic(rhs, i64::checked_sub),
            Some(TokenKind::Star) => lhs.arithmetic(rhs, i64::checked_mul),
            Some(TokenKind::Slash) => lhs.arithmetic(rhs, i64::checked_div),
            Some(TokenKind::Percent) => lhs.arithmetic(rhs, i64::checked_rem),
            Some(TokenKind::Comma) => rhs.clone(),
            _ => Value::Unknown,
        }
    }

    fn assign(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let children: Vec<NodeId> = tree.child_nodes(node).collect();
        let [target, source] = children.as_slice() else {
            self.eval_children(stack, tree, node);
            return Value::Unknown;
        };
        let current = self.eval(stack, tree, *target);
        let value = self.eval(stack, tree, *source);
        let value = match tree.operator(node) {
            Some(TokenKind::Assign) => value,
            Some(TokenKind::PlusAssign) => current.add(&value),
            _ => Value::Unknown,
        };
        if tree.kind(*target) == RuleKind::NameRef {
            if let Some(name) = tree.name_text(*target) {
                stack.assign(name, value.clone());
            }
        }
        value
    }

    /// `(struct point)x` and `(point)x` give a struct value; other casts
    /// keep the operand's value.
    fn cast(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let operand = tree
            .child_nodes(node)
            .find(|child| tree.kind(*child) != RuleKind::TypeSpec);
        let value = match operand {
            Some(operand) => self.eval(stack, tree, operand),
            None => Value::Unknown,
        };
        if tree.has_child_token(node, TokenKind::Star) {
            return Value::Unknown;
        }
        let Some(spec) = tree.find_child(node, RuleKind::TypeSpec) else {
            return value;
        };
        let spec_text = tree.text(spec);
        match Value::of_type(Some(&spec_text)) {
            Value::Struct(name) => Value::Struct(name),
            _ if tree.child_token(spec, TokenKind::Ident).is_some() => Value::Struct(spec_text),
            _ => value,
        }
    }

    fn identifier(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let Some(name) = tree.name_text(node) else {
            return Value::Unknown;
        };
        let unit = self.current_unit(stack);
        let range = tree.range(node);
        let found = self.resolve_at(unit, range.start, name, |_| true);

        if let Some(bound) = stack.lookup(name) {
            let bound = bound.clone();
            if found.is_some() {
                self.record_reference(unit, name);
            }
            return bound;
        }
        let Some(found) = found else {
            self.report(Diagnostic::error(range, format!("undefined variable `{name}`")));
            return Value::Unknown;
        };
        self.record_reference(unit, name);
        self.symbol_value(stack, found)
    }

    /// Value of a resolved declaration that has no binding in any frame.
    fn symbol_value(&mut self, stack: &mut CallStack, found: SymbolRef) -> Value {
        let Some(symbol) = self.ws.symbol(found) else {
            return Value::Unknown;
        };
        match symbol.kind() {
            SymbolKind::Define => {
                let has_params = !symbol.children.is_empty();
                let body = symbol.value.clone().unwrap_or_default();
                if has_params || self.calls >= MAX_CALL_DEPTH || !self.expanding.insert(found) {
                    return Value::Unknown;
                }
                let output = parse_expression(&body);
                let value = match output.tree.child_nodes(output.tree.root()).next() {
                    Some(expr) if output.errors.is_empty() => {
                        self.calls += 1;
                        let value = self.quietly(|ev| ev.eval(stack, &output.tree, expr));
                        self.calls -= 1;
                        value
                    }
                    _ => Value::Unknown,
                };
                self.expanding.remove(&found);
                value
            }
            SymbolKind::Variable if symbol.parent.is_none() => {
                let declared = Value::of_type(symbol.type_name.as_deref());
                if declared != Value::Unknown {
                    return declared;
                }
                match (UnitId::from_table(found.table), symbol.node) {
                    (Some(unit), Some(node)) => self.global_value(stack, unit, found.symbol, node),
                    _ => Value::Unknown,
                }
            }
            SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::StructMember => {
                Value::of_type(symbol.type_name.as_deref())
            }
            SymbolKind::Method | SymbolKind::MethodDeclaration | SymbolKind::Efun => Value::Closure,
            _ => Value::Unknown,
        }
    }

    /// Initializer value of a global variable, evaluated once.
    fn global_value(&mut self, stack: &mut CallStack, unit: UnitId, symbol: SymbolId, declarator: NodeId) -> Value {
        let key = (unit, symbol);
        if let Some(value) = self.memo.get(&key) {
            return value.clone();
        }
        if self.calls >= MAX_CALL_DEPTH || !self.in_progress.insert(key) {
            return Value::Unknown;
        }
        let value = match self.ws.unit(unit).tree() {
            Some(tree) => match tree.initializer(declarator) {
                Some(init) => {
                    let mut root = stack.enter(StackFrame::root(unit));
                    self.calls += 1;
                    let value = self.quietly(|ev| ev.eval(&mut root, &tree, init));
                    self.calls -= 1;
                    value
                }
                None => Value::Unknown,
            },
            None => Value::Unknown,
        };
        self.in_progress.remove(&key);
        self.memo.insert(key, value.clone());
        value
    }

    fn call(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let Some(view) = tree.call(node) else {
            return Value::Unknown;
        };
        let args: Vec<Value> = tree
            .arguments(view.args)
            .into_iter()
            .map(|arg| self.eval(stack, tree, arg))
            .collect();
        let unit = self.current_unit(stack);
        let range = tree.range(view.callee);

        match tree.kind(view.callee) {
            RuleKind::NameRef => {
                let Some(name) = tree.name_text(view.callee) else {
                    return Value::Unknown;
                };
                if let Some(value) = self.object_efun(unit, name, &args) {
                    self.record_reference(unit, name);
                    return value;
                }
                let found = self.resolve_at(unit, range.start, name, |s| {
                    s.kind().is_callable() || s.kind().is_value()
                });
                match found {
                    Some(found) => {
                        self.record_reference(unit, name);
                        self.invoke(stack, found, args)
                    }
                    None if stack.lookup(name).is_some() => Value::Unknown,
                    None => {
                        self.report(Diagnostic::warning(
                            range,
                            format!("function `{name}` may be undefined"),
                        ));
                        Value::Unknown
                    }
                }
            }
            RuleKind::ScopedName => {
                let Some(name) = tree.name_text(view.callee) else {
                    return Value::Unknown;
                };
                let qualifier = tree
                    .child_tokens(view.callee)
                    .map(|idx| tree.token(idx))
                    .find(|token| token.kind == TokenKind::Ident)
                    .filter(|token| token.text != name)
                    .map(|token| token.text.clone());
                match self.resolve_inherited(unit, qualifier.as_deref(), name) {
                    Some(found) => {
                        self.record_reference(unit, name);
                        self.invoke(stack, found, args)
                    }
                    None => {
                        self.report(Diagnostic::warning(
                            range,
                            format!("function `{name}` may be undefined"),
                        ));
                        Value::Unknown
                    }
                }
            }
            _ => {
                self.eval(stack, tree, view.callee);
                Value::Unknown
            }
        }
    }

    fn invoke(&mut self, stack: &mut CallStack, found: SymbolRef, args: Vec<Value>) -> Value {
        let is_method = self
            .ws
            .symbol(found)
            .map_or(false, |s| s.kind() == SymbolKind::Method);
        match UnitId::from_table(found.table) {
            Some(callee) if is_method => self.call_function(stack, callee, found.symbol, args),
            _ => Value::Unknown,
        }
    }

    /// `efun::name` looks in the efun table; `::name` and `base::name`
    /// skip the unit's own definitions.
    fn resolve_inherited(&self, unit: UnitId, qualifier: Option<&str>, name: &str) -> Option<SymbolRef> {
        let ws: &Workspace = &*self.ws;
        if qualifier == Some("efun") {
            return ws
                .table(TableId::EFUNS)
                .and_then(|table| table.resolve(ws, name, true));
        }
        let table = &ws.unit(unit).table;
        let callable = |s: &Symbol| s.kind().is_callable();
        table
            .dependencies()
            .filter(|dep| !dep.is_builtin())
            .find_map(|dep| {
                ws.table(dep)
                    .and_then(|dep| dep.resolve_matching(ws, name, false, callable))
            })
            .or_else(|| table.resolve_matching(ws, name, false, callable))
    }

    /// Efuns whose value is an object: `this_object()` and the loaders.
    fn object_efun(&mut self, unit: UnitId, name: &str, args: &[Value]) -> Option<Value> {
        match name {
            "this_object" => Some(Value::Object(unit)),
            "load_object" | "find_object" | "clone_object" => Some(
                args.first()
                    .and_then(Value::as_str)
                    .and_then(|path| self.ws.load_object(path))
                    .map_or(Value::Unknown, Value::Object),
            ),
            _ => None,
        }
    }
}

fn literal(tree: &SyntaxTree, node: NodeId) -> Value {
    if let Some(text) = tree.string_value(node) {
        return Value::String(text);
    }
    let Some(token) = tree.literal_token(node).map(|idx| tree.token(idx)) else {
        return Value::Unknown;
    };
    match token.kind {
        TokenKind::IntLit => {
            let text = token.text.as_str();
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => text.parse(),
            };
            parsed.map_or(Value::Unknown, Value::Int)
        }
        TokenKind::FloatLit => token.text.parse().map_or(Value::Unknown, Value::Float),
        TokenKind::CharLit => lpc_syntax::ast::unquote(&token.text)
            .chars()
            .next()
            .map_or(Value::Unknown, |c| Value::Int(c as i64)),
        _ => Value::Unknown,
    }
}
