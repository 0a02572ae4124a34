//! `a->b(...)`: remote call or struct member access.

use lpc_source::Diagnostic;
use lpc_symbols::{SymbolKind, SymbolRef};
use lpc_syntax::ast::ArrowTarget;
use lpc_syntax::{NodeId, SyntaxTree};

use super::{is_function, CallStack, Evaluator, Value};
use crate::unit::UnitId;

/// What an arrow expression turned out to be in the current analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrowResolution {
    /// The source did not evaluate to anything usable.
    Unresolved,
    /// A call into another object. `function` is `None` when the method
    /// name is missing or the object does not define it.
    RemoteCall {
        object: UnitId,
        function: Option<SymbolRef>,
    },
    /// Member access on a struct value.
    StructAccess { member: Option<String> },
}

impl ArrowResolution {
    pub fn object(&self) -> Option<UnitId> {
        match self {
            ArrowResolution::RemoteCall { object, .. } => Some(*object),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<SymbolRef> {
        match self {
            ArrowResolution::RemoteCall { function, .. } => *function,
            _ => None,
        }
    }
}

impl Evaluator<'_> {
    fn record_arrow(&mut self, unit: UnitId, node: NodeId, resolution: ArrowResolution) {
        if self.quiet == 0 {
            self.ws.unit_mut(unit).arrows.insert(node, resolution);
        }
    }

    pub(super) fn arrow(&mut self, stack: &mut CallStack, tree: &SyntaxTree, node: NodeId) -> Value {
        let Some(view) = tree.arrow(node) else {
            return Value::Unknown;
        };
        let unit = self.current_unit(stack);
        let range = tree.range(node);
        let source = match view.source {
            Some(source) => self.eval(stack, tree, source),
            None => Value::Unknown,
        };

        if source.is_struct() {
            let member = match view.target {
                ArrowTarget::Name(name) => Some(tree.text(name)),
                ArrowTarget::Expr(expr) => {
                    self.eval(stack, tree, expr);
                    None
                }
                ArrowTarget::Missing => {
                    self.report(Diagnostic::error(range, "missing member name"));
                    None
                }
            };
            if let Some(args) = view.args {
                self.report(Diagnostic::error(
                    tree.range(args),
                    "cannot call methods on struct members",
                ));
            }
            // Member types are not tracked, so the value stays unknown.
            self.record_arrow(unit, node, ArrowResolution::StructAccess { member });
            return Value::Unknown;
        }

        // Arguments belong to the caller's frame.
        let args: Vec<Value> = tree
            .arguments(view.args)
            .into_iter()
            .map(|arg| self.eval(stack, tree, arg))
            .collect();

        let (method, method_range) = match view.target {
            ArrowTarget::Missing => {
                self.report(Diagnostic::error(range, "missing method name"));
                (None, range)
            }
            ArrowTarget::Name(name) => (Some(tree.text(name)), tree.range(name)),
            ArrowTarget::Expr(expr) => (self.target_name(stack, tree, unit, expr), tree.range(expr)),
        };
        if method.is_some() && view.args.is_none() {
            self.report(Diagnostic::error(method_range, "missing call parentheses"));
        }

        let object = match &source {
            Value::String(path) => match self.ws.load_object(path) {
                Some(object) => object,
                None => {
                    let source_range = view.source.map_or(range, |s| tree.range(s));
                    self.report(Diagnostic::warning(
                        source_range,
                        format!("could not load source: {path}"),
                    ));
                    self.record_arrow(unit, node, ArrowResolution::Unresolved);
                    return Value::Unknown;
                }
            },
            Value::Object(object) => *object,
            other => {
                log::debug!("arrow source at {:?} is not an object: {other:?}", range.start);
                self.record_arrow(unit, node, ArrowResolution::Unresolved);
                return Value::Unknown;
            }
        };
        if object != unit {
            self.ws.add_as_reference_to(object, unit, false);
        }

        let Some(method) = method else {
            self.record_arrow(unit, node, ArrowResolution::RemoteCall { object, function: None });
            return Value::Unknown;
        };

        let function = {
            let ws = &*self.ws;
            ws.unit(object)
                .table()
                .resolve_matching(ws, &method, false, is_function)
        };
        let Some(function) = function else {
            let path = self.ws.display_path(object);
            self.report(Diagnostic::warning(
                method_range,
                format!("function `{method}` may be undefined in {path}"),
            ));
            self.record_arrow(unit, node, ArrowResolution::RemoteCall { object, function: None });
            return Value::Unknown;
        };
        self.record_arrow(
            unit,
            node,
            ArrowResolution::RemoteCall {
                object,
                function: Some(function),
            },
        );

        let is_method = self
            .ws
            .symbol(function)
            .map_or(false, |s| s.kind() == SymbolKind::Method);
        match UnitId::from_table(function.table) {
            Some(callee) if is_method => self.call_function(stack, callee, function.symbol, args),
            _ => Value::Unknown,
        }
    }

    /// Method name computed by `ob->(expr)`, evaluated once per generation.
    fn target_name(
        &mut self,
        stack: &mut CallStack,
        tree: &SyntaxTree,
        unit: UnitId,
        expr: NodeId,
    ) -> Option<String> {
        if let Some(cached) = self.ws.unit(unit).targets.get(&expr) {
            return cached.clone();
        }
        let value = match tree.inner_expr(expr) {
            Some(inner) => self.eval(stack, tree, inner),
            None => Value::Unknown,
        };
        let name = value.as_str().map(str::to_string);
        self.ws.unit_mut(unit).targets.insert(expr, name.clone());
        name
    }
}
