//! Typed views over [`SyntaxTree`] nodes.
//!
//! The tree is untyped; these helpers pull out the parts of declarations,
//! calls, arrows and directives that symbol collection and evaluation need.

use crate::lexer::TokenKind;
use crate::tree::{Element, NodeId, RuleKind, SyntaxTree};

/// Name of a preprocessor directive: `# define X` gives `define`.
pub fn directive_name(text: &str) -> &str {
    let rest = text.trim_start_matches('#').trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Directive text after its name, continuation lines joined.
pub fn directive_body(text: &str) -> String {
    let rest = text.trim_start_matches('#').trim_start();
    let name_len = directive_name(text).len();
    rest[name_len..]
        .replace("\\\r\n", " ")
        .replace("\\\n", " ")
        .trim()
        .to_string()
}

/// `#define NAME(a, b) body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    /// `Some` for function-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
}

pub fn parse_define(text: &str) -> Option<Define> {
    if directive_name(text) != "define" {
        return None;
    }
    let rest = directive_body(text);
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_end == 0 {
        return None;
    }
    let name = rest[..name_end].to_string();
    let after = &rest[name_end..];

    // Only `NAME(` with no space starts a parameter list.
    if let Some(params_text) = after.strip_prefix('(') {
        let close = params_text.find(')')?;
        let params = params_text[..close]
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        return Some(Define {
            name,
            params: Some(params),
            body: params_text[close + 1..].trim().to_string(),
        });
    }

    Some(Define {
        name,
        params: None,
        body: after.trim().to_string(),
    })
}

/// Raw target of `#include`, delimiters kept: `"room.h"` or `<lib.h>`.
pub fn include_target(text: &str) -> Option<String> {
    if directive_name(text) != "include" {
        return None;
    }
    let body = directive_body(text);
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Decode a string or char literal token, quotes removed.
pub fn unquote(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\n') | None => {}
            Some(other) => out.push(other),
        }
    }
    out
}

/// Method part of an arrow expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowTarget {
    /// `obj->`
    Missing,
    /// `obj->name`, holding the `MemberName` node.
    Name(NodeId),
    /// `obj->(expr)`, holding the parenthesised expression.
    Expr(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrowView {
    pub source: Option<NodeId>,
    pub target: ArrowTarget,
    pub args: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallView {
    pub callee: NodeId,
    pub args: Option<NodeId>,
}

impl SyntaxTree {
    /// First identifier owned directly by the node: the declared name of a
    /// function, declarator, parameter or struct.
    pub fn name_token(&self, node: NodeId) -> Option<usize> {
        if self.kind(node) == RuleKind::ScopedName {
            return self
                .child_tokens(node)
                .filter(|idx| self.token(*idx).kind == TokenKind::Ident)
                .last();
        }
        self.child_token(node, TokenKind::Ident)
    }

    pub fn name_text(&self, node: NodeId) -> Option<&str> {
        self.name_token(node).map(|idx| self.token(idx).text.as_str())
    }

    /// Declared type of a function, parameter or declarator, with array
    /// markers: `string *`.
    pub fn type_text(&self, node: NodeId) -> Option<String> {
        let type_owner = match self.kind(node) {
            RuleKind::Declarator => self.parent(node)?,
            _ => node,
        };
        let base = self
            .find_child(type_owner, RuleKind::TypeSpec)
            .map(|spec| self.text(spec));
        let stars = self
            .child_tokens(node)
            .filter(|idx| self.token(*idx).kind == TokenKind::Star)
            .count();
        match base {
            Some(base) if stars > 0 => Some(format!("{base} {}", "*".repeat(stars))),
            Some(base) => Some(base),
            None if stars > 0 => Some(format!("mixed {}", "*".repeat(stars))),
            None => None,
        }
    }

    pub fn modifiers(&self, node: NodeId) -> Vec<String> {
        self.find_child(node, RuleKind::Modifiers)
            .map(|mods| {
                self.child_tokens(mods)
                    .map(|idx| self.token(idx).text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn arrow(&self, node: NodeId) -> Option<ArrowView> {
        if self.kind(node) != RuleKind::ArrowExpr {
            return None;
        }
        let mut view = ArrowView {
            source: None,
            target: ArrowTarget::Missing,
            args: None,
        };
        let mut after_arrow = false;
        for element in self.children(node) {
            match *element {
                Element::Token(idx) if self.token(idx).kind == TokenKind::Arrow => {
                    after_arrow = true;
                }
                Element::Token(_) => {}
                Element::Node(child) if !after_arrow => view.source = Some(child),
                Element::Node(child) => match self.kind(child) {
                    RuleKind::MemberName => view.target = ArrowTarget::Name(child),
                    RuleKind::ParenExpr => view.target = ArrowTarget::Expr(child),
                    RuleKind::ArgList => view.args = Some(child),
                    _ => {}
                },
            }
        }
        Some(view)
    }

    pub fn call(&self, node: NodeId) -> Option<CallView> {
        if self.kind(node) != RuleKind::CallExpr {
            return None;
        }
        let callee = self.child_nodes(node).next()?;
        Some(CallView {
            callee,
            args: self.find_child(node, RuleKind::ArgList),
        })
    }

    /// Argument expressions of an `ArgList`.
    pub fn arguments(&self, args: Option<NodeId>) -> Vec<NodeId> {
        args.map(|list| self.child_nodes(list).collect())
            .unwrap_or_default()
    }

    /// Value of a literal made of one or more adjacent string tokens.
    pub fn string_value(&self, node: NodeId) -> Option<String> {
        if self.kind(node) != RuleKind::Literal {
            return None;
        }
        let mut out = String::new();
        for idx in self.child_tokens(node) {
            let token = self.token(idx);
            if token.kind != TokenKind::StringLit {
                return None;
            }
            out.push_str(&unquote(&token.text));
        }
        Some(out)
    }

    /// The single literal token of a `Literal` node.
    pub fn literal_token(&self, node: NodeId) -> Option<usize> {
        if self.kind(node) != RuleKind::Literal {
            return None;
        }
        self.child_tokens(node).next()
    }

    /// Inner expression of a `ParenExpr`.
    pub fn inner_expr(&self, node: NodeId) -> Option<NodeId> {
        self.child_nodes(node).next()
    }

    /// Operator token of a binary, unary, postfix or assignment node.
    pub fn operator(&self, node: NodeId) -> Option<TokenKind> {
        self.child_tokens(node).next().map(|idx| self.token(idx).kind)
    }

    /// The function body block of a `FunctionDef` or `ClosureExpr`.
    pub fn body(&self, node: NodeId) -> Option<NodeId> {
        self.find_child(node, RuleKind::Block)
    }

    pub fn params(&self, node: NodeId) -> Vec<NodeId> {
        self.find_child(node, RuleKind::ParamList)
            .map(|list| {
                self.child_nodes(list)
                    .filter(|p| self.kind(*p) == RuleKind::Param)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn declarators(&self, node: NodeId) -> Vec<NodeId> {
        self.child_nodes(node)
            .filter(|d| self.kind(*d) == RuleKind::Declarator)
            .collect()
    }

    /// Initializer expression of a declarator.
    pub fn initializer(&self, declarator: NodeId) -> Option<NodeId> {
        if self.has_child_token(declarator, TokenKind::Assign) {
            self.child_nodes(declarator).last()
        } else {
            None
        }
    }

    /// Whether a parameter is the `...` rest parameter or ends with it.
    pub fn is_varargs_param(&self, param: NodeId) -> bool {
        self.has_child_token(param, TokenKind::Ellipsis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_source};

    #[test]
    fn test_define_forms() {
        assert_eq!(
            parse_define("#define ROOM \"/std/room\""),
            Some(Define {
                name: "ROOM".into(),
                params: None,
                body: "\"/std/room\"".into()
            })
        );
        assert_eq!(
            parse_define("#define ADD(a, b) ((a) + \\\n (b))"),
            Some(Define {
                name: "ADD".into(),
                params: Some(vec!["a".into(), "b".into()]),
                body: "((a) +   (b))".into()
            })
        );
        assert_eq!(parse_define("#include <x.h>"), None);
    }

    #[test]
    fn test_include_target_keeps_delimiters() {
        assert_eq!(include_target("#include <lib.h>"), Some("<lib.h>".into()));
        assert_eq!(include_target("# include \"room.h\""), Some("\"room.h\"".into()));
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a\"b\n""#), "a\"b\n");
        assert_eq!(unquote("'x'"), "x");
    }

    #[test]
    fn test_declaration_views() {
        let output = parse_source("static string *names(int count, mixed rest...) { return 0; }");
        let tree = &output.tree;
        let func = tree.child_nodes(tree.root()).next().unwrap();
        assert_eq!(tree.name_text(func), Some("names"));
        assert_eq!(tree.type_text(func), Some("string *".to_string()));
        assert_eq!(tree.modifiers(func), vec!["static".to_string()]);
        let params = tree.params(func);
        assert_eq!(params.len(), 2);
        assert_eq!(tree.type_text(params[0]), Some("int".to_string()));
        assert!(tree.is_varargs_param(params[1]));
    }

    #[test]
    fn test_arrow_view() {
        let output = parse_expression("ob->query(1, 2)");
        let tree = &output.tree;
        let arrow = tree.child_nodes(tree.root()).next().unwrap();
        let view = tree.arrow(arrow).unwrap();
        assert_eq!(view.source.map(|s| tree.kind(s)), Some(RuleKind::NameRef));
        let ArrowTarget::Name(name) = view.target else {
            panic!("expected a name target");
        };
        assert_eq!(tree.text(name), "query");
        assert_eq!(tree.arguments(view.args).len(), 2);
    }

    #[test]
    fn test_string_value_concatenates() {
        let output = parse_expression("\"/obj/\" \"torch\"");
        let tree = &output.tree;
        let lit = tree.child_nodes(tree.root()).next().unwrap();
        assert_eq!(tree.string_value(lit), Some("/obj/torch".to_string()));
    }
}
