//! Top-level items: directives, inherits and declarations.

use super::Parser;
use crate::ast::directive_name;
use crate::lexer::TokenKind;
use crate::tree::RuleKind;

impl Parser<'_> {
    pub(crate) fn parse_source_file(&mut self) {
        self.start(RuleKind::SourceFile);
        while !self.at_eof() {
            let before = self.pos;
            self.parse_item();
            if self.pos == before {
                self.error_unexpected("declaration");
                self.bump_into_error();
            }
        }
        self.finish();
    }

    fn parse_item(&mut self) {
        match self.current() {
            TokenKind::Directive => self.parse_directive(),
            TokenKind::Semi => {
                self.start(RuleKind::EmptyStmt);
                self.bump();
                self.finish();
            }
            _ if self.at_inherit() => self.parse_inherit(),
            _ => self.parse_declaration(),
        }
    }

    fn parse_directive(&mut self) {
        let kind = match directive_name(self.nth_text(0)) {
            "include" => RuleKind::IncludeDirective,
            "define" => RuleKind::DefineDirective,
            _ => RuleKind::Directive,
        };
        self.start(kind);
        self.bump();
        self.finish();
    }

    fn at_inherit(&self) -> bool {
        let mut n = 0;
        while self.nth(n).is_modifier() {
            n += 1;
        }
        self.nth(n) == TokenKind::Inherit
    }

    fn parse_inherit(&mut self) {
        self.start(RuleKind::InheritDecl);
        self.parse_modifiers();
        self.expect(TokenKind::Inherit);
        if self.at_any(&[TokenKind::StringLit, TokenKind::Ident]) {
            self.parse_expr();
        } else {
            self.error_unexpected("inherited file name");
        }
        self.expect(TokenKind::Semi);
        self.finish();
    }

    pub(crate) fn parse_modifiers(&mut self) -> bool {
        if !self.current().is_modifier() {
            return false;
        }
        self.start(RuleKind::Modifiers);
        while self.current().is_modifier() {
            self.bump();
        }
        self.finish();
        true
    }

    /// Whether the current token can begin a type: a type keyword or
    /// `struct Name` / `class Name`.
    pub(crate) fn at_type_start(&self) -> bool {
        let kind = self.current();
        kind.is_type_keyword()
            || (matches!(kind, TokenKind::Struct | TokenKind::Class)
                && self.nth(1) == TokenKind::Ident)
    }

    pub(crate) fn parse_type_spec(&mut self) {
        self.start(RuleKind::TypeSpec);
        if matches!(self.current(), TokenKind::Struct | TokenKind::Class) {
            self.bump();
            self.expect(TokenKind::Ident);
        } else {
            self.bump();
        }
        self.finish();
    }

    fn parse_declaration(&mut self) {
        let cp = self.checkpoint();
        self.parse_modifiers();

        if matches!(self.current(), TokenKind::Struct | TokenKind::Class)
            && self.nth(1) == TokenKind::Ident
            && matches!(self.nth(2), TokenKind::LBrace | TokenKind::LParen)
        {
            self.start_at(cp, RuleKind::StructDef);
            self.parse_struct_rest();
            self.finish();
            return;
        }

        if self.at_type_start() {
            self.parse_type_spec();
        } else if !(self.current() == TokenKind::Ident && self.nth(1) == TokenKind::LParen) {
            // Neither a typed declaration nor an untyped function.
            self.error_unexpected("declaration");
            self.start_at(cp, RuleKind::Error);
            self.bump();
            self.finish();
            return;
        }

        let mut n = 0;
        while self.nth(n) == TokenKind::Star {
            n += 1;
        }
        if self.nth(n) == TokenKind::Ident && self.nth(n + 1) == TokenKind::LParen {
            for _ in 0..n {
                self.bump();
            }
            self.bump();
            self.parse_param_list();
            if self.current() == TokenKind::LBrace {
                self.start_at(cp, RuleKind::FunctionDef);
                self.parse_block();
            } else {
                self.start_at(cp, RuleKind::FunctionDecl);
                self.expect(TokenKind::Semi);
            }
            self.finish();
            return;
        }

        self.start_at(cp, RuleKind::VariableDecl);
        self.parse_declarators();
        self.finish();
    }

    /// `name [= init] {, name [= init]} ;` after the type of a variable
    /// declaration.
    pub(crate) fn parse_declarators(&mut self) {
        loop {
            self.start(RuleKind::Declarator);
            while self.eat(TokenKind::Star) {}
            self.expect(TokenKind::Ident);
            if self.eat(TokenKind::Assign) {
                self.parse_assign();
            }
            self.finish();
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi);
    }

    pub(crate) fn parse_param_list(&mut self) {
        self.start(RuleKind::ParamList);
        let opener = self.pos;
        self.expect(TokenKind::LParen);
        if self.current() == TokenKind::Void && self.nth(1) == TokenKind::RParen {
            self.start(RuleKind::Param);
            self.parse_type_spec();
            self.finish();
        } else if !self.at(TokenKind::RParen) {
            loop {
                let before = self.pos;
                self.parse_param();
                if self.pos == before {
                    self.error_unexpected("parameter");
                    if matches!(self.current(), TokenKind::LBrace | TokenKind::Semi) {
                        break;
                    }
                    self.bump_into_error();
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.eat(TokenKind::RParen) {
            self.error_unterminated("parameter list", ")", opener);
        }
        self.finish();
    }

    fn parse_param(&mut self) {
        if !self.at_any(&[TokenKind::Ident, TokenKind::Ellipsis])
            && !self.at_type_start()
            && !self.current().is_modifier()
        {
            return;
        }
        self.start(RuleKind::Param);
        self.parse_modifiers();
        if self.at_type_start() {
            self.parse_type_spec();
        }
        while self.eat(TokenKind::Star) {}
        self.eat(TokenKind::Ident);
        self.eat(TokenKind::Ellipsis);
        if self.eat(TokenKind::Assign) {
            self.parse_assign();
        }
        self.finish();
    }

    /// `struct Name [(Base)] { members } [;]`, keyword already current.
    fn parse_struct_rest(&mut self) {
        self.bump();
        let name = self.nth_text(0).to_string();
        self.expect(TokenKind::Ident);
        self.declare_struct(&name);

        if self.eat(TokenKind::LParen) {
            self.expect(TokenKind::Ident);
            self.expect(TokenKind::RParen);
        }

        let opener = self.pos;
        if !self.expect(TokenKind::LBrace) {
            return;
        }
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_eof() {
                self.error_unterminated("struct body", "}", opener);
                break;
            }
            let before = self.pos;
            self.parse_struct_member();
            if self.pos == before {
                self.error_unexpected("struct member");
                self.bump_into_error();
            }
        }
        self.eat(TokenKind::Semi);
    }

    fn parse_struct_member(&mut self) {
        if !self.at_type_start() {
            return;
        }
        self.start(RuleKind::StructMember);
        self.parse_type_spec();
        loop {
            self.start(RuleKind::Declarator);
            while self.eat(TokenKind::Star) {}
            self.expect(TokenKind::Ident);
            self.finish();
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi);
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_source;
    use crate::tree::RuleKind;

    fn top_level(text: &str) -> Vec<RuleKind> {
        let output = parse_source(text);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        output
            .tree
            .child_nodes(output.tree.root())
            .map(|n| output.tree.kind(n))
            .collect()
    }

    #[test]
    fn test_directive_kinds() {
        assert_eq!(
            top_level("#include <lib.h>\n#define X 1\n#pragma strict_types\n"),
            vec![
                RuleKind::IncludeDirective,
                RuleKind::DefineDirective,
                RuleKind::Directive
            ]
        );
    }

    #[test]
    fn test_declaration_kinds() {
        assert_eq!(
            top_level(
                "private inherit \"/std/room\";\n\
                 int *list, count = 2;\n\
                 varargs string query(int a, mixed *rest...);\n\
                 static void create() { }\n\
                 reset() { }\n\
                 struct pair (base) { int a, b; mixed *c; };\n"
            ),
            vec![
                RuleKind::InheritDecl,
                RuleKind::VariableDecl,
                RuleKind::FunctionDecl,
                RuleKind::FunctionDef,
                RuleKind::FunctionDef,
                RuleKind::StructDef,
            ]
        );
    }

    #[test]
    fn test_void_parameter_list() {
        let output = parse_source("int f(void);");
        let decl = output.tree.child_nodes(output.tree.root()).next().unwrap();
        let params = output.tree.find_child(decl, RuleKind::ParamList).unwrap();
        assert_eq!(output.tree.child_nodes(params).count(), 1);
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_missing_semicolon_is_reported() {
        let output = parse_source("int x\nint y;");
        assert_eq!(output.errors.len(), 1);
    }
}
