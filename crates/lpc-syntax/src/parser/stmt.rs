use super::Parser;
use crate::lexer::TokenKind;
use crate::tree::RuleKind;

impl Parser<'_> {
    pub(crate) fn parse_block(&mut self) {
        self.start(RuleKind::Block);
        let opener = self.pos;
        self.expect(TokenKind::LBrace);
        loop {
            self.note_rule(RuleKind::ExprStmt);
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_eof() {
                self.error_unterminated("block", "}", opener);
                break;
            }
            let before = self.pos;
            self.parse_statement();
            if self.pos == before {
                self.error_unexpected("statement");
                self.bump_into_error();
            }
        }
        self.finish();
    }

    fn parse_statement(&mut self) {
        match self.current() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semi => {
                self.start(RuleKind::EmptyStmt);
                self.bump();
                self.finish();
            }
            TokenKind::If => {
                self.start(RuleKind::IfStmt);
                self.bump();
                self.parse_condition();
                self.parse_statement();
                if self.eat(TokenKind::Else) {
                    self.parse_statement();
                }
                self.finish();
            }
            TokenKind::While => {
                self.start(RuleKind::WhileStmt);
                self.bump();
                self.parse_condition();
                self.parse_statement();
                self.finish();
            }
            TokenKind::Do => {
                self.start(RuleKind::DoStmt);
                self.bump();
                self.parse_statement();
                self.expect(TokenKind::While);
                self.parse_condition();
                self.expect(TokenKind::Semi);
                self.finish();
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Switch => {
                self.start(RuleKind::SwitchStmt);
                self.bump();
                self.parse_condition();
                self.parse_block();
                self.finish();
            }
            TokenKind::Case => {
                self.start(RuleKind::CaseLabel);
                self.bump();
                self.parse_expr();
                if self.eat(TokenKind::DotDot) {
                    self.parse_expr();
                }
                self.expect(TokenKind::Colon);
                self.finish();
            }
            TokenKind::Default if self.nth(1) == TokenKind::Colon => {
                self.start(RuleKind::DefaultLabel);
                self.bump();
                self.bump();
                self.finish();
            }
            TokenKind::Return => {
                self.start(RuleKind::ReturnStmt);
                self.bump();
                if !self.at(TokenKind::Semi) {
                    self.parse_expr();
                }
                self.expect(TokenKind::Semi);
                self.finish();
            }
            TokenKind::Break | TokenKind::Continue => {
                let kind = if self.current() == TokenKind::Break {
                    RuleKind::BreakStmt
                } else {
                    RuleKind::ContinueStmt
                };
                self.start(kind);
                self.bump();
                self.expect(TokenKind::Semi);
                self.finish();
            }
            _ if self.at_local_declaration() => self.parse_local_declaration(),
            _ => {
                self.start(RuleKind::ExprStmt);
                self.parse_expr();
                self.expect(TokenKind::Semi);
                self.finish();
            }
        }
    }

    fn parse_condition(&mut self) {
        self.expect(TokenKind::LParen);
        self.parse_expr();
        self.expect(TokenKind::RParen);
    }

    /// A declaration inside a function body. `function (...) {}` and
    /// `(struct x)` casts are expressions, not declarations.
    fn at_local_declaration(&self) -> bool {
        let kind = self.current();
        if kind.is_modifier() {
            return true;
        }
        if kind == TokenKind::FunctionKw {
            return self.nth(1) != TokenKind::LParen;
        }
        if kind.is_type_keyword() {
            return true;
        }
        matches!(kind, TokenKind::Struct | TokenKind::Class)
            && self.nth(1) == TokenKind::Ident
            && matches!(self.nth(2), TokenKind::Ident | TokenKind::Star)
    }

    fn parse_local_declaration(&mut self) {
        let cp = self.checkpoint();
        self.parse_modifiers();
        if self.at_type_start() {
            self.parse_type_spec();
        }
        self.start_at(cp, RuleKind::VariableDecl);
        self.parse_declarators();
        self.finish();
    }

    fn parse_for(&mut self) {
        self.start(RuleKind::ForStmt);
        self.bump();
        self.expect(TokenKind::LParen);

        if self.at_local_declaration() {
            self.parse_local_declaration();
        } else {
            if !self.at(TokenKind::Semi) {
                self.parse_expr();
            }
            self.expect(TokenKind::Semi);
        }
        if !self.at(TokenKind::Semi) {
            self.parse_expr();
        }
        self.expect(TokenKind::Semi);
        if !self.at(TokenKind::RParen) {
            self.parse_expr();
        }
        self.expect(TokenKind::RParen);

        self.parse_statement();
        self.finish();
    }

    fn parse_foreach(&mut self) {
        self.start(RuleKind::ForeachStmt);
        self.bump();
        self.expect(TokenKind::LParen);
        self.parse_foreach_var();
        if self.eat(TokenKind::Comma) {
            self.parse_foreach_var();
        }
        if !self.eat(TokenKind::In) && !self.eat(TokenKind::Colon) {
            self.error_unexpected("`in`");
        }
        self.parse_expr();
        self.expect(TokenKind::RParen);
        self.parse_statement();
        self.finish();
    }

    fn parse_foreach_var(&mut self) {
        if self.at_type_start() {
            self.start(RuleKind::VariableDecl);
            self.parse_type_spec();
            self.start(RuleKind::Declarator);
            while self.eat(TokenKind::Star) {}
            self.expect(TokenKind::Ident);
            self.finish();
            self.finish();
        } else if self.at(TokenKind::Ident) {
            self.start(RuleKind::NameRef);
            self.bump();
            self.finish();
        } else {
            self.error_unexpected("loop variable");
        }
    }
}
