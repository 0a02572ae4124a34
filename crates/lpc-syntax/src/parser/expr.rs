//! Expressions, lowest precedence first.

use super::{Parser, PredictionMode};
use crate::lexer::TokenKind;
use crate::tree::RuleKind;

const OPERAND_START: &[TokenKind] = &[
    TokenKind::Ident,
    TokenKind::IntLit,
    TokenKind::FloatLit,
    TokenKind::StringLit,
    TokenKind::CharLit,
    TokenKind::LParen,
    TokenKind::ArrayOpen,
    TokenKind::MappingOpen,
    TokenKind::ClosureOpen,
    TokenKind::HashQuote,
    TokenKind::ColonColon,
    TokenKind::Catch,
];

const POSTFIX_OPS: &[TokenKind] = &[
    TokenKind::LParen,
    TokenKind::LBracket,
    TokenKind::Arrow,
    TokenKind::PlusPlus,
    TokenKind::MinusMinus,
];

const ASSIGN_OPS: &[TokenKind] = &[
    TokenKind::Assign,
    TokenKind::PlusAssign,
    TokenKind::MinusAssign,
    TokenKind::StarAssign,
    TokenKind::SlashAssign,
    TokenKind::PercentAssign,
    TokenKind::AmpAssign,
    TokenKind::PipeAssign,
    TokenKind::CaretAssign,
    TokenKind::ShlAssign,
    TokenKind::ShrAssign,
    TokenKind::AndAndAssign,
    TokenKind::OrOrAssign,
];

fn binary_precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    let prec = match kind {
        OrOr => 1,
        AndAnd => 2,
        Pipe => 3,
        Caret => 4,
        Amp => 5,
        EqEq | NotEq => 6,
        Lt | Le | Gt | Ge => 7,
        Shl | Shr => 8,
        Plus | Minus => 9,
        Star | Slash | Percent => 10,
        _ => return None,
    };
    Some(prec)
}

const BINARY_OPS: &[TokenKind] = &[
    TokenKind::OrOr,
    TokenKind::AndAnd,
    TokenKind::Pipe,
    TokenKind::Caret,
    TokenKind::Amp,
    TokenKind::EqEq,
    TokenKind::NotEq,
    TokenKind::Lt,
    TokenKind::Le,
    TokenKind::Gt,
    TokenKind::Ge,
    TokenKind::Shl,
    TokenKind::Shr,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Percent,
];

/// Tokens that close an enclosing construct; error recovery never eats them.
fn is_closer(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Semi
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::RParen
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::ClosureClose
            | TokenKind::Eof
    )
}

enum ParenReading {
    Group,
    Cast,
    /// `(Name) - x`: cast of `-x` or `Name - x`.
    Ambiguous,
}

impl Parser<'_> {
    /// Comma expression.
    pub(crate) fn parse_expr(&mut self) {
        let cp = self.checkpoint();
        self.parse_assign();
        while self.at(TokenKind::Comma) {
            self.start_at(cp, RuleKind::BinaryExpr);
            self.bump();
            self.parse_assign();
            self.finish();
        }
    }

    pub(crate) fn parse_assign(&mut self) {
        let cp = self.checkpoint();
        self.parse_ternary();
        if self.at_any(ASSIGN_OPS) {
            self.start_at(cp, RuleKind::AssignExpr);
            self.bump();
            self.parse_assign();
            self.finish();
        }
    }

    fn parse_ternary(&mut self) {
        let cp = self.checkpoint();
        self.parse_binary(1);
        if self.at(TokenKind::Question) {
            self.start_at(cp, RuleKind::TernaryExpr);
            self.bump();
            self.parse_assign();
            self.expect(TokenKind::Colon);
            self.parse_assign();
            self.finish();
        }
    }

    fn parse_binary(&mut self, min_prec: u8) {
        let cp = self.checkpoint();
        self.parse_unary();
        loop {
            self.note_expected(BINARY_OPS);
            let Some(prec) = binary_precedence(self.current()) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.start_at(cp, RuleKind::BinaryExpr);
            self.bump();
            self.parse_binary(prec + 1);
            self.finish();
        }
    }

    fn parse_unary(&mut self) {
        match self.current() {
            TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Amp => {
                self.start(RuleKind::UnaryExpr);
                self.bump();
                self.parse_unary();
                self.finish();
                return;
            }
            TokenKind::LParen => match self.read_paren() {
                ParenReading::Cast => {
                    self.parse_cast();
                    return;
                }
                ParenReading::Ambiguous => match self.mode() {
                    PredictionMode::Fast => self.abort_ambiguity(),
                    PredictionMode::Exhaustive => {
                        if self.is_struct_name(self.nth_text(1)) && self.speculate_cast() {
                            return;
                        }
                    }
                },
                ParenReading::Group => {}
            },
            _ => {}
        }
        self.parse_postfix();
    }

    fn read_paren(&self) -> ParenReading {
        let first = self.nth(1);
        if first.is_type_keyword() {
            return if matches!(self.nth(2), TokenKind::RParen | TokenKind::Star) {
                ParenReading::Cast
            } else {
                ParenReading::Group
            };
        }
        if matches!(first, TokenKind::Struct | TokenKind::Class) && self.nth(2) == TokenKind::Ident {
            return ParenReading::Cast;
        }
        if first == TokenKind::Ident && self.nth(2) == TokenKind::RParen {
            let after = self.nth(3);
            if matches!(
                after,
                TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Amp
            ) {
                return ParenReading::Ambiguous;
            }
            if after != TokenKind::LParen && (OPERAND_START.contains(&after)
                || matches!(after, TokenKind::Bang | TokenKind::Tilde))
            {
                return ParenReading::Cast;
            }
        }
        ParenReading::Group
    }

    /// Try the cast reading; keep it only if the operand parses cleanly.
    fn speculate_cast(&mut self) -> bool {
        let cp = self.checkpoint();
        let open = self.open_rule_count();
        self.parse_cast();
        if self.errors.len() == cp.errors {
            return true;
        }
        log::trace!("cast reading failed at token {}, rolling back", cp.pos);
        self.rewind(cp, open);
        false
    }

    fn parse_cast(&mut self) {
        self.start(RuleKind::CastExpr);
        self.bump();
        if self.current() == TokenKind::Ident {
            self.start(RuleKind::TypeSpec);
            self.bump();
            self.finish();
        } else {
            self.parse_type_spec();
        }
        while self.eat(TokenKind::Star) {}
        self.expect(TokenKind::RParen);
        self.parse_unary();
        self.finish();
    }

    fn parse_postfix(&mut self) {
        let cp = self.checkpoint();
        self.parse_primary();
        loop {
            self.note_expected(POSTFIX_OPS);
            match self.current() {
                TokenKind::LParen => {
                    self.start_at(cp, RuleKind::CallExpr);
                    self.parse_arg_list();
                    self.finish();
                }
                TokenKind::LBracket => {
                    self.start_at(cp, RuleKind::IndexExpr);
                    self.parse_index_rest();
                    self.finish();
                }
                TokenKind::Arrow => {
                    self.start_at(cp, RuleKind::ArrowExpr);
                    self.parse_arrow_rest();
                    self.finish();
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    self.start_at(cp, RuleKind::PostfixExpr);
                    self.bump();
                    self.finish();
                }
                _ => break,
            }
        }
    }

    fn parse_index_rest(&mut self) {
        let opener = self.pos;
        self.bump();
        self.eat(TokenKind::Lt);
        if !self.at(TokenKind::DotDot) && !self.at(TokenKind::RBracket) {
            self.parse_expr();
        }
        if self.eat(TokenKind::DotDot) {
            self.eat(TokenKind::Lt);
            if !self.at(TokenKind::RBracket) {
                self.parse_expr();
            }
        }
        if !self.eat(TokenKind::RBracket) {
            self.error_unterminated("index", "]", opener);
        }
    }

    /// `-> [name | (expr)] [(args)]`. Both parts are optional in the tree;
    /// their absence is diagnosed during evaluation.
    fn parse_arrow_rest(&mut self) {
        self.bump();
        self.note_rule(RuleKind::MemberName);
        if self.at(TokenKind::Ident) {
            self.start(RuleKind::MemberName);
            self.bump();
            self.finish();
        } else if self.at(TokenKind::LParen) {
            let opener = self.pos;
            self.start(RuleKind::ParenExpr);
            self.bump();
            self.parse_expr();
            if !self.eat(TokenKind::RParen) {
                self.error_unterminated("method name expression", ")", opener);
            }
            self.finish();
        } else {
            // Missing member name; reported during evaluation.
            self.close_caret();
        }
        if self.at(TokenKind::LParen) {
            self.parse_arg_list();
        }
    }

    pub(crate) fn parse_arg_list(&mut self) {
        self.start(RuleKind::ArgList);
        let opener = self.pos;
        self.bump();
        loop {
            self.note_expected(OPERAND_START);
            if self.at(TokenKind::RParen) || self.at_eof() {
                break;
            }
            let before = self.pos;
            self.parse_assign();
            self.eat(TokenKind::Ellipsis);
            if self.pos == before {
                break;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.eat(TokenKind::RParen) {
            self.error_unterminated("argument list", ")", opener);
        }
        self.finish();
    }

    fn parse_primary(&mut self) {
        self.note_expected(OPERAND_START);
        match self.current() {
            TokenKind::Ident if self.nth(1) == TokenKind::ColonColon => {
                self.start(RuleKind::ScopedName);
                self.bump();
                self.bump();
                self.expect(TokenKind::Ident);
                self.finish();
            }
            TokenKind::Ident => {
                self.start(RuleKind::NameRef);
                self.bump();
                self.finish();
            }
            TokenKind::ColonColon => {
                self.start(RuleKind::ScopedName);
                self.bump();
                self.expect(TokenKind::Ident);
                self.finish();
            }
            TokenKind::StringLit => {
                self.start(RuleKind::Literal);
                while self.current() == TokenKind::StringLit {
                    self.bump();
                }
                self.finish();
            }
            kind if kind.is_literal() => {
                self.start(RuleKind::Literal);
                self.bump();
                self.finish();
            }
            TokenKind::ArrayOpen => self.parse_array_literal(1),
            TokenKind::LParen if self.nth(1) == TokenKind::LBrace => self.parse_array_literal(2),
            TokenKind::MappingOpen => self.parse_mapping_literal(1),
            TokenKind::LParen if self.nth(1) == TokenKind::LBracket => {
                self.parse_mapping_literal(2)
            }
            TokenKind::ClosureOpen => self.parse_closure(),
            TokenKind::FunctionKw if self.nth(1) == TokenKind::LParen => {
                self.start(RuleKind::ClosureExpr);
                self.bump();
                self.parse_param_list();
                self.parse_block();
                self.finish();
            }
            TokenKind::HashQuote => self.parse_function_ref(),
            TokenKind::Catch => self.parse_catch(),
            TokenKind::LParen => {
                let opener = self.pos;
                self.start(RuleKind::ParenExpr);
                self.bump();
                self.parse_expr();
                if !self.eat(TokenKind::RParen) {
                    self.error_unterminated("parenthesised expression", ")", opener);
                }
                self.finish();
            }
            // `new(class foo)` takes a type as its argument.
            TokenKind::Struct | TokenKind::Class if self.nth(1) == TokenKind::Ident => {
                self.parse_type_spec();
            }
            kind => {
                self.error_unexpected("expression");
                if is_closer(kind) {
                    self.start(RuleKind::Error);
                    self.finish();
                } else {
                    self.bump_into_error();
                }
            }
        }
    }

    fn parse_catch(&mut self) {
        self.start(RuleKind::CatchExpr);
        self.bump();
        if self.at(TokenKind::LBrace) {
            self.parse_block();
        } else if self.at(TokenKind::LParen) {
            let opener = self.pos;
            self.bump();
            self.parse_expr();
            if !self.eat(TokenKind::RParen) {
                self.error_unterminated("catch", ")", opener);
            }
        } else {
            self.error_unexpected("`(` or `{`");
        }
        self.finish();
    }

    /// `({ a, b, })`; `opener_len` is 2 for the spaced `( {` spelling.
    fn parse_array_literal(&mut self, opener_len: usize) {
        self.start(RuleKind::ArrayLiteral);
        let opener = self.pos;
        for _ in 0..opener_len {
            self.bump();
        }
        loop {
            self.note_expected(OPERAND_START);
            if self.at(TokenKind::RBrace) || self.at_eof() {
                break;
            }
            let before = self.pos;
            self.parse_assign();
            self.eat(TokenKind::Ellipsis);
            if self.pos == before || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !(self.eat(TokenKind::RBrace) && self.eat(TokenKind::RParen)) {
            self.error_unterminated("array literal", "})", opener);
        }
        self.finish();
    }

    fn parse_mapping_literal(&mut self, opener_len: usize) {
        self.start(RuleKind::MappingLiteral);
        let opener = self.pos;
        for _ in 0..opener_len {
            self.bump();
        }
        loop {
            if self.at(TokenKind::RBracket) || self.at_eof() {
                break;
            }
            let before = self.pos;
            self.start(RuleKind::MappingEntry);
            self.parse_assign();
            if self.eat(TokenKind::Colon) {
                self.parse_assign();
                while self.eat(TokenKind::Semi) {
                    self.parse_assign();
                }
            }
            self.finish();
            if self.pos == before || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !(self.eat(TokenKind::RBracket) && self.eat(TokenKind::RParen)) {
            self.error_unterminated("mapping literal", "])", opener);
        }
        self.finish();
    }

    fn parse_closure(&mut self) {
        self.start(RuleKind::ClosureExpr);
        let opener = self.pos;
        self.bump();
        if !self.at(TokenKind::ClosureClose) {
            self.parse_expr();
        }
        if !self.eat(TokenKind::ClosureClose) {
            self.error_unterminated("closure", ":)", opener);
        }
        self.finish();
    }

    /// `#'name`, `#'efun::name` or `#'+`.
    fn parse_function_ref(&mut self) {
        self.start(RuleKind::FunctionRef);
        self.bump();
        match self.current() {
            TokenKind::Ident => {
                self.bump();
                if self.eat(TokenKind::ColonColon) {
                    self.expect(TokenKind::Ident);
                }
            }
            kind if kind.fixed_text().is_some() && !is_closer(kind) => self.bump(),
            _ => self.error_unexpected("function name"),
        }
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{parse_expression, ParseOutput};
    use crate::tree::{NodeId, RuleKind};

    /// S-expression view of the rule structure.
    fn shape(output: &ParseOutput, node: NodeId) -> String {
        let tree = &output.tree;
        let children: Vec<String> = tree.child_nodes(node).map(|c| shape(output, c)).collect();
        let name = format!("{:?}", tree.kind(node));
        if children.is_empty() {
            format!("{name}:{}", tree.text(node))
        } else {
            format!("({name} {})", children.join(" "))
        }
    }

    fn parse(text: &str) -> String {
        let output = parse_expression(text);
        assert!(output.errors.is_empty(), "{text}: {:?}", output.errors);
        let expr = output.tree.child_nodes(output.tree.root()).next().unwrap();
        shape(&output, expr)
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(
            parse("a = b = 1 + 2 * 3"),
            "(AssignExpr NameRef:a (AssignExpr NameRef:b (BinaryExpr Literal:1 (BinaryExpr Literal:2 Literal:3))))"
        );
        assert_eq!(
            parse("a || b && c"),
            "(BinaryExpr NameRef:a (BinaryExpr NameRef:b NameRef:c))"
        );
    }

    #[test]
    fn test_arrow_shapes() {
        assert_eq!(
            parse("\"/obj/torch\"->light(1)"),
            "(ArrowExpr Literal:\"/obj/torch\" MemberName:light (ArgList Literal:1))"
        );
        assert_eq!(
            parse("ob->(\"query_\" + x)()"),
            "(ArrowExpr NameRef:ob (ParenExpr (BinaryExpr Literal:\"query_\" NameRef:x)) ArgList:())"
        );
        assert_eq!(parse("p->x"), "(ArrowExpr NameRef:p MemberName:x)");
    }

    #[test]
    fn test_arrow_without_target_parses() {
        let output = parse_expression("ob->");
        assert!(output.errors.is_empty());
        let expr = output.tree.child_nodes(output.tree.root()).next().unwrap();
        assert_eq!(output.tree.kind(expr), RuleKind::ArrowExpr);
        assert_eq!(output.tree.child_nodes(expr).count(), 1);
    }

    #[test]
    fn test_literals_and_closures() {
        assert_eq!(
            parse("({ 1, \"a\" \"b\", })"),
            "(ArrayLiteral Literal:1 Literal:\"a\" \"b\")"
        );
        assert_eq!(
            parse("([ \"k\": 1, \"j\": 2 ])"),
            "(MappingLiteral (MappingEntry Literal:\"k\" Literal:1) (MappingEntry Literal:\"j\" Literal:2))"
        );
        assert_eq!(
            parse("(: $1 + 1 :)"),
            "(ClosureExpr (BinaryExpr Literal:$1 Literal:1))"
        );
        assert_eq!(parse("#'write"), "FunctionRef:#'write");
    }

    #[test]
    fn test_catch_forms() {
        assert_eq!(
            parse("catch(write(1))"),
            "(CatchExpr (CallExpr NameRef:write (ArgList Literal:1)))"
        );
        let output = parse_expression("catch { x = 1; }");
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        let expr = output.tree.child_nodes(output.tree.root()).next().unwrap();
        assert_eq!(output.tree.kind(expr), RuleKind::CatchExpr);
        let body: Vec<RuleKind> = output.tree.child_nodes(expr).map(|n| output.tree.kind(n)).collect();
        assert_eq!(body, vec![RuleKind::Block]);
    }

    #[test]
    fn test_casts_calls_and_scoped_names() {
        assert_eq!(
            parse("(string *)efun::explode(s, \",\")"),
            "(CastExpr TypeSpec:string (CallExpr ScopedName:efun::explode (ArgList NameRef:s Literal:\",\")))"
        );
        assert_eq!(parse("::create()"), "(CallExpr ScopedName:::create ArgList:())");
        assert_eq!(
            parse("arr[<2..]"),
            "(IndexExpr NameRef:arr Literal:2)"
        );
    }
}
