//! Expression parsing.
//!
//! One function per precedence level, lowest binding first:
//!
//! ```text
//! expr := assignment
//! assignment := ternary (("=" | "+=" | "-=" | "*=" | "/=" | "%=" | "^=") assignment)?
//! ternary    := lambda ("?" expr ":" expr)?
//! lambda     := "lam" IDENT expr | or
//! or         := and ("or" and)*
//! and        := equality ("and" equality)*
//! equality   := comparison (("==" | "!=") comparison)*
//! comparison := sum (("<" | "<=" | ">" | ">=") sum)*
//! sum        := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "%") unary)*
//! unary      := ("+" | "-" | "!") unary | power
//! power      := factorial ("^" unary)?
//! factorial  := call "!"*
//! call       := atom ("(" args? ")" | "[" expr "]")*
//! ```

use timidc_lex::TokenKind;

use crate::ast::*;
use crate::{PResult, Parser, MAX_ARG_COUNT};

impl<'a> Parser<'a> {
    /// Parses an expression.
    ///
    /// With `nullable` set, the absence of an expression is `Ok(None)`
    /// rather than an error; the caller decides whether that is allowed.
    pub(crate) fn expr(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.assignment(nullable)
    }

    /// Assignment is right-associative and the target must be a variable.
    fn assignment(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        let target = self.ternary(nullable)?;

        if self.match_any(&[
            TokenKind::Eq,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::PercentEq,
            TokenKind::CaretEq,
        ]) {
            let operator = self.previous().clone();
            let value = self.assignment(true)?;
            let value = self.require(value, "Expected an assignment value")?;

            return match target {
                Some(Expr::Variable(variable)) => {
                    let span = variable.name.span.merge(value.span());
                    Ok(Some(Expr::Assign(AssignExpr {
                        name: variable.name,
                        operator,
                        value: Box::new(value),
                        span,
                    })))
                },
                Some(other) => {
                    // Report but keep the left-hand side so parsing can
                    // carry on past the bad assignment
                    self.handler
                        .syntax_error(other.span(), "Invalid assignment target");
                    Ok(Some(other))
                },
                None => Err(self.error(operator.span, "Invalid assignment target")),
            };
        }

        Ok(target)
    }

    fn ternary(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        let condition = match self.lambda_expr(nullable)? {
            Some(condition) => condition,
            None => return Ok(None),
        };

        if self.match_kind(TokenKind::Question) {
            let if_branch = self.expr(true)?;
            let if_branch = self.require(if_branch, "Expected a ternary operator true branch")?;

            self.consume(TokenKind::Colon, "Expected a ':' in ternary operator")?;

            let else_branch = self.expr(true)?;
            let else_branch =
                self.require(else_branch, "Expected a ternary operator false branch")?;

            let span = condition.span().merge(else_branch.span());
            return Ok(Some(Expr::Ternary(TernaryExpr {
                condition: Box::new(condition),
                if_branch: Box::new(if_branch),
                else_branch: Box::new(else_branch),
                span,
            })));
        }

        Ok(Some(condition))
    }

    fn lambda_expr(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        if self.match_kind(TokenKind::Lambda) {
            let keyword = self.previous().clone();
            let param = self.consume(
                TokenKind::Identifier,
                "Expected an identifier (after 'lam' keyword)",
            )?;

            let body = self.expr(true)?;
            let body = self.require(body, "Expected a lambda expression body")?;

            let span = keyword.span.merge(body.span());
            return Ok(Some(Expr::Lambda(LambdaExpr {
                param,
                body: Box::new(body),
                span,
            })));
        }
        self.or_expr(nullable)
    }

    fn or_expr(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(Self::and_expr, &[TokenKind::Or], Self::and_expr, nullable)
    }

    fn and_expr(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(Self::equality, &[TokenKind::And], Self::equality, nullable)
    }

    fn equality(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(
            Self::comparison,
            &[TokenKind::EqEq, TokenKind::NotEq],
            Self::comparison,
            nullable,
        )
    }

    fn comparison(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(
            Self::sum,
            &[
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
            ],
            Self::sum,
            nullable,
        )
    }

    fn sum(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(
            Self::term,
            &[TokenKind::Plus, TokenKind::Minus],
            Self::term,
            nullable,
        )
    }

    fn term(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(
            Self::unary,
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            Self::unary,
            nullable,
        )
    }

    fn unary(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        if self.match_any(&[TokenKind::Plus, TokenKind::Minus, TokenKind::Not]) {
            let operator = self.previous().clone();
            let right = self.unary(true)?;
            let right = match right {
                Some(right) => right,
                None => {
                    let span = self.current().span;
                    return Err(self.error(
                        span,
                        &format!(
                            "Expected a unary operand (after unary operator '{}')",
                            operator.lexeme
                        ),
                    ));
                },
            };
            let span = operator.span.merge(right.span());
            return Ok(Some(Expr::Unary(UnaryExpr {
                operator,
                right: Box::new(right),
                span,
            })));
        }
        self.power(nullable)
    }

    /// `^` is right-associative: its right operand re-enters `unary`.
    fn power(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        self.bin_op(Self::factorial, &[TokenKind::Caret], Self::unary, nullable)
    }

    fn factorial(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        let mut expr = match self.call(nullable)? {
            Some(expr) => expr,
            None => return Ok(None),
        };

        // There can be as many `!`s after the expression
        while self.match_kind(TokenKind::Not) {
            let span = expr.span().merge(self.previous().span);
            expr = Expr::Factorial(FactorialExpr {
                expr: Box::new(expr),
                span,
            });
        }
        Ok(Some(expr))
    }

    fn call(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        let mut expr = match self.atom(nullable)? {
            Some(expr) => expr,
            None => return Ok(None),
        };

        loop {
            if self.match_kind(TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::LBracket) {
                expr = self.finish_subscript(expr)?;
            } else {
                break;
            }
        }

        Ok(Some(expr))
    }

    fn atom(&mut self, nullable: bool) -> PResult<Option<Expr>> {
        if self.match_kind(TokenKind::In) {
            let keyword = self.previous().clone();
            let prompt = self.expr(true)?; // there may not be a prompt
            let span = match &prompt {
                Some(prompt) => keyword.span.merge(prompt.span()),
                None => keyword.span,
            };
            return Ok(Some(Expr::Input(InputExpr {
                prompt: prompt.map(Box::new),
                span,
            })));
        }

        if self.match_any(&[
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::Str,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
        ]) {
            return Ok(Some(Expr::Literal(LiteralExpr {
                token: self.previous().clone(),
            })));
        }

        if self.match_kind(TokenKind::Identifier) {
            let name = self.previous().clone();
            if self.match_kind(TokenKind::Colon) {
                let span = self.previous().span;
                return Err(self.error(span, "Goto label in expression"));
            }
            return Ok(Some(Expr::Variable(VariableExpr { name })));
        }

        if self.match_kind(TokenKind::LParen) {
            let lparen = self.previous().clone();
            self.enter_nested(lparen.span, "parentheses")?;

            let expr = self.expr(false)?;
            let expr = self.require(expr, "Expected an expression")?;

            if self.match_kind(TokenKind::Colon) {
                let dict = self.finish_dictionary(lparen, expr)?;
                self.exit_nested();
                return Ok(Some(dict));
            }

            self.consume(
                TokenKind::RParen,
                "Expected a closing ')' for grouping",
            )?;
            self.exit_nested();
            return Ok(Some(expr));
        }

        if !nullable {
            let span = self.current().span;
            return Err(self.error(
                span,
                "Expected an expression, a boolean, a string, a number, or 'nul'",
            ));
        }

        Ok(None)
    }

    /// Parses the remainder of a dictionary literal. The first key and its
    /// `:` are already consumed.
    fn finish_dictionary(&mut self, lparen: timidc_lex::Token, first_key: Expr) -> PResult<Expr> {
        let mut keys = vec![first_key];
        let mut values = Vec::new();

        let first_value = self.expr(true)?;
        values.push(self.require(first_value, "Expected an initial dictionary value")?);

        if self.match_kind(TokenKind::Comma) {
            loop {
                let key = match self.expr(true)? {
                    Some(key) => key,
                    None => break, // a trailing comma before ')'
                };
                keys.push(key);

                self.consume(TokenKind::Colon, "Expected a ':' after dictionary key")?;

                let value = self.expr(true)?;
                values.push(self.require(value, "Expected a dictionary value")?);

                if self.check(TokenKind::Comma) && self.next().is(TokenKind::RParen) {
                    self.advance(); // the trailing comma
                    break;
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let rparen = self.consume(
            TokenKind::RParen,
            "Expected a closing ')' for dictionary",
        )?;

        Ok(Expr::Dictionary(DictionaryExpr {
            keys,
            values,
            span: lparen.span.merge(rparen.span),
        }))
    }

    /// Parses the remainder of `target[index]`. The `[` is already consumed.
    fn finish_subscript(&mut self, target: Expr) -> PResult<Expr> {
        let index = self.expr(false)?;
        let index = self.require(index, "Expected a subscript expression")?;

        let rbracket = self.consume(
            TokenKind::RBracket,
            "Expected a closing ']' after subscript",
        )?;

        let span = target.span().merge(rbracket.span);
        Ok(Expr::Subscript(SubscriptExpr {
            target: Box::new(target),
            index: Box::new(index),
            span,
        }))
    }

    /// Parses the remainder of `callee(args)`. The `(` is already consumed.
    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut args = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                if args.len() == MAX_ARG_COUNT {
                    let span = self.current().span;
                    self.handler.syntax_error(
                        span,
                        format!("Maximum argument count ({}) reached", MAX_ARG_COUNT),
                    );
                }

                let arg = self.expr(false)?;
                args.push(self.require(arg, "Expected a call argument")?);

                if self.check(TokenKind::Comma) && self.next().is(TokenKind::RParen) {
                    self.advance(); // the trailing comma
                    break;
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let rparen = self.consume(
            TokenKind::RParen,
            "Expected a closing ')' after function call",
        )?;

        let span = callee.span().merge(rparen.span);
        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span,
        }))
    }

    /// Parses a left-associative run of binary operators.
    ///
    /// `right_rule` differs from `left_rule` only for right-associative
    /// operators (`^` re-enters `unary`).
    fn bin_op(
        &mut self,
        left_rule: fn(&mut Self, bool) -> PResult<Option<Expr>>,
        operators: &[TokenKind],
        right_rule: fn(&mut Self, bool) -> PResult<Option<Expr>>,
        nullable: bool,
    ) -> PResult<Option<Expr>> {
        let mut left = match left_rule(self, nullable)? {
            Some(left) => left,
            None => return Ok(None),
        };

        while self.match_any(operators) {
            let operator = self.previous().clone();
            let right = match right_rule(self, true)? {
                Some(right) => right,
                None => {
                    let span = self.current().span;
                    return Err(self.error(
                        span,
                        &format!(
                            "Expected a right binary operand (after '{}')",
                            operator.lexeme
                        ),
                    ));
                },
            };
            let span = left.span().merge(right.span());
            left = Expr::Binary(BinaryExpr {
                left: Box::new(left),
                operator,
                right: Box::new(right),
                span,
            });
        }

        Ok(Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timidc_lex::{Lexer, Literal};
    use timidc_util::Handler;

    /// Parses a source consisting of one expression statement.
    fn parse_expr_source(source: &str) -> (Expr, Handler) {
        let handler = Handler::new();
        let expr = {
            let tokens = Lexer::new(source, &handler).lex();
            let mut statements = Parser::new(tokens, &handler).parse();
            assert_eq!(statements.len(), 1, "expected one statement for {:?}", source);
            match statements.remove(0) {
                Stmt::Expr(stmt) => stmt.expr,
                other => panic!("expected expression statement, got {:?}", other),
            }
        };
        (expr, handler)
    }

    fn parse_expr_ok(source: &str) -> Expr {
        let (expr, handler) = parse_expr_source(source);
        assert!(
            !handler.has_errors(),
            "unexpected errors for {:?}: {:?}",
            source,
            handler.diagnostics()
        );
        expr
    }

    fn as_binary(expr: &Expr) -> &BinaryExpr {
        match expr {
            Expr::Binary(binary) => binary,
            other => panic!("expected Binary, got {:?}", other),
        }
    }

    fn literal_int(expr: &Expr) -> i64 {
        match expr {
            Expr::Literal(literal) => match literal.token.literal {
                Some(Literal::Int(value)) => value,
                ref other => panic!("expected int literal, got {:?}", other),
            },
            other => panic!("expected Literal, got {:?}", other),
        }
    }

    #[test]
    fn test_term_binds_tighter_than_sum() {
        // 1 + 2 * 3  =>  1 + (2 * 3)
        let expr = parse_expr_ok("1 + 2 * 3");
        let sum = as_binary(&expr);
        assert_eq!(sum.operator.lexeme, "+");
        assert_eq!(literal_int(&sum.left), 1);

        let product = as_binary(&sum.right);
        assert_eq!(product.operator.lexeme, "*");
        assert_eq!(literal_int(&product.left), 2);
        assert_eq!(literal_int(&product.right), 3);
    }

    #[test]
    fn test_sum_is_left_associative() {
        // 1 - 2 - 3  =>  (1 - 2) - 3
        let expr = parse_expr_ok("1 - 2 - 3");
        let outer = as_binary(&expr);
        assert_eq!(literal_int(&outer.right), 3);
        let inner = as_binary(&outer.left);
        assert_eq!(literal_int(&inner.left), 1);
        assert_eq!(literal_int(&inner.right), 2);
    }

    #[test]
    fn test_power_is_right_associative() {
        // 2 ^ 3 ^ 4  =>  2 ^ (3 ^ 4)
        let expr = parse_expr_ok("2 ^ 3 ^ 4");
        let outer = as_binary(&expr);
        assert_eq!(literal_int(&outer.left), 2);
        let inner = as_binary(&outer.right);
        assert_eq!(literal_int(&inner.left), 3);
        assert_eq!(literal_int(&inner.right), 4);
    }

    #[test]
    fn test_comparison_and_logic_precedence() {
        // 1 < 2 and 3 < 4  =>  (1 < 2) and (3 < 4)
        let expr = parse_expr_ok("1 < 2 and 3 < 4");
        let and = as_binary(&expr);
        assert_eq!(and.operator.lexeme, "and");
        assert_eq!(as_binary(&and.left).operator.lexeme, "<");
        assert_eq!(as_binary(&and.right).operator.lexeme, "<");
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        // (1 + 2) * 3
        let expr = parse_expr_ok("(1 + 2) * 3");
        let product = as_binary(&expr);
        assert_eq!(product.operator.lexeme, "*");
        assert_eq!(as_binary(&product.left).operator.lexeme, "+");
    }

    #[test]
    fn test_unary_chain() {
        let expr = parse_expr_ok("--1");
        match expr {
            Expr::Unary(outer) => {
                assert_eq!(outer.operator.lexeme, "-");
                assert!(matches!(*outer.right, Expr::Unary(_)));
            },
            other => panic!("expected Unary, got {:?}", other),
        }
    }

    #[test]
    fn test_factorial_postfix_chain() {
        let expr = parse_expr_ok("5!!");
        match expr {
            Expr::Factorial(outer) => assert!(matches!(*outer.expr, Expr::Factorial(_))),
            other => panic!("expected Factorial, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary() {
        let expr = parse_expr_ok("tru ? 1 : 2");
        match expr {
            Expr::Ternary(ternary) => {
                assert!(matches!(*ternary.condition, Expr::Literal(_)));
                assert_eq!(literal_int(&ternary.if_branch), 1);
                assert_eq!(literal_int(&ternary.else_branch), 2);
            },
            other => panic!("expected Ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr_ok("x = y = 2");
        match expr {
            Expr::Assign(outer) => {
                assert_eq!(outer.name.lexeme, "x");
                assert!(matches!(*outer.value, Expr::Assign(_)));
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_keeps_operator() {
        let expr = parse_expr_ok("x += 1");
        match expr {
            Expr::Assign(assign) => {
                assert_eq!(assign.operator.kind, TokenKind::PlusEq);
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target_reports() {
        let (expr, handler) = parse_expr_source("1 = 2");
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message == "Invalid assignment target"));
        // The left-hand side survives as the expression
        assert_eq!(literal_int(&expr), 1);
    }

    #[test]
    fn test_lambda() {
        let expr = parse_expr_ok("lam x x + 1");
        match expr {
            Expr::Lambda(lambda) => {
                assert_eq!(lambda.param.lexeme, "x");
                assert!(matches!(*lambda.body, Expr::Binary(_)));
            },
            other => panic!("expected Lambda, got {:?}", other),
        }
    }

    #[test]
    fn test_input_with_and_without_prompt() {
        let expr = parse_expr_ok("in \"name? \"");
        assert!(matches!(expr, Expr::Input(InputExpr { prompt: Some(_), .. })));

        // A bare `in` has no prompt; parenthesised so the statement is
        // unambiguous
        let expr = parse_expr_ok("(in)");
        assert!(matches!(expr, Expr::Input(InputExpr { prompt: None, .. })));
    }

    #[test]
    fn test_call_and_subscript_chain() {
        let expr = parse_expr_ok("f(1, 2)[3]");
        match expr {
            Expr::Subscript(subscript) => {
                assert_eq!(literal_int(&subscript.index), 3);
                match *subscript.target {
                    Expr::Call(ref call) => assert_eq!(call.args.len(), 2),
                    ref other => panic!("expected Call, got {:?}", other),
                }
            },
            other => panic!("expected Subscript, got {:?}", other),
        }
    }

    #[test]
    fn test_call_trailing_comma() {
        let expr = parse_expr_ok("f(1, 2,)");
        match expr {
            Expr::Call(call) => assert_eq!(call.args.len(), 2),
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_count_cap() {
        let args: Vec<String> = (0..260).map(|i| i.to_string()).collect();
        let source = format!("f({})", args.join(", "));
        let (_, handler) = parse_expr_source(&source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("Maximum argument count")));
    }

    #[test]
    fn test_dictionary_literal() {
        let expr = parse_expr_ok("(1 : \"one\", 2 : \"two\", 3 : \"three\")");
        match expr {
            Expr::Dictionary(dict) => {
                assert_eq!(dict.keys.len(), 3);
                assert_eq!(dict.values.len(), 3);
            },
            other => panic!("expected Dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_dictionary_trailing_comma() {
        let expr = parse_expr_ok("(1 : 2, 3 : 4,)");
        match expr {
            Expr::Dictionary(dict) => {
                assert_eq!(dict.keys.len(), 2);
                assert_eq!(dict.values.len(), 2);
            },
            other => panic!("expected Dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_goto_label_in_expression_is_an_error() {
        let handler = Handler::new();
        let tokens = Lexer::new("print x: 1", &handler).lex();
        Parser::new(tokens, &handler).parse();
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message == "Goto label in expression"));
    }

    #[test]
    fn test_parentheses_nesting_cap() {
        let source = format!("{}1{}", "(".repeat(45), ")".repeat(45));
        let handler = Handler::new();
        let tokens = Lexer::new(&source, &handler).lex();
        Parser::new(tokens, &handler).parse();

        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message == "Maximum parentheses nesting depth reached"));
    }

    #[test]
    fn test_missing_closing_paren_reports() {
        let handler = Handler::new();
        let tokens = Lexer::new("(1 + 2", &handler).lex();
        Parser::new(tokens, &handler).parse();

        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("Expected a closing ')' for grouping")));
    }
}
