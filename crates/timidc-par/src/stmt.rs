//! Statement parsing - declarations, control flow, blocks.

use timidc_lex::TokenKind;

use crate::ast::*;
use crate::{PResult, Parser};

impl<'a> Parser<'a> {
    /// Parses one declaration: a variable declaration or any statement.
    ///
    /// Returns `Ok(None)` at the end of the input (or block) once stray
    /// statement terminators have been skipped.
    pub(crate) fn declaration(&mut self, nullable: bool) -> PResult<Option<Stmt>> {
        // Ignore stray semicolons and blank lines
        while self.match_kind(TokenKind::Semicolon) {}
        if self.is_at_end() {
            return Ok(None);
        }

        if self.match_kind(TokenKind::Dollar) {
            return self.var_decl().map(Some);
        }
        self.statement(nullable)
    }

    /// Parses `$name (= initializer)?`. The `$` is already consumed.
    fn var_decl(&mut self) -> PResult<Stmt> {
        let dollar = self.previous().clone();
        let name = self.consume(TokenKind::Identifier, "Expected an identifier (after '$')")?;

        let mut initializer = None;
        if self.match_kind(TokenKind::Eq) {
            let value = self.expr(true)?;
            initializer = Some(self.require(value, "Expected a variable initializer")?);
        }

        let span = match &initializer {
            Some(init) => dollar.span.merge(init.span()),
            None => dollar.span.merge(name.span),
        };
        Ok(Stmt::VarDecl(VarDeclStmt {
            name,
            initializer,
            span,
        }))
    }

    /// Parses a single statement.
    ///
    /// Returns `Ok(None)` when the input is exhausted or a `}` closes the
    /// enclosing block.
    pub(crate) fn statement(&mut self, _nullable: bool) -> PResult<Option<Stmt>> {
        while self.match_kind(TokenKind::Semicolon) {}
        if self.is_at_end() || self.check(TokenKind::RBrace) {
            return Ok(None);
        }

        if self.match_kind(TokenKind::While) {
            return self.while_stmt().map(Some);
        }
        if self.match_kind(TokenKind::Forever) {
            let keyword = self.previous().clone();
            let body = self.statement(true)?;
            let body = self.require(body, "Expected a 'forever' loop body")?;
            let span = keyword.span.merge(body.span());
            return Ok(Some(Stmt::Forever(ForeverStmt {
                body: Box::new(body),
                span,
            })));
        }
        if self.match_kind(TokenKind::For) {
            return self.for_stmt().map(Some);
        }
        if self.match_kind(TokenKind::If) {
            return self.if_stmt().map(Some);
        }
        if self.match_kind(TokenKind::Print) {
            return self.print_stmt().map(Some);
        }
        if self.match_kind(TokenKind::LBrace) {
            return self.block().map(Some);
        }
        if self.match_kind(TokenKind::Assert) {
            return self.assert_stmt().map(Some);
        }
        if self.check(TokenKind::Identifier) && self.next().is(TokenKind::Colon) {
            let name = self.advance();
            self.advance(); // the colon
            return Ok(Some(Stmt::Label(LabelStmt { name })));
        }
        if self.match_kind(TokenKind::Goto) {
            let keyword = self.previous().clone();
            let label = self.consume(TokenKind::Identifier, "Expected a label")?;
            let span = keyword.span.merge(label.span);
            return Ok(Some(Stmt::Goto(GotoStmt { label, span })));
        }
        if self.match_kind(TokenKind::Break) {
            return Ok(Some(Stmt::Break(BreakStmt {
                keyword: self.previous().clone(),
            })));
        }
        if self.match_kind(TokenKind::Continue) {
            return Ok(Some(Stmt::Continue(ContinueStmt {
                keyword: self.previous().clone(),
            })));
        }

        self.expr_stmt().map(Some)
    }

    /// Parses `while cond stmt`. The keyword is already consumed.
    fn while_stmt(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        self.enter_nested(self.current().span, "block")?;

        let condition = self.expr(true)?;
        let condition = self.require(condition, "Expected a 'while' loop condition")?;

        let body = self.statement(true)?;
        let body = self.require(body, "Expected a 'while' loop body")?;

        self.exit_nested();
        let span = keyword.span.merge(body.span());
        Ok(Stmt::While(WhileStmt {
            condition,
            body: Box::new(body),
            span,
        }))
    }

    /// Parses `for init, cond, step stmt`. The keyword is already consumed.
    ///
    /// All three header slots may be empty; the commas are mandatory.
    fn for_stmt(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        let initializer = if self.match_kind(TokenKind::Dollar) {
            Some(Box::new(self.var_decl()?))
        } else {
            self.expr(true)?
                .map(|expr| Box::new(Stmt::Expr(ExprStmt { expr })))
        };
        self.consume(
            TokenKind::Comma,
            "Expected a ',' or initializer statement after 'for' keyword",
        )?;

        let condition = self.expr(true)?;
        self.consume(TokenKind::Comma, "Expected a ',' after the loop condition")?;

        let step = self.expr(true)?;

        let body = self.statement(true)?;
        let body = self.require(body, "Expected a 'for' loop body")?;

        let span = keyword.span.merge(body.span());
        Ok(Stmt::For(ForStmt {
            initializer,
            condition,
            step,
            body: Box::new(body),
            span,
        }))
    }

    /// Parses `if cond stmt (else stmt)?`. The keyword is already consumed.
    fn if_stmt(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        self.enter_nested(self.current().span, "block")?;

        let condition = self.expr(true)?;
        let condition = self.require(condition, "Expected an 'if' statement condition")?;

        let then_branch = self.statement(true)?;
        let then_branch = self.require(then_branch, "Expected an 'if' statement body")?;

        // Statement terminators may separate the branch from its `else`
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }

        let mut else_branch = None;
        if self.match_kind(TokenKind::Else) {
            let body = self.statement(true)?;
            else_branch = Some(Box::new(
                self.require(body, "Expected an 'else' clause body")?,
            ));
        }

        self.exit_nested();
        let span = match &else_branch {
            Some(branch) => keyword.span.merge(branch.span()),
            None => keyword.span.merge(then_branch.span()),
        };
        Ok(Stmt::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
            span,
        }))
    }

    /// Parses `print value?`. The keyword is already consumed.
    fn print_stmt(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = self.expr(true)?; // there can be nothing to print
        let span = match &value {
            Some(value) => keyword.span.merge(value.span()),
            None => keyword.span,
        };
        Ok(Stmt::Print(PrintStmt { value, span }))
    }

    /// Parses `{ declaration* }`. The `{` is already consumed.
    fn block(&mut self) -> PResult<Stmt> {
        let lbrace = self.previous().clone();
        self.enter_nested(lbrace.span, "block")?;

        let mut statements = Vec::new();
        loop {
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            match self.declaration(true) {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => break,
                // Recover inside the block so one bad statement does not
                // take the rest of the block with it
                Err(_) => self.synchronize(),
            }
        }

        let rbrace = self.consume(
            TokenKind::RBrace,
            "Expected a closing '}' (after '{' or previous statement)",
        )?;

        self.exit_nested();
        Ok(Stmt::Block(Block {
            statements,
            span: lbrace.span.merge(rbrace.span),
        }))
    }

    /// Parses `|- cond message?`. The `|-` is already consumed.
    fn assert_stmt(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        let condition = self.expr(true)?;
        let condition = self.require(condition, "Expected an assertion condition")?;
        let message = self.expr(true)?;

        let span = match &message {
            Some(message) => keyword.span.merge(message.span()),
            None => keyword.span.merge(condition.span()),
        };
        Ok(Stmt::Assert(AssertStmt {
            condition,
            message,
            span,
        }))
    }

    /// Parses an expression statement.
    fn expr_stmt(&mut self) -> PResult<Stmt> {
        let value = self.expr(true)?;
        let expr = self.require(value, "Expected a statement")?;
        Ok(Stmt::Expr(ExprStmt { expr }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timidc_lex::Lexer;
    use timidc_util::Handler;

    fn parse_source(source: &str) -> (Vec<Stmt>, Handler) {
        let handler = Handler::new();
        let statements = {
            let tokens = Lexer::new(source, &handler).lex();
            Parser::new(tokens, &handler).parse()
        };
        (statements, handler)
    }

    fn parse_one(source: &str) -> Stmt {
        let (mut statements, handler) = parse_source(source);
        assert!(
            !handler.has_errors(),
            "unexpected errors: {:?}",
            handler.diagnostics()
        );
        assert_eq!(statements.len(), 1, "expected one statement");
        statements.remove(0)
    }

    #[test]
    fn test_var_decl_with_initializer() {
        let stmt = parse_one("$x = 1 + 2");
        match stmt {
            Stmt::VarDecl(decl) => {
                assert_eq!(decl.name.lexeme, "x");
                assert!(matches!(decl.initializer, Some(Expr::Binary(_))));
            },
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_var_decl_without_initializer() {
        let stmt = parse_one("$x");
        match stmt {
            Stmt::VarDecl(decl) => assert!(decl.initializer.is_none()),
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_var_decl_requires_identifier() {
        let (_, handler) = parse_source("$ = 1");
        assert!(handler.has_errors());
        assert!(handler.diagnostics()[0]
            .message
            .contains("Expected an identifier"));
    }

    #[test]
    fn test_bare_print() {
        let stmt = parse_one("print");
        match stmt {
            Stmt::Print(print) => assert!(print.value.is_none()),
            other => panic!("expected Print, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else() {
        let stmt = parse_one("if tru print 1; else print 2");
        match stmt {
            Stmt::If(if_stmt) => {
                assert!(matches!(*if_stmt.then_branch, Stmt::Print(_)));
                assert!(if_stmt.else_branch.is_some());
            },
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_while_with_block_body() {
        let stmt = parse_one("while x < 10 { print x }");
        match stmt {
            Stmt::While(while_stmt) => {
                assert!(matches!(while_stmt.condition, Expr::Binary(_)));
                assert!(matches!(*while_stmt.body, Stmt::Block(_)));
            },
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_full_header() {
        let stmt = parse_one("for $i = 0, i < 5, i += 1 { print i }");
        match stmt {
            Stmt::For(for_stmt) => {
                assert!(matches!(for_stmt.initializer.as_deref(), Some(Stmt::VarDecl(_))));
                assert!(matches!(for_stmt.condition, Some(Expr::Binary(_))));
                assert!(matches!(for_stmt.step, Some(Expr::Assign(_))));
            },
            other => panic!("expected For, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_empty_header() {
        let stmt = parse_one("for , , { break }");
        match stmt {
            Stmt::For(for_stmt) => {
                assert!(for_stmt.initializer.is_none());
                assert!(for_stmt.condition.is_none());
                assert!(for_stmt.step.is_none());
            },
            other => panic!("expected For, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_expression_initializer() {
        let stmt = parse_one("for i = 0, i < 5, i += 1 print i");
        match stmt {
            Stmt::For(for_stmt) => {
                // A plain assignment initializer is wrapped as an
                // expression statement
                assert!(matches!(for_stmt.initializer.as_deref(), Some(Stmt::Expr(_))));
            },
            other => panic!("expected For, got {:?}", other),
        }
    }

    #[test]
    fn test_forever_break_continue() {
        let stmt = parse_one("forever { break; continue }");
        match stmt {
            Stmt::Forever(forever) => match *forever.body {
                Stmt::Block(ref block) => {
                    assert!(matches!(block.statements[0], Stmt::Break(_)));
                    assert!(matches!(block.statements[1], Stmt::Continue(_)));
                },
                ref other => panic!("expected Block body, got {:?}", other),
            },
            other => panic!("expected Forever, got {:?}", other),
        }
    }

    #[test]
    fn test_label_and_goto() {
        let (statements, handler) = parse_source("top:\ngoto top");
        assert!(!handler.has_errors());
        assert!(matches!(statements[0], Stmt::Label(_)));
        match &statements[1] {
            Stmt::Goto(goto) => assert_eq!(goto.label.lexeme, "top"),
            other => panic!("expected Goto, got {:?}", other),
        }
    }

    #[test]
    fn test_assert_with_message() {
        let stmt = parse_one("|- x > 0 \"x must be positive\"");
        match stmt {
            Stmt::Assert(assert_stmt) => {
                assert!(matches!(assert_stmt.condition, Expr::Binary(_)));
                assert!(matches!(assert_stmt.message, Some(Expr::Literal(_))));
            },
            other => panic!("expected Assert, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let stmt = parse_one("{ $a = 1; { $a = 2; print a; } print a; }");
        match stmt {
            Stmt::Block(block) => {
                assert_eq!(block.statements.len(), 3);
                assert!(matches!(block.statements[1], Stmt::Block(_)));
            },
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_block_nesting_cap() {
        let source = format!("{}1{}", "{".repeat(45), "}".repeat(45));
        let (_, handler) = parse_source(&source);
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message == "Maximum block nesting depth reached"));
    }

    #[test]
    fn test_unclosed_block_reports() {
        let (_, handler) = parse_source("{ print 1;");
        assert!(handler.has_errors());
        assert!(handler.diagnostics()[0]
            .message
            .contains("Expected a closing '}'"));
    }

    #[test]
    fn test_error_inside_block_recovers() {
        let (statements, handler) = parse_source("{ 1 + ;\nprint 2; }");
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        // The block survived with the statement that parsed
        match &statements[0] {
            Stmt::Block(block) => {
                assert_eq!(block.statements.len(), 1);
                assert!(matches!(block.statements[0], Stmt::Print(_)));
            },
            other => panic!("expected Block, got {:?}", other),
        }
    }
}
