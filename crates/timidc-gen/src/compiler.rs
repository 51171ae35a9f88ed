//! The bytecode compiler: a single-pass AST walker.
//!
//! Statements and expressions are lowered directly into a [`Chunk`] in
//! source order. The compiler owns the interning table, the local-slot
//! stack, and the book-keeping for the innermost loop (where pending
//! `break`/`continue` jumps wait to be patched).
//!
//! Problems are reported through the shared [`Handler`]; compilation keeps
//! going to surface as many diagnostics as possible, and the finished
//! chunk is withheld whenever any error was recorded.

use rustc_hash::FxHashMap;

use timidc_lex::{Literal, Token, TokenKind};
use timidc_par::ast::*;
use timidc_util::{Handler, Span};

use crate::chunk::{Chunk, ChunkError};
use crate::opcode::OpCode;
use crate::value::Value;

/// Maximum number of live local slots (`GET_LOCAL` takes a 1-byte index).
pub const MAX_LOCALS: usize = 256;

/// A declared local variable.
struct Local {
    name: Token,
    /// Lexical depth at declaration; -1 until the initializer finishes,
    /// so a read inside the initializer can be rejected.
    depth: i32,
}

/// Book-keeping for the innermost loop being compiled.
struct LoopState {
    /// Code offset of the loop start.
    start: usize,
    /// What `continue` emits: `Loop` jumps back to the start, `Jump` goes
    /// forward to a `for` step block.
    continue_op: OpCode,
    /// Placeholder offsets of pending `break` jumps.
    break_jumps: Vec<usize>,
    /// Placeholder offsets of pending `continue` jumps.
    continue_jumps: Vec<usize>,
}

/// Single-pass AST-to-bytecode compiler.
pub struct Compiler<'a> {
    chunk: Chunk,
    handler: &'a Handler,

    /// String/identifier content -> pool index (the interning table).
    interned: FxHashMap<String, usize>,

    /// The local slot stack; indices are runtime stack slots.
    locals: Vec<Local>,

    /// Count of open blocks; 0 is the global scope.
    scope_depth: i32,

    /// Innermost loop, if any. Enclosing loops are parked on the call
    /// stack of their compile functions.
    current_loop: Option<LoopState>,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler reporting through `handler`.
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            chunk: Chunk::new(),
            handler,
            interned: FxHashMap::default(),
            locals: Vec::new(),
            scope_depth: 0,
            current_loop: None,
        }
    }

    /// Compiles a program into a chunk.
    ///
    /// Returns `None` when any error was recorded (by this phase or an
    /// earlier one); no output may be produced from a poisoned run.
    pub fn compile(mut self, statements: &[Stmt]) -> Option<Chunk> {
        for stmt in statements {
            self.statement(stmt);
        }
        self.chunk.emit_op(OpCode::Return);

        debug_assert_eq!(self.locals.len(), 0, "locals stack must balance");
        debug_assert_eq!(self.scope_depth, 0, "every scope must be closed");

        if self.handler.has_errors() {
            return None;
        }
        Some(self.chunk)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(s) => {
                self.expression(&s.expr);
                self.chunk.emit_op(OpCode::Pop);
            },
            Stmt::Print(s) => self.print_stmt(s),
            Stmt::VarDecl(s) => self.var_decl(s),
            Stmt::Block(s) => {
                self.begin_scope();
                for stmt in &s.statements {
                    self.statement(stmt);
                }
                self.end_scope();
            },
            Stmt::If(s) => self.if_stmt(s),
            Stmt::While(s) => self.while_stmt(s),
            Stmt::For(s) => self.for_stmt(s),
            Stmt::Forever(s) => self.forever_stmt(s),
            // Assertions are evaluated by the tree-interpreter
            // collaborator; the bytecode path emits nothing for them.
            Stmt::Assert(_) => {},
            Stmt::Break(s) => self.break_stmt(s),
            Stmt::Continue(s) => self.continue_stmt(s),
            Stmt::Label(s) => {
                self.handler.compile_error(
                    s.name.span,
                    "Labels are not supported by the bytecode compiler",
                );
            },
            Stmt::Goto(s) => {
                self.handler
                    .compile_error(s.span, "Goto is not supported by the bytecode compiler");
            },
        }
    }

    fn print_stmt(&mut self, stmt: &PrintStmt) {
        match &stmt.value {
            Some(value) => self.expression(value),
            // A bare `print` prints an empty string
            None => self.emit_string(""),
        }
        self.chunk.emit_op(OpCode::Print);
    }

    fn var_decl(&mut self, stmt: &VarDeclStmt) {
        let global_index = self.declare_and_name(&stmt.name);

        match &stmt.initializer {
            Some(initializer) => self.expression(initializer),
            None => self.chunk.emit_op(OpCode::Null),
        }

        self.define_variable(global_index);
    }

    /// Lowers `if`/`else`.
    ///
    /// `JUMP_IF_FLS` leaves the condition on the stack; the `POP` at the
    /// head of each branch removes it on both paths.
    fn if_stmt(&mut self, stmt: &IfStmt) {
        self.expression(&stmt.condition);

        let then_jump = self.chunk.emit_jump(OpCode::JumpIfFls);
        self.chunk.emit_op(OpCode::Pop);

        self.statement(&stmt.then_branch);

        let else_jump = self.chunk.emit_jump(OpCode::Jump);

        self.patch_jump(stmt.span, then_jump);
        self.chunk.emit_op(OpCode::Pop);

        if let Some(else_branch) = &stmt.else_branch {
            self.statement(else_branch);
        }

        self.patch_jump(stmt.span, else_jump);
    }

    fn while_stmt(&mut self, stmt: &WhileStmt) {
        let start = self.chunk.code_len();
        let enclosing = self.begin_loop(start, OpCode::Loop);

        self.expression(&stmt.condition);
        let exit_jump = self.chunk.emit_jump(OpCode::JumpIfFls);
        self.chunk.emit_op(OpCode::Pop);

        self.begin_scope();
        self.statement(&stmt.body);
        self.end_scope();

        self.emit_loop(stmt.span, start);

        self.patch_jump(stmt.span, exit_jump);
        self.chunk.emit_op(OpCode::Pop);

        // Breaks land here, just after the exit-condition pop
        self.finish_loop(stmt.span, None, enclosing);
    }

    fn for_stmt(&mut self, stmt: &ForStmt) {
        if let Some(initializer) = &stmt.initializer {
            self.statement(initializer);
        }

        // With a step block, `continue` must jump forward to it rather
        // than straight back to the condition
        let continue_op = if stmt.step.is_some() {
            OpCode::Jump
        } else {
            OpCode::Loop
        };

        let start = self.chunk.code_len();
        let enclosing = self.begin_loop(start, continue_op);

        match &stmt.condition {
            Some(condition) => self.expression(condition),
            None => self.chunk.emit_op(OpCode::True),
        }
        let exit_jump = self.chunk.emit_jump(OpCode::JumpIfFls);
        self.chunk.emit_op(OpCode::Pop);

        self.begin_scope();
        self.statement(&stmt.body);

        let mut continue_target = None;
        if let Some(step) = &stmt.step {
            continue_target = Some(self.chunk.code_len());
            self.expression(step);
        }

        self.emit_loop(stmt.span, start);

        self.patch_jump(stmt.span, exit_jump);
        self.chunk.emit_op(OpCode::Pop);

        self.end_scope();
        self.finish_loop(stmt.span, continue_target, enclosing);
    }

    fn forever_stmt(&mut self, stmt: &ForeverStmt) {
        let start = self.chunk.code_len();
        let enclosing = self.begin_loop(start, OpCode::Loop);

        self.begin_scope();
        self.statement(&stmt.body);
        self.end_scope();

        self.emit_loop(stmt.span, start);

        self.finish_loop(stmt.span, None, enclosing);
    }

    fn break_stmt(&mut self, stmt: &BreakStmt) {
        if self.current_loop.is_none() {
            self.handler
                .compile_error(stmt.keyword.span, "Break statement outside of loop");
            return;
        }
        let slot = self.chunk.emit_jump(OpCode::Jump);
        if let Some(state) = self.current_loop.as_mut() {
            state.break_jumps.push(slot);
        }
    }

    fn continue_stmt(&mut self, stmt: &ContinueStmt) {
        let continue_op = match &self.current_loop {
            Some(state) => state.continue_op,
            None => {
                self.handler
                    .compile_error(stmt.keyword.span, "Continue statement outside of loop");
                return;
            },
        };
        let slot = self.chunk.emit_jump(continue_op);
        if let Some(state) = self.current_loop.as_mut() {
            state.continue_jumps.push(slot);
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(e) => self.literal(e),
            Expr::Variable(e) => self.named_variable(&e.name, false),
            Expr::Assign(e) => self.assign(e),
            Expr::Binary(e) => self.binary(e),
            Expr::Unary(e) => self.unary(e),
            Expr::Factorial(e) => {
                self.expression(&e.expr);
                self.chunk.emit_op(OpCode::Fact);
            },
            Expr::Ternary(e) => self.ternary(e),
            Expr::Subscript(e) => {
                self.expression(&e.target);
                self.expression(&e.index);
                self.chunk.emit_op(OpCode::Subscript);
            },
            Expr::Input(e) => {
                match &e.prompt {
                    Some(prompt) => self.expression(prompt),
                    None => self.emit_string(""),
                }
                self.chunk.emit_op(OpCode::GetInput);
            },
            // The bytecode core stops at scalars, strings, variables, and
            // control flow; these forms belong to the tree-interpreter.
            Expr::Call(e) => {
                self.handler.compile_error(
                    e.span,
                    "Function calls are not supported by the bytecode compiler",
                );
            },
            Expr::Dictionary(e) => {
                self.handler.compile_error(
                    e.span,
                    "Dictionary literals are not supported by the bytecode compiler",
                );
            },
            Expr::Lambda(e) => {
                self.handler.compile_error(
                    e.span,
                    "Lambda expressions are not supported by the bytecode compiler",
                );
            },
        }
    }

    fn literal(&mut self, expr: &LiteralExpr) {
        match (expr.token.kind, &expr.token.literal) {
            (TokenKind::True, _) => self.chunk.emit_op(OpCode::True),
            (TokenKind::False, _) => self.chunk.emit_op(OpCode::False),
            (TokenKind::Null, _) => self.chunk.emit_op(OpCode::Null),
            (TokenKind::Str, Some(Literal::Str(value))) => self.emit_string(value),
            (TokenKind::Int, Some(Literal::Int(value))) => self.integer(*value),
            (TokenKind::Float, Some(Literal::Float(value))) => {
                self.chunk.emit_constant(Value::Float(*value));
            },
            _ => {},
        }
    }

    /// Small integers get dedicated single-byte opcodes; the rest go
    /// through the pool.
    fn integer(&mut self, value: i64) {
        match value {
            0 => self.chunk.emit_op(OpCode::Zero),
            1 => self.chunk.emit_op(OpCode::One),
            2 => self.chunk.emit_op(OpCode::Two),
            _ => {
                self.chunk.emit_constant(Value::Int(value));
            },
        }
    }

    fn unary(&mut self, expr: &UnaryExpr) {
        let before = self.chunk.code_len();
        self.expression(&expr.right);

        match expr.operator.kind {
            TokenKind::Minus => {
                // Peephole: `1` under a unary minus becomes OP_NEG1. Only
                // fires when the operand emitted exactly the one OP_1
                // byte, so an operand byte that merely equals OP_1's
                // value cannot trigger it.
                if self.chunk.code_len() == before + 1
                    && self.chunk.last_byte() == Some(OpCode::One as u8)
                {
                    self.chunk.replace_last(OpCode::Neg1 as u8);
                } else {
                    self.chunk.emit_op(OpCode::Negate);
                }
            },
            TokenKind::Not => self.chunk.emit_op(OpCode::Not),
            // Unary plus emits nothing
            _ => {},
        }
    }

    fn binary(&mut self, expr: &BinaryExpr) {
        self.expression(&expr.left);
        self.expression(&expr.right);
        self.binary_operator(expr.operator.kind);
    }

    /// Emits the opcode(s) for an infix operator whose operands are
    /// already on the stack. `!=`, `<=`, and `>=` are composed from their
    /// complements plus `NOT`.
    fn binary_operator(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Plus => self.chunk.emit_op(OpCode::Add),
            TokenKind::Minus => self.chunk.emit_op(OpCode::Sub),
            TokenKind::Star => self.chunk.emit_op(OpCode::Mul),
            TokenKind::Slash => self.chunk.emit_op(OpCode::Div),
            TokenKind::Percent => self.chunk.emit_op(OpCode::Mod),
            TokenKind::Caret => self.chunk.emit_op(OpCode::Pow),
            TokenKind::EqEq => self.chunk.emit_op(OpCode::Eq),
            TokenKind::NotEq => {
                self.chunk.emit_op(OpCode::Eq);
                self.chunk.emit_op(OpCode::Not);
            },
            TokenKind::Lt => self.chunk.emit_op(OpCode::Lt),
            TokenKind::LtEq => {
                self.chunk.emit_op(OpCode::Gt);
                self.chunk.emit_op(OpCode::Not);
            },
            TokenKind::Gt => self.chunk.emit_op(OpCode::Gt),
            TokenKind::GtEq => {
                self.chunk.emit_op(OpCode::Lt);
                self.chunk.emit_op(OpCode::Not);
            },
            TokenKind::And => self.chunk.emit_op(OpCode::And),
            TokenKind::Or => self.chunk.emit_op(OpCode::Or),
            _ => {},
        }
    }

    fn assign(&mut self, expr: &AssignExpr) {
        match compound_operator(expr.operator.kind) {
            // Plain `=`
            None => self.expression(&expr.value),
            // `x op= e` desugars to `x = x op e`
            Some(op) => {
                self.named_variable(&expr.name, false);
                self.expression(&expr.value);
                self.chunk.emit_op(op);
            },
        }
        self.named_variable(&expr.name, true);
    }

    /// Lowered exactly like `if`/`else`, but both branches leave a value.
    fn ternary(&mut self, expr: &TernaryExpr) {
        self.expression(&expr.condition);

        let then_jump = self.chunk.emit_jump(OpCode::JumpIfFls);
        self.chunk.emit_op(OpCode::Pop);

        self.expression(&expr.if_branch);

        let else_jump = self.chunk.emit_jump(OpCode::Jump);

        self.patch_jump(expr.span, then_jump);
        self.chunk.emit_op(OpCode::Pop);

        self.expression(&expr.else_branch);

        self.patch_jump(expr.span, else_jump);
    }

    // =========================================================================
    // Scopes and variables
    // =========================================================================

    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Closes a scope, popping its locals in LIFO order - once from the
    /// compiler's stack and once with an emitted `POP` each.
    fn end_scope(&mut self) {
        self.scope_depth -= 1;

        while self
            .locals
            .last()
            .map_or(false, |local| local.depth > self.scope_depth)
        {
            self.chunk.emit_op(OpCode::Pop);
            self.locals.pop();
        }
    }

    /// Declares a variable and, at global scope, interns its name.
    ///
    /// Returns the pool index of the name for globals; locals live in
    /// stack slots and need no pool entry.
    fn declare_and_name(&mut self, name: &Token) -> usize {
        self.declare_variable(name);
        if self.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(&name.lexeme)
    }

    /// Declares a local in the current scope; a no-op at global scope.
    ///
    /// Redeclaring a name that already lives in the *same* scope is a
    /// resolution error.
    fn declare_variable(&mut self, name: &Token) {
        if self.scope_depth == 0 {
            return;
        }

        for local in self.locals.iter().rev() {
            // Once we reach an initialised local from an outer scope the
            // name is free to shadow
            if local.depth != -1 && local.depth < self.scope_depth {
                break;
            }
            if local.name.lexeme == name.lexeme {
                self.handler.resolve_error(
                    name.span,
                    format!(
                        "Variable '{}' has already been declared in this scope",
                        name.lexeme
                    ),
                );
            }
        }

        self.add_local(name.clone());
    }

    fn add_local(&mut self, name: Token) {
        if self.locals.len() >= MAX_LOCALS {
            self.handler
                .compile_error(name.span, "Too many local variables in scope");
            return;
        }
        self.locals.push(Local { name, depth: -1 });
    }

    /// Flips the newest local from "declared" to "usable".
    fn mark_initialized(&mut self) {
        if let Some(local) = self.locals.last_mut() {
            local.depth = self.scope_depth;
        }
    }

    /// Finishes a declaration: locals become usable, globals get their
    /// `DEFINE_GLOBAL` with the interned-name index.
    fn define_variable(&mut self, global_index: usize) {
        if self.scope_depth > 0 {
            self.mark_initialized();
            return;
        }

        self.chunk.emit_op(OpCode::DefineGlobal);
        self.chunk.emit_pooled_index(global_index);
    }

    /// Finds the stack slot of a local, scanning innermost-first.
    ///
    /// A hit on a local still marked depth -1 means the variable is being
    /// read inside its own initializer.
    fn resolve_local(&self, name: &Token) -> Option<usize> {
        for (slot, local) in self.locals.iter().enumerate().rev() {
            if local.name.lexeme == name.lexeme {
                if local.depth == -1 {
                    self.handler.resolve_error(
                        name.span,
                        "Cannot read a variable in its own initializer",
                    );
                }
                return Some(slot);
            }
        }
        None
    }

    /// Emits a variable access: local slot when the name resolves,
    /// otherwise a global keyed by its interned name.
    fn named_variable(&mut self, name: &Token, is_assign: bool) {
        if let Some(slot) = self.resolve_local(name) {
            let op = if is_assign {
                OpCode::SetLocal
            } else {
                OpCode::GetLocal
            };
            self.chunk.emit_op(op);
            self.chunk.emit_byte(slot as u8);
        } else {
            let index = self.identifier_constant(&name.lexeme);
            let op = if is_assign {
                OpCode::SetGlobal
            } else {
                OpCode::GetGlobal
            };
            self.chunk.emit_op(op);
            self.chunk.emit_pooled_index(index);
        }
    }

    // =========================================================================
    // Constants and interning
    // =========================================================================

    /// Interns a string, returning its pool index. Identical strings and
    /// identifier names share one entry.
    fn string_constant(&mut self, value: &str) -> usize {
        if let Some(&index) = self.interned.get(value) {
            return index;
        }
        let index = self.chunk.add_constant(Value::Str(value.to_string()));
        self.interned.insert(value.to_string(), index);
        index
    }

    fn identifier_constant(&mut self, name: &str) -> usize {
        self.string_constant(name)
    }

    /// Interns a string and emits the push for it.
    fn emit_string(&mut self, value: &str) {
        let index = self.string_constant(value);
        self.chunk.emit_pooled_index(index);
    }

    // =========================================================================
    // Loops and patching
    // =========================================================================

    /// Opens a loop at `start`, parking the enclosing loop state.
    fn begin_loop(&mut self, start: usize, continue_op: OpCode) -> Option<LoopState> {
        self.current_loop.replace(LoopState {
            start,
            continue_op,
            break_jumps: Vec::new(),
            continue_jumps: Vec::new(),
        })
    }

    /// Closes the innermost loop: patches every pending break to the
    /// current end of code and every pending continue to its target
    /// (the loop start, or a `for` step block), then restores the
    /// enclosing loop state.
    fn finish_loop(&mut self, span: Span, continue_target: Option<usize>, enclosing: Option<LoopState>) {
        let loop_end = self.chunk.code_len();

        if let Some(state) = self.current_loop.take() {
            for slot in state.break_jumps {
                let distance = loop_end - slot - 2;
                let result = self.chunk.patch_distance(slot, distance);
                self.report_chunk_result(span, result);
            }

            let target = continue_target.unwrap_or(state.start);
            for slot in state.continue_jumps {
                // Forward for `for` steps, backward for plain loops; the
                // operand is the magnitude either way
                let distance = (target as i64 - slot as i64 - 2).unsigned_abs() as usize;
                let result = self.chunk.patch_distance(slot, distance);
                self.report_chunk_result(span, result);
            }
        }

        self.current_loop = enclosing;
    }

    fn emit_loop(&mut self, span: Span, start: usize) {
        let result = self.chunk.emit_loop(start);
        self.report_chunk_result(span, result);
    }

    fn patch_jump(&mut self, span: Span, index: usize) {
        let result = self.chunk.patch_jump(index);
        self.report_chunk_result(span, result);
    }

    /// Surfaces a chunk-level distance overflow as a *Compile* diagnostic.
    fn report_chunk_result(&self, span: Span, result: Result<(), ChunkError>) {
        if let Err(error) = result {
            self.handler.compile_error(span, error.to_string());
        }
    }
}

/// The binary opcode a compound assignment desugars to.
fn compound_operator(kind: TokenKind) -> Option<OpCode> {
    match kind {
        TokenKind::PlusEq => Some(OpCode::Add),
        TokenKind::MinusEq => Some(OpCode::Sub),
        TokenKind::StarEq => Some(OpCode::Mul),
        TokenKind::SlashEq => Some(OpCode::Div),
        TokenKind::PercentEq => Some(OpCode::Mod),
        TokenKind::CaretEq => Some(OpCode::Pow),
        _ => None,
    }
}
