use std::rc::Rc;

use lox_lexer::{Lexer, Token, TokenKind};

use crate::error::CompileError;
use crate::gc::Heap;
use crate::object::{LoxFunction, Obj, UpvalueDesc};
use crate::opcode::Op;
use crate::value::Value;

const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Minus | Plus => Precedence::Term,
        Slash | Star => Precedence::Factor,
        BangEqual | EqualEqual => Precedence::Equality,
        Greater | GreaterEqual | Less | LessEqual => Precedence::Comparison,
        And => Precedence::And,
        Or => Precedence::Or,
        LeftParen | Dot => Precedence::Call,
        _ => Precedence::None,
    }
}

struct Local {
    name: String,
    depth: i32, // -1 marks "declared but not yet defined"
    is_captured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct FunctionState {
    function: LoxFunction,
    fn_type: FunctionType,
    locals: Vec<Local>,
    scope_depth: i32,
    upvalues: Vec<UpvalueDesc>,
}

impl FunctionState {
    fn new(fn_type: FunctionType, name: Option<crate::value::ObjRef>) -> Self {
        let mut locals = Vec::new();
        // Slot 0 is reserved: `this` for methods/initializers, an
        // unnameable placeholder for plain functions and the script.
        locals.push(Local {
            name: if matches!(fn_type, FunctionType::Method | FunctionType::Initializer) {
                "this".to_string()
            } else {
                String::new()
            },
            depth: 0,
            is_captured: false,
        });
        FunctionState { function: LoxFunction::new(name), fn_type, locals, scope_depth: 0, upvalues: Vec::new() }
    }
}

struct ClassState {
    has_superclass: bool,
}

/// A single-pass compiler: it walks the token stream once, with no
/// intermediate AST, emitting bytecode directly as each expression or
/// statement is recognized via Pratt parsing.
pub struct Compiler<'src, 'h> {
    lexer: Lexer<'src>,
    heap: &'h mut Heap,
    previous: Token,
    current: Token,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    functions: Vec<FunctionState>,
    classes: Vec<ClassState>,
    /// Upvalue descriptors of the function most recently popped by
    /// [`end_function`](Self::end_function), collected by [`function`](Self::function)
    /// to emit alongside the enclosing `Op::Closure`.
    pending_upvalues: Vec<UpvalueDesc>,
}

impl<'src, 'h> Compiler<'src, 'h> {
    pub fn compile(source: &'src str, heap: &'h mut Heap) -> Result<Rc<LoxFunction>, Vec<CompileError>> {
        let mut compiler = Compiler {
            lexer: Lexer::new(source),
            heap,
            previous: Token::new(TokenKind::Eof, lox_lexer::Span::new(0, 0, 0), ""),
            current: Token::new(TokenKind::Eof, lox_lexer::Span::new(0, 0, 0), ""),
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
            functions: vec![FunctionState::new(FunctionType::Script, None)],
            classes: Vec::new(),
            pending_upvalues: Vec::new(),
        };
        compiler.advance();
        while !compiler.check(&TokenKind::Eof) {
            compiler.declaration();
        }
        compiler.consume(&TokenKind::Eof, "Expect end of expression.");
        let function = compiler.end_function();
        if compiler.had_error {
            Err(compiler.errors)
        } else {
            Ok(Rc::new(function))
        }
    }

    // ── Token stream plumbing ───────────────────────────────────────────

    fn advance(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        loop {
            self.current = self.lexer.next_token();
            if !matches!(self.current.kind, TokenKind::Error) {
                break;
            }
            let message = self.current.lexeme.clone();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let at_eof = matches!(token.kind, TokenKind::Eof);
        let lexeme = if at_eof { String::new() } else { token.lexeme.clone() };
        self.errors.push(CompileError { line: token.line(), lexeme, at_eof, message: message.to_string() });
    }

    /// Skips tokens until a statement boundary, so one syntax error doesn't
    /// cascade into dozens of spurious follow-on errors.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.check(&TokenKind::Eof) {
            if matches!(self.previous.kind, TokenKind::Semicolon) {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ── Emission helpers ─────────────────────────────────────────────────

    fn fs(&mut self) -> &mut FunctionState {
        self.functions.last_mut().unwrap()
    }

    fn chunk(&mut self) -> &mut crate::chunk::Chunk {
        &mut self.functions.last_mut().unwrap().function.chunk
    }

    fn emit(&mut self, op: Op) {
        let line = self.previous.line() as u32;
        self.chunk().write_op(op, line);
    }

    fn emit_u8(&mut self, byte: u8) {
        let line = self.previous.line() as u32;
        self.chunk().write(byte, line);
    }

    fn emit_u16_operand(&mut self, v: u16) {
        let line = self.previous.line() as u32;
        self.chunk().write_u16(v, line);
    }

    fn emit_jump(&mut self, op: Op) -> usize {
        let line = self.previous.line() as u32;
        self.chunk().emit_jump(op, line)
    }

    fn patch_jump(&mut self, offset: usize) {
        self.chunk().patch_jump(offset);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        let line = self.previous.line() as u32;
        self.chunk().emit_loop(loop_start, line);
    }

    fn emit_return(&mut self) {
        if self.fs().fn_type == FunctionType::Initializer {
            self.emit(Op::GetLocal);
            self.emit_u8(0); // `init` always returns `this`
        } else {
            self.emit(Op::Nil);
        }
        self.emit(Op::Return);
    }

    fn make_constant(&mut self, value: Value) -> u16 {
        let idx = self.chunk().add_constant(value);
        if idx == u16::MAX {
            self.error("Too many constants in one chunk.");
        }
        idx
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit(Op::Constant);
        self.emit_u16_operand(idx);
    }

    fn identifier_constant(&mut self, name: &str) -> u16 {
        let r = self.heap.intern_string(name);
        self.make_constant(Value::Obj(r))
    }

    fn end_function(&mut self) -> LoxFunction {
        self.emit_return();
        let state = self.functions.pop().unwrap();
        #[cfg(feature = "debug_print_code")]
        {
            if !self.had_error {
                let name = state.function.name.map(|r| self.heap.as_str(r).to_string()).unwrap_or_else(|| "<script>".into());
                eprintln!("{}", state.function.chunk.disassemble(&name, self.heap));
            }
        }
        self.pending_upvalues = state.upvalues;
        state.function
    }

    // ── Scopes / locals ───────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.fs().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.fs().scope_depth -= 1;
        let depth = self.fs().scope_depth;
        while let Some(local) = self.fs().locals.last() {
            if local.depth <= depth {
                break;
            }
            if self.fs().locals.last().unwrap().is_captured {
                self.emit(Op::CloseUpvalue);
            } else {
                self.emit(Op::Pop);
            }
            self.fs().locals.pop();
        }
    }

    fn add_local(&mut self, name: String) {
        if self.fs().locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.fs().locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn declare_variable(&mut self, name: &str) {
        if self.fs().scope_depth == 0 {
            return;
        }
        let depth = self.fs().scope_depth;
        for local in self.fs().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                self.error("Already a variable with this name in this scope.");
                return;
            }
        }
        self.add_local(name.to_string());
    }

    fn mark_initialized(&mut self) {
        if self.fs().scope_depth == 0 {
            return;
        }
        let depth = self.fs().scope_depth;
        self.fs().locals.last_mut().unwrap().depth = depth;
    }

    fn parse_variable(&mut self, message: &str) -> u16 {
        self.consume(&TokenKind::Identifier, message);
        let name = self.previous.lexeme.clone();
        self.declare_variable(&name);
        if self.fs().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(&name)
    }

    fn define_variable(&mut self, global: u16) {
        if self.fs().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit(Op::DefineGlobal);
        self.emit_u16_operand(global);
    }

    fn resolve_local(&self, depth_index: usize, name: &str) -> Option<usize> {
        let fs = &self.functions[depth_index];
        fs.locals.iter().rposition(|l| l.name == name).filter(|&i| fs.locals[i].depth != -1)
    }

    fn resolve_upvalue(&mut self, depth_index: usize, name: &str) -> Option<usize> {
        if depth_index == 0 {
            return None;
        }
        let enclosing = depth_index - 1;
        if let Some(local_idx) = self.resolve_local(enclosing, name) {
            self.functions[enclosing].locals[local_idx].is_captured = true;
            return Some(self.add_upvalue(depth_index, local_idx as u8, true));
        }
        if let Some(upvalue_idx) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(depth_index, upvalue_idx as u8, false));
        }
        None
    }

    fn add_upvalue(&mut self, depth_index: usize, index: u8, is_local: bool) -> usize {
        let fs = &mut self.functions[depth_index];
        for (i, uv) in fs.upvalues.iter().enumerate() {
            if uv.index == index && uv.is_local == is_local {
                return i;
            }
        }
        if fs.upvalues.len() >= MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        fs.upvalues.push(UpvalueDesc { is_local, index });
        fs.upvalues.len() - 1
    }

    // ── Declarations ──────────────────────────────────────────────────────

    fn declaration(&mut self) {
        if self.match_token(&TokenKind::Class) {
            self.class_declaration();
        } else if self.match_token(&TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(&TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(&TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous.lexeme.clone();
        let name_constant = self.identifier_constant(&class_name);
        self.declare_variable(&class_name);

        self.emit(Op::Class);
        self.emit_u16_operand(name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassState { has_superclass: false });

        if self.match_token(&TokenKind::Less) {
            self.consume(&TokenKind::Identifier, "Expect superclass name.");
            let super_name = self.previous.lexeme.clone();
            if super_name == class_name {
                self.error("A class can't inherit from itself.");
            }
            self.named_variable(&super_name, false);

            self.begin_scope();
            self.add_local("super".to_string());
            self.define_variable(0);

            self.named_variable(&class_name, false);
            self.emit(Op::Inherit);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(&class_name, false);
        self.consume(&TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            self.method();
        }
        self.consume(&TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit(Op::Pop); // the class itself, left by `named_variable` above

        if self.classes.last().unwrap().has_superclass {
            self.end_scope();
        }
        self.classes.pop();
    }

    fn method(&mut self) {
        self.consume(&TokenKind::Identifier, "Expect method name.");
        let name = self.previous.lexeme.clone();
        let name_constant = self.identifier_constant(&name);
        let fn_type = if name == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(fn_type);
        self.emit(Op::Method);
        self.emit_u16_operand(name_constant);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    /// Compiles a function's parameter list and body into its own
    /// [`FunctionState`], then emits `Op::Closure` in the *enclosing*
    /// function to materialize it at runtime.
    fn function(&mut self, fn_type: FunctionType) {
        let name = self.previous.lexeme.clone();
        let name_ref = self.heap.intern_string(&name);
        self.functions.push(FunctionState::new(fn_type, Some(name_ref)));
        self.begin_scope();

        self.consume(&TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(&TokenKind::RightParen) {
            loop {
                self.fs().function.arity += 1;
                if self.fs().function.arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(&TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let function = self.end_function();
        let upvalues = std::mem::take(&mut self.pending_upvalues);
        let idx = self.make_constant(Value::Obj(self.heap.alloc(Obj::Function(Rc::new(function)))));
        self.emit(Op::Closure);
        self.emit_u16_operand(idx);
        self.emit_u8(upvalues.len() as u8);
        for uv in upvalues {
            self.emit_u8(uv.is_local as u8);
            self.emit_u8(uv.index);
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(&TokenKind::Equal) {
            self.expression();
        } else {
            self.emit(Op::Nil);
        }
        self.consume(&TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    // ── Statements ────────────────────────────────────────────────────────

    fn statement(&mut self) {
        if self.match_token(&TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(&TokenKind::For) {
            self.for_statement();
        } else if self.match_token(&TokenKind::If) {
            self.if_statement();
        } else if self.match_token(&TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(&TokenKind::While) {
            self.while_statement();
        } else if self.match_token(&TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(&TokenKind::Semicolon, "Expect ';' after value.");
        self.emit(Op::Print);
    }

    fn return_statement(&mut self) {
        if self.fs().fn_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(&TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.fs().fn_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(&TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit(Op::Return);
        }
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().code.len();
        self.consume(&TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(&TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit(Op::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(&TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(&TokenKind::Semicolon) {
            // no initializer
        } else if self.match_token(&TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().code.len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(&TokenKind::Semicolon) {
            self.expression();
            self.consume(&TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(Op::JumpIfFalse));
            self.emit(Op::Pop);
        }

        if !self.match_token(&TokenKind::RightParen) {
            let body_jump = self.emit_jump(Op::Jump);
            let increment_start = self.chunk().code.len();
            self.expression();
            self.emit(Op::Pop);
            self.consume(&TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit(Op::Pop);
        }
        self.end_scope();
    }

    fn if_statement(&mut self) {
        self.consume(&TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(&TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.statement();

        let else_jump = self.emit_jump(Op::Jump);
        self.patch_jump(then_jump);
        self.emit(Op::Pop);

        if self.match_token(&TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn block(&mut self) {
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            self.declaration();
        }
        self.consume(&TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(&TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit(Op::Pop);
    }

    // ── Expressions (Pratt parser) ────────────────────────────────────────

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if !self.prefix(can_assign) {
            self.error("Expect expression.");
            return;
        }
        while precedence <= precedence_of(&self.current.kind) {
            self.advance();
            self.infix(can_assign);
        }
        if can_assign && self.match_token(&TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    /// Dispatches on `self.previous.kind` (the token `advance()` just
    /// consumed) to the matching prefix parselet. Returns `false` if the
    /// token has no prefix position at all.
    fn prefix(&mut self, can_assign: bool) -> bool {
        match self.previous.kind.clone() {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus | TokenKind::Bang => self.unary(),
            TokenKind::NumberLiteral(n) => self.number(n),
            TokenKind::StringLiteral(s) => self.string(s),
            TokenKind::True => self.emit(Op::True),
            TokenKind::False => self.emit(Op::False),
            TokenKind::Nil => self.emit(Op::Nil),
            TokenKind::Identifier => self.variable(can_assign),
            TokenKind::This => self.this_expr(),
            TokenKind::Super => self.super_expr(),
            _ => return false,
        }
        true
    }

    fn infix(&mut self, can_assign: bool) {
        match self.previous.kind.clone() {
            TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Slash
            | TokenKind::Star
            | TokenKind::BangEqual
            | TokenKind::EqualEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => self.binary(),
            TokenKind::And => self.and(),
            TokenKind::Or => self.or(),
            TokenKind::LeftParen => self.call(),
            TokenKind::Dot => self.dot(can_assign),
            _ => {}
        }
    }

    fn number(&mut self, n: f64) {
        self.emit_constant(Value::Number(n));
    }

    fn string(&mut self, s: String) {
        let r = self.heap.intern_string(&s);
        self.emit_constant(Value::Obj(r));
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(&TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind.clone();
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit(Op::Negate),
            TokenKind::Bang => self.emit(Op::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind.clone();
        let rule_prec = precedence_of(&operator);
        self.parse_precedence(rule_prec.next());
        match operator {
            TokenKind::Plus => self.emit(Op::Add),
            TokenKind::Minus => self.emit(Op::Subtract),
            TokenKind::Star => self.emit(Op::Multiply),
            TokenKind::Slash => self.emit(Op::Divide),
            TokenKind::BangEqual => {
                self.emit(Op::Equal);
                self.emit(Op::Not);
            }
            TokenKind::EqualEqual => self.emit(Op::Equal),
            TokenKind::Greater => self.emit(Op::Greater),
            TokenKind::GreaterEqual => {
                self.emit(Op::Less);
                self.emit(Op::Not);
            }
            TokenKind::Less => self.emit(Op::Less),
            TokenKind::LessEqual => {
                self.emit(Op::Greater);
                self.emit(Op::Not);
            }
            _ => unreachable!(),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(Op::JumpIfFalse);
        let end_jump = self.emit_jump(Op::Jump);
        self.patch_jump(else_jump);
        self.emit(Op::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit(Op::Call);
        self.emit_u8(argc);
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(&TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme.clone();
        let name_constant = self.identifier_constant(&name);

        if can_assign && self.match_token(&TokenKind::Equal) {
            self.expression();
            self.emit(Op::SetProperty);
            self.emit_u16_operand(name_constant);
        } else if self.match_token(&TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.emit(Op::Invoke);
            self.emit_u16_operand(name_constant);
            self.emit_u8(argc);
        } else {
            self.emit(Op::GetProperty);
            self.emit_u16_operand(name_constant);
        }
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u16 = 0;
        if !self.check(&TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                argc += 1;
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "Expect ')' after arguments.");
        argc as u8
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme.clone();
        self.named_variable(&name, can_assign);
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let depth_index = self.functions.len() - 1;
        let (get_op, set_op, slot) = if let Some(idx) = self.resolve_local(depth_index, name) {
            (Op::GetLocal, Op::SetLocal, idx as u16)
        } else if let Some(idx) = self.resolve_upvalue(depth_index, name) {
            (Op::GetUpvalue, Op::SetUpvalue, idx as u16)
        } else {
            let idx = self.identifier_constant(name);
            (Op::GetGlobal, Op::SetGlobal, idx)
        };

        if can_assign && self.match_token(&TokenKind::Equal) {
            self.expression();
            self.emit(set_op);
            self.emit_slot(set_op, slot);
        } else {
            self.emit(get_op);
            self.emit_slot(get_op, slot);
        }
    }

    fn emit_slot(&mut self, op: Op, slot: u16) {
        match op {
            Op::GetLocal | Op::SetLocal | Op::GetUpvalue | Op::SetUpvalue => self.emit_u8(slot as u8),
            _ => self.emit_u16_operand(slot),
        }
    }

    fn this_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.variable(false);
    }

    fn super_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }
        self.consume(&TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(&TokenKind::Identifier, "Expect superclass method name.");
        let name = self.previous.lexeme.clone();
        let name_constant = self.identifier_constant(&name);

        let depth_index = self.functions.len() - 1;
        self.named_variable_raw(depth_index, "this");
        if self.match_token(&TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.named_variable_raw(depth_index, "super");
            self.emit(Op::SuperInvoke);
            self.emit_u16_operand(name_constant);
            self.emit_u8(argc);
        } else {
            self.named_variable_raw(depth_index, "super");
            self.emit(Op::GetSuper);
            self.emit_u16_operand(name_constant);
        }
    }

    /// Like [`named_variable`](Self::named_variable) but for compiler-synthesized
    /// lookups (`this`, `super`) that are never assignment targets.
    fn named_variable_raw(&mut self, depth_index: usize, name: &str) {
        if let Some(idx) = self.resolve_local(depth_index, name) {
            self.emit(Op::GetLocal);
            self.emit_u8(idx as u8);
        } else if let Some(idx) = self.resolve_upvalue(depth_index, name) {
            self.emit(Op::GetUpvalue);
            self.emit_u8(idx as u8);
        } else {
            unreachable!("'{name}' must always resolve inside a method body");
        }
    }
}
