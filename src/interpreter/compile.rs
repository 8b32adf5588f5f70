use super::*;
use crate::bytecode::{Address, Code, Op, UNPATCHED};

/// A statement `break`/`continue` can leave, with its pending jumps.
struct Breakable {
    target: LabelId,
    break_depth: u32,
    continue_depth: u32,
    breaks: Vec<Address>,
    continues: Vec<Address>,
}

/// Single forward pass from a body to [`Code`]. Forward jumps are emitted
/// with a placeholder target and patched once the target is known.
struct Compiler {
    code: Code,
    depth: usize,
    blocks: u32,
    breakables: Vec<Breakable>,
    fold: bool,
    top_level: bool,
}

#[tracing::instrument(level = "debug", skip_all, fields(program = body.is_program))]
pub(crate) fn compile_body(body: &FunctionBody, fold: bool) -> Code {
    let mut c = Compiler {
        code: Code::default(),
        depth: 0,
        blocks: 0,
        breakables: Vec::new(),
        fold,
        top_level: false,
    };
    for stmt in &body.statements {
        c.top_level = body.is_program;
        c.statement(stmt);
    }
    c.emit(Op::Halt);
    tracing::debug!(
        ops = c.code.ops.len(),
        max_stack = c.code.max_stack,
        max_blocks = c.code.max_blocks,
        "compiled body"
    );
    c.code
}

impl Compiler {
    fn emit(&mut self, op: Op) -> Address {
        let (pops, pushes) = op.stack_effect();
        self.depth = self.depth.saturating_sub(pops) + pushes;
        self.code.max_stack = self.code.max_stack.max(self.depth);
        self.code.ops.push(op);
        self.code.ops.len() - 1
    }

    fn here(&self) -> Address {
        self.code.ops.len()
    }

    fn patch(&mut self, site: Address, target: Address) {
        if let Some(t) = self.code.ops.get_mut(site).and_then(Op::target_mut) {
            *t = target;
        }
    }

    fn patch_here(&mut self, site: Address) {
        let here = self.here();
        self.patch(site, here);
    }

    fn push_block(&mut self) {
        self.blocks += 1;
        self.code.max_blocks = self.code.max_blocks.max(self.blocks as usize);
    }

    fn leave_to(&mut self, depth: u32) {
        if self.blocks > depth {
            self.emit(Op::Leave(depth));
        }
    }

    // Statements

    fn statements(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        if !matches!(stmt.kind, StatementKind::Block(_)) {
            self.emit(Op::Line {
                line: stmt.line,
                top_level: self.top_level,
            });
        }
        let top_level = std::mem::replace(&mut self.top_level, false);
        match &stmt.kind {
            StatementKind::Empty | StatementKind::FunctionDeclaration(_) => {}
            StatementKind::Expression(expr) => {
                self.value(expr);
                self.emit(Op::SetResult);
            }
            StatementKind::Block(stmts) => self.statements(stmts),
            StatementKind::Variable(decls) => self.variable_declarations(decls),
            StatementKind::If(s) => {
                self.value(&s.test);
                let to_else = self.emit(Op::JumpIfFalse(UNPATCHED));
                self.statement(&s.consequent);
                match &s.alternate {
                    Some(alt) => {
                        let to_end = self.emit(Op::Jump(UNPATCHED));
                        self.patch_here(to_else);
                        self.statement(alt);
                        self.patch_here(to_end);
                    }
                    None => self.patch_here(to_else),
                }
            }
            StatementKind::DoWhile(l) => {
                let top = self.here();
                self.push_breakable(l.target, self.blocks);
                self.statement(&l.body);
                let cont = self.here();
                self.value(&l.test);
                self.emit(Op::JumpIfTrue(top));
                self.pop_breakable(cont, None);
            }
            StatementKind::While(l) => {
                let top = self.here();
                self.value(&l.test);
                let exit = self.emit(Op::JumpIfFalse(UNPATCHED));
                self.push_breakable(l.target, self.blocks);
                self.statement(&l.body);
                self.emit(Op::Jump(top));
                self.pop_breakable(top, Some(exit));
            }
            StatementKind::For(f) => self.for_statement(f),
            StatementKind::ForIn(f) => self.for_in_statement(f),
            StatementKind::Continue(target) => {
                let Some(i) = self.breakables.iter().rposition(|b| b.target == *target) else {
                    return;
                };
                self.leave_to(self.breakables[i].continue_depth);
                let site = self.emit(Op::Jump(UNPATCHED));
                self.breakables[i].continues.push(site);
            }
            StatementKind::Break(target) => {
                let Some(i) = self.breakables.iter().rposition(|b| b.target == *target) else {
                    return;
                };
                self.leave_to(self.breakables[i].break_depth);
                let site = self.emit(Op::Jump(UNPATCHED));
                self.breakables[i].breaks.push(site);
            }
            StatementKind::Return(expr) => {
                match expr {
                    Some(e) => self.value(e),
                    None => {
                        self.emit(Op::Undefined);
                    }
                }
                self.emit(Op::Return);
            }
            StatementKind::With(expr, body) => {
                let outer = self.blocks;
                self.value(expr);
                self.emit(Op::EnterWith);
                self.push_block();
                self.statement(body);
                self.emit(Op::Leave(outer));
                self.blocks = outer;
            }
            StatementKind::Switch(s) => self.switch_statement(s),
            StatementKind::Labeled(target, body) => {
                self.push_breakable(*target, self.blocks);
                self.statement(body);
                let here = self.here();
                self.pop_breakable(here, None);
            }
            StatementKind::Throw(expr) => {
                self.value(expr);
                self.emit(Op::Throw);
            }
            StatementKind::Try(t) => self.try_statement(t),
        }
        self.top_level = top_level;
    }

    fn variable_declarations(&mut self, decls: &[VariableDeclarator]) {
        for decl in decls {
            if let Some(init) = &decl.init {
                self.emit(Op::Lookup(decl.name));
                self.value(init);
                self.emit(Op::PutValue);
                self.emit(Op::Pop);
            }
        }
    }

    fn push_breakable(&mut self, target: LabelId, depth: u32) {
        self.breakables.push(Breakable {
            target,
            break_depth: depth,
            continue_depth: depth,
            breaks: Vec::new(),
            continues: Vec::new(),
        });
    }

    /// Patches `continue` jumps to `cont`, and `break` jumps (plus `exit`)
    /// to the current address.
    fn pop_breakable(&mut self, cont: Address, exit: Option<Address>) {
        let Some(b) = self.breakables.pop() else {
            return;
        };
        for site in b.continues {
            self.patch(site, cont);
        }
        for site in b.breaks.into_iter().chain(exit) {
            self.patch_here(site);
        }
    }

    fn for_statement(&mut self, f: &ForStatement) {
        match &f.init {
            Some(ForInit::Variable(decls)) => self.variable_declarations(decls),
            Some(ForInit::Expression(expr)) => {
                self.value(expr);
                self.emit(Op::Pop);
            }
            None => {}
        }
        let top = self.here();
        let exit = f.test.as_ref().map(|test| {
            self.value(test);
            self.emit(Op::JumpIfFalse(UNPATCHED))
        });
        self.push_breakable(f.target, self.blocks);
        self.statement(&f.body);
        let cont = self.here();
        if let Some(update) = &f.update {
            self.value(update);
            self.emit(Op::Pop);
        }
        self.emit(Op::Jump(top));
        self.pop_breakable(cont, exit);
    }

    fn for_in_statement(&mut self, f: &ForInStatement) {
        if let ForInTarget::Variable(decl) = &f.left {
            self.variable_declarations(std::slice::from_ref(decl));
        }
        let outer = self.blocks;
        self.value(&f.object);
        self.emit(Op::EnterEnum);
        self.push_block();

        let top = self.here();
        let exit = self.emit(Op::NextName(UNPATCHED));
        match &f.left {
            ForInTarget::Variable(decl) => {
                self.emit(Op::Lookup(decl.name));
            }
            ForInTarget::Expression(expr) => self.expr(expr),
        }
        self.emit(Op::Exch);
        self.emit(Op::PutValue);
        self.emit(Op::Pop);

        self.breakables.push(Breakable {
            target: f.target,
            break_depth: outer,
            continue_depth: self.blocks,
            breaks: Vec::new(),
            continues: Vec::new(),
        });
        self.statement(&f.body);
        self.emit(Op::Jump(top));
        self.pop_breakable(top, Some(exit));
        self.emit(Op::Leave(outer));
        self.blocks = outer;
    }

    // §12.11: case tests run in order against a copy of the discriminant;
    // a matching test jumps to a stub that drops the copy.
    fn switch_statement(&mut self, s: &SwitchStatement) {
        self.value(&s.discriminant);
        let base = self.depth - 1;
        let mut matches = Vec::new();
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                self.emit(Op::Dup);
                self.value(test);
                self.emit(Op::Binary(BinaryOp::StrictEq));
                matches.push((i, self.emit(Op::JumpIfTrue(UNPATCHED))));
            }
        }
        self.emit(Op::Pop);
        let no_match = self.emit(Op::Jump(UNPATCHED));

        let mut entries = Vec::new();
        for (i, site) in matches {
            self.patch_here(site);
            self.depth = base + 1;
            self.emit(Op::Pop);
            entries.push((i, self.emit(Op::Jump(UNPATCHED))));
        }

        self.push_breakable(s.target, self.blocks);
        let mut starts = Vec::with_capacity(s.cases.len());
        for case in &s.cases {
            starts.push(self.here());
            self.statements(&case.body);
        }
        for (i, site) in entries {
            self.patch(site, starts[i]);
        }
        match s.cases.iter().position(|c| c.test.is_none()) {
            Some(default) => self.patch(no_match, starts[default]),
            None => {
                if let Some(b) = self.breakables.last_mut() {
                    b.breaks.push(no_match);
                }
            }
        }
        let here = self.here();
        self.pop_breakable(here, None);
    }

    // §12.14
    fn try_statement(&mut self, t: &TryStatement) {
        let outer = self.blocks;
        let finally_site = t.finalizer.as_ref().map(|_| {
            let site = self.emit(Op::EnterFinally(UNPATCHED));
            self.push_block();
            site
        });

        match &t.handler {
            Some(handler) => {
                let catch_depth = self.blocks;
                let catch_site = self.emit(Op::EnterCatch {
                    handler: UNPATCHED,
                    param: handler.param,
                });
                self.push_block();
                self.statements(&t.block);
                self.emit(Op::Leave(catch_depth));
                self.blocks = catch_depth;
                let skip = self.emit(Op::Jump(UNPATCHED));

                self.patch_here(catch_site);
                self.push_block();
                self.statements(&handler.body);
                self.emit(Op::Leave(catch_depth));
                self.blocks = catch_depth;
                self.patch_here(skip);
            }
            None => self.statements(&t.block),
        }

        if let (Some(site), Some(finalizer)) = (finally_site, &t.finalizer) {
            self.emit(Op::Leave(outer));
            self.blocks = outer;
            let skip = self.emit(Op::Jump(UNPATCHED));
            self.patch_here(site);
            self.push_block();
            self.statements(finalizer);
            self.emit(Op::EndFinally);
            self.blocks = outer;
            self.patch_here(skip);
        }
    }

    // Expressions

    fn constant(&mut self, value: JsValue) {
        let op = match value {
            JsValue::Undefined => Op::Undefined,
            JsValue::Null => Op::Null,
            JsValue::Boolean(b) => Op::Bool(b),
            JsValue::Number(n) => Op::Number(n),
            JsValue::String(s) => Op::String(s),
            JsValue::Object(_) => Op::Undefined,
        };
        self.emit(op);
    }

    /// Compiles `expr` so that a value, never a reference, is pushed.
    fn value(&mut self, expr: &Expression) {
        if self.fold
            && !matches!(expr, Expression::Literal(_))
            && let Some(v) = fold(expr)
        {
            self.constant(v);
            return;
        }
        self.expr(expr);
        if matches!(expr, Expression::Identifier(_) | Expression::Member(..)) {
            self.emit(Op::GetValue);
        }
    }

    fn expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(lit) => self.constant(literal_value(lit)),
            Expression::Identifier(name) => {
                self.emit(Op::Lookup(*name));
            }
            Expression::This => {
                self.emit(Op::This);
            }
            Expression::Array(elements) => {
                self.emit(Op::NewArray);
                for (i, element) in elements.iter().enumerate() {
                    if let Some(e) = element {
                        self.value(e);
                        self.emit(Op::SetIndex(i as u32));
                    }
                }
                self.emit(Op::SetLength(elements.len() as u32));
            }
            Expression::Object(props) => {
                self.emit(Op::NewObject);
                for (name, value) in props {
                    self.value(value);
                    self.emit(Op::InitProperty(*name));
                }
            }
            Expression::Function(literal) => {
                let index = self.code.functions.len() as u32;
                self.code.functions.push(literal.clone());
                self.emit(Op::Function(index));
            }
            Expression::Unary(op, operand) => match op {
                UnaryOp::Delete => {
                    self.expr(operand);
                    self.emit(Op::Delete);
                }
                UnaryOp::Typeof => {
                    self.expr(operand);
                    self.emit(Op::Typeof);
                }
                UnaryOp::Void => {
                    self.value(operand);
                    self.emit(Op::Pop);
                    self.emit(Op::Undefined);
                }
                UnaryOp::Not | UnaryOp::Minus | UnaryOp::Plus | UnaryOp::BitNot => {
                    self.value(operand);
                    self.emit(match op {
                        UnaryOp::Not => Op::Not,
                        UnaryOp::Minus => Op::Negate,
                        UnaryOp::Plus => Op::Plus,
                        _ => Op::BitNot,
                    });
                }
            },
            Expression::Update(op, prefix, target) => {
                self.expr(target);
                self.emit(match (op, prefix) {
                    (UpdateOp::Increment, true) => Op::PreIncrement,
                    (UpdateOp::Decrement, true) => Op::PreDecrement,
                    (UpdateOp::Increment, false) => Op::PostIncrement,
                    (UpdateOp::Decrement, false) => Op::PostDecrement,
                });
            }
            Expression::Binary(op, left, right) => {
                self.value(left);
                self.value(right);
                self.emit(Op::Binary(*op));
            }
            Expression::Logical(op, left, right) => {
                self.value(left);
                self.emit(Op::Dup);
                let skip = self.emit(match op {
                    LogicalOp::And => Op::JumpIfFalse(UNPATCHED),
                    LogicalOp::Or => Op::JumpIfTrue(UNPATCHED),
                });
                self.emit(Op::Pop);
                self.value(right);
                self.patch_here(skip);
            }
            Expression::Conditional(test, consequent, alternate) => {
                self.value(test);
                let to_else = self.emit(Op::JumpIfFalse(UNPATCHED));
                let depth = self.depth;
                self.value(consequent);
                let to_end = self.emit(Op::Jump(UNPATCHED));
                self.patch_here(to_else);
                self.depth = depth;
                self.value(alternate);
                self.patch_here(to_end);
            }
            Expression::Assign(op, target, value) => {
                self.expr(target);
                match op.binary_op() {
                    None => self.value(value),
                    Some(bop) => {
                        self.emit(Op::Dup);
                        self.emit(Op::GetValue);
                        self.value(value);
                        self.emit(Op::Binary(bop));
                    }
                }
                self.emit(Op::PutValue);
            }
            Expression::Call(callee, args) => {
                self.expr(callee);
                for arg in args {
                    self.value(arg);
                }
                self.emit(Op::Call(args.len() as u32));
            }
            Expression::New(callee, args) => {
                self.value(callee);
                for arg in args {
                    self.value(arg);
                }
                self.emit(Op::New(args.len() as u32));
            }
            Expression::Member(object, property) => {
                self.value(object);
                match property {
                    MemberProperty::Dot(name) => {
                        self.emit(Op::Member(*name));
                    }
                    MemberProperty::Computed(name) => {
                        self.value(name);
                        self.emit(Op::MemberComputed);
                    }
                }
            }
            Expression::Sequence(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.emit(Op::Pop);
                    }
                    self.value(e);
                }
            }
        }
    }
}

/// Evaluates an expression built only from literals and operators that
/// cannot reach user code.
fn fold(expr: &Expression) -> Option<JsValue> {
    match expr {
        Expression::Literal(lit) => Some(literal_value(lit)),
        Expression::Unary(op, operand) => {
            let v = fold(operand)?;
            Some(match op {
                UnaryOp::Minus => JsValue::Number(-primitive_to_number(&v)),
                UnaryOp::Plus => JsValue::Number(primitive_to_number(&v)),
                UnaryOp::Not => JsValue::Boolean(!to_boolean(&v)),
                UnaryOp::BitNot => JsValue::Number(crate::types::number_ops::bitwise_not(primitive_to_number(&v))),
                UnaryOp::Void => JsValue::Undefined,
                UnaryOp::Typeof => JsValue::string(v.type_name()),
                UnaryOp::Delete => JsValue::Boolean(true),
            })
        }
        Expression::Binary(op, left, right) => fold_binary(*op, &fold(left)?, &fold(right)?),
        Expression::Logical(op, left, right) => {
            let l = fold(left)?;
            match (op, to_boolean(&l)) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Some(l),
                _ => fold(right),
            }
        }
        Expression::Conditional(test, consequent, alternate) => {
            if to_boolean(&fold(test)?) {
                fold(consequent)
            } else {
                fold(alternate)
            }
        }
        Expression::Sequence(exprs) => {
            let mut last = None;
            for e in exprs {
                last = Some(fold(e)?);
            }
            last
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, Parser};

    fn compile(src: &str, fold: bool) -> Code {
        let mut interner = Interner::new(LiteralTable::standard());
        let program = Parser::new(src, "c", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_program()
            .unwrap();
        compile_body(&program.body, fold)
    }

    fn unpatched(code: &Code) -> usize {
        code.ops
            .clone()
            .iter_mut()
            .filter_map(|op| op.target_mut().map(|t| *t))
            .filter(|t| *t == UNPATCHED)
            .count()
    }

    #[test]
    fn constant_expressions_fold_to_one_literal() {
        let code = compile("1 + 2 * 3;", true);
        assert!(code.ops.contains(&Op::Number(7.0)));
        assert!(!code.ops.iter().any(|op| matches!(op, Op::Binary(_))));
        let code = compile("'a' + 1 + (true ? 'x' : y);", true);
        assert!(code.ops.contains(&Op::String(JsString::from_str("a1x"))));
    }

    #[test]
    fn folding_stops_at_identifiers_and_objects() {
        let code = compile("x + 1; [1] + 1;", true);
        assert_eq!(code.ops.iter().filter(|op| matches!(op, Op::Binary(_))).count(), 2);
        let code = compile("1 + 2;", false);
        assert!(code.ops.contains(&Op::Binary(BinaryOp::Add)));
    }

    #[test]
    fn every_jump_is_patched() {
        let code = compile(
            "a: for (var i = 0; i < 3; i++) { while (x) { if (y) break a; else continue; } \
             switch (i) { case 1: break; default: continue a; } \
             try { for (var k in o) { if (k) break; } } catch (e) { } finally { z = 1; } } \
             do { q++; } while (q < 2); with (o) { r = 1; }",
            false,
        );
        assert_eq!(unpatched(&code), 0);
        assert!(matches!(code.ops.last(), Some(Op::Halt)));
    }

    #[test]
    fn max_stack_covers_nested_calls() {
        let code = compile("f(1, g(2, 3), 4);", false);
        assert!(code.max_stack >= 5, "max_stack = {}", code.max_stack);
        let code = compile("var a = 1;", false);
        assert_eq!(code.max_stack, 2);
    }

    #[test]
    fn block_nesting_is_counted() {
        let code = compile("try { with (o) { for (var k in o) {} } } finally {}", false);
        assert_eq!(code.max_blocks, 3);
    }

    #[test]
    fn top_level_lines_are_marked() {
        let code = compile("a;\nif (b) {\n c;\n}", false);
        let lines: Vec<(u32, bool)> = code
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Line { line, top_level } => Some((*line, *top_level)),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![(1, true), (2, true), (3, false)]);
    }
}
