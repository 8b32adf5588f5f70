use super::*;

/// Direct interpretation of the syntax tree.
pub(crate) struct TreeWalker;

impl ExecutionStrategy for TreeWalker {
    fn execute(&self, interp: &mut Interpreter, body: &FunctionBody) -> JsResult<Completion> {
        interp.exec_body(body)
    }
}

enum LoopFlow {
    Next,
    Exit,
    Propagate(Completion),
}

impl Interpreter {
    pub(crate) fn exec_body(&mut self, body: &FunctionBody) -> JsResult<Completion> {
        for stmt in &body.statements {
            if body.is_program {
                self.maybe_collect(&[]);
            }
            let completion = self.exec_statement(stmt)?;
            if completion.is_abrupt() {
                return Ok(completion);
            }
        }
        Ok(Completion::Normal)
    }

    pub(crate) fn exec_statements(&mut self, stmts: &[Statement]) -> JsResult<Completion> {
        for stmt in stmts {
            let completion = self.exec_statement(stmt)?;
            if completion.is_abrupt() {
                return Ok(completion);
            }
        }
        Ok(Completion::Normal)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement) -> JsResult<Completion> {
        if !matches!(stmt.kind, StatementKind::Block(_)) {
            self.location.line = stmt.line;
            self.trace(TraceEvent::Statement);
        }
        match &stmt.kind {
            StatementKind::Empty | StatementKind::FunctionDeclaration(_) => Ok(Completion::Normal),
            StatementKind::Expression(expr) => {
                let value = self.eval_value(expr)?;
                self.set_result(value);
                Ok(Completion::Normal)
            }
            StatementKind::Block(stmts) => self.exec_statements(stmts),
            StatementKind::Variable(decls) => {
                self.exec_variable_declarations(decls)?;
                Ok(Completion::Normal)
            }
            StatementKind::If(if_stmt) => {
                let test = self.eval_value(&if_stmt.test)?;
                if to_boolean(&test) {
                    self.exec_statement(&if_stmt.consequent)
                } else if let Some(alt) = &if_stmt.alternate {
                    self.exec_statement(alt)
                } else {
                    Ok(Completion::Normal)
                }
            }
            StatementKind::DoWhile(l) => self.exec_do_while(l),
            StatementKind::While(l) => self.exec_while(l),
            StatementKind::For(f) => self.exec_for(f),
            StatementKind::ForIn(f) => self.exec_for_in(f),
            StatementKind::Continue(target) => Ok(Completion::Continue(*target)),
            StatementKind::Break(target) => Ok(Completion::Break(*target)),
            StatementKind::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval_value(e)?,
                    None => JsValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            StatementKind::With(expr, body) => {
                let value = self.eval_value(expr)?;
                let object = self.to_object(&value)?;
                let scope = self.current_scope().push(object);
                let saved = self.replace_scope(scope);
                let result = self.exec_statement(body);
                self.replace_scope(saved);
                result
            }
            StatementKind::Switch(s) => self.exec_switch(s),
            StatementKind::Labeled(target, body) => match self.exec_statement(body)? {
                Completion::Break(t) if t == *target => Ok(Completion::Normal),
                other => Ok(other),
            },
            StatementKind::Throw(expr) => {
                let value = self.eval_value(expr)?;
                self.trace(TraceEvent::Throw);
                Err(self.throw_value(value))
            }
            StatementKind::Try(t) => self.exec_try(t),
        }
    }

    // §12.2
    fn exec_variable_declarations(&mut self, decls: &[VariableDeclarator]) -> JsResult<()> {
        for decl in decls {
            if let Some(init) = &decl.init {
                let target = self.lookup(decl.name)?;
                let value = self.eval_value(init)?;
                self.put_value(&Operand::Reference(target), value)?;
            }
        }
        Ok(())
    }

    fn loop_flow(completion: Completion, target: LabelId) -> LoopFlow {
        match completion {
            Completion::Normal => LoopFlow::Next,
            Completion::Continue(t) if t == target => LoopFlow::Next,
            Completion::Break(t) if t == target => LoopFlow::Exit,
            other => LoopFlow::Propagate(other),
        }
    }

    fn exec_do_while(&mut self, l: &LoopStatement) -> JsResult<Completion> {
        loop {
            match Self::loop_flow(self.exec_statement(&l.body)?, l.target) {
                LoopFlow::Next => {}
                LoopFlow::Exit => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
            let test = self.eval_value(&l.test)?;
            if !to_boolean(&test) {
                break;
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_while(&mut self, l: &LoopStatement) -> JsResult<Completion> {
        loop {
            let test = self.eval_value(&l.test)?;
            if !to_boolean(&test) {
                break;
            }
            match Self::loop_flow(self.exec_statement(&l.body)?, l.target) {
                LoopFlow::Next => {}
                LoopFlow::Exit => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_for(&mut self, f: &ForStatement) -> JsResult<Completion> {
        match &f.init {
            Some(ForInit::Variable(decls)) => self.exec_variable_declarations(decls)?,
            Some(ForInit::Expression(expr)) => {
                self.eval_value(expr)?;
            }
            None => {}
        }
        loop {
            if let Some(test) = &f.test {
                let test = self.eval_value(test)?;
                if !to_boolean(&test) {
                    break;
                }
            }
            match Self::loop_flow(self.exec_statement(&f.body)?, f.target) {
                LoopFlow::Next => {}
                LoopFlow::Exit => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
            if let Some(update) = &f.update {
                self.eval_value(update)?;
            }
        }
        Ok(Completion::Normal)
    }

    // §12.6.4: names are snapshotted up front; a name deleted before it is
    // reached is skipped.
    fn exec_for_in(&mut self, f: &ForInStatement) -> JsResult<Completion> {
        if let ForInTarget::Variable(decl) = &f.left {
            self.exec_variable_declarations(std::slice::from_ref(decl))?;
        }
        let value = self.eval_value(&f.object)?;
        let object = self.to_object(&value)?;
        for name in self.enumerate(object) {
            if !self.has_property(object, name)? {
                continue;
            }
            let target = match &f.left {
                ForInTarget::Variable(decl) => Operand::Reference(self.lookup(decl.name)?),
                ForInTarget::Expression(expr) => self.eval_expr(expr)?,
            };
            let key = JsValue::String(self.atom_string(name));
            self.put_value(&target, key)?;
            match Self::loop_flow(self.exec_statement(&f.body)?, f.target) {
                LoopFlow::Next => {}
                LoopFlow::Exit => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
        }
        Ok(Completion::Normal)
    }

    // §12.11
    fn exec_switch(&mut self, s: &SwitchStatement) -> JsResult<Completion> {
        let discriminant = self.eval_value(&s.discriminant)?;
        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let value = self.eval_value(test)?;
                if self.strict_equals(&discriminant, &value) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = start.or_else(|| s.cases.iter().position(|c| c.test.is_none()));
        let Some(start) = start else {
            return Ok(Completion::Normal);
        };
        for case in &s.cases[start..] {
            match self.exec_statements(&case.body)? {
                Completion::Normal => {}
                Completion::Break(t) if t == s.target => return Ok(Completion::Normal),
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    // §12.14: an abrupt `finally` replaces whatever the guarded part produced.
    fn exec_try(&mut self, t: &TryStatement) -> JsResult<Completion> {
        self.enter_region(RegionKind::Script);
        let mut outcome = self.exec_statements(&t.block);
        self.leave_region(outcome.is_err());

        if let Some(handler) = &t.handler
            && let Err(exception) = outcome
        {
            self.enter_region(RegionKind::Script);
            outcome = self.exec_catch(handler, exception.value);
            self.leave_region(outcome.is_err());
        }

        if let Some(finalizer) = &t.finalizer {
            let saved_result = self.context().result.clone();
            let completion = self.exec_statements(finalizer)?;
            if completion.is_abrupt() {
                return Ok(completion);
            }
            self.context_mut().result = saved_result;
        }
        outcome
    }

    fn exec_catch(&mut self, handler: &CatchClause, value: JsValue) -> JsResult<Completion> {
        let holder = self.new_object();
        self.define_property(holder, handler.param, value, Attributes::DONT_DELETE);
        let scope = self.current_scope().push(holder);
        let saved = self.replace_scope(scope);
        let result = self.exec_statements(&handler.body);
        self.replace_scope(saved);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> JsValue {
        let mut interp = Interpreter::new(Config::default());
        interp.evaluate("exec", src).unwrap().unwrap_or(JsValue::Undefined)
    }

    #[test]
    fn statement_list_value_is_last_expression() {
        assert_eq!(run("1; 2; var x = 3;"), JsValue::Number(2.0));
        assert_eq!(run("var x;"), JsValue::Undefined);
        assert_eq!(run("5; if (false) 6;"), JsValue::Number(5.0));
    }

    #[test]
    fn labelled_break_and_continue() {
        let v = run(
            "var s = ''; outer: for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { \
             if (j == 1) continue outer; if (i == 2) break outer; s += i + '' + j; } } s",
        );
        assert_eq!(v.to_string(), "0010");
        assert_eq!(run("var n = 0; a: { n = 1; break a; n = 2; } n"), JsValue::Number(1.0));
    }

    #[test]
    fn do_while_runs_body_first() {
        assert_eq!(run("var n = 0; do { n++; } while (false); n"), JsValue::Number(1.0));
    }

    #[test]
    fn switch_falls_through_and_uses_default() {
        let v = run(
            "function f(x) { var s = ''; switch (x) { case 1: s += 'a'; case 2: s += 'b'; break; default: s += 'd'; case 3: s += 'c'; } return s; } \
             f(1) + ',' + f(2) + ',' + f(3) + ',' + f(9)",
        );
        assert_eq!(v.to_string(), "ab,b,c,dc");
        assert_eq!(run("switch ('1') { case 1: 'num'; break; default: 'none'; }").to_string(), "none");
    }

    #[test]
    fn finally_masks_pending_throw() {
        assert_eq!(
            run("function f() { try { throw 1; } finally { return 2; } } f()"),
            JsValue::Number(2.0)
        );
        assert_eq!(
            run("function g() { try { return 1; } finally { 5; } } g()"),
            JsValue::Number(1.0)
        );
        assert_eq!(
            run("var r; try { try { throw 'a'; } finally { throw 'b'; } } catch (e) { r = e; } r").to_string(),
            "b"
        );
    }

    #[test]
    fn finally_keeps_statement_value_of_try_block() {
        assert_eq!(run("try { 1; } finally { 2; }"), JsValue::Number(1.0));
        assert_eq!(run("try { throw 0; } catch (e) { 3; } finally { 4; }"), JsValue::Number(3.0));
    }

    #[test]
    fn catch_scope_is_removed_afterwards() {
        assert_eq!(
            run("var e = 'outer'; try { throw 'inner'; } catch (e) { e; } e").to_string(),
            "outer"
        );
    }

    #[test]
    fn for_in_skips_names_deleted_mid_loop() {
        let v = run(
            "var o = { a: 1, b: 2, c: 3 }; var s = ''; for (var k in o) { s += k; delete o.c; } s",
        );
        assert_eq!(v.to_string(), "ab");
    }

    #[test]
    fn for_in_visits_inherited_names_once() {
        let v = run(
            "function P() { this.own = 1; } P.prototype.inh = 2; P.prototype.own = 3; \
             var s = ''; for (var k in new P()) s += k + ';'; s",
        );
        assert_eq!(v.to_string(), "own;inh;");
    }

    #[test]
    fn for_in_over_null_is_a_type_error() {
        let v = run("var r; try { for (var k in null) {} } catch (e) { r = e.name; } r");
        assert_eq!(v.to_string(), "TypeError");
    }

    #[test]
    fn with_statement_resolves_through_object() {
        let v = run("var o = { x: 1 }; var x = 'g'; with (o) { x = 2; } o.x + ':' + x");
        assert_eq!(v.to_string(), "2:g");
    }
}
