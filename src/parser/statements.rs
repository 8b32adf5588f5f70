use super::*;

impl<'a, 'i> Parser<'a, 'i> {
    pub(super) fn parse_source_element(&mut self) -> Result<Statement, ParseError> {
        if self.current == Token::Keyword(Keyword::Function) {
            return self.parse_function_declaration();
        }
        self.parse_statement()
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.current_line;
        // Only loops, switch and nested labels consume a pending target.
        let pending = self.pending_target.take();
        let kind = match &self.current {
            Token::LeftBrace => StatementKind::Block(self.parse_block()?),
            Token::Semicolon => {
                self.advance()?;
                StatementKind::Empty
            }
            Token::Keyword(Keyword::Var) => self.parse_variable_statement()?,
            Token::Keyword(Keyword::If) => self.parse_if_statement()?,
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(pending)?,
            Token::Keyword(Keyword::While) => self.parse_while_statement(pending)?,
            Token::Keyword(Keyword::For) => self.parse_for_statement(pending)?,
            Token::Keyword(Keyword::Continue) => self.parse_continue_statement()?,
            Token::Keyword(Keyword::Break) => self.parse_break_statement()?,
            Token::Keyword(Keyword::Return) => self.parse_return_statement()?,
            Token::Keyword(Keyword::With) => self.parse_with_statement()?,
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(pending)?,
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement()?,
            Token::Keyword(Keyword::Try) => self.parse_try_statement()?,
            Token::Keyword(Keyword::Function) => {
                return self.parse_function_declaration();
            }
            Token::Identifier(_) => {
                if let Some(labelled) = self.try_parse_labelled_statement(pending)? {
                    labelled
                } else {
                    self.parse_expression_statement()?
                }
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Statement { line, kind })
    }

    pub(super) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut body = Vec::new();
        while self.current != Token::RightBrace {
            if self.current == Token::Eof {
                return Err(self.error("Unexpected end of input in block"));
            }
            body.push(self.parse_source_element()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_variable_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // var
        let declarations = self.parse_variable_declaration_list()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Variable(declarations))
    }

    pub(super) fn parse_variable_declaration_list(
        &mut self,
    ) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut declarations = vec![self.parse_variable_declarator()?];
        while self.current == Token::Comma {
            self.advance()?;
            declarations.push(self.parse_variable_declarator()?);
        }
        Ok(declarations)
    }

    fn parse_variable_declarator(&mut self) -> Result<VariableDeclarator, ParseError> {
        let name = self.expect_identifier()?;
        self.declare_var(name);
        let init = if self.current == Token::Assign {
            self.advance()?;
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };
        Ok(VariableDeclarator { name, init })
    }

    fn parse_expression_statement(&mut self) -> Result<StatementKind, ParseError> {
        let expr = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Expression(expr))
    }

    fn parse_if_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // if
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StatementKind::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    /// Resolves the label-id of a breakable statement. A target handed down
    /// by enclosing labels is reused so that `continue label` and the loop's
    /// own `continue` share one id.
    fn enter_breakable(&mut self, pending: Option<LabelId>, kind: LabelKind) -> LabelId {
        let target = match pending {
            Some(target) => {
                if kind == LabelKind::Iteration {
                    for entry in self.labels.iter_mut().rev() {
                        if entry.target != target {
                            break;
                        }
                        entry.kind = LabelKind::Iteration;
                    }
                }
                target
            }
            None => self.new_label(),
        };
        self.labels.push(LabelEntry {
            name: None,
            target,
            kind,
        });
        target
    }

    fn leave_breakable(&mut self) {
        self.labels.pop();
    }

    fn parse_do_while_statement(
        &mut self,
        pending: Option<LabelId>,
    ) -> Result<StatementKind, ParseError> {
        self.advance()?; // do
        let target = self.enter_breakable(pending, LabelKind::Iteration);
        let body = self.parse_statement();
        self.leave_breakable();
        let body = Box::new(body?);
        if self.current != Token::Keyword(Keyword::While) {
            return Err(self.error("Expected 'while' after do body"));
        }
        self.advance()?;
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        // A semicolon is always inserted after do-while.
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(StatementKind::DoWhile(LoopStatement { target, test, body }))
    }

    fn parse_while_statement(
        &mut self,
        pending: Option<LabelId>,
    ) -> Result<StatementKind, ParseError> {
        self.advance()?; // while
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let target = self.enter_breakable(pending, LabelKind::Iteration);
        let body = self.parse_statement();
        self.leave_breakable();
        Ok(StatementKind::While(LoopStatement {
            target,
            test,
            body: Box::new(body?),
        }))
    }

    fn parse_for_statement(&mut self, pending: Option<LabelId>) -> Result<StatementKind, ParseError> {
        self.advance()?; // for
        self.eat(&Token::LeftParen)?;

        let init = match self.current {
            Token::Semicolon => None,
            Token::Keyword(Keyword::Var) => {
                self.advance()?;
                let prev_no_in = std::mem::replace(&mut self.no_in, true);
                let declarations = self.parse_variable_declaration_list();
                self.no_in = prev_no_in;
                let mut declarations = declarations?;
                if self.current == Token::Keyword(Keyword::In) {
                    if declarations.len() != 1 {
                        return Err(self.error("Only one variable may be declared in for-in"));
                    }
                    let declarator = declarations.remove(0);
                    return self.parse_for_in_rest(pending, ForInTarget::Variable(declarator));
                }
                Some(ForInit::Variable(declarations))
            }
            _ => {
                let prev_no_in = std::mem::replace(&mut self.no_in, true);
                let expr = self.parse_expression();
                self.no_in = prev_no_in;
                let expr = expr?;
                if self.current == Token::Keyword(Keyword::In) {
                    if !is_reference_expression(&expr) {
                        return Err(self.error("Invalid left-hand side in for-in"));
                    }
                    return self.parse_for_in_rest(pending, ForInTarget::Expression(expr));
                }
                Some(ForInit::Expression(expr))
            }
        };

        self.eat(&Token::Semicolon)?;
        let test = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::Semicolon)?;
        let update = if self.current == Token::RightParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::RightParen)?;

        let target = self.enter_breakable(pending, LabelKind::Iteration);
        let body = self.parse_statement();
        self.leave_breakable();
        Ok(StatementKind::For(ForStatement {
            target,
            init,
            test,
            update,
            body: Box::new(body?),
        }))
    }

    fn parse_for_in_rest(
        &mut self,
        pending: Option<LabelId>,
        left: ForInTarget,
    ) -> Result<StatementKind, ParseError> {
        self.advance()?; // in
        let object = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let target = self.enter_breakable(pending, LabelKind::Iteration);
        let body = self.parse_statement();
        self.leave_breakable();
        Ok(StatementKind::ForIn(ForInStatement {
            target,
            left,
            object,
            body: Box::new(body?),
        }))
    }

    fn parse_continue_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // continue
        let label = self.parse_optional_label()?;
        let target = match label {
            Some(name) => {
                let entry = self
                    .labels
                    .iter()
                    .rev()
                    .find(|e| e.name == Some(name))
                    .ok_or_else(|| self.undefined_label_error(name))?;
                if entry.kind != LabelKind::Iteration {
                    return Err(self.error("continue: label does not denote an iteration statement"));
                }
                entry.target
            }
            None => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name.is_none() && e.kind == LabelKind::Iteration)
                .map(|e| e.target)
                .ok_or_else(|| self.error("continue outside of a loop"))?,
        };
        self.eat_semicolon()?;
        Ok(StatementKind::Continue(target))
    }

    fn parse_break_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // break
        let label = self.parse_optional_label()?;
        let target = match label {
            Some(name) => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name == Some(name))
                .map(|e| e.target)
                .ok_or_else(|| self.undefined_label_error(name))?,
            None => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name.is_none())
                .map(|e| e.target)
                .ok_or_else(|| self.error("break outside of a loop or switch"))?,
        };
        self.eat_semicolon()?;
        Ok(StatementKind::Break(target))
    }

    fn undefined_label_error(&self, name: Atom) -> ParseError {
        let text = self.interner.resolve(name).to_rust_string();
        self.error(format!("Undefined label '{text}'"))
    }

    fn parse_return_statement(&mut self) -> Result<StatementKind, ParseError> {
        if self.in_function == 0 {
            return Err(self.error("return outside of a function"));
        }
        self.advance()?; // return
        let argument = if self.current == Token::Semicolon
            || self.current == Token::RightBrace
            || self.current == Token::Eof
            || self.prev_line_terminator
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semicolon()?;
        Ok(StatementKind::Return(argument))
    }

    fn parse_with_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // with
        self.eat(&Token::LeftParen)?;
        let object = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let body = self.parse_statement()?;
        Ok(StatementKind::With(object, Box::new(body)))
    }

    fn parse_switch_statement(
        &mut self,
        pending: Option<LabelId>,
    ) -> Result<StatementKind, ParseError> {
        self.advance()?; // switch
        self.eat(&Token::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        self.eat(&Token::LeftBrace)?;

        let target = self.enter_breakable(pending, LabelKind::Switch);
        let cases = self.parse_case_clauses();
        self.leave_breakable();
        let cases = cases?;
        self.eat(&Token::RightBrace)?;
        Ok(StatementKind::Switch(SwitchStatement {
            target,
            discriminant,
            cases,
        }))
    }

    fn parse_case_clauses(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while self.current != Token::RightBrace {
            let test = match self.current {
                Token::Keyword(Keyword::Case) => {
                    self.advance()?;
                    Some(self.parse_expression()?)
                }
                Token::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(self.error("More than one default clause in switch"));
                    }
                    seen_default = true;
                    self.advance()?;
                    None
                }
                _ => return Err(self.error(format!("Expected case or default, got {:?}", self.current))),
            };
            self.eat(&Token::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case)
                    | Token::Keyword(Keyword::Default)
                    | Token::RightBrace
                    | Token::Eof
            ) {
                body.push(self.parse_source_element()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(cases)
    }

    fn parse_throw_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // throw
        if self.prev_line_terminator {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // try
        let block = self.parse_block()?;

        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            self.advance()?;
            self.eat(&Token::LeftParen)?;
            let param = self.expect_identifier()?;
            self.eat(&Token::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.current == Token::Keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(StatementKind::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    /// Parses `Identifier : Statement`, or restores the identifier and
    /// returns `None` when no colon follows.
    fn try_parse_labelled_statement(
        &mut self,
        pending: Option<LabelId>,
    ) -> Result<Option<StatementKind>, ParseError> {
        let Some(name) = self.current_identifier_name() else {
            return Ok(None);
        };
        let had_lt = self.prev_line_terminator;
        let line = self.current_line;
        let (start, end) = (self.current_token_start, self.current_token_end);
        let token = self.advance()?;
        if self.current != Token::Colon {
            self.push_back(token, had_lt, line, start, end);
            return Ok(None);
        }
        self.advance()?; // :

        let name = self.intern(&name);
        if self.labels.iter().any(|e| e.name == Some(name)) {
            let text = self.interner.resolve(name).to_rust_string();
            return Err(self.error(format!("Label '{text}' has already been declared")));
        }
        let target = pending.unwrap_or_else(|| self.new_label());
        self.labels.push(LabelEntry {
            name: Some(name),
            target,
            kind: LabelKind::Other,
        });
        self.pending_target = Some(target);
        let body = self.parse_statement();
        self.pending_target = None;
        self.labels.pop();
        Ok(Some(StatementKind::Labeled(target, Box::new(body?))))
    }
}

/// Expressions that may produce a reference at run time.
pub(super) fn is_reference_expression(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Identifier(_) | Expression::Member(..) | Expression::Call(..)
    )
}
