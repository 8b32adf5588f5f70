use super::*;

impl<'a, 'i> Parser<'a, 'i> {
    pub(super) fn parse_function_declaration(&mut self) -> Result<Statement, ParseError> {
        let line = self.current_line;
        self.advance()?; // function
        let name = self.expect_identifier()?;
        let func = Rc::new(self.parse_function_rest(Some(name), line)?);
        self.declare_function(func.clone());
        Ok(Statement {
            line,
            kind: StatementKind::FunctionDeclaration(func),
        })
    }

    pub(super) fn parse_function_expression(&mut self) -> Result<Expression, ParseError> {
        let line = self.current_line;
        self.advance()?; // function
        let name = if self.current == Token::LeftParen {
            None
        } else {
            Some(self.expect_identifier()?)
        };
        let func = self.parse_function_rest(name, line)?;
        Ok(Expression::Function(Rc::new(func)))
    }

    fn parse_formal_parameters(&mut self) -> Result<Vec<Atom>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            params.push(self.expect_identifier()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
            }
        }
        self.advance()?; // )
        Ok(params)
    }

    /// Parses the parameter list and body of a function. Labels and the
    /// `in` restriction of the enclosing code do not reach into the body.
    fn parse_function_rest(&mut self, name: Option<Atom>, line: u32) -> Result<FunctionLiteral, ParseError> {
        let params = self.parse_formal_parameters()?;
        self.eat(&Token::LeftBrace)?;
        let body_start = self.prev_token_end;

        let saved_labels = std::mem::take(&mut self.labels);
        let saved_pending = self.pending_target.take();
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        self.in_function += 1;
        self.declarations.push(DeclarationScope::default());

        let statements = self.parse_function_body_statements();

        let scope = self.declarations.pop().unwrap_or_default();
        self.in_function -= 1;
        self.no_in = saved_no_in;
        self.pending_target = saved_pending;
        self.labels = saved_labels;
        let statements = statements?;

        let body_end = self.current_token_start;
        self.eat(&Token::RightBrace)?;
        let body_text: Rc<str> = Rc::from(&self.source[body_start..body_end]);
        Ok(FunctionLiteral {
            name,
            params,
            body: self.make_body(statements, scope, false),
            body_text,
            line,
            cache: Cell::new(None),
            common: Cell::new(None),
        })
    }

    fn parse_function_body_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while self.current != Token::RightBrace {
            if self.current == Token::Eof {
                return Err(self.error("Unexpected end of input in function body"));
            }
            statements.push(self.parse_source_element()?);
        }
        Ok(statements)
    }
}
