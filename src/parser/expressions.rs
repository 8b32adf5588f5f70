use super::statements::is_reference_expression;
use super::*;
use crate::types::{JsString, number_ops};

impl<'a, 'i> Parser<'a, 'i> {
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_assignment_expression()?;
        if self.current == Token::Comma {
            let mut exprs = vec![expr];
            while self.current == Token::Comma {
                self.advance()?;
                exprs.push(self.parse_assignment_expression()?);
            }
            Ok(Expression::Sequence(exprs))
        } else {
            Ok(expr)
        }
    }

    /// Calls may appear on the left of an assignment; the error surfaces at
    /// run time when no reference is produced.
    fn validate_assignment_target(&self, expr: &Expression) -> Result<(), ParseError> {
        if is_reference_expression(expr) {
            Ok(())
        } else {
            Err(self.error("Invalid left-hand side in assignment"))
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional_expression()?;
        let op = match self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::AddAssign,
            Token::MinusAssign => AssignOp::SubAssign,
            Token::StarAssign => AssignOp::MulAssign,
            Token::SlashAssign => AssignOp::DivAssign,
            Token::PercentAssign => AssignOp::ModAssign,
            Token::LeftShiftAssign => AssignOp::LShiftAssign,
            Token::RightShiftAssign => AssignOp::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
            Token::AmpersandAssign => AssignOp::BitAndAssign,
            Token::PipeAssign => AssignOp::BitOrAssign,
            Token::CaretAssign => AssignOp::BitXorAssign,
            _ => return Ok(left),
        };
        self.validate_assignment_target(&left)?;
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_logical_or()?;
        if self.current != Token::Question {
            return Ok(test);
        }
        self.advance()?;
        let prev_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression();
        self.no_in = prev_no_in;
        let consequent = consequent?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.current == Token::LogicalOr {
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_bitwise_xor()?;
            left = Expression::Binary(BinaryOp::BitOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.current == Token::Caret {
            self.advance()?;
            let right = self.parse_bitwise_and()?;
            left = Expression::Binary(BinaryOp::BitXor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.current == Token::Ampersand {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expression::Binary(BinaryOp::BitAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match &self.current {
                Token::LessThan => BinaryOp::Lt,
                Token::GreaterThan => BinaryOp::Gt,
                Token::LessThanEqual => BinaryOp::LtEq,
                Token::GreaterThanEqual => BinaryOp::GtEq,
                Token::Keyword(Keyword::Instanceof) => BinaryOp::Instanceof,
                Token::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_shift()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current {
                Token::LeftShift => BinaryOp::LShift,
                Token::RightShift => BinaryOp::RShift,
                Token::UnsignedRightShift => BinaryOp::URShift,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match &self.current {
            Token::Increment | Token::Decrement => {
                let op = if self.current == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let argument = self.parse_unary()?;
                self.validate_assignment_target(&argument)?;
                return Ok(Expression::Update(op, true, Box::new(argument)));
            }
            Token::Minus => UnaryOp::Minus,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::Keyword(Keyword::Typeof) => UnaryOp::Typeof,
            Token::Keyword(Keyword::Void) => UnaryOp::Void,
            Token::Keyword(Keyword::Delete) => UnaryOp::Delete,
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let argument = self.parse_unary()?;
        Ok(Expression::Unary(op, Box::new(argument)))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        if self.prev_line_terminator {
            return Ok(expr);
        }
        let op = match self.current {
            Token::Increment => UpdateOp::Increment,
            Token::Decrement => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.validate_assignment_target(&expr)?;
        self.advance()?;
        Ok(Expression::Update(op, false, Box::new(expr)))
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.current {
                Token::Dot | Token::LeftBracket => {
                    expr = self.parse_member_suffix(expr)?;
                }
                Token::LeftParen => {
                    let args = self.parse_arguments()?;
                    expr = Expression::Call(Box::new(expr), args);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member_suffix(&mut self, object: Expression) -> Result<Expression, ParseError> {
        if self.current == Token::Dot {
            self.advance()?;
            let Some(name) = identifier_name(&self.current) else {
                return Err(self.error(format!("Expected property name, got {:?}", self.current)));
            };
            self.advance()?;
            let name = self.intern(&name);
            Ok(Expression::Member(Box::new(object), MemberProperty::Dot(name)))
        } else {
            self.advance()?; // [
            let prev_no_in = std::mem::replace(&mut self.no_in, false);
            let property = self.parse_expression();
            self.no_in = prev_no_in;
            let property = property?;
            self.eat(&Token::RightBracket)?;
            Ok(Expression::Member(
                Box::new(object),
                MemberProperty::Computed(Box::new(property)),
            ))
        }
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // new
        let mut callee = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        while matches!(self.current, Token::Dot | Token::LeftBracket) {
            callee = self.parse_member_suffix(callee)?;
        }
        let args = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let prev_no_in = std::mem::replace(&mut self.no_in, false);
        let args = self.parse_argument_list();
        self.no_in = prev_no_in;
        let args = args?;
        self.eat(&Token::RightParen)?;
        Ok(args)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        while self.current != Token::RightParen {
            args.push(self.parse_assignment_expression()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
                if self.current == Token::RightParen {
                    return Err(self.error("Unexpected ')' after ','"));
                }
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expression::This)
            }
            Token::Keyword(Keyword::Function) => self.parse_function_expression(),
            Token::Identifier(_) => {
                let name = self.expect_identifier()?;
                Ok(Expression::Identifier(name))
            }
            Token::NumericLiteral(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            Token::StringLiteral(units) => {
                let s = JsString::from_units(units.clone());
                self.advance()?;
                Ok(Expression::Literal(Literal::String(s)))
            }
            Token::BooleanLiteral(b) => {
                let b = *b;
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(b)))
            }
            Token::NullLiteral => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Null))
            }
            Token::LeftParen => {
                self.advance()?;
                let prev_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = prev_no_in;
                let expr = expr?;
                self.eat(&Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => self.parse_array_literal(),
            Token::LeftBrace => self.parse_object_literal(),
            Token::Slash | Token::SlashAssign => {
                Err(self.error("Regular expression literals are not supported"))
            }
            Token::Eof => Err(self.error("Unexpected end of input")),
            _ => Err(self.error(format!("Unexpected token {:?}", self.current))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // [
        let prev_no_in = std::mem::replace(&mut self.no_in, false);
        let elements = self.parse_array_elements();
        self.no_in = prev_no_in;
        let elements = elements?;
        self.advance()?; // ]
        Ok(Expression::Array(elements))
    }

    /// Elisions become `None`; a single trailing comma adds nothing.
    fn parse_array_elements(&mut self) -> Result<Vec<Option<Expression>>, ParseError> {
        let mut elements = Vec::new();
        loop {
            match self.current {
                Token::RightBracket => break,
                Token::Comma => {
                    self.advance()?;
                    elements.push(None);
                }
                _ => {
                    elements.push(Some(self.parse_assignment_expression()?));
                    if self.current == Token::Comma {
                        self.advance()?;
                    } else if self.current != Token::RightBracket {
                        return Err(self.error("Expected ',' or ']' in array literal"));
                    }
                }
            }
        }
        Ok(elements)
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // {
        let prev_no_in = std::mem::replace(&mut self.no_in, false);
        let properties = self.parse_property_assignments();
        self.no_in = prev_no_in;
        let properties = properties?;
        self.advance()?; // }
        Ok(Expression::Object(properties))
    }

    fn parse_property_assignments(&mut self) -> Result<Vec<(Atom, Expression)>, ParseError> {
        let mut properties = Vec::new();
        while self.current != Token::RightBrace {
            let key = match &self.current {
                Token::StringLiteral(units) => self.interner.intern_units(units),
                Token::NumericLiteral(n) => {
                    let text = number_ops::to_string(*n);
                    self.intern(&text)
                }
                tok => match identifier_name(tok) {
                    Some(name) => self.intern(&name),
                    None => {
                        return Err(self.error(format!(
                            "Unexpected token {:?} in object literal",
                            self.current
                        )));
                    }
                },
            };
            self.advance()?;
            self.eat(&Token::Colon)?;
            let value = self.parse_assignment_expression()?;
            properties.push((key, value));
            if self.current != Token::RightBrace {
                self.eat(&Token::Comma)?;
            }
        }
        Ok(properties)
    }
}

/// The text of a token usable as a property name after `.` or in an object
/// literal, reserved words included.
fn identifier_name(token: &Token) -> Option<String> {
    match token {
        Token::Identifier(name) => Some(name.clone()),
        Token::Keyword(k) => Some(k.to_string()),
        Token::BooleanLiteral(b) => Some(b.to_string()),
        Token::NullLiteral => Some("null".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::LiteralTable;

    fn parse_expr(src: &str) -> Expression {
        let mut interner = Interner::new(LiteralTable::standard());
        let mut parser = Parser::new(src, "test", &mut interner, ParseOptions::default()).unwrap();
        parser.parse_expression().unwrap()
    }

    #[test]
    fn precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let Expression::Binary(BinaryOp::Add, _, right) = expr else {
            panic!("expected addition at the root");
        };
        assert!(matches!(*right, Expression::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = parse_expr("a = b += c");
        let Expression::Assign(AssignOp::Assign, _, right) = expr else {
            panic!("expected assignment");
        };
        assert!(matches!(*right, Expression::Assign(AssignOp::AddAssign, _, _)));
    }

    #[test]
    fn new_with_and_without_arguments() {
        assert!(matches!(parse_expr("new F"), Expression::New(_, ref a) if a.is_empty()));
        let expr = parse_expr("new a.b.C(1, 2).d");
        let Expression::Member(object, MemberProperty::Dot(_)) = expr else {
            panic!("expected member access");
        };
        assert!(matches!(*object, Expression::New(_, ref a) if a.len() == 2));
        let expr = parse_expr("new new F()()");
        let Expression::New(inner, _) = expr else {
            panic!("expected new");
        };
        assert!(matches!(*inner, Expression::New(_, _)));
    }

    #[test]
    fn array_elisions() {
        let Expression::Array(elements) = parse_expr("[1,,2,]") else {
            panic!("expected array");
        };
        assert_eq!(elements.len(), 3);
        assert!(elements[1].is_none());
        let Expression::Array(elements) = parse_expr("[,]") else {
            panic!("expected array");
        };
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn object_literal_keys() {
        let Expression::Object(props) = parse_expr("{a: 1, 'b c': 2, 3: 4, if: 5}") else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn in_operator_inside_parens_of_for_init() {
        let expr = parse_expr("'a' in o");
        assert!(matches!(expr, Expression::Binary(BinaryOp::In, _, _)));
    }

    #[test]
    fn postfix_respects_line_terminator() {
        let mut interner = Interner::new(LiteralTable::standard());
        let prog = Parser::new("a\n++b", "test", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_program()
            .unwrap();
        assert_eq!(prog.body.statements.len(), 2);
        let StatementKind::Expression(Expression::Update(_, prefix, _)) =
            &prog.body.statements[1].kind
        else {
            panic!("expected prefix update");
        };
        assert!(*prefix);
    }

    #[test]
    fn regex_literals_are_rejected() {
        let mut interner = Interner::new(LiteralTable::standard());
        let err = Parser::new("x = /a/;", "test", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("Regular expression"));
    }
}
