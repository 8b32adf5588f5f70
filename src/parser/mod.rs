use crate::ast::*;
use crate::intern::{Atom, Interner};
use crate::lexer::{Keyword, LexError, Lexer, Token, is_future_reserved};
use std::cell::{Cell, OnceCell};
use std::rc::Rc;

mod declarations;
mod expressions;
mod statements;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{source_name}:{line}: SyntaxError: {message}")]
pub struct ParseError {
    pub message: String,
    pub source_name: Rc<str>,
    pub line: u32,
}

/// Lexical options selected by the interpreter's compatibility flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    pub annex_b: bool,
    pub sgml_comments: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LabelKind {
    Iteration,
    Switch,
    Other,
}

/// An entry of the label stack. Unnamed entries are the implicit targets of
/// plain `break` and `continue`.
struct LabelEntry {
    name: Option<Atom>,
    target: LabelId,
    kind: LabelKind,
}

/// Declarations collected for the function body being parsed.
#[derive(Default)]
struct DeclarationScope {
    var_names: Vec<Atom>,
    functions: Vec<Rc<FunctionLiteral>>,
}

pub struct Parser<'a, 'i> {
    source: &'a str,
    source_name: Rc<str>,
    lexer: Lexer<'a>,
    interner: &'i mut Interner,
    current: Token,
    current_line: u32,
    current_token_start: usize,
    current_token_end: usize,
    prev_token_end: usize,
    prev_line_terminator: bool,
    pushback: Option<(Token, bool, u32, usize, usize)>, // (token, had_line_terminator_before, line, start, end)
    in_function: u32,
    no_in: bool,
    labels: Vec<LabelEntry>,
    /// Target handed from a labelled statement to the statement it labels.
    pending_target: Option<LabelId>,
    next_label: LabelId,
    declarations: Vec<DeclarationScope>,
}

impl<'a, 'i> Parser<'a, 'i> {
    pub fn new(
        source: &'a str,
        source_name: &str,
        interner: &'i mut Interner,
        options: ParseOptions,
    ) -> Result<Self, ParseError> {
        let source_name: Rc<str> = Rc::from(source_name);
        let mut lexer = Lexer::new(source);
        lexer.annex_b = options.annex_b;
        lexer.sgml_comments = options.sgml_comments;
        let mut had_lt = false;
        let current = loop {
            let tok = lexer.next_token().map_err(|e| lex_error(&source_name, e))?;
            if tok == Token::LineTerminator {
                had_lt = true;
                continue;
            }
            break tok;
        };
        Ok(Self {
            source,
            current_line: lexer.token_line(),
            current_token_start: lexer.token_start(),
            current_token_end: lexer.offset(),
            source_name,
            lexer,
            interner,
            current,
            prev_token_end: 0,
            prev_line_terminator: had_lt,
            pushback: None,
            in_function: 0,
            no_in: false,
            labels: Vec::new(),
            pending_target: None,
            next_label: 1,
            declarations: Vec::new(),
        })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_token_end = self.current_token_end;
        let old = std::mem::replace(&mut self.current, Token::Eof);
        if let Some((tok, lt, line, start, end)) = self.pushback.take() {
            self.current = tok;
            self.prev_line_terminator = lt;
            self.current_line = line;
            self.current_token_start = start;
            self.current_token_end = end;
        } else {
            self.prev_line_terminator = false;
            loop {
                let tok = self
                    .lexer
                    .next_token()
                    .map_err(|e| lex_error(&self.source_name, e))?;
                if tok == Token::LineTerminator {
                    self.prev_line_terminator = true;
                    continue;
                }
                self.current_line = self.lexer.token_line();
                self.current_token_start = self.lexer.token_start();
                self.current_token_end = self.lexer.offset();
                self.current = tok;
                break;
            }
        }
        Ok(old)
    }

    /// Undoes one `advance`: `token` becomes current again and the token that
    /// was current is queued.
    fn push_back(&mut self, token: Token, had_lt: bool, line: u32, start: usize, end: usize) {
        let old_current = std::mem::replace(&mut self.current, token);
        let old_lt = std::mem::replace(&mut self.prev_line_terminator, had_lt);
        let old_line = std::mem::replace(&mut self.current_line, line);
        let old_start = std::mem::replace(&mut self.current_token_start, start);
        let old_end = std::mem::replace(&mut self.current_token_end, end);
        self.pushback = Some((old_current, old_lt, old_line, old_start, old_end));
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!("Expected {expected:?}, got {:?}", self.current)))
        }
    }

    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        // ASI
        if self.prev_line_terminator
            || self.current == Token::RightBrace
            || self.current == Token::Eof
        {
            return Ok(());
        }
        Err(self.error(format!("Expected ';', got {:?}", self.current)))
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError {
            message: msg.into(),
            source_name: self.source_name.clone(),
            line: self.current_line,
        }
    }

    fn intern(&mut self, name: &str) -> Atom {
        self.interner.intern_str(name)
    }

    fn new_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn is_reserved_identifier(name: &str) -> bool {
        is_future_reserved(name)
    }

    fn current_identifier_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) if !Self::is_reserved_identifier(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn expect_identifier(&mut self) -> Result<Atom, ParseError> {
        match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok(self.intern(&name))
            }
            None => Err(self.error(format!("Expected identifier, got {:?}", self.current))),
        }
    }

    fn parse_optional_label(&mut self) -> Result<Option<Atom>, ParseError> {
        if !self.prev_line_terminator
            && let Some(name) = self.current_identifier_name()
        {
            self.advance()?;
            return Ok(Some(self.intern(&name)));
        }
        Ok(None)
    }

    fn declare_var(&mut self, name: Atom) {
        if let Some(scope) = self.declarations.last_mut()
            && !scope.var_names.contains(&name)
        {
            scope.var_names.push(name);
        }
    }

    fn declare_function(&mut self, func: Rc<FunctionLiteral>) {
        if let Some(scope) = self.declarations.last_mut() {
            scope.functions.push(func);
        }
    }

    fn make_body(
        &self,
        statements: Vec<Statement>,
        scope: DeclarationScope,
        is_program: bool,
    ) -> FunctionBody {
        FunctionBody {
            statements,
            var_names: scope.var_names,
            functions: scope.functions,
            is_program,
            source_name: self.source_name.clone(),
            code: OnceCell::new(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.declarations.push(DeclarationScope::default());
        let mut statements = Vec::new();
        while self.current != Token::Eof {
            statements.push(self.parse_source_element()?);
        }
        let scope = self.declarations.pop().unwrap_or_default();
        Ok(Program {
            body: Rc::new(self.make_body(statements, scope, true)),
        })
    }

    /// Parses a stand-alone formal parameter list (the `Function` constructor's
    /// leading arguments joined by commas).
    pub fn parse_parameter_text(&mut self) -> Result<Vec<Atom>, ParseError> {
        let mut params = Vec::new();
        while self.current != Token::Eof {
            params.push(self.expect_identifier()?);
            if self.current == Token::Comma {
                self.advance()?;
            } else if self.current != Token::Eof {
                return Err(self.error("Expected ',' in parameter list"));
            }
        }
        Ok(params)
    }

    /// Parses a stand-alone function body (the `Function` constructor's last
    /// argument) into an anonymous function literal.
    pub fn parse_function_text(&mut self, params: Vec<Atom>) -> Result<Rc<FunctionLiteral>, ParseError> {
        let line = self.current_line;
        let saved_labels = std::mem::take(&mut self.labels);
        self.in_function += 1;
        self.declarations.push(DeclarationScope::default());
        let mut statements = Vec::new();
        while self.current != Token::Eof {
            statements.push(self.parse_source_element()?);
        }
        let scope = self.declarations.pop().unwrap_or_default();
        self.in_function -= 1;
        self.labels = saved_labels;
        Ok(Rc::new(FunctionLiteral {
            name: None,
            params,
            body: self.make_body(statements, scope, false),
            body_text: Rc::from(self.source),
            line,
            cache: Cell::new(None),
            common: Cell::new(None),
        }))
    }
}

fn lex_error(source_name: &Rc<str>, e: LexError) -> ParseError {
    ParseError {
        message: e.message,
        source_name: source_name.clone(),
        line: e.location.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::LiteralTable;

    fn parse_with(interner: &mut Interner, src: &str) -> Result<Program, ParseError> {
        Parser::new(src, "test", interner, ParseOptions::default())?.parse_program()
    }

    fn parse(src: &str) -> Program {
        let mut interner = Interner::new(LiteralTable::standard());
        parse_with(&mut interner, src).unwrap()
    }

    fn parse_err(src: &str) -> ParseError {
        let mut interner = Interner::new(LiteralTable::standard());
        parse_with(&mut interner, src).unwrap_err()
    }

    #[test]
    fn parse_empty() {
        let prog = parse("");
        assert!(prog.body.statements.is_empty());
        assert!(prog.body.is_program);
    }

    #[test]
    fn parse_var_declaration_is_hoisted() {
        let mut interner = Interner::new(LiteralTable::standard());
        let prog = parse_with(&mut interner, "x = 1; if (x) { var y = 2, x; }").unwrap();
        let names: Vec<String> = prog
            .body
            .var_names
            .iter()
            .map(|a| interner.resolve(*a).to_rust_string())
            .collect();
        assert_eq!(names, vec!["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn parse_function_declaration() {
        let prog = parse("function foo(a, b) { return a + b; }");
        assert!(matches!(
            &prog.body.statements[0].kind,
            StatementKind::FunctionDeclaration(_)
        ));
        assert_eq!(prog.body.functions.len(), 1);
        assert_eq!(prog.body.functions[0].params.len(), 2);
        assert_eq!(&*prog.body.functions[0].body_text, " return a + b; ");
    }

    #[test]
    fn nested_function_declarations_stay_local() {
        let prog = parse("function outer() { var inner; function f() {} }");
        assert!(prog.body.var_names.is_empty());
        let outer = &prog.body.functions[0];
        assert_eq!(outer.body.var_names.len(), 1);
        assert_eq!(outer.body.functions.len(), 1);
    }

    #[test]
    fn statements_record_lines() {
        let prog = parse("a;\n\nb;");
        assert_eq!(prog.body.statements[0].line, 1);
        assert_eq!(prog.body.statements[1].line, 3);
    }

    #[test]
    fn labels_share_target_with_loops() {
        let prog = parse("outer: while (1) { for (;;) { continue outer; } }");
        let StatementKind::Labeled(label, body) = &prog.body.statements[0].kind else {
            panic!("expected labelled statement");
        };
        let StatementKind::While(w) = &body.kind else {
            panic!("expected while");
        };
        assert_eq!(*label, w.target);
        let StatementKind::Block(stmts) = &w.body.kind else {
            panic!("expected block");
        };
        let StatementKind::For(f) = &stmts[0].kind else {
            panic!("expected for");
        };
        assert_ne!(f.target, w.target);
        let StatementKind::Block(inner) = &f.body.kind else {
            panic!("expected block");
        };
        assert!(matches!(inner[0].kind, StatementKind::Continue(t) if t == w.target));
    }

    #[test]
    fn unlabeled_break_targets_innermost_breakable() {
        let prog = parse("switch (x) { case 1: while (y) { break; } break; }");
        let StatementKind::Switch(s) = &prog.body.statements[0].kind else {
            panic!("expected switch");
        };
        let StatementKind::While(w) = &s.cases[0].body[0].kind else {
            panic!("expected while");
        };
        let StatementKind::Block(stmts) = &w.body.kind else {
            panic!("expected block");
        };
        assert!(matches!(stmts[0].kind, StatementKind::Break(t) if t == w.target));
        assert!(matches!(s.cases[0].body[1].kind, StatementKind::Break(t) if t == s.target));
    }

    #[test]
    fn misplaced_jumps_are_syntax_errors() {
        assert!(parse_err("break;").message.contains("break"));
        assert!(parse_err("while (1) { continue nope; }").message.contains("nope"));
        assert!(parse_err("a: { continue a; }").message.contains("continue"));
        assert!(parse_err("return 1;").message.contains("return"));
        assert!(parse_err("function f() { x: while (1) { function g() { break x; } } }")
            .message
            .contains("x"));
    }

    #[test]
    fn syntax_error_reports_location() {
        let err = parse_err("a = 1;\nb = ;");
        assert_eq!(err.line, 2);
        assert!(err.to_string().starts_with("test:2: SyntaxError:"));
    }

    #[test]
    fn asi_and_restricted_productions() {
        let prog = parse("a = 1\nb = 2\nreturnValue\n++c");
        assert_eq!(prog.body.statements.len(), 4);
        let prog = parse("function f() { return\n1 }");
        let StatementKind::Return(value) = &prog.body.functions[0].body.statements[0].kind else {
            panic!("expected return");
        };
        assert!(value.is_none());
    }

    #[test]
    fn for_in_variants() {
        let prog = parse("for (var k in o) {} for (k in o) {} for (a.b in o);");
        assert!(prog
            .body
            .statements
            .iter()
            .all(|s| matches!(s.kind, StatementKind::ForIn(_))));
        let prog = parse("for (var i = 0 in o) {}");
        assert!(matches!(prog.body.statements[0].kind, StatementKind::ForIn(_)));
        let prog = parse("for (var i = 0, j = ('a' in o); i < 1; i++) {}");
        assert!(matches!(prog.body.statements[0].kind, StatementKind::For(_)));
        assert!(parse_err("for (var i, j in o) {}").message.contains("for-in"));
    }

    #[test]
    fn try_statement_shapes() {
        let prog = parse("try { x; } catch (e) { y; } finally { z; }");
        let StatementKind::Try(t) = &prog.body.statements[0].kind else {
            panic!("expected try");
        };
        assert!(t.handler.is_some() && t.finalizer.is_some());
        assert!(parse_err("try { x; }").message.contains("catch"));
    }

    #[test]
    fn invalid_assignment_targets() {
        assert!(parse_err("1 = 2;").message.contains("assignment"));
        assert!(parse_err("a + b++ = c;").message.contains("assignment"));
        parse("f() = 1;");
    }

    #[test]
    fn reserved_words_are_not_identifiers() {
        assert!(parse_err("var class = 1;").message.contains("identifier"));
        parse("o.class = 1;");
    }

    #[test]
    fn function_constructor_text() {
        let mut interner = Interner::new(LiteralTable::standard());
        let params = Parser::new("a, b", "Function", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_parameter_text()
            .unwrap();
        assert_eq!(params.len(), 2);
        let func = Parser::new("return a + b", "Function", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_function_text(params)
            .unwrap();
        assert_eq!(func.body.statements.len(), 1);
        assert!(Parser::new("a b", "Function", &mut interner, ParseOptions::default())
            .unwrap()
            .parse_parameter_text()
            .is_err());
    }
}
