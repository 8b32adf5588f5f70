use std::fmt;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Literals
    NumericLiteral(f64),
    StringLiteral(Vec<u16>),
    BooleanLiteral(bool),
    NullLiteral,

    // Punctuators
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Semicolon,                // ;
    Comma,                    // ,
    LessThan,                 // <
    GreaterThan,              // >
    LessThanEqual,            // <=
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    StrictEqual,              // ===
    StrictNotEqual,           // !==
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Percent,                  // %
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    Question,                 // ?
    Colon,                    // :
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    PercentAssign,            // %=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=
    Slash,                    // /
    SlashAssign,              // /=

    // Special
    LineTerminator,
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Continue,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    Instanceof,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        match s {
            "break" => Some(Keyword::Break),
            "case" => Some(Keyword::Case),
            "catch" => Some(Keyword::Catch),
            "continue" => Some(Keyword::Continue),
            "default" => Some(Keyword::Default),
            "delete" => Some(Keyword::Delete),
            "do" => Some(Keyword::Do),
            "else" => Some(Keyword::Else),
            "finally" => Some(Keyword::Finally),
            "for" => Some(Keyword::For),
            "function" => Some(Keyword::Function),
            "if" => Some(Keyword::If),
            "in" => Some(Keyword::In),
            "instanceof" => Some(Keyword::Instanceof),
            "new" => Some(Keyword::New),
            "return" => Some(Keyword::Return),
            "switch" => Some(Keyword::Switch),
            "this" => Some(Keyword::This),
            "throw" => Some(Keyword::Throw),
            "try" => Some(Keyword::Try),
            "typeof" => Some(Keyword::Typeof),
            "var" => Some(Keyword::Var),
            "void" => Some(Keyword::Void),
            "while" => Some(Keyword::While),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Continue => "continue",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        };
        write!(f, "{s}")
    }
}

/// ES3 §7.5.3 future reserved words. They lex as identifiers but may not be
/// used as one.
pub fn is_future_reserved(name: &str) -> bool {
    matches!(
        name,
        "abstract"
            | "boolean"
            | "byte"
            | "char"
            | "class"
            | "const"
            | "debugger"
            | "double"
            | "enum"
            | "export"
            | "extends"
            | "final"
            | "float"
            | "goto"
            | "implements"
            | "import"
            | "int"
            | "interface"
            | "long"
            | "native"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "short"
            | "static"
            | "super"
            | "synchronized"
            | "throws"
            | "transient"
            | "volatile"
    )
}

#[derive(Clone, Debug)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: u32,
    column: u32,
    token_start: usize,
    token_line: u32,
    /// Annex B octal numeric literals and octal string escapes.
    pub annex_b: bool,
    /// Treat `<!--` as the start of a line comment.
    pub sgml_comments: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            current,
            offset: 0,
            line: 1,
            column: 0,
            token_start: 0,
            token_line: 1,
            annex_b: false,
            sgml_comments: false,
        }
    }

    /// Byte offset where the most recently returned token starts.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Line of the most recently returned token.
    pub fn token_line(&self) -> u32 {
        self.token_line
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(
            ch,
            '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}'
        ) || ch.is_whitespace() && !Self::is_line_terminator(ch)
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphabetic() || unicode_id_start(ch)
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphanumeric() || unicode_id_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_whitespace(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') => {
                    if self.peek() == Some('/') {
                        self.advance();
                        return Ok(has_line_terminator);
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated block comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn read_string(&mut self, quote: char) -> Result<Vec<u16>, LexError> {
        let mut s = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some(ch) if ch == quote => return Ok(s),
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated string literal"));
                }
                Some('\\') => self.read_escape_sequence(&mut s)?,
                Some(ch) => {
                    let mut buf = [0u16; 2];
                    s.extend_from_slice(ch.encode_utf16(&mut buf));
                }
            }
        }
    }

    fn read_escape_sequence(&mut self, out: &mut Vec<u16>) -> Result<(), LexError> {
        let unit = match self.advance() {
            None => return Err(self.error("Unterminated escape sequence")),
            Some('n') => 0x0A,
            Some('r') => 0x0D,
            Some('t') => 0x09,
            Some('b') => 0x08,
            Some('f') => 0x0C,
            Some('v') => 0x0B,
            Some(ch @ '0'..='7') => {
                if ch == '0' && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    0
                } else if !self.annex_b {
                    return Err(self.error("Octal escape sequences require Annex B"));
                } else {
                    let mut val = (ch as u32) - ('0' as u32);
                    if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                        self.advance();
                        val = val * 8 + d;
                        if ch <= '3'
                            && let Some(d) = self.peek().and_then(|c| c.to_digit(8))
                        {
                            self.advance();
                            val = val * 8 + d;
                        }
                    }
                    val as u16
                }
            }
            Some('x') => {
                let mut val = 0u32;
                for _ in 0..2 {
                    let d = self
                        .advance()
                        .and_then(hex_val)
                        .ok_or_else(|| self.error("Invalid hex escape"))?;
                    val = val * 16 + d;
                }
                val as u16
            }
            Some('u') => self.read_unicode_escape()?,
            Some(ch) if Self::is_line_terminator(ch) => {
                return Err(self.error("Unterminated string literal"));
            }
            Some(ch) => {
                let mut buf = [0u16; 2];
                out.extend_from_slice(ch.encode_utf16(&mut buf));
                return Ok(());
            }
        };
        out.push(unit);
        Ok(())
    }

    fn read_unicode_escape(&mut self) -> Result<u16, LexError> {
        let mut val: u32 = 0;
        for _ in 0..4 {
            let d = self
                .advance()
                .and_then(hex_val)
                .ok_or_else(|| self.error("Invalid Unicode escape"))?;
            val = val * 16 + d;
        }
        Ok(val as u16)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        let mut s = String::new();
        s.push(first);

        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => return self.read_hex_literal(),
                Some(c) if c.is_ascii_digit() => {
                    return self.read_leading_zero_literal(s);
                }
                _ => {}
            }
        }

        if first != '.' {
            self.read_decimal_digits(&mut s);
            if self.peek() == Some('.') {
                s.push('.');
                self.advance();
            }
        }
        self.read_decimal_digits(&mut s);
        self.read_exponent(&mut s)?;
        self.finish_decimal(&s)
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_exponent(&mut self, s: &mut String) -> Result<(), LexError> {
        if let Some(e @ ('e' | 'E')) = self.peek() {
            s.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error("Missing exponent digits"));
            }
            self.read_decimal_digits(s);
        }
        Ok(())
    }

    fn finish_decimal(&self, s: &str) -> Result<Token, LexError> {
        if self.peek().is_some_and(Self::is_identifier_start) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        let val: f64 = s
            .parse()
            .map_err(|_| self.error("Invalid numeric literal"))?;
        Ok(Token::NumericLiteral(val))
    }

    fn read_hex_literal(&mut self) -> Result<Token, LexError> {
        self.advance(); // x/X
        let mut val = 0.0f64;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(hex_val) {
            val = val * 16.0 + f64::from(d);
            digits += 1;
            self.advance();
        }
        if digits == 0 {
            return Err(self.error("Invalid hex literal"));
        }
        if self.peek().is_some_and(Self::is_identifier_start) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        Ok(Token::NumericLiteral(val))
    }

    fn read_leading_zero_literal(&mut self, mut s: String) -> Result<Token, LexError> {
        self.read_decimal_digits(&mut s);
        let all_octal = s.chars().all(|c| ('0'..='7').contains(&c));
        if self.annex_b && all_octal && !matches!(self.peek(), Some('.' | 'e' | 'E')) {
            let val = s
                .chars()
                .filter_map(|c| c.to_digit(8))
                .fold(0.0, |acc, d| acc * 8.0 + f64::from(d));
            return Ok(Token::NumericLiteral(val));
        }
        if self.peek() == Some('.') {
            s.push('.');
            self.advance();
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s)?;
        self.finish_decimal(&s)
    }

    fn read_identifier(&mut self, first: char) -> Result<Token, LexError> {
        let mut name = String::new();
        if first == '\\' {
            name.push(self.read_identifier_escape()?);
        } else {
            name.push(first);
        }
        while let Some(ch) = self.peek() {
            if Self::is_identifier_continue(ch) {
                name.push(ch);
                self.advance();
            } else if ch == '\\' {
                self.advance();
                name.push(self.read_identifier_escape()?);
            } else {
                break;
            }
        }

        Ok(match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        })
    }

    fn read_identifier_escape(&mut self) -> Result<char, LexError> {
        if self.advance() != Some('u') {
            return Err(self.error("Invalid escape in identifier"));
        }
        let unit = self.read_unicode_escape()?;
        char::from_u32(u32::from(unit))
            .filter(|&c| Self::is_identifier_continue(c))
            .ok_or_else(|| self.error("Invalid identifier escape"))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            self.token_start = self.offset;
            self.token_line = self.line;

            let ch = match self.peek() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                if self.peek_next() == Some('/') {
                    self.advance();
                    self.advance();
                    self.skip_line_comment();
                    continue;
                }
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    let had_lt = self.skip_block_comment()?;
                    if had_lt {
                        return Ok(Token::LineTerminator);
                    }
                    continue;
                }
            }

            if ch == '<' && self.sgml_comments && self.source[self.offset..].starts_with("<!--") {
                self.skip_line_comment();
                continue;
            }

            self.advance();

            if ch == '\'' || ch == '"' {
                let s = self.read_string(ch)?;
                return Ok(Token::StringLiteral(s));
            }

            if ch.is_ascii_digit() {
                return self.read_numeric_literal(ch);
            }
            if ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_numeric_literal(ch);
            }

            if Self::is_identifier_start(ch) || ch == '\\' {
                return self.read_identifier(ch);
            }

            return self.read_punctuator(ch);
        }
    }

    /// Consumes `=` if it is next, returning `with` instead of `without`.
    fn with_assign(&mut self, with: Token, without: Token) -> Token {
        if self.peek() == Some('=') {
            self.advance();
            with
        } else {
            without
        }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        match ch {
            '{' => Ok(Token::LeftBrace),
            '}' => Ok(Token::RightBrace),
            '(' => Ok(Token::LeftParen),
            ')' => Ok(Token::RightParen),
            '[' => Ok(Token::LeftBracket),
            ']' => Ok(Token::RightBracket),
            ';' => Ok(Token::Semicolon),
            ',' => Ok(Token::Comma),
            '~' => Ok(Token::Tilde),
            ':' => Ok(Token::Colon),
            '?' => Ok(Token::Question),
            '.' => Ok(Token::Dot),

            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    Ok(self.with_assign(Token::LeftShiftAssign, Token::LeftShift))
                } else {
                    Ok(self.with_assign(Token::LessThanEqual, Token::LessThan))
                }
            }

            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        Ok(self.with_assign(
                            Token::UnsignedRightShiftAssign,
                            Token::UnsignedRightShift,
                        ))
                    } else {
                        Ok(self.with_assign(Token::RightShiftAssign, Token::RightShift))
                    }
                } else {
                    Ok(self.with_assign(Token::GreaterThanEqual, Token::GreaterThan))
                }
            }

            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(self.with_assign(Token::StrictEqual, Token::Equal))
                } else {
                    Ok(Token::Assign)
                }
            }

            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(self.with_assign(Token::StrictNotEqual, Token::NotEqual))
                } else {
                    Ok(Token::Bang)
                }
            }

            '+' => {
                if self.peek() == Some('+') {
                    self.advance();
                    Ok(Token::Increment)
                } else {
                    Ok(self.with_assign(Token::PlusAssign, Token::Plus))
                }
            }

            '-' => {
                if self.peek() == Some('-') {
                    self.advance();
                    Ok(Token::Decrement)
                } else {
                    Ok(self.with_assign(Token::MinusAssign, Token::Minus))
                }
            }

            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    Ok(Token::LogicalAnd)
                } else {
                    Ok(self.with_assign(Token::AmpersandAssign, Token::Ampersand))
                }
            }

            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    Ok(Token::LogicalOr)
                } else {
                    Ok(self.with_assign(Token::PipeAssign, Token::Pipe))
                }
            }

            '*' => Ok(self.with_assign(Token::StarAssign, Token::Star)),
            '/' => Ok(self.with_assign(Token::SlashAssign, Token::Slash)),
            '%' => Ok(self.with_assign(Token::PercentAssign, Token::Percent)),
            '^' => Ok(self.with_assign(Token::CaretAssign, Token::Caret)),

            _ => Err(self.error(format!("Unexpected character: {ch}"))),
        }
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

fn unicode_id_start(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_start(ch)
}

fn unicode_id_continue(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_continue(ch)
}
