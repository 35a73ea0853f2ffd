//! Lexer for expression text.
//!
//! Whitespace and comments (`//` to end of line, `/* */`) are insignificant
//! and discarded here; every token carries its byte offset so parse errors
//! can point into the source text.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{FhirPathError, Result};

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Xor,
    Implies,
    Is,
    As,

    // Literals
    Ident(String),
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),

    // Symbols
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Dot,      // .
    Comma,    // ,
    Eq,       // =
    NotEq,    // !=
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /

    Eof,
}

impl TokenKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Xor => "'xor'",
            TokenKind::Implies => "'implies'",
            TokenKind::Is => "'is'",
            TokenKind::As => "'as'",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Bool(_) => "boolean literal",
            TokenKind::Integer(_) => "integer literal",
            TokenKind::Decimal(_) => "decimal literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Date(_) => "date literal",
            TokenKind::DateTime(_) => "dateTime literal",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Dot => "'.'",
            TokenKind::Comma => "','",
            TokenKind::Eq => "'='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token with its start offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

impl Token {
    pub fn new(kind: TokenKind, pos: usize) -> Self {
        Self { kind, pos }
    }
}

/// Lexer state.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Tokenize all input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn next_char(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            while self.peek_char().is_some_and(char::is_whitespace) {
                self.next_char();
            }
            if self.peek_char() != Some('/') {
                return Ok(());
            }
            // Distinguish comments from the division operator.
            let mut lookahead = self.chars.clone();
            lookahead.next();
            match lookahead.peek().map(|(_, c)| *c) {
                Some('/') => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('*') => {
                    let start = self.pos;
                    self.next_char();
                    self.next_char();
                    loop {
                        match self.next_char() {
                            None => {
                                return Err(FhirPathError::syntax(start, "unterminated comment"));
                            }
                            Some('*') if self.peek_char() == Some('/') => {
                                self.next_char();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(c) = self.next_char() else {
            return Ok(Token::new(TokenKind::Eof, self.pos));
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '=' => TokenKind::Eq,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => {
                if self.peek_char() == Some('=') {
                    self.next_char();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.next_char();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.next_char();
                    TokenKind::NotEq
                } else {
                    return Err(FhirPathError::syntax(start, "unexpected character '!'"));
                }
            }
            '\'' => self.scan_string(start)?,
            '@' => self.scan_date_time(start)?,
            '0'..='9' => self.scan_number(c, start)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_ident(c),
            c => {
                return Err(FhirPathError::syntax(
                    start,
                    format!("unexpected character '{}'", c),
                ));
            }
        };

        Ok(Token::new(kind, start))
    }

    fn scan_string(&mut self, start: usize) -> Result<TokenKind> {
        let mut value = String::new();
        loop {
            match self.next_char() {
                None => {
                    return Err(FhirPathError::syntax(start, "unterminated string literal"));
                }
                Some('\'') => break,
                Some('\\') => {
                    let escape_pos = self.pos;
                    match self.next_char() {
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('/') => value.push('/'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('f') => value.push('\u{0c}'),
                        Some(c) => {
                            return Err(FhirPathError::syntax(
                                escape_pos,
                                format!("unknown escape sequence '\\{}'", c),
                            ));
                        }
                        None => {
                            return Err(FhirPathError::syntax(start, "unterminated string literal"));
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::Str(value))
    }

    fn scan_number(&mut self, first: char, start: usize) -> Result<TokenKind> {
        let mut text = String::from(first);
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.next_char().unwrap());
        }

        // A dot is only part of the number when digits follow; otherwise it
        // is a path step (`1.combine(...)` never occurs here, but `a.b` does).
        let mut lookahead = self.chars.clone();
        let is_decimal = lookahead.next().map(|(_, c)| c) == Some('.')
            && lookahead.peek().is_some_and(|(_, c)| c.is_ascii_digit());

        if is_decimal {
            text.push(self.next_char().unwrap());
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.next_char().unwrap());
            }
            let value: f64 = text
                .parse()
                .map_err(|_| FhirPathError::syntax(start, format!("invalid decimal '{}'", text)))?;
            Ok(TokenKind::Decimal(value))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| FhirPathError::syntax(start, format!("integer out of range '{}'", text)))?;
            Ok(TokenKind::Integer(value))
        }
    }

    fn scan_date_time(&mut self, start: usize) -> Result<TokenKind> {
        let mut text = String::new();
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | 'Z'))
        {
            text.push(self.next_char().unwrap());
        }

        if text.is_empty() {
            return Err(FhirPathError::syntax(start, "expected date after '@'"));
        }

        if text.contains('T') {
            let naive = text.strip_suffix('Z').unwrap_or(&text);
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
                if let Ok(value) = NaiveDateTime::parse_from_str(naive, format) {
                    return Ok(TokenKind::DateTime(value));
                }
            }
            Err(FhirPathError::syntax(
                start,
                format!("invalid dateTime literal '@{}'", text),
            ))
        } else {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map(TokenKind::Date)
                .map_err(|_| {
                    FhirPathError::syntax(start, format!("invalid date literal '@{}'", text))
                })
        }
    }

    fn scan_ident(&mut self, first: char) -> TokenKind {
        let mut text = String::from(first);
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            text.push(self.next_char().unwrap());
        }

        match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "xor" => TokenKind::Xor,
            "implies" => TokenKind::Implies,
            "is" => TokenKind::Is,
            "as" => TokenKind::As,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(text),
        }
    }
}
