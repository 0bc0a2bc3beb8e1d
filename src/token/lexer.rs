use crate::error::CompileError;
use crate::types::Type;

use super::{Term, Token, TokenValue};

/// Lexical analyser.
///
/// Walks the source one byte at a time and produces [`Token`]s. Keeps a
/// two-slot pushback buffer so the parsers can look ahead and rewind; a
/// third `unget` in a row is a lexical error.
pub struct Lexer {
    src: Vec<u8>,
    pos: usize,
    row: u32,
    column: u32,
    // most recently produced tokens, [0] is the newest
    history: [Option<Token>; 2],
    ungot: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            src: source.as_bytes().to_vec(),
            pos: 0,
            row: 1,
            column: 0,
            history: [None, None],
            ungot: 0,
        }
    }

    /// Produces the next token, serving the pushback buffer first.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        if self.ungot > 0 {
            self.ungot -= 1;
            return self.history[self.ungot]
                .clone()
                .ok_or_else(|| CompileError::Internal("empty token pushback slot".to_string()));
        }
        let token = self.scan()?;
        self.history[1] = self.history[0].take();
        self.history[0] = Some(token.clone());
        Ok(token)
    }

    /// Pushes the last delivered token back; at most two tokens can be
    /// unread at a time.
    pub fn unget(&mut self) -> Result<(), CompileError> {
        if self.ungot >= self.history.len() {
            return Err(self.error("token pushback buffer overflow"));
        }
        self.ungot += 1;
        Ok(())
    }

    /// Position of the byte that would be read next, for diagnostics.
    pub fn position(&self) -> (u32, u32) {
        (self.row, self.column)
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::Lex {
            row: self.row,
            column: self.column,
            message: message.to_string(),
        }
    }

    fn getc(&mut self) -> Option<u8> {
        let c = self.src.get(self.pos).copied()?;
        self.pos += 1;
        self.column += 1;
        Some(c)
    }

    fn ungetc(&mut self) {
        self.pos -= 1;
        self.column -= 1;
    }

    fn consume_if(&mut self, expected: u8) -> bool {
        match self.getc() {
            Some(c) if c == expected => true,
            Some(_) => {
                self.ungetc();
                false
            }
            None => false,
        }
    }

    fn scan(&mut self) -> Result<Token, CompileError> {
        loop {
            let c = match self.getc() {
                Some(c) => c,
                None => {
                    return Ok(Token::new(Term::Eof, TokenValue::None, self.row, self.column))
                }
            };
            let row = self.row;
            let column = self.column;
            let simple =
                |term| Ok(Token::new(term, TokenValue::None, row, column));

            match c {
                b'\n' => {
                    self.row += 1;
                    self.column = 0;
                }
                c if c.is_ascii_whitespace() => {}
                c if c.is_ascii_digit() => return self.scan_number(c, row, column),
                c if c == b'_' || c.is_ascii_alphabetic() => {
                    return Ok(self.scan_word(c, row, column))
                }
                b'"' => return self.scan_string(row, column),
                b'-' => {
                    if self.consume_if(b'-') {
                        self.scan_comment()?;
                    } else {
                        return simple(Term::Minus);
                    }
                }
                b'<' => {
                    return simple(if self.consume_if(b'=') { Term::Lte } else { Term::Lt })
                }
                b'>' => {
                    return simple(if self.consume_if(b'=') { Term::Gte } else { Term::Gt })
                }
                b'=' => {
                    return simple(if self.consume_if(b'=') {
                        Term::DoubleEquals
                    } else {
                        Term::Equals
                    })
                }
                b'/' => {
                    return simple(if self.consume_if(b'/') {
                        Term::DoubleSlash
                    } else {
                        Term::Slash
                    })
                }
                b'~' => {
                    if self.consume_if(b'=') {
                        return simple(Term::TildeEquals);
                    }
                    return Err(self.error("expected '=' after '~'"));
                }
                b'.' => {
                    if self.consume_if(b'.') {
                        return simple(Term::DoubleDot);
                    }
                    return Err(self.error("expected '.' after '.'"));
                }
                b'+' => return simple(Term::Plus),
                b'*' => return simple(Term::Asterisk),
                b'%' => return simple(Term::Percent),
                b'^' => return simple(Term::Caret),
                b'(' => return simple(Term::LParen),
                b')' => return simple(Term::RParen),
                b':' => return simple(Term::Colon),
                b',' => return simple(Term::Comma),
                b'#' => return simple(Term::Hash),
                _ => return Err(self.error("unknown character")),
            }
        }
    }

    /// Consumes a comment; the two leading dashes are already gone.
    fn scan_comment(&mut self) -> Result<(), CompileError> {
        let block = match self.getc() {
            None => return Ok(()),
            Some(b'\n') => {
                self.row += 1;
                self.column = 0;
                return Ok(());
            }
            Some(b'[') => self.consume_if(b'['),
            Some(_) => false,
        };

        if block {
            // block comment, runs to the matching ]]
            loop {
                match self.getc() {
                    None => return Err(self.error("unterminated block comment")),
                    Some(b'\n') => {
                        self.row += 1;
                        self.column = 0;
                    }
                    Some(b']') => {
                        if self.consume_if(b']') {
                            return Ok(());
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        // line comment, runs to the end of the line
        loop {
            match self.getc() {
                None => return Ok(()),
                Some(b'\n') => {
                    self.row += 1;
                    self.column = 0;
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn scan_string(&mut self, row: u32, column: u32) -> Result<Token, CompileError> {
        let mut text = String::new();
        loop {
            match self.getc() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => {
                    return Ok(Token::new(Term::Str, TokenValue::Text(text), row, column))
                }
                Some(b'\\') => match self.getc() {
                    Some(b'\\') => text.push('\\'),
                    Some(b'n') => text.push('\n'),
                    Some(b't') => text.push('\t'),
                    Some(b'"') => text.push('"'),
                    Some(d) if d.is_ascii_digit() => {
                        let mut value = u32::from(d - b'0');
                        for _ in 0..2 {
                            match self.getc() {
                                Some(d) if d.is_ascii_digit() => {
                                    value = value * 10 + u32::from(d - b'0');
                                }
                                _ => {
                                    return Err(self.error("escape sequence needs three digits"))
                                }
                            }
                        }
                        if value == 0 || value > 255 {
                            return Err(self.error("escape sequence out of range"));
                        }
                        text.push(char::from(value as u8));
                    }
                    _ => return Err(self.error("unknown escape sequence")),
                },
                Some(b'\n') => {
                    self.row += 1;
                    self.column = 0;
                    text.push('\n');
                }
                Some(c) => text.push(char::from(c)),
            }
        }
    }

    fn scan_number(&mut self, first: u8, row: u32, column: u32) -> Result<Token, CompileError> {
        let mut text = String::new();
        text.push(char::from(first));
        let mut is_decimal = false;

        self.take_digits(&mut text);

        match self.getc() {
            Some(b'.') => {
                is_decimal = true;
                text.push('.');
                match self.getc() {
                    Some(d) if d.is_ascii_digit() => text.push(char::from(d)),
                    _ => return Err(self.error("expected digit after decimal point")),
                }
                self.take_digits(&mut text);
                if let Some(c) = self.getc() {
                    if c == b'e' || c == b'E' {
                        self.scan_exponent(&mut text)?;
                    } else {
                        self.ungetc();
                    }
                }
            }
            Some(c) if c == b'e' || c == b'E' => {
                is_decimal = true;
                self.scan_exponent(&mut text)?;
            }
            Some(_) => self.ungetc(),
            None => {}
        }

        if is_decimal {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error("malformed number literal"))?;
            Ok(Token::new(Term::Number, TokenValue::Num(value), row, column))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error("malformed integer literal"))?;
            Ok(Token::new(Term::Integer, TokenValue::Int(value), row, column))
        }
    }

    /// Exponent part after the `e`; a sign is optional, at least one digit
    /// is not.
    fn scan_exponent(&mut self, text: &mut String) -> Result<(), CompileError> {
        text.push('e');
        match self.getc() {
            Some(c) if c == b'+' || c == b'-' => {
                text.push(char::from(c));
                match self.getc() {
                    Some(d) if d.is_ascii_digit() => text.push(char::from(d)),
                    _ => return Err(self.error("expected digit in exponent")),
                }
            }
            Some(d) if d.is_ascii_digit() => text.push(char::from(d)),
            _ => return Err(self.error("expected digit in exponent")),
        }
        self.take_digits(text);
        Ok(())
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(c) = self.getc() {
            if c.is_ascii_digit() {
                text.push(char::from(c));
            } else {
                self.ungetc();
                break;
            }
        }
    }

    fn scan_word(&mut self, first: u8, row: u32, column: u32) -> Token {
        let mut text = String::new();
        text.push(char::from(first));
        while let Some(c) = self.getc() {
            if c == b'_' || c.is_ascii_alphanumeric() {
                text.push(char::from(c));
            } else {
                self.ungetc();
                break;
            }
        }

        let (term, value) = match text.as_str() {
            "if" => (Term::If, TokenValue::None),
            "else" => (Term::Else, TokenValue::None),
            "elseif" => (Term::Elseif, TokenValue::None),
            "then" => (Term::Then, TokenValue::None),
            "end" => (Term::End, TokenValue::None),
            "do" => (Term::Do, TokenValue::None),
            "while" => (Term::While, TokenValue::None),
            "repeat" => (Term::Repeat, TokenValue::None),
            "until" => (Term::Until, TokenValue::None),
            "for" => (Term::For, TokenValue::None),
            "break" => (Term::Break, TokenValue::None),
            "return" => (Term::Return, TokenValue::None),
            "function" => (Term::Function, TokenValue::None),
            "local" => (Term::Local, TokenValue::None),
            "global" => (Term::Global, TokenValue::None),
            "require" => (Term::Require, TokenValue::None),
            "nil" => (Term::Nil, TokenValue::None),
            "and" => (Term::And, TokenValue::None),
            "or" => (Term::Or, TokenValue::None),
            "not" => (Term::Not, TokenValue::None),
            "true" => (Term::Bool, TokenValue::Bool(true)),
            "false" => (Term::Bool, TokenValue::Bool(false)),
            "integer" => (Term::TypeName, TokenValue::TypeTag(Type::Integer)),
            "number" => (Term::TypeName, TokenValue::TypeTag(Type::Number)),
            "string" => (Term::TypeName, TokenValue::TypeTag(Type::String)),
            "boolean" => (Term::TypeName, TokenValue::TypeTag(Type::Boolean)),
            _ => (Term::Identifier, TokenValue::Text(text)),
        };
        Token::new(term, value, row, column)
    }
}
