//! Lexer: splits one N-Quads line into term tokens.
//!
//! Paired delimiters (`<...>` and `"..."`) are consumed atomically, so
//! whitespace, `#` and `.` inside an IRI or literal never end a token.
//! Escapes are validated here; the token text is returned unchanged.

/// Byte-level source span within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// The lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<...>`
    Iri,
    /// `_:label`
    BlankNode,
    /// `"..."` with an optional `^^<datatype>` or `@lang` suffix.
    Literal,
    /// The statement terminator `.`
    Dot,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Iri => write!(f, "IRI"),
            TokenKind::BlankNode => write!(f, "blank node"),
            TokenKind::Literal => write!(f, "literal"),
            TokenKind::Dot => write!(f, "'.'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

/// A lexical error at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub reason: String,
}

impl LexError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skip blanks and line terminators; a `#` outside delimiters starts a
    /// comment that runs to the end of the line.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.pos += 1;
                }
                '#' => {
                    self.pos = self.src.len();
                }
                _ => break,
            }
        }
    }

    /// Produce the next token, or `None` at end of line.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, LexError> {
        self.skip_trivia();
        let start = self.pos;
        let kind = match self.peek() {
            None => return Ok(None),
            Some('<') => {
                self.iri()?;
                TokenKind::Iri
            }
            Some('"') => {
                self.literal()?;
                TokenKind::Literal
            }
            Some('_') => {
                self.blank_node()?;
                TokenKind::BlankNode
            }
            Some('.') => {
                self.pos += 1;
                TokenKind::Dot
            }
            Some(c) => {
                return Err(LexError::new(start, format!("unexpected character {c:?}")));
            }
        };
        Ok(Some(Token {
            kind,
            text: &self.src[start..self.pos],
            span: Span {
                start,
                end: self.pos,
            },
        }))
    }

    fn iri(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.bump();
        loop {
            let at = self.pos;
            match self.bump() {
                None => return Err(LexError::new(start, "unterminated IRI")),
                Some('>') => return Ok(()),
                Some('\\') => match self.bump() {
                    Some('u') => self.hex_digits(4, at)?,
                    Some('U') => self.hex_digits(8, at)?,
                    _ => return Err(LexError::new(at, "invalid escape in IRI")),
                },
                Some(c) if is_forbidden_in_iri(c) => {
                    return Err(LexError::new(at, format!("character {c:?} is not allowed in an IRI")));
                }
                Some(_) => {}
            }
        }
    }

    fn literal(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.bump();
        loop {
            let at = self.pos;
            match self.bump() {
                None => return Err(LexError::new(start, "unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('t' | 'b' | 'n' | 'r' | 'f' | '"' | '\'' | '\\') => {}
                    Some('u') => self.hex_digits(4, at)?,
                    Some('U') => self.hex_digits(8, at)?,
                    _ => return Err(LexError::new(at, "invalid escape in string literal")),
                },
                Some('\n' | '\r') => {
                    return Err(LexError::new(at, "line break inside string literal"));
                }
                Some(_) => {}
            }
        }

        if self.src[self.pos..].starts_with("^^") {
            self.pos += 2;
            if self.peek() != Some('<') {
                return Err(LexError::new(self.pos, "expected datatype IRI after '^^'"));
            }
            self.iri()?;
        } else if self.eat('@') {
            self.lang_tag()?;
        }
        Ok(())
    }

    fn lang_tag(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(LexError::new(start, "empty language tag"));
        }
        while self.peek() == Some('-') {
            self.pos += 1;
            let sub = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric()) {
                self.pos += 1;
            }
            if self.pos == sub {
                return Err(LexError::new(sub, "empty language subtag"));
            }
        }
        Ok(())
    }

    fn blank_node(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.bump();
        if !self.eat(':') {
            return Err(LexError::new(start, "expected ':' after '_' in blank node label"));
        }
        match self.peek() {
            Some(c) if is_pn_chars_u(c) || c.is_ascii_digit() => {
                self.bump();
            }
            _ => return Err(LexError::new(self.pos, "empty blank node label")),
        }
        // Interior dots are allowed, a trailing dot belongs to the statement.
        let mut last_valid = self.pos;
        while let Some(c) = self.peek() {
            if is_pn_chars(c) {
                self.bump();
                last_valid = self.pos;
            } else if c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        self.pos = last_valid;
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, escape_at: usize) -> Result<(), LexError> {
        for _ in 0..count {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return Err(LexError::new(escape_at, "malformed unicode escape")),
            }
        }
        Ok(())
    }
}

fn is_forbidden_in_iri(c: char) -> bool {
    c <= '\u{20}' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`')
}

fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_pn_chars_u(c: char) -> bool {
    is_pn_chars_base(c) || c == '_' || c == ':'
}

fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || c == '-'
        || c.is_ascii_digit()
        || c == '\u{00B7}'
        || ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{203F}'..='\u{2040}').contains(&c)
}
