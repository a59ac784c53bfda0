//! Recursive-descent statement parser over the [`Lexer`] token stream.
//!
//! ```text
//! statement := subject predicate object graph? '.'
//! subject   := IRI | BLANK
//! predicate := IRI
//! object    := IRI | BLANK | LITERAL
//! graph     := IRI | BLANK
//! ```

use crate::error::ParseError;

use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::{Field, QuadRef};

/// Parses a single line into a [`QuadRef`] borrowing from it.
pub struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    line: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            lexer: Lexer::new(src),
            line: 0,
        }
    }

    /// Report errors against this 1-based line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Parse the line. Blank and comment-only lines yield `Ok(None)`.
    pub fn parse(mut self) -> Result<Option<QuadRef<'a>>, ParseError> {
        let Some(first) = self.next()? else {
            return Ok(None);
        };
        let subject = self.expect_term(Some(first), Field::Subject)?;
        let predicate = self.expect_term(None, Field::Predicate)?;
        let object = self.expect_term(None, Field::Object)?;

        let graph = match self.next()? {
            Some(tok) if tok.kind == TokenKind::Dot => None,
            Some(tok) => {
                let graph = self.expect_term(Some(tok), Field::Graph)?;
                match self.next()? {
                    Some(tok) if tok.kind == TokenKind::Dot => {}
                    Some(tok) => {
                        return Err(self.error(tok.span.start, format!("expected '.', found {}", tok.kind)));
                    }
                    None => return Err(self.error(self.src.len(), "expected '.' at end of statement")),
                }
                Some(graph)
            }
            None => return Err(self.error(self.src.len(), "expected '.' at end of statement")),
        };

        if let Some(tok) = self.next()? {
            return Err(self.error(tok.span.start, "unexpected content after '.'"));
        }

        Ok(Some(QuadRef {
            subject,
            predicate,
            object,
            graph,
        }))
    }

    fn next(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.lexer.next_token().map_err(|e| self.lex_error(e))
    }

    fn expect_term(&mut self, tok: Option<Token<'a>>, field: Field) -> Result<&'a str, ParseError> {
        let tok = match tok {
            Some(tok) => tok,
            None => match self.next()? {
                Some(tok) => tok,
                None => {
                    return Err(self.error(self.src.len(), format!("missing {field}")));
                }
            },
        };
        let allowed = match field {
            Field::Subject | Field::Graph => {
                matches!(tok.kind, TokenKind::Iri | TokenKind::BlankNode)
            }
            Field::Predicate => tok.kind == TokenKind::Iri,
            Field::Object => tok.kind != TokenKind::Dot,
        };
        if allowed {
            Ok(tok.text)
        } else {
            Err(self.error(tok.span.start, format!("{} cannot be used as {field}", tok.kind)))
        }
    }

    fn lex_error(&self, e: LexError) -> ParseError {
        self.error(e.offset, e.reason)
    }

    fn error(&self, offset: usize, reason: impl Into<String>) -> ParseError {
        let text = self.src.trim_end_matches(['\r', '\n']).to_string();
        let offset = offset.min(text.len());
        ParseError::Grammar {
            line: self.line,
            reason: reason.into(),
            text,
            at: (offset, 0).into(),
        }
    }
}
