//! N-Quads statements: tokenizing, parsing, serializing and matching.
//!
//! A statement is kept in its lexical form: IRIs keep their angle brackets,
//! blank nodes their `_:` prefix, and literals their quotes and suffix. That
//! form is the identity of a term everywhere in provlog, so `<x>` and `"x"`
//! never compare equal.
//!
//! Serialization normalizes whitespace: terms are joined by a single space
//! and followed by ` .`. A line already written that way round-trips
//! byte-for-byte.

pub mod lexer;
pub mod parser;
pub mod pattern;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

pub use parser::Parser;
pub use pattern::{QuadPattern, TermPattern};

/// One of the four positions in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Subject,
    Predicate,
    Object,
    Graph,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Subject => write!(f, "subject"),
            Field::Predicate => write!(f, "predicate"),
            Field::Object => write!(f, "object"),
            Field::Graph => write!(f, "graph"),
        }
    }
}

/// A parsed statement borrowing its terms from the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadRef<'a> {
    pub subject: &'a str,
    pub predicate: &'a str,
    pub object: &'a str,
    pub graph: Option<&'a str>,
}

impl<'a> QuadRef<'a> {
    /// The term at `field`, if present.
    pub fn get(&self, field: Field) -> Option<&'a str> {
        match field {
            Field::Subject => Some(self.subject),
            Field::Predicate => Some(self.predicate),
            Field::Object => Some(self.object),
            Field::Graph => self.graph,
        }
    }

    pub fn to_quad(&self) -> Quad {
        Quad {
            subject: self.subject.to_string(),
            predicate: self.predicate.to_string(),
            object: self.object.to_string(),
            graph: self.graph.map(str::to_string),
        }
    }
}

impl std::fmt::Display for QuadRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = self.graph {
            write!(f, " {graph}")?;
        }
        write!(f, " .")
    }
}

/// An owned statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub graph: Option<String>,
}

impl Quad {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: None,
        }
    }

    /// Set the graph label.
    pub fn in_graph(mut self, graph: Option<impl Into<String>>) -> Self {
        self.graph = graph.map(Into::into);
        self
    }

    pub fn as_quad_ref(&self) -> QuadRef<'_> {
        QuadRef {
            subject: &self.subject,
            predicate: &self.predicate,
            object: &self.object,
            graph: self.graph.as_deref(),
        }
    }
}

impl std::fmt::Display for Quad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.as_quad_ref(), f)
    }
}

/// Parse one line; blank and comment-only lines yield `Ok(None)`.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<QuadRef<'_>>, ParseError> {
    Parser::new(line).at_line(line_no).parse()
}

/// Parse one line that must hold a statement.
pub fn parse_statement(line: &str) -> Result<QuadRef<'_>, ParseError> {
    match Parser::new(line).parse()? {
        Some(quad) => Ok(quad),
        None => Err(ParseError::Grammar {
            line: 0,
            reason: "line holds no statement".into(),
            text: line.trim_end_matches(['\r', '\n']).to_string(),
            at: (0, 0).into(),
        }),
    }
}
