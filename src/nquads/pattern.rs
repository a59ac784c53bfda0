//! Statement patterns with per-field wildcards.

use crate::term::TermKind;

use super::QuadRef;

/// Constraint on a single statement field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TermPattern {
    /// Matches anything, including an absent graph label.
    #[default]
    Any,
    /// Matches exactly this lexical text.
    Exact(String),
    /// Matches any term of this kind.
    Kind(TermKind),
}

impl TermPattern {
    pub fn exact(text: impl Into<String>) -> Self {
        TermPattern::Exact(text.into())
    }

    pub fn matches(&self, term: Option<&str>) -> bool {
        match (self, term) {
            (TermPattern::Any, _) => true,
            (TermPattern::Exact(want), Some(have)) => want == have,
            (TermPattern::Kind(kind), Some(have)) => kind.admits(TermKind::classify(have)),
            (_, None) => false,
        }
    }
}

impl From<&str> for TermPattern {
    fn from(text: &str) -> Self {
        TermPattern::Exact(text.to_string())
    }
}

impl From<TermKind> for TermPattern {
    fn from(kind: TermKind) -> Self {
        if kind == TermKind::Any {
            TermPattern::Any
        } else {
            TermPattern::Kind(kind)
        }
    }
}

impl std::fmt::Display for TermPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermPattern::Any => write!(f, "*"),
            TermPattern::Exact(text) => write!(f, "{text}"),
            TermPattern::Kind(kind) => write!(f, "{{{kind}}}"),
        }
    }
}

/// A (subject, predicate, object, graph) pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuadPattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
    pub graph: TermPattern,
}

impl QuadPattern {
    /// A pattern matching every statement.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, p: impl Into<TermPattern>) -> Self {
        self.subject = p.into();
        self
    }

    pub fn predicate(mut self, p: impl Into<TermPattern>) -> Self {
        self.predicate = p.into();
        self
    }

    pub fn object(mut self, p: impl Into<TermPattern>) -> Self {
        self.object = p.into();
        self
    }

    pub fn graph(mut self, p: impl Into<TermPattern>) -> Self {
        self.graph = p.into();
        self
    }

    pub fn matches(&self, quad: &QuadRef<'_>) -> bool {
        self.subject.matches(Some(quad.subject))
            && self.predicate.matches(Some(quad.predicate))
            && self.object.matches(Some(quad.object))
            && self.graph.matches(quad.graph)
    }
}

impl std::fmt::Display for QuadPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if self.graph != TermPattern::Any {
            write!(f, " {}", self.graph)?;
        }
        Ok(())
    }
}
