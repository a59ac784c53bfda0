//! Interned statement graph.
//!
//! Every distinct term text maps to exactly one [`Node`] (subject, object or
//! graph position) or [`Verb`] (predicate position), and every distinct
//! statement to exactly one [`Statement`]. All three live in arenas owned by
//! [`GraphIndex`](index::GraphIndex) and are referred to by copyable handles.
//!
//! Invariant: for every statement `S` in the index, `S` is in
//! `S.subject.outward`, `S.object.inward` and `S.predicate.statements`.

pub mod index;

use serde::{Deserialize, Serialize};

use crate::error::{ProvError, ProvResult};
use crate::term::Term;

pub use index::GraphIndex;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Handle for an existing arena slot.
            pub(crate) fn from_index(index: usize) -> Self {
                // Slots are only created through `next`, so they fit.
                Self(index as u32)
            }

            /// Handle for a new slot appended to an arena of `len` entries.
            pub(crate) fn next(len: usize, arena: &'static str) -> ProvResult<Self> {
                u32::try_from(len)
                    .map(Self)
                    .map_err(|_| ProvError::GraphFull { arena })
            }

            /// Position in the owning arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Handle to an interned [`Node`].
    NodeId
);
handle!(
    /// Handle to an interned [`Verb`].
    VerbId
);
handle!(
    /// Handle to an interned [`Statement`].
    StatementId
);

/// A graph vertex: a term seen in subject, object or graph position.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) term: Term,
    pub(crate) inward: Vec<StatementId>,
    pub(crate) outward: Vec<StatementId>,
}

impl Node {
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Statements where this node is the object.
    pub fn inward(&self) -> &[StatementId] {
        &self.inward
    }

    /// Statements where this node is the subject.
    pub fn outward(&self) -> &[StatementId] {
        &self.outward
    }
}

/// A predicate and the statements that use it.
#[derive(Debug, Clone)]
pub struct Verb {
    pub(crate) term: Term,
    pub(crate) statements: Vec<StatementId>,
}

impl Verb {
    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn statements(&self) -> &[StatementId] {
        &self.statements
    }
}

/// An interned statement. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: NodeId,
    pub predicate: VerbId,
    pub object: NodeId,
    pub graph: Option<NodeId>,
}

impl Statement {
    /// Exact-or-wildcard match: each `Some` argument must equal the field.
    ///
    /// A `Some` graph argument never matches a statement without a graph.
    pub fn matches(
        &self,
        subject: Option<NodeId>,
        predicate: Option<VerbId>,
        object: Option<NodeId>,
        graph: Option<NodeId>,
    ) -> bool {
        subject.is_none_or(|s| s == self.subject)
            && predicate.is_none_or(|p| p == self.predicate)
            && object.is_none_or(|o| o == self.object)
            && graph.is_none_or(|g| Some(g) == self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_round_trip_index() {
        assert_eq!(NodeId::from_index(7).index(), 7);
        assert_eq!(VerbId::from_index(0).index(), 0);
        assert!(StatementId::from_index(1) < StatementId::from_index(2));
    }

    #[test]
    fn full_arena_is_an_error() {
        assert_eq!(NodeId::next(3, "nodes").unwrap().index(), 3);
        assert!(VerbId::next(u32::MAX as usize, "verbs").is_ok());
        let err = StatementId::next(u32::MAX as usize + 1, "statements").unwrap_err();
        assert!(matches!(err, ProvError::GraphFull { arena: "statements" }));
    }

    #[test]
    fn statement_matching_with_wildcards() {
        let s = NodeId::from_index(0);
        let o = NodeId::from_index(1);
        let g = NodeId::from_index(2);
        let p = VerbId::from_index(0);
        let stmt = Statement {
            subject: s,
            predicate: p,
            object: o,
            graph: None,
        };
        assert!(stmt.matches(None, None, None, None));
        assert!(stmt.matches(Some(s), Some(p), Some(o), None));
        assert!(!stmt.matches(Some(o), None, None, None));
        assert!(!stmt.matches(None, None, None, Some(g)));

        let in_graph = Statement {
            graph: Some(g),
            ..stmt
        };
        assert!(in_graph.matches(None, None, None, Some(g)));
    }
}
