//! Summary counts over a [`GraphIndex`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::graph::GraphIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub verbs: usize,
    pub statements: usize,
    /// Node count per term kind.
    pub kinds: BTreeMap<String, usize>,
    /// Statement count per predicate, most used first.
    pub predicates: Vec<PredicateCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateCount {
    pub predicate: String,
    pub statements: usize,
}

impl GraphStats {
    pub fn collect(index: &GraphIndex) -> Self {
        let kinds = index
            .kind_counts()
            .into_iter()
            .map(|(kind, n)| (kind.to_string(), n))
            .collect();
        let mut predicates: Vec<PredicateCount> = index
            .verb_ids()
            .map(|id| {
                let verb = index.verb(id);
                PredicateCount {
                    predicate: verb.term().text().to_string(),
                    statements: verb.statements().len(),
                }
            })
            .collect();
        predicates.sort_by(|a, b| {
            b.statements
                .cmp(&a.statements)
                .then_with(|| a.predicate.cmp(&b.predicate))
        });
        Self {
            nodes: index.node_count(),
            verbs: index.verb_count(),
            statements: index.statement_count(),
            kinds,
            predicates,
        }
    }
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "statements: {}", self.statements)?;
        writeln!(f, "nodes:      {}", self.nodes)?;
        writeln!(f, "predicates: {}", self.verbs)?;
        writeln!(f)?;
        writeln!(f, "nodes by kind:")?;
        for (kind, n) in &self.kinds {
            writeln!(f, "  {kind:<14} {n}")?;
        }
        writeln!(f)?;
        writeln!(f, "statements by predicate:")?;
        for p in &self.predicates {
            writeln!(f, "  {:>8}  {}", p.statements, p.predicate)?;
        }
        Ok(())
    }
}
