//! Graph index: interning tables plus adjacency for ingested statements.
//!
//! Terms and statements are interned by their text, so ingesting the same
//! statement twice returns the same [`StatementId`] and leaves adjacency
//! untouched. Lookups never create entries; only [`GraphIndex::ingest`] does.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{ProvError, ProvResult};
use crate::nquads::{self, QuadPattern, QuadRef, TermPattern};
use crate::term::{Term, TermKind};

use super::{Node, NodeId, Statement, StatementId, Verb, VerbId};

/// Arena-backed index of every statement ingested so far.
#[derive(Default)]
pub struct GraphIndex {
    nodes: Vec<Node>,
    verbs: Vec<Verb>,
    statements: Vec<Statement>,
    node_lookup: HashMap<Box<str>, NodeId>,
    verb_lookup: HashMap<Box<str>, VerbId>,
    statement_lookup: HashMap<String, StatementId>,
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `line` and intern its statement.
    pub fn ingest(&mut self, line: &str) -> ProvResult<StatementId> {
        let quad = nquads::parse_statement(line)?;
        self.insert(&quad)
    }

    /// Ingest every statement of a line-oriented reader.
    ///
    /// Blank and comment lines are skipped. Bytes that are not UTF-8 are
    /// dropped from their line. Returns the number of statement lines read,
    /// duplicates included.
    pub fn ingest_reader<R: BufRead>(&mut self, mut reader: R) -> ProvResult<usize> {
        let mut count = 0;
        let mut lossy = 0;
        let mut buf = Vec::new();
        for number in 1.. {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| ProvError::io(format!("reading line {number}"), e))?;
            if n == 0 {
                break;
            }
            let line = match std::str::from_utf8(&buf) {
                Ok(text) => Cow::Borrowed(text),
                Err(_) => {
                    lossy += 1;
                    tracing::warn!(line = number, "dropping bytes that are not UTF-8");
                    Cow::Owned(utf8_only(&buf))
                }
            };
            if let Some(quad) = nquads::parse_line(&line, number)? {
                self.insert(&quad)?;
                count += 1;
            }
        }
        tracing::debug!(
            lines = count,
            lossy,
            statements = self.statements.len(),
            nodes = self.nodes.len(),
            "ingest complete"
        );
        Ok(count)
    }

    /// Intern an already parsed statement.
    pub fn insert(&mut self, quad: &QuadRef<'_>) -> ProvResult<StatementId> {
        let key = canonical_key(quad);
        if let Some(&id) = self.statement_lookup.get(&key) {
            return Ok(id);
        }

        let id = StatementId::next(self.statements.len(), "statements")?;
        let subject = self.intern_node(quad.subject)?;
        let predicate = self.intern_verb(quad.predicate)?;
        let object = self.intern_node(quad.object)?;
        let graph = quad.graph.map(|g| self.intern_node(g)).transpose()?;

        self.statements.push(Statement {
            subject,
            predicate,
            object,
            graph,
        });
        self.nodes[subject.index()].outward.push(id);
        self.nodes[object.index()].inward.push(id);
        self.verbs[predicate.index()].statements.push(id);
        self.statement_lookup.insert(key, id);
        Ok(id)
    }

    fn intern_node(&mut self, text: &str) -> ProvResult<NodeId> {
        let text = text.trim();
        if let Some(&id) = self.node_lookup.get(text) {
            return Ok(id);
        }
        let id = NodeId::next(self.nodes.len(), "nodes")?;
        self.nodes.push(Node {
            term: Term::new(text),
            inward: Vec::new(),
            outward: Vec::new(),
        });
        self.node_lookup.insert(text.into(), id);
        Ok(id)
    }

    fn intern_verb(&mut self, text: &str) -> ProvResult<VerbId> {
        let text = text.trim();
        if let Some(&id) = self.verb_lookup.get(text) {
            return Ok(id);
        }
        let id = VerbId::next(self.verbs.len(), "verbs")?;
        self.verbs.push(Verb {
            term: Term::new(text),
            statements: Vec::new(),
        });
        self.verb_lookup.insert(text.into(), id);
        Ok(id)
    }

    /// Look up a node by its exact lexical text.
    pub fn node_id(&self, text: &str) -> Option<NodeId> {
        self.node_lookup.get(text.trim()).copied()
    }

    /// Look up a verb by its exact lexical text.
    pub fn verb_id(&self, text: &str) -> Option<VerbId> {
        self.verb_lookup.get(text.trim()).copied()
    }

    /// Look up a previously ingested statement by its text.
    pub fn statement_id(&self, line: &str) -> Option<StatementId> {
        let quad = nquads::parse_statement(line).ok()?;
        self.statement_lookup.get(&canonical_key(&quad)).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn verb(&self, id: VerbId) -> &Verb {
        &self.verbs[id.index()]
    }

    pub fn statement(&self, id: StatementId) -> &Statement {
        &self.statements[id.index()]
    }

    /// The statement's terms as text.
    pub fn quad(&self, id: StatementId) -> QuadRef<'_> {
        let s = self.statement(id);
        QuadRef {
            subject: self.node(s.subject).term.text(),
            predicate: self.verb(s.predicate).term.text(),
            object: self.node(s.object).term.text(),
            graph: s.graph.map(|g| self.node(g).term.text()),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn verb_count(&self) -> usize {
        self.verbs.len()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    pub fn verb_ids(&self) -> impl Iterator<Item = VerbId> + '_ {
        (0..self.verbs.len()).map(VerbId::from_index)
    }

    /// All statements in ingestion order.
    pub fn statement_ids(&self) -> impl Iterator<Item = StatementId> + '_ {
        (0..self.statements.len()).map(StatementId::from_index)
    }

    /// Statements matching `pattern`, in ingestion order.
    ///
    /// Exact subject, object or predicate constraints narrow the scan to the
    /// corresponding adjacency list; a constraint naming unknown text yields
    /// no results.
    pub fn query(&self, pattern: &QuadPattern) -> Vec<StatementId> {
        let candidates: &[StatementId] = match (&pattern.subject, &pattern.object, &pattern.predicate) {
            (TermPattern::Exact(s), _, _) => match self.node_id(s) {
                Some(id) => self.node(id).outward(),
                None => return Vec::new(),
            },
            (_, TermPattern::Exact(o), _) => match self.node_id(o) {
                Some(id) => self.node(id).inward(),
                None => return Vec::new(),
            },
            (_, _, TermPattern::Exact(p)) => match self.verb_id(p) {
                Some(id) => self.verb(id).statements(),
                None => return Vec::new(),
            },
            _ => {
                return self
                    .statement_ids()
                    .filter(|&id| self.matches_pattern(id, pattern))
                    .collect();
            }
        };
        let mut hits: Vec<StatementId> = candidates
            .iter()
            .copied()
            .filter(|&id| self.matches_pattern(id, pattern))
            .collect();
        hits.sort_unstable();
        hits
    }

    fn matches_pattern(&self, id: StatementId, pattern: &QuadPattern) -> bool {
        let s = self.statement(id);
        term_matches(&pattern.subject, Some(&self.node(s.subject).term))
            && term_matches(&pattern.predicate, Some(&self.verb(s.predicate).term))
            && term_matches(&pattern.object, Some(&self.node(s.object).term))
            && term_matches(&pattern.graph, s.graph.map(|g| &self.node(g).term))
    }

    /// Number of nodes of each concrete [`TermKind`].
    pub fn kind_counts(&self) -> Vec<(TermKind, usize)> {
        TermKind::CONCRETE
            .iter()
            .map(|&kind| {
                let n = self.nodes.iter().filter(|n| n.term.kind() == kind).count();
                (kind, n)
            })
            .collect()
    }
}

/// Uses the cached kind instead of re-classifying.
fn term_matches(pattern: &TermPattern, term: Option<&Term>) -> bool {
    match (pattern, term) {
        (TermPattern::Any, _) => true,
        (TermPattern::Exact(text), Some(term)) => term == text.as_str(),
        (TermPattern::Kind(kind), Some(term)) => kind.admits(term.kind()),
        (_, None) => false,
    }
}

/// The valid UTF-8 runs of `bytes`, with everything else left out.
fn utf8_only(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn canonical_key(quad: &QuadRef<'_>) -> String {
    let mut key = String::with_capacity(
        quad.subject.len() + quad.predicate.len() + quad.object.len() + 3,
    );
    key.push_str(quad.subject.trim());
    key.push('\t');
    key.push_str(quad.predicate.trim());
    key.push('\t');
    key.push_str(quad.object.trim());
    if let Some(graph) = quad.graph {
        key.push('\t');
        key.push_str(graph.trim());
    }
    key
}

impl std::fmt::Debug for GraphIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphIndex")
            .field("nodes", &self.node_count())
            .field("verbs", &self.verb_count())
            .field("statements", &self.statement_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab;

    const HASH: &str = "<hash://sha256/0000000000000000000000000000000000000000000000000000000000000001>";

    fn line(s: &str, p: &str, o: &str) -> String {
        format!("{s} {p} {o} .")
    }

    #[test]
    fn ingest_and_lookup() {
        let mut idx = GraphIndex::new();
        let id = idx
            .ingest(&line("<https://gbif.org>", vocab::HAS_VERSION, HASH))
            .unwrap();

        assert_eq!(idx.statement_count(), 1);
        assert_eq!(idx.node_count(), 2);
        assert_eq!(idx.verb_count(), 1);

        let url = idx.node_id("<https://gbif.org>").unwrap();
        let hash = idx.node_id(HASH).unwrap();
        assert_eq!(idx.node(url).term().kind(), TermKind::Url);
        assert_eq!(idx.node(hash).term().kind(), TermKind::ContentHash);
        assert_eq!(idx.node(url).outward(), &[id]);
        assert_eq!(idx.node(hash).inward(), &[id]);
    }

    #[test]
    fn ingest_is_idempotent() {
        let mut idx = GraphIndex::new();
        let text = line("<a>", "<p>", "<b>");
        let first = idx.ingest(&text).unwrap();
        let second = idx.ingest(&text).unwrap();
        // Same statement, different whitespace.
        let third = idx.ingest("<a>\t<p>  <b>\t.").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(idx.statement_count(), 1);
        let a = idx.node_id("<a>").unwrap();
        assert_eq!(idx.node(a).outward().len(), 1);
        let p = idx.verb_id("<p>").unwrap();
        assert_eq!(idx.verb(p).statements().len(), 1);
    }

    #[test]
    fn graph_label_distinguishes_statements() {
        let mut idx = GraphIndex::new();
        let a = idx.ingest("<a> <p> <b> .").unwrap();
        let b = idx.ingest("<a> <p> <b> <g> .").unwrap();
        assert_ne!(a, b);
        let g = idx.node_id("<g>").unwrap();
        assert!(idx.statement(b).matches(None, None, None, Some(g)));
        assert!(!idx.statement(a).matches(None, None, None, Some(g)));
    }

    #[test]
    fn adjacency_invariant_holds() {
        let mut idx = GraphIndex::new();
        for text in [
            "<a> <p> <b> .",
            "<b> <p> <c> .",
            "<a> <q> <c> <g> .",
            "<c> <q> \"lit\" .",
            "<a> <p> <b> .",
        ] {
            idx.ingest(text).unwrap();
        }
        for id in idx.statement_ids() {
            let s = *idx.statement(id);
            assert!(idx.node(s.subject).outward().contains(&id));
            assert!(idx.node(s.object).inward().contains(&id));
            assert!(idx.verb(s.predicate).statements().contains(&id));
        }
        assert_eq!(idx.statement_count(), 4);
    }

    #[test]
    fn lookups_do_not_create_entries() {
        let mut idx = GraphIndex::new();
        idx.ingest("<a> <p> <b> .").unwrap();
        assert!(idx.node_id("<zzz>").is_none());
        assert!(idx.verb_id("<a>").is_none());
        assert!(idx.statement_id("<b> <p> <a> .").is_none());
        assert!(idx.statement_id("<a> <p> <b> .").is_some());
        assert_eq!(idx.node_count(), 2);
    }

    #[test]
    fn malformed_line_is_rejected_without_side_effects() {
        let mut idx = GraphIndex::new();
        assert!(idx.ingest("<a> <p> .").is_err());
        assert_eq!(idx.node_count(), 0);
        assert_eq!(idx.statement_count(), 0);
    }

    #[test]
    fn query_by_pattern() {
        let mut idx = GraphIndex::new();
        idx.ingest(&line("<https://gbif.org>", vocab::HAS_VERSION, HASH)).unwrap();
        idx.ingest(&line(HASH, vocab::HAD_MEMBER, "<https://api.gbif.org/v1/dataset?offset=0>"))
            .unwrap();
        idx.ingest(&line("<urn:uuid:0659a54f-b713-4f86-a917-5be166a14110>", vocab::TYPE, vocab::ACTIVITY))
            .unwrap();

        let versions = idx.query(&QuadPattern::any().predicate(vocab::HAS_VERSION));
        assert_eq!(versions.len(), 1);

        let from_hash = idx.query(&QuadPattern::any().subject(HASH));
        assert_eq!(from_hash.len(), 1);
        assert_eq!(idx.quad(from_hash[0]).predicate, vocab::HAD_MEMBER);

        let to_hash = idx.query(&QuadPattern::any().object(HASH));
        assert_eq!(to_hash.len(), 1);

        let uuids = idx.query(&QuadPattern::any().subject(TermKind::Uuid));
        assert_eq!(uuids.len(), 1);

        assert!(idx.query(&QuadPattern::any().subject("<nope>")).is_empty());
        assert_eq!(idx.query(&QuadPattern::any()).len(), 3);
    }

    #[test]
    fn ingest_reader_skips_blank_and_comment_lines() {
        let input = "# header\n<a> <p> <b> .\n\n<a> <p> <b> .\n<b> <p> <c> .\n";
        let mut idx = GraphIndex::new();
        let n = idx.ingest_reader(std::io::Cursor::new(input)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(idx.statement_count(), 2);
    }

    #[test]
    fn ingest_reader_reports_line_number() {
        let input = "<a> <p> <b> .\n<a> <p>\n";
        let mut idx = GraphIndex::new();
        let err = idx.ingest_reader(std::io::Cursor::new(input)).unwrap_err();
        assert!(matches!(err, ProvError::Parse(ref e) if e.line() == 2));
    }

    #[test]
    fn ingest_reader_drops_invalid_utf8() {
        let input: &[u8] = b"<a> <p> \"caf\xe9\" .\n<b> <p> <c> .\n";
        let mut idx = GraphIndex::new();
        assert_eq!(idx.ingest_reader(input).unwrap(), 2);
        assert!(idx.node_id("\"caf\"").is_some());
        assert!(idx.statement_id("<b> <p> <c> .").is_some());
    }

    #[test]
    fn kind_counts() {
        let mut idx = GraphIndex::new();
        idx.ingest(&line("<https://gbif.org>", vocab::HAS_VERSION, HASH)).unwrap();
        idx.ingest("_:b <p> \"x\" .").unwrap();
        let counts: HashMap<_, _> = idx.kind_counts().into_iter().collect();
        assert_eq!(counts[&TermKind::Url], 1);
        assert_eq!(counts[&TermKind::ContentHash], 1);
        assert_eq!(counts[&TermKind::Raw], 2);
        assert_eq!(counts[&TermKind::Uuid], 0);
    }
}
