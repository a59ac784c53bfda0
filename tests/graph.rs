//! Graph index, patch and stats over a whole crawl log.

use std::collections::HashSet;
use std::io::Cursor;

use provlog::generation::SequentialIds;
use provlog::graph::GraphIndex;
use provlog::nquads::{self, QuadPattern};
use provlog::patch;
use provlog::stats::GraphStats;
use provlog::term::TermKind;
use provlog::vocab;

const CRAWL: &str = include_str!("data/crawl.nq");

fn crawl_index() -> GraphIndex {
    let mut index = GraphIndex::new();
    let lines = index.ingest_reader(Cursor::new(CRAWL)).unwrap();
    assert_eq!(lines, CRAWL.lines().count());
    index
}

#[test]
fn adjacency_covers_every_statement() {
    let index = crawl_index();
    for id in index.statement_ids() {
        let s = index.statement(id);
        assert!(index.node(s.subject).outward().contains(&id));
        assert!(index.node(s.object).inward().contains(&id));
        assert!(index.verb(s.predicate).statements().contains(&id));
    }
    let total: usize = index.verb_ids().map(|v| index.verb(v).statements().len()).sum();
    assert_eq!(total, index.statement_count());
}

#[test]
fn reingesting_the_log_changes_nothing() {
    let mut index = crawl_index();
    let before = (index.node_count(), index.verb_count(), index.statement_count());
    let first: Vec<_> = CRAWL.lines().map(|l| index.statement_id(l).unwrap()).collect();

    index.ingest_reader(Cursor::new(CRAWL)).unwrap();
    assert_eq!(before, (index.node_count(), index.verb_count(), index.statement_count()));
    for (line, id) in CRAWL.lines().zip(first) {
        assert_eq!(index.ingest(line).unwrap(), id);
    }
    for id in index.statement_ids() {
        let s = index.statement(id);
        let out = index.node(s.subject).outward();
        assert_eq!(out.iter().filter(|&&x| x == id).count(), 1);
    }
}

#[test]
fn statements_serialize_back_to_their_lines() {
    let index = crawl_index();
    for (line, id) in CRAWL.lines().zip(index.statement_ids()) {
        assert_eq!(index.quad(id).to_string(), line);
    }
}

#[test]
fn lookups_never_create_entries() {
    let index = crawl_index();
    let nodes = index.node_count();
    assert!(index.node_id("<https://example.org/unknown>").is_none());
    assert!(index.verb_id(vocab::WAS_GENERATED_BY).is_none());
    assert!(index.statement_id("<a> <b> <c> .").is_none());
    assert_eq!(index.node_count(), nodes);
}

#[test]
fn terms_are_classified() {
    let index = crawl_index();
    let kind = |text: &str| index.node(index.node_id(text).unwrap()).term().kind();
    assert_eq!(kind("<https://gbif.org>"), TermKind::Url);
    assert_eq!(kind("<urn:uuid:0659a54f-b713-4f86-a917-5be166a14110>"), TermKind::Uuid);
    assert_eq!(
        kind("<hash://sha256/1111111111111111111111111111111111111111111111111111111111111111>"),
        TermKind::ContentHash
    );
    assert_eq!(kind("\"A herbarium \\\"sheet\\\".\"@en"), TermKind::Raw);
}

#[test]
fn queries_by_kind_and_predicate() {
    let index = crawl_index();
    let downloads = index.query(
        &QuadPattern::any()
            .subject(TermKind::Url)
            .predicate(vocab::HAS_VERSION)
            .object(TermKind::ContentHash),
    );
    assert_eq!(downloads.len(), 6);
    let members = index.query(&QuadPattern::any().predicate(vocab::HAD_MEMBER));
    assert_eq!(members.len(), 7);
    let mut seen = HashSet::new();
    for id in members {
        assert!(seen.insert(id));
    }
}

#[test]
fn patch_adds_one_generation_per_download() {
    let index = crawl_index();
    let mut ids = SequentialIds::default();
    let mut out = Vec::new();
    let generations = patch::write_patch(&index, &mut ids, &mut out).unwrap();
    assert_eq!(generations, 6);

    let text = String::from_utf8(out).unwrap();
    let quads: Vec<_> = text
        .lines()
        .map(|l| nquads::parse_statement(l).unwrap().to_quad())
        .collect();
    assert_eq!(quads.len(), 24);
    for block in quads.chunks(4) {
        assert_eq!(block[0].predicate, vocab::QUALIFIED_GENERATION);
        assert_eq!(block[2].object, "<urn:uuid:0659a54f-b713-4f86-a917-5be166a14110>");
        assert_eq!(TermKind::classify(&block[0].subject), TermKind::ContentHash);
        assert_eq!(TermKind::classify(&block[3].object), TermKind::Url);
    }

    // The patched log ingests cleanly on top of the original.
    let mut patched = crawl_index();
    patched.ingest_reader(Cursor::new(text)).unwrap();
    assert_eq!(patched.statement_count(), index.statement_count() + 24);
}

#[test]
fn stats_summarize_the_log() {
    let stats = GraphStats::collect(&crawl_index());
    assert_eq!(stats.statements, 23);
    assert_eq!(stats.kinds["content-hash"], 6);
    let has_version = stats
        .predicates
        .iter()
        .find(|p| p.predicate == vocab::HAS_VERSION)
        .unwrap();
    assert_eq!(has_version.statements, 6);
}
