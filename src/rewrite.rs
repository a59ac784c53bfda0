//! Flush-time line rewriting.
//!
//! Every line leaving the partition window passes through a [`Rewriter`]
//! exactly once, in input order. The rewriter tracks the [`CrawlContext`] and
//! turns one logical line into one or more physical lines:
//!
//! - `V prov:qualifiedGeneration G` records `V` as having a generation.
//! - A mislabeled predicate is replaced in place by its correct IRI.
//! - `U pav:hasVersion V` without a known generation for `V` is preceded by a
//!   synthesized qualified generation for (`V`, `U`, current crawl activity).
//! - Everything else passes through untouched.
//!
//! Routing never depends on the rewriter; it only sees lines whose
//! destinations are final.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::ParseError;
use crate::generation::{self, IdSource};
use crate::nquads::{self, QuadPattern, QuadRef};
use crate::vocab;

/// Scan state carried across the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlContext {
    /// The crawl activity of the current run.
    pub activity: Option<String>,
    /// The most recent version known to have a qualified generation.
    pub generated: Option<String>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub lines: usize,
    pub relabeled: usize,
    pub synthesized: usize,
    /// `hasVersion` lines that needed a generation but had no known activity.
    pub unattributed: usize,
}

pub struct Rewriter {
    context: CrawlContext,
    run_start: QuadPattern,
    mislabeled: HashMap<String, String>,
    ids: Box<dyn IdSource>,
    stats: RewriteStats,
}

impl Rewriter {
    pub fn new(run_start: QuadPattern, ids: Box<dyn IdSource>) -> Self {
        Self {
            context: CrawlContext::default(),
            run_start,
            mislabeled: HashMap::new(),
            ids,
            stats: RewriteStats::default(),
        }
    }

    /// Replace predicate `wrong` by `right` wherever it appears.
    pub fn relabel(mut self, wrong: impl Into<String>, right: impl Into<String>) -> Self {
        self.mislabeled.insert(wrong.into(), right.into());
        self
    }

    pub fn context(&self) -> &CrawlContext {
        &self.context
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    /// Rewrite one line.
    ///
    /// `upcoming` holds the later lines not written yet, including any a
    /// rewind put back; a qualified generation among them counts as already
    /// present.
    pub fn rewrite<'a, 'u>(
        &mut self,
        line: &'a str,
        line_no: usize,
        upcoming: impl IntoIterator<Item = &'u str>,
    ) -> Result<Vec<Cow<'a, str>>, ParseError> {
        self.stats.lines += 1;
        let Some(quad) = nquads::parse_line(line, line_no)? else {
            return Ok(vec![Cow::Borrowed(line)]);
        };

        self.track(&quad);

        if quad.predicate == vocab::QUALIFIED_GENERATION {
            self.context.generated = Some(quad.subject.to_string());
        } else if let Some(right) = self.mislabeled.get(quad.predicate) {
            self.stats.relabeled += 1;
            tracing::trace!(line = line_no, from = quad.predicate, to = %right, "relabeling predicate");
            return Ok(vec![Cow::Owned(splice(line, quad.predicate, right))]);
        } else if quad.predicate == vocab::HAS_VERSION && !self.has_generation(quad.object, upcoming) {
            return Ok(self.with_generation(line, line_no, &quad));
        }
        Ok(vec![Cow::Borrowed(line)])
    }

    /// Track a line that is dropped rather than written.
    pub fn observe(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        self.stats.lines += 1;
        if let Some(quad) = nquads::parse_line(line, line_no)? {
            self.track(&quad);
            if quad.predicate == vocab::QUALIFIED_GENERATION {
                self.context.generated = Some(quad.subject.to_string());
            }
        }
        Ok(())
    }

    /// Update the crawl context from a statement.
    fn track(&mut self, quad: &QuadRef<'_>) {
        if self.run_start.matches(quad) {
            tracing::debug!("run start, resetting crawl context");
            self.context = CrawlContext::default();
        } else if self.context.activity.is_none()
            && quad.predicate == vocab::TYPE
            && quad.object == vocab::ACTIVITY
        {
            tracing::debug!(activity = quad.subject, "crawl activity");
            self.context.activity = Some(quad.subject.to_string());
        }
    }

    fn has_generation<'u>(&self, version: &str, upcoming: impl IntoIterator<Item = &'u str>) -> bool {
        if self.context.generated.as_deref() == Some(version) {
            return true;
        }
        upcoming.into_iter().any(|text| {
            matches!(
                nquads::parse_line(text, 0),
                Ok(Some(q)) if q.predicate == vocab::QUALIFIED_GENERATION && q.subject == version
            )
        })
    }

    fn with_generation<'a>(&mut self, line: &'a str, line_no: usize, quad: &QuadRef<'_>) -> Vec<Cow<'a, str>> {
        let activity = match (self.context.activity.as_deref(), quad.graph) {
            (Some(activity), _) => activity.to_string(),
            (None, Some(graph)) => graph.to_string(),
            (None, None) => {
                self.stats.unattributed += 1;
                tracing::warn!(
                    line = line_no,
                    version = quad.object,
                    "no crawl activity known, leaving version without a generation"
                );
                return vec![Cow::Borrowed(line)];
            }
        };

        let block = generation::qualified_generation(quad.object, quad.subject, &activity, self.ids.as_mut());
        self.stats.synthesized += 1;
        self.context.generated = Some(quad.object.to_string());
        tracing::debug!(line = line_no, version = quad.object, used = quad.subject, "synthesized generation");

        let mut out: Vec<Cow<'a, str>> = block
            .into_iter()
            .map(|q| Cow::Owned(q.in_graph(quad.graph).to_string()))
            .collect();
        out.push(Cow::Borrowed(line));
        out
    }
}

/// Replace `term`, which must be a slice of `line`, by `replacement`.
fn splice(line: &str, term: &str, replacement: &str) -> String {
    let start = term.as_ptr() as usize - line.as_ptr() as usize;
    let end = start + term.len();
    let mut out = String::with_capacity(line.len() + replacement.len());
    out.push_str(&line[..start]);
    out.push_str(replacement);
    out.push_str(&line[end..]);
    out
}

impl std::fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rewriter")
            .field("context", &self.context)
            .field("mislabeled", &self.mislabeled)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::SequentialIds;

    const HASH: &str =
        "<hash://sha256/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa>";
    const CRAWL: &str = "<urn:uuid:0659a54f-b713-4f86-a917-5be166a14110>";
    const GEN: &str = "<urn:uuid:00000000-0000-0000-0000-000000000001>";

    fn rewriter() -> Rewriter {
        let run_start = QuadPattern::any()
            .subject(vocab::PRESTON)
            .predicate(vocab::TYPE)
            .object(vocab::SOFTWARE_AGENT);
        Rewriter::new(run_start, Box::new(SequentialIds::default()))
            .relabel(vocab::WAS_INFLUENCED_BY, vocab::WAS_INFORMED_BY)
    }

    fn run(rw: &mut Rewriter, line: &str) -> Vec<String> {
        rw.rewrite(line, 1, std::iter::empty())
            .unwrap()
            .into_iter()
            .map(Cow::into_owned)
            .collect()
    }

    fn has_version() -> String {
        format!("<http://a> {} {HASH} .\n", vocab::HAS_VERSION)
    }

    fn start_crawl(rw: &mut Rewriter) {
        run(rw, &format!("{CRAWL} {} {} .\n", vocab::TYPE, vocab::ACTIVITY));
    }

    #[test]
    fn unrelated_lines_pass_through() {
        let mut rw = rewriter();
        let line = "<a> <b> <c> .\n";
        assert_eq!(run(&mut rw, line), vec![line.to_string()]);
        assert_eq!(run(&mut rw, "\n"), vec!["\n".to_string()]);
    }

    #[test]
    fn activity_is_tracked() {
        let mut rw = rewriter();
        start_crawl(&mut rw);
        assert_eq!(rw.context().activity.as_deref(), Some(CRAWL));
        // Later activities are sub-activities of the crawl.
        run(&mut rw, &format!("<urn:uuid:11111111-1111-1111-1111-111111111111> {} {} .", vocab::TYPE, vocab::ACTIVITY));
        assert_eq!(rw.context().activity.as_deref(), Some(CRAWL));
    }

    #[test]
    fn run_start_resets_context() {
        let mut rw = rewriter();
        start_crawl(&mut rw);
        run(&mut rw, &format!("{} {} {} .", vocab::PRESTON, vocab::TYPE, vocab::SOFTWARE_AGENT));
        assert_eq!(rw.context(), &CrawlContext::default());
    }

    #[test]
    fn missing_generation_is_synthesized_before_the_line() {
        let mut rw = rewriter();
        start_crawl(&mut rw);
        let line = has_version();
        let out = run(&mut rw, &line);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], format!("{HASH} {} {GEN} .", vocab::QUALIFIED_GENERATION));
        assert_eq!(out[1], format!("{GEN} {} {} .", vocab::TYPE, vocab::GENERATION));
        assert_eq!(out[2], format!("{GEN} {} {CRAWL} .", vocab::PROV_ACTIVITY));
        assert_eq!(out[3], format!("{GEN} {} <http://a> .", vocab::USED));
        assert_eq!(out[4], line);
        assert_eq!(rw.stats().synthesized, 1);
        assert_eq!(rw.context().generated.as_deref(), Some(HASH));
    }

    #[test]
    fn earlier_generation_suppresses_synthesis() {
        let mut rw = rewriter();
        start_crawl(&mut rw);
        run(&mut rw, &format!("{HASH} {} <urn:uuid:22222222-2222-2222-2222-222222222222> .", vocab::QUALIFIED_GENERATION));
        let line = has_version();
        assert_eq!(run(&mut rw, &line), vec![line.clone()]);
        assert_eq!(rw.stats().synthesized, 0);
    }

    #[test]
    fn upcoming_generation_suppresses_synthesis() {
        let mut rw = rewriter();
        start_crawl(&mut rw);
        let line = has_version();
        let next = format!("{HASH} {} <urn:uuid:22222222-2222-2222-2222-222222222222> .\n", vocab::QUALIFIED_GENERATION);
        let out = rw.rewrite(&line, 2, [next.as_str()]).unwrap();
        assert_eq!(out, vec![Cow::Borrowed(line.as_str())]);
    }

    #[test]
    fn graph_label_is_used_without_known_activity() {
        let mut rw = rewriter();
        let line = format!("<http://a> {} {HASH} {CRAWL} .", vocab::HAS_VERSION);
        let out = run(&mut rw, &line);
        assert_eq!(out.len(), 5);
        assert_eq!(out[2], format!("{GEN} {} {CRAWL} {CRAWL} .", vocab::PROV_ACTIVITY));
    }

    #[test]
    fn no_activity_no_graph_leaves_line_alone() {
        let mut rw = rewriter();
        let line = has_version();
        assert_eq!(run(&mut rw, &line), vec![line.clone()]);
        assert_eq!(rw.stats().unattributed, 1);
    }

    #[test]
    fn mislabeled_predicate_is_replaced_in_place() {
        let mut rw = rewriter();
        let line = format!("{CRAWL}  {}\t{CRAWL} .\n", vocab::WAS_INFLUENCED_BY);
        let out = run(&mut rw, &line);
        assert_eq!(out, vec![format!("{CRAWL}  {}\t{CRAWL} .\n", vocab::WAS_INFORMED_BY)]);
        assert_eq!(rw.stats().relabeled, 1);
    }

    #[test]
    fn splice_replaces_only_the_slice() {
        let line = "<p> <p> <p> .";
        let quad = nquads::parse_statement(line).unwrap();
        assert_eq!(splice(line, quad.predicate, "<q>"), "<p> <q> <p> .");
    }

    #[test]
    fn observed_lines_update_context_only() {
        let mut rw = rewriter();
        rw.observe(&format!("{CRAWL} {} {} .", vocab::TYPE, vocab::ACTIVITY), 1).unwrap();
        rw.observe(&has_version(), 2).unwrap();
        assert_eq!(rw.context().activity.as_deref(), Some(CRAWL));
        assert_eq!(rw.stats().synthesized, 0);
        assert_eq!(rw.stats().lines, 2);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut rw = rewriter();
        assert!(rw.rewrite("<a> <b>", 3, std::iter::empty()).is_err());
    }
}
