//! Stream partitioning of a crawl log into per-source logs.
//!
//! A [`Partitioner`] reads the log once, line by line, and routes every line
//! to zero or more named sinks. Routing decisions are made by searching
//! forward for marker statements ([`Partitioner::echo_until`],
//! [`Partitioner::echo_up_to`]), reading back identifiers from lines just
//! routed ([`Partitioner::look_back`]) and occasionally undoing a provisional
//! decision ([`Partitioner::rewind`]). Routed lines wait in a bounded queue
//! so a rewind can still reach them; once they fall out of it they are
//! rewritten and written for good.
//!
//! [`Plan`]s describe the per-source control flow declaratively; see
//! [`Partitioner::run`].

pub mod output;
pub mod plan;
pub mod runner;
pub mod window;

use std::io::{BufRead, Write};

use crate::error::PartitionError;
use crate::nquads::{self, Quad, QuadPattern};
use crate::rewrite::{RewriteStats, Rewriter};

pub use output::{Output, Sink};
pub use plan::{Bindings, Op, PatternSpec, Plan, PlanTerm, Step};
pub use runner::RunReport;
pub use window::{Line, Queued, Window};

pub type PartitionResult<T> = std::result::Result<T, PartitionError>;

/// The set of sinks a line is written to, as a bitmask over sink indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Route(u64);

impl Route {
    /// Written nowhere.
    pub const DISCARD: Route = Route(0);
    pub const MAX_SINKS: usize = 64;

    pub fn to(sink: usize) -> Self {
        Self::DISCARD.with(sink)
    }

    /// Every one of the first `count` sinks.
    pub fn all(count: usize) -> Self {
        if count >= Self::MAX_SINKS {
            Route(u64::MAX)
        } else {
            Route((1u64 << count) - 1)
        }
    }

    pub fn with(self, sink: usize) -> Self {
        debug_assert!(sink < Self::MAX_SINKS);
        Route(self.0 | (1u64 << sink))
    }

    pub fn contains(self, sink: usize) -> bool {
        sink < Self::MAX_SINKS && self.0 & (1u64 << sink) != 0
    }

    pub fn is_discard(self) -> bool {
        self.0 == 0
    }

    /// Sink indices in ascending order.
    pub fn sinks(self) -> impl Iterator<Item = usize> {
        (0..Self::MAX_SINKS).filter(move |&i| self.contains(i))
    }
}

/// What a finished partition produced.
#[derive(Debug)]
pub struct Summary<W> {
    pub sinks: Vec<Sink<W>>,
    pub lines_read: usize,
    pub discarded: usize,
    pub rewrite: RewriteStats,
}

enum Probe {
    Match(Quad),
    Boundary,
    Pass,
}

pub struct Partitioner<R, W> {
    window: Window<R>,
    output: Output<W>,
    /// Run-start marker; optional searches stop in front of it.
    boundary: Option<QuadPattern>,
    /// Line the current run began on. The marker there does not stop a search.
    run_started_at: usize,
    /// Plan step being executed, for error reports.
    step: usize,
}

impl<R: BufRead, W: Write> Partitioner<R, W> {
    /// Partition `input` into `sinks`, keeping up to `capacity` routed lines
    /// rewindable.
    pub fn new(input: R, sinks: Vec<Sink<W>>, rewriter: Rewriter, capacity: usize) -> PartitionResult<Self> {
        let window = Window::new(input, capacity)?;
        Ok(Self {
            run_started_at: window.position(),
            window,
            output: Output::new(sinks, rewriter),
            boundary: None,
            step: 0,
        })
    }

    /// Make searches with `required = false` give up at a run-start marker.
    pub fn stop_at(mut self, run_start: QuadPattern) -> Self {
        self.boundary = Some(run_start);
        self
    }

    /// Mark the current line as the start of a new run.
    pub fn begin_run(&mut self) {
        self.run_started_at = self.window.position();
    }

    /// The next unrouted line.
    pub fn current(&self) -> Option<&Line> {
        self.window.current()
    }

    pub fn is_exhausted(&self) -> bool {
        self.window.current().is_none()
    }

    /// Number of routed lines still in the queue.
    pub fn buffered(&self) -> usize {
        self.window.buffered()
    }

    /// Route lines to `to` until one matches `pattern`, leaving the match
    /// unrouted as the current line.
    ///
    /// Returns `None` when an optional search hits the end of input or the
    /// run-start marker; a required search fails instead.
    pub fn echo_until(&mut self, to: Route, pattern: &QuadPattern, required: bool) -> PartitionResult<Option<Quad>> {
        self.echo(to, pattern, required, false)
    }

    /// Like [`Partitioner::echo_until`] but also routes the matching line.
    pub fn echo_up_to(&mut self, to: Route, pattern: &QuadPattern, required: bool) -> PartitionResult<Option<Quad>> {
        self.echo(to, pattern, required, true)
    }

    fn echo(&mut self, to: Route, pattern: &QuadPattern, required: bool, inclusive: bool) -> PartitionResult<Option<Quad>> {
        loop {
            let probe = match self.window.current() {
                None => break,
                Some(line) => match nquads::parse_line(&line.text, line.number)? {
                    Some(quad) if pattern.matches(&quad) => Probe::Match(quad.to_quad()),
                    Some(quad)
                        if !required
                            && line.number != self.run_started_at
                            && self.boundary.as_ref().is_some_and(|b| b.matches(&quad)) =>
                    {
                        Probe::Boundary
                    }
                    _ => Probe::Pass,
                },
            };
            match probe {
                Probe::Match(quad) => {
                    tracing::trace!(line = self.window.position(), %pattern, "matched");
                    if inclusive {
                        self.advance(to)?;
                    }
                    return Ok(Some(quad));
                }
                Probe::Boundary => {
                    tracing::debug!(line = self.window.position(), %pattern, "run start reached before match");
                    return Ok(None);
                }
                Probe::Pass => self.advance(to)?,
            }
        }
        if required {
            return Err(PartitionError::PatternNotFound {
                step: self.step,
                pattern: pattern.to_string(),
                line: self.window.lines_read(),
            });
        }
        tracing::debug!(%pattern, "end of input before match");
        Ok(None)
    }

    fn advance(&mut self, to: Route) -> PartitionResult<()> {
        self.window.advance(to)?;
        while let Some(queued) = self.window.take_overflow() {
            self.output.emit(&queued, self.window.upcoming())?;
        }
        Ok(())
    }

    /// The statement of the `n`-th most recently routed line (0 is newest).
    pub fn look_back(&self, n: usize) -> PartitionResult<Quad> {
        let queued = self.window.look_back(n)?;
        match nquads::parse_line(&queued.line.text, queued.line.number)? {
            Some(quad) => Ok(quad.to_quad()),
            None => Err(PartitionError::NotAStatement { position: n }),
        }
    }

    /// Un-route the `n` most recently routed lines; they are read again next.
    pub fn rewind(&mut self, n: usize) -> PartitionResult<()> {
        self.window.rewind(n)
    }

    /// Write out every queued line. Nothing before this point can be
    /// rewound afterwards.
    pub fn flush(&mut self) -> PartitionResult<()> {
        while let Some(queued) = self.window.take_oldest() {
            self.output.emit(&queued, self.window.upcoming())?;
        }
        Ok(())
    }

    /// Flush everything and return the sinks.
    pub fn finish(mut self) -> PartitionResult<Summary<W>> {
        self.flush()?;
        let lines_read = self.window.lines_read();
        let discarded = self.output.discarded();
        let rewrite = self.output.rewrite_stats();
        let sinks = self.output.finish()?;
        for sink in &sinks {
            tracing::info!(sink = sink.name(), lines = sink.lines(), "sink written");
        }
        Ok(Summary {
            sinks,
            lines_read,
            discarded,
            rewrite,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::generation::SequentialIds;
    use crate::vocab;

    const LOG: &str = "\
<http://s1> <http://p> <http://o1> .
<http://s2> <http://p> <http://o2> .
<http://s3> <http://q> <http://o3> .
<http://s4> <http://p> <http://o4> .
<http://s5> <http://q> <http://o5> .
";

    fn partitioner(log: &'static str, capacity: usize) -> Partitioner<Cursor<&'static str>, Vec<u8>> {
        let rewriter = Rewriter::new(
            QuadPattern::any().subject(vocab::PRESTON),
            Box::new(SequentialIds::default()),
        );
        let sinks = vec![Sink::new("a", Vec::new()), Sink::new("b", Vec::new())];
        Partitioner::new(Cursor::new(log), sinks, rewriter, capacity).unwrap()
    }

    fn outputs(p: Partitioner<Cursor<&'static str>, Vec<u8>>) -> Vec<String> {
        p.finish()
            .unwrap()
            .sinks
            .into_iter()
            .map(|s| String::from_utf8(s.into_writer()).unwrap())
            .collect()
    }

    fn q() -> QuadPattern {
        QuadPattern::any().predicate("<http://q>")
    }

    #[test]
    fn route_bits() {
        let r = Route::to(0).with(2);
        assert!(r.contains(0));
        assert!(!r.contains(1));
        assert!(r.contains(2));
        assert_eq!(r.sinks().collect::<Vec<_>>(), vec![0, 2]);
        assert!(Route::DISCARD.is_discard());
        assert_eq!(Route::all(3).sinks().count(), 3);
        assert_eq!(Route::all(64).sinks().count(), 64);
    }

    #[test]
    fn echo_until_leaves_match_current() {
        let mut p = partitioner(LOG, 3);
        let quad = p.echo_until(Route::to(0), &q(), true).unwrap().unwrap();
        assert_eq!(quad.subject, "<http://s3>");
        assert_eq!(p.current().unwrap().number, 3);
        assert_eq!(p.buffered(), 2);
    }

    #[test]
    fn echo_up_to_routes_the_match() {
        let mut p = partitioner(LOG, 3);
        p.echo_up_to(Route::to(0), &q(), true).unwrap();
        assert_eq!(p.current().unwrap().number, 4);
        assert_eq!(p.look_back(0).unwrap().subject, "<http://s3>");
        p.echo_until(Route::to(1), &QuadPattern::any().subject("<nope>"), false).unwrap();
        let out = outputs(p);
        assert_eq!(out[0].lines().count(), 3);
        assert_eq!(out[1].lines().count(), 2);
    }

    #[test]
    fn required_search_fails_at_end_of_input() {
        let mut p = partitioner(LOG, 3);
        p.step = 9;
        let err = p.echo_until(Route::to(0), &QuadPattern::any().subject("<nope>"), true).unwrap_err();
        assert!(matches!(err, PartitionError::PatternNotFound { step: 9, line: 5, .. }));
    }

    #[test]
    fn optional_search_returns_none() {
        let mut p = partitioner(LOG, 3);
        let found = p.echo_up_to(Route::DISCARD, &QuadPattern::any().subject("<nope>"), false).unwrap();
        assert!(found.is_none());
        assert!(p.is_exhausted());
    }

    #[test]
    fn optional_search_stops_at_run_start() {
        let log = "\
<http://s1> <http://p> <http://o1> .
<https://preston.guoda.bio> <http://p> <http://o2> .
<http://s3> <http://q> <http://o3> .
";
        let mut p = partitioner(log, 3).stop_at(QuadPattern::any().subject(vocab::PRESTON));
        assert!(p.echo_up_to(Route::to(0), &q(), false).unwrap().is_none());
        assert_eq!(p.current().unwrap().number, 2);
        // Still the marker of a run that has not begun.
        assert!(p.echo_up_to(Route::to(1), &q(), false).unwrap().is_none());
        assert_eq!(p.current().unwrap().number, 2);
        // The marker the current run began on does not stop the search.
        p.begin_run();
        assert!(p.echo_up_to(Route::to(1), &q(), false).unwrap().is_some());
    }

    #[test]
    fn run_start_survives_rewind() {
        let log = "\
<https://preston.guoda.bio> <http://p> <http://o1> .
<http://s2> <http://p> <http://o2> .
<http://s3> <http://q> <http://o3> .
";
        let mut p = partitioner(log, 3).stop_at(QuadPattern::any().subject(vocab::PRESTON));
        p.echo_up_to(Route::to(0), &QuadPattern::any().subject("<http://s2>"), true).unwrap();
        p.rewind(2).unwrap();
        // Back on line 1, where the run began.
        assert!(p.echo_up_to(Route::to(1), &q(), false).unwrap().is_some());
    }

    #[test]
    fn look_back_out_of_range() {
        let p = partitioner(LOG, 3);
        assert!(matches!(
            p.look_back(0),
            Err(PartitionError::LookBackOutOfRange { requested: 0, buffered: 0 })
        ));
    }

    #[test]
    fn rewind_reroutes_lines() {
        let mut p = partitioner(LOG, 3);
        p.echo_up_to(Route::to(0), &q(), true).unwrap();
        p.rewind(2).unwrap();
        assert_eq!(p.current().unwrap().number, 2);
        p.echo_until(Route::to(1), &QuadPattern::any().subject("<nope>"), false).unwrap();
        let out = outputs(p);
        assert_eq!(out[0], "<http://s1> <http://p> <http://o1> .\n");
        assert_eq!(out[1].lines().count(), 4);
        assert!(out[1].starts_with("<http://s2>"));
    }

    #[test]
    fn rewind_past_flushed_lines_fails() {
        let mut p = partitioner(LOG, 2);
        p.echo_up_to(Route::to(0), &QuadPattern::any().subject("<http://s4>"), true).unwrap();
        assert_eq!(p.buffered(), 2);
        assert!(matches!(
            p.rewind(3),
            Err(PartitionError::RewindOutOfRange { requested: 3, buffered: 2 })
        ));
    }

    #[test]
    fn queue_stays_bounded() {
        let mut p = partitioner(LOG, 2);
        p.echo_until(Route::to(0), &QuadPattern::any().subject("<nope>"), false).unwrap();
        assert_eq!(p.buffered(), 2);
    }

    #[test]
    fn blank_lines_are_routed_but_never_match() {
        let log = "\n# comment\n<http://s> <http://q> <http://o> .\n";
        let mut p = partitioner(log, 3);
        let quad = p.echo_until(Route::to(1), &QuadPattern::any(), true).unwrap().unwrap();
        assert_eq!(quad.subject, "<http://s>");
        p.echo_until(Route::to(0), &QuadPattern::any().subject("<nope>"), false).unwrap();
        let out = outputs(p);
        assert_eq!(out[1], "\n# comment\n");
    }

    #[test]
    fn rewound_generation_counts_as_present() {
        let log = "\
<urn:uuid:0659a54f-b713-4f86-a917-5be166a14110> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/ns/prov#Activity> .
<http://a> <http://purl.org/pav/hasVersion> <hash://sha256/aa> .
<http://x> <http://p> <http://o> .
<hash://sha256/aa> <http://www.w3.org/ns/prov#qualifiedGeneration> <urn:uuid:22222222-2222-2222-2222-222222222222> .
<http://y> <http://p> <http://o> .
";
        let mut p = partitioner(log, 3);
        p.echo_up_to(Route::to(0), &QuadPattern::any().predicate(vocab::QUALIFIED_GENERATION), true)
            .unwrap();
        p.rewind(2).unwrap();
        // The hasVersion line is written while its generation sits behind the cursor.
        p.flush().unwrap();
        p.echo_until(Route::to(0), &QuadPattern::any().subject("<nope>"), false).unwrap();
        let summary = p.finish().unwrap();
        assert_eq!(summary.rewrite.synthesized, 0);
        let a = String::from_utf8(summary.sinks.into_iter().next().unwrap().into_writer()).unwrap();
        assert_eq!(a, log);
    }

    #[test]
    fn malformed_line_is_fatal() {
        let mut p = partitioner("<http://s> <http://p>\n", 3);
        let err = p.echo_until(Route::to(0), &q(), true).unwrap_err();
        assert!(matches!(err, PartitionError::Parse(_)));
    }
}
