//! Executing a [`Plan`] over a [`Partitioner`].
//!
//! The plan's steps run in order once per crawl run, with a fresh set of
//! variables each time, until the input is exhausted. An optional search
//! that gives up (end of input, or the next run-start marker) ends the run
//! early: the remaining steps are skipped and the plan restarts at the
//! marker.

use std::io::{BufRead, Write};

use crate::config::{ConfigError, SplitConfig};
use crate::error::{PartitionError, ProvResult};
use crate::generation::IdSource;
use crate::nquads;
use crate::rewrite::Rewriter;

use super::plan::{Bindings, Op, Plan};
use super::{PartitionResult, Partitioner, Sink, Summary};

/// What happened over all runs of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub runs: usize,
    /// `(run, step)` of every optional section found absent.
    pub absent: Vec<(usize, usize)>,
}

enum Outcome {
    Complete,
    /// An optional search ran into the next run.
    Absent(usize),
    /// An optional search ran out of input.
    Ended(usize),
}

impl<R: BufRead, W: Write> Partitioner<R, W> {
    /// Run `plan` repeatedly until the input is exhausted.
    ///
    /// Queued lines are not flushed; call [`Partitioner::finish`] afterwards.
    pub fn run(&mut self, plan: &Plan) -> PartitionResult<RunReport> {
        let mut report = RunReport::default();
        while !self.is_exhausted() {
            self.begin_run();
            let start = self.run_started_at;
            report.runs += 1;
            tracing::info!(run = report.runs, line = start, plan = plan.name(), "run started");
            match self.run_once(plan, report.runs)? {
                Outcome::Complete => tracing::info!(run = report.runs, "run complete"),
                Outcome::Absent(step) => {
                    tracing::info!(run = report.runs, step, "section absent, skipping to next run");
                    report.absent.push((report.runs, step));
                }
                Outcome::Ended(step) => tracing::info!(run = report.runs, step, "input ended"),
            }
            if !self.is_exhausted() && self.window.position() <= start {
                return Err(PartitionError::Stalled { line: start });
            }
        }
        self.step = 0;
        Ok(report)
    }

    fn run_once(&mut self, plan: &Plan, run: usize) -> PartitionResult<Outcome> {
        let mut vars = Bindings::new();
        for (i, step) in plan.steps().iter().enumerate() {
            let number = i + 1;
            self.step = number;
            if let Some(label) = &step.label {
                tracing::info!(run, step = number, "{label}");
            }
            match &step.op {
                Op::Until { to, pattern, required } => {
                    let pattern = pattern.resolve(&vars, number)?;
                    if self.echo_until(plan.route(to), &pattern, *required)?.is_none() {
                        return Ok(self.gave_up(number));
                    }
                }
                Op::UpTo { to, pattern, required } => {
                    let pattern = pattern.resolve(&vars, number)?;
                    if self.echo_up_to(plan.route(to), &pattern, *required)?.is_none() {
                        return Ok(self.gave_up(number));
                    }
                }
                Op::Capture { name, back, field } => {
                    let quad = self.look_back(*back)?;
                    let value = quad.as_quad_ref().get(*field).ok_or_else(|| {
                        PartitionError::MissingField {
                            position: *back,
                            field: field.to_string(),
                        }
                    })?;
                    tracing::debug!(run, step = number, variable = %name, %value, "captured");
                    vars.insert(name.clone(), value.to_string());
                }
                Op::RewindIf { probe, pattern, count } => {
                    let pattern = pattern.resolve(&vars, number)?;
                    let queued = self.window.look_back(*probe)?;
                    let hit = matches!(
                        nquads::parse_line(&queued.line.text, queued.line.number)?,
                        Some(quad) if pattern.matches(&quad)
                    );
                    if hit {
                        tracing::debug!(run, step = number, count, "provisional routing undone");
                        self.rewind(*count)?;
                    }
                }
            }
        }
        Ok(Outcome::Complete)
    }

    fn gave_up(&self, step: usize) -> Outcome {
        if self.is_exhausted() {
            Outcome::Ended(step)
        } else {
            Outcome::Absent(step)
        }
    }
}

/// Split `input` by `plan` into `writers`, one per plan sink in order.
pub fn split<R: BufRead, W: Write>(
    input: R,
    plan: &Plan,
    writers: Vec<W>,
    config: &SplitConfig,
    ids: Box<dyn IdSource>,
) -> ProvResult<(RunReport, Summary<W>)> {
    if writers.len() != plan.sinks().len() {
        return Err(ConfigError::Invalid {
            origin: plan.name().to_string(),
            message: format!("{} writers for {} sinks", writers.len(), plan.sinks().len()),
        }
        .into());
    }
    if config.window < plan.reach() {
        return Err(ConfigError::Invalid {
            origin: plan.name().to_string(),
            message: format!(
                "window {} is smaller than the deepest look-back or rewind ({})",
                config.window,
                plan.reach()
            ),
        }
        .into());
    }

    let rewriter = config
        .relabelings()
        .fold(Rewriter::new(plan.run_start().clone(), ids), |rw, (wrong, right)| {
            rw.relabel(wrong, right)
        });
    let sinks = plan
        .sinks()
        .iter()
        .zip(writers)
        .map(|(name, writer)| Sink::new(name.as_str(), writer))
        .collect();

    let mut partitioner = Partitioner::new(input, sinks, rewriter, config.window)?
        .stop_at(plan.run_start().clone());
    let report = partitioner.run(plan)?;
    let summary = partitioner.finish()?;
    tracing::info!(
        runs = report.runs,
        lines = summary.lines_read,
        synthesized = summary.rewrite.synthesized,
        relabeled = summary.rewrite.relabeled,
        "split complete"
    );
    if summary.rewrite.unattributed > 0 {
        tracing::warn!(
            count = summary.rewrite.unattributed,
            "versions left without a generation because no crawl activity was known"
        );
    }
    Ok((report, summary))
}
