//! Destination sinks.
//!
//! Every line leaving the window comes through [`Output::emit`], which runs
//! the rewrite hook and writes the result to each sink on the line's route.

use std::io::Write;

use crate::error::PartitionError;
use crate::rewrite::{RewriteStats, Rewriter};

use super::PartitionResult;
use super::window::Queued;

/// A named destination.
pub struct Sink<W> {
    name: String,
    writer: W,
    lines: usize,
}

impl<W: Write> Sink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            lines: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn write_line(&mut self, text: &str) -> PartitionResult<()> {
        let io = |source| PartitionError::Io {
            target: self.name.clone(),
            source,
        };
        self.writer.write_all(text.as_bytes()).map_err(io)?;
        if !text.ends_with('\n') {
            self.writer.write_all(b"\n").map_err(io)?;
        }
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> PartitionResult<()> {
        self.writer.flush().map_err(|source| PartitionError::Io {
            target: self.name.clone(),
            source,
        })
    }
}

impl<W> std::fmt::Debug for Sink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.name)
            .field("lines", &self.lines)
            .finish()
    }
}

#[derive(Debug)]
pub struct Output<W> {
    sinks: Vec<Sink<W>>,
    rewriter: Rewriter,
    discarded: usize,
}

impl<W: Write> Output<W> {
    pub fn new(sinks: Vec<Sink<W>>, rewriter: Rewriter) -> Self {
        Self {
            sinks,
            rewriter,
            discarded: 0,
        }
    }

    /// Rewrite a flushed line and write it to every sink on its route.
    ///
    /// `upcoming` are the texts of the lines still held in the window after it.
    pub fn emit<'u>(
        &mut self,
        queued: &Queued,
        upcoming: impl IntoIterator<Item = &'u str>,
    ) -> PartitionResult<()> {
        let Queued { route, line } = queued;
        if route.is_discard() {
            self.rewriter.observe(&line.text, line.number)?;
            self.discarded += 1;
            tracing::trace!(line = line.number, "discarded");
            return Ok(());
        }
        let texts = self.rewriter.rewrite(&line.text, line.number, upcoming)?;
        for index in route.sinks() {
            let Some(sink) = self.sinks.get_mut(index) else {
                continue;
            };
            for text in &texts {
                sink.write_line(text)?;
            }
        }
        Ok(())
    }

    pub fn sinks(&self) -> &[Sink<W>] {
        &self.sinks
    }

    pub fn rewrite_stats(&self) -> RewriteStats {
        self.rewriter.stats()
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Flush every writer and hand the sinks back.
    pub fn finish(mut self) -> PartitionResult<Vec<Sink<W>>> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(self.sinks)
    }
}
