//! The partition window: lookahead plus a bounded queue of unflushed output.
//!
//! Lines flow `input -> lookahead -> current -> pending -> (flushed)`. Only
//! [`Window::rewind`] moves lines backwards, from the newest end of `pending`
//! back in front of `current`, so they are read again in their original
//! order. Flushing always takes the oldest pending line, which keeps each
//! destination's output in input order.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::PartitionError;

use super::{PartitionResult, Route};

/// One raw input line and its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// A line whose destinations are decided but which is not written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queued {
    pub route: Route,
    pub line: Line,
}

pub struct Window<R> {
    input: R,
    lines_read: usize,
    /// Stack of lines to read before `input`; the last element is next.
    lookahead: Vec<Line>,
    current: Option<Line>,
    /// Oldest at the front, newest at the back.
    pending: VecDeque<Queued>,
    capacity: usize,
}

impl<R: BufRead> Window<R> {
    /// Create a window over `input` and read the first line.
    pub fn new(input: R, capacity: usize) -> PartitionResult<Self> {
        let mut window = Self {
            input,
            lines_read: 0,
            lookahead: Vec::new(),
            current: None,
            pending: VecDeque::with_capacity(capacity + 1),
            capacity,
        };
        window.current = window.read_next()?;
        Ok(window)
    }

    fn read_next(&mut self) -> PartitionResult<Option<Line>> {
        if let Some(line) = self.lookahead.pop() {
            return Ok(Some(line));
        }
        let mut text = String::new();
        let n = self
            .input
            .read_line(&mut text)
            .map_err(|source| PartitionError::Io {
                target: "input".into(),
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }
        self.lines_read += 1;
        Ok(Some(Line {
            number: self.lines_read,
            text,
        }))
    }

    /// The line under the cursor, not yet routed.
    pub fn current(&self) -> Option<&Line> {
        self.current.as_ref()
    }

    /// Line number of the cursor; one past the last line once exhausted.
    pub fn position(&self) -> usize {
        match &self.current {
            Some(line) => line.number,
            None => self.lines_read + 1,
        }
    }

    /// Number of lines read from the underlying input so far.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Queue the current line for `route` and move to the next one.
    ///
    /// The queue may now exceed its capacity by one; the caller drains the
    /// excess with [`Window::take_overflow`].
    pub fn advance(&mut self, route: Route) -> PartitionResult<()> {
        if let Some(line) = self.current.take() {
            tracing::trace!(line = line.number, ?route, "queued");
            self.pending.push_back(Queued { route, line });
        }
        self.current = self.read_next()?;
        Ok(())
    }

    /// Pop the oldest pending line if the queue is over capacity.
    pub fn take_overflow(&mut self) -> Option<Queued> {
        if self.pending.len() > self.capacity {
            self.pending.pop_front()
        } else {
            None
        }
    }

    /// Pop the oldest pending line regardless of capacity.
    pub fn take_oldest(&mut self) -> Option<Queued> {
        self.pending.pop_front()
    }

    /// Number of queued, unflushed lines.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The `n`-th most recently queued line (0 is the newest).
    pub fn look_back(&self, n: usize) -> PartitionResult<&Queued> {
        let buffered = self.pending.len();
        if n >= buffered {
            return Err(PartitionError::LookBackOutOfRange {
                requested: n,
                buffered,
            });
        }
        Ok(&self.pending[buffered - 1 - n])
    }

    /// Un-queue the `n` newest pending lines and make the oldest of them
    /// the current line again.
    pub fn rewind(&mut self, n: usize) -> PartitionResult<()> {
        let buffered = self.pending.len();
        if n > buffered {
            return Err(PartitionError::RewindOutOfRange {
                requested: n,
                buffered,
            });
        }
        if n == 0 {
            return Ok(());
        }
        if let Some(line) = self.current.take() {
            self.lookahead.push(line);
        }
        // Newest first onto the stack so the oldest rewound line pops first.
        for _ in 0..n {
            if let Some(queued) = self.pending.pop_back() {
                self.lookahead.push(queued.line);
            }
        }
        self.current = self.lookahead.pop();
        tracing::debug!(count = n, line = self.position(), "rewound");
        Ok(())
    }

    /// Text of every line held in the window, in input order: the queue,
    /// the current line, then lines a rewind put back.
    pub fn upcoming(&self) -> impl Iterator<Item = &str> {
        self.pending
            .iter()
            .map(|q| &q.line)
            .chain(self.current.iter())
            .chain(self.lookahead.iter().rev())
            .map(|l| l.text.as_str())
    }
}
