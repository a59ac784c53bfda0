//! Rich diagnostic error types for provlog.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong in a log and where.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::config::ConfigError;
use crate::patch::PatchError;

/// Top-level error type for provlog.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ProvError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Patch(#[from] PatchError),

    #[error("graph index holds more {arena} than a handle can address")]
    #[diagnostic(
        code(provlog::graph::full),
        help("Split the log and index the parts separately.")
    )]
    GraphFull { arena: &'static str },

    #[error("I/O error while {context}: {source}")]
    #[diagnostic(
        code(provlog::io),
        help("Check that the input exists and that output paths are writable.")
    )]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProvError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// A line that does not conform to the N-Quads statement grammar.
///
/// Always fatal: callers never receive a partially parsed statement.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("line {line}: {reason}")]
    #[diagnostic(
        code(provlog::nquads::grammar),
        help(
            "Each line must be `subject predicate object [graph] .` where subject and \
             graph are IRIs (<...>) or blank nodes (_:label), the predicate is an IRI, \
             and the object is an IRI, blank node, or quoted literal."
        )
    )]
    Grammar {
        line: usize,
        reason: String,
        #[source_code]
        text: String,
        #[label("here")]
        at: SourceSpan,
    },
}

impl ParseError {
    /// Line number the error was reported at (1-based, 0 when unknown).
    pub fn line(&self) -> usize {
        match self {
            Self::Grammar { line, .. } => *line,
        }
    }

    /// Byte offset within the line where parsing failed.
    pub fn offset(&self) -> usize {
        match self {
            Self::Grammar { at, .. } => at.offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// Partition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PartitionError {
    #[error("step {step}: expected statement matching {pattern} was not found before line {line}")]
    #[diagnostic(
        code(provlog::partition::pattern_not_found),
        help(
            "The log does not have the layout the split plan expects. \
             Mark the step `required = false` if this section may be absent, \
             or check that the plan matches the crawler version that wrote the log."
        )
    )]
    PatternNotFound {
        step: usize,
        pattern: String,
        line: usize,
    },

    #[error("rewind of {requested} line(s) exceeds the {buffered} unflushed line(s) in the window")]
    #[diagnostic(
        code(provlog::partition::rewind_out_of_range),
        help(
            "Rewinds can only reach lines that have not been flushed yet. \
             Increase `window` in the split config so it covers the largest rewind count."
        )
    )]
    RewindOutOfRange { requested: usize, buffered: usize },

    #[error("look-back to position {requested} exceeds the {buffered} unflushed line(s) in the window")]
    #[diagnostic(
        code(provlog::partition::look_back_out_of_range),
        help("Increase `window` in the split config so it covers the deepest look-back.")
    )]
    LookBackOutOfRange { requested: usize, buffered: usize },

    #[error("look-back at position {position} found a line that is not a statement")]
    #[diagnostic(
        code(provlog::partition::not_a_statement),
        help("Blank and comment-only lines cannot be captured from; adjust the look-back position.")
    )]
    NotAStatement { position: usize },

    #[error("look-back at position {position} found a statement without a {field}")]
    #[diagnostic(
        code(provlog::partition::missing_field),
        help("Only the graph label can be absent; capture a different field or position.")
    )]
    MissingField { position: usize, field: String },

    #[error("plan made no progress at line {line}")]
    #[diagnostic(
        code(provlog::partition::stalled),
        help(
            "A full pass of the plan consumed no input. Make sure at least one step \
             is an `up-to` search or routes lines with `until`."
        )
    )]
    Stalled { line: usize },

    #[error("step {step}: variable ${name} is used before it was captured")]
    #[diagnostic(
        code(provlog::partition::undefined_variable),
        help("Add a `capture` step that defines this variable earlier in the plan.")
    )]
    UndefinedVariable { step: usize, name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error on {target}: {source}")]
    #[diagnostic(
        code(provlog::partition::io),
        help("Check that the input is readable and the output files are writable.")
    )]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning provlog results.
pub type ProvResult<T> = std::result::Result<T, ProvError>;
