//! Batch repair of logs written without qualified generations.
//!
//! Older crawls recorded downloads only as `URL pav:hasVersion HASH`. This
//! module reads a whole log into a [`GraphIndex`], splits it into download
//! groups (one per such `hasVersion` statement, holding every statement up
//! to the next one) and emits one qualified generation per group, attributed
//! to the crawl activity and pointing at the group's latest version.
//!
//! Unlike the streaming rewrite in [`crate::rewrite`], the output is only
//! the new statements; appending them to the log is left to the caller.

use std::io::Write;

use miette::Diagnostic;
use thiserror::Error;

use crate::error::{ProvError, ProvResult};
use crate::generation::{self, IdSource};
use crate::graph::{GraphIndex, StatementId};
use crate::nquads::{Quad, QuadPattern};
use crate::term::TermKind;
use crate::vocab;

#[derive(Debug, Error, Diagnostic)]
pub enum PatchError {
    #[error("the log names no crawl activity")]
    #[diagnostic(
        code(provlog::patch::no_activity),
        help("Generations are attributed to the first subject typed prov:Activity; the log has none.")
    )]
    NoActivity,
}

pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// The statements recorded for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadGroup {
    /// The `URL pav:hasVersion HASH` statement opening the group.
    pub key: StatementId,
    /// All statements of the group, `key` first, in ingestion order.
    pub statements: Vec<StatementId>,
}

/// The first subject typed `prov:Activity`.
pub fn crawl_activity(index: &GraphIndex) -> Option<&str> {
    let pattern = QuadPattern::any().predicate(vocab::TYPE).object(vocab::ACTIVITY);
    index
        .query(&pattern)
        .first()
        .map(|&id| index.quad(id).subject)
}

fn is_download(index: &GraphIndex, id: StatementId) -> bool {
    let s = index.statement(id);
    index.node(s.subject).term().kind() == TermKind::Url
        && index.verb(s.predicate).term() == vocab::HAS_VERSION
        && index.node(s.object).term().is_content_hash()
}

/// Split the index into download groups.
///
/// Statements before the first download belong to no group.
pub fn download_groups(index: &GraphIndex) -> Vec<DownloadGroup> {
    let mut groups: Vec<DownloadGroup> = Vec::new();
    for id in index.statement_ids() {
        if is_download(index, id) {
            groups.push(DownloadGroup {
                key: id,
                statements: vec![id],
            });
        } else if let Some(group) = groups.last_mut() {
            group.statements.push(id);
        }
    }
    groups
}

/// The newest version recorded in a group.
///
/// A `NEW pav:previousVersion OLD` statement between two content hashes
/// makes `NEW` the latest; the last such statement wins. Without one, the
/// downloaded version itself is the latest.
pub fn latest_version<'a>(index: &'a GraphIndex, group: &DownloadGroup) -> &'a str {
    let mut latest = index.quad(group.key).object;
    for &id in &group.statements {
        let s = index.statement(id);
        if index.verb(s.predicate).term() == vocab::PREVIOUS_VERSION
            && index.node(s.subject).term().is_content_hash()
            && index.node(s.object).term().is_content_hash()
        {
            latest = index.node(s.subject).term().text();
        }
    }
    latest
}

/// Qualified generations for every download group, in log order.
pub fn patch(index: &GraphIndex, ids: &mut dyn IdSource) -> PatchResult<Vec<Quad>> {
    let activity = crawl_activity(index).ok_or(PatchError::NoActivity)?;
    let groups = download_groups(index);
    tracing::debug!(activity, groups = groups.len(), "patching downloads");

    let mut quads = Vec::with_capacity(groups.len() * 4);
    for group in &groups {
        let used = index.quad(group.key).subject;
        let version = latest_version(index, group);
        quads.extend(generation::qualified_generation(version, used, activity, ids));
    }
    Ok(quads)
}

/// Write the patch as N-Quads, one statement per line. Returns the number
/// of generations written.
pub fn write_patch<W: Write>(index: &GraphIndex, ids: &mut dyn IdSource, mut out: W) -> ProvResult<usize> {
    let quads = patch(index, ids).map_err(ProvError::from)?;
    for quad in &quads {
        writeln!(out, "{quad}").map_err(|e| ProvError::io("writing patch", e))?;
    }
    out.flush().map_err(|e| ProvError::io("writing patch", e))?;
    let generations = quads.len() / 4;
    tracing::info!(generations, "patch written");
    Ok(generations)
}
