// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # provlog
//!
//! Tools for PROV provenance logs written as N-Quads by the Preston crawler.
//!
//! ## Architecture
//!
//! - **Terms** (`term`): lexical terms classified as content hash, UUID, URL or raw
//! - **N-Quads** (`nquads`): line parser, serializer and statement patterns
//! - **Graph index** (`graph`): interned nodes, verbs and statements with adjacency
//! - **Partitioning** (`partition`): single-pass split of a crawl log into
//!   per-source logs, driven by a declarative plan
//! - **Rewriting** (`rewrite`, `generation`): flush-time repair of predicates and
//!   synthesis of missing qualified generations
//! - **Patching** (`patch`): batch qualified generations for a whole log
//!
//! ## Library usage
//!
//! ```no_run
//! use provlog::config::SplitConfig;
//! use provlog::generation::UuidIds;
//! use provlog::partition::{runner, Plan};
//!
//! let config = SplitConfig::default();
//! let plan = Plan::bundled().unwrap();
//! let input = std::io::BufReader::new(std::fs::File::open("crawl.nq").unwrap());
//! let writers = vec![Vec::<u8>::new(); plan.sinks().len()];
//! let ids = Box::new(UuidIds::new(config.id_scheme));
//! let (report, summary) = runner::split(input, &plan, writers, &config, ids).unwrap();
//! println!("{} runs, {} lines", report.runs, summary.lines_read);
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod graph;
pub mod nquads;
pub mod partition;
pub mod patch;
pub mod rewrite;
pub mod stats;
pub mod term;
pub mod vocab;
