//! Declarative split plans.
//!
//! A plan names the destination sinks, the statement that marks the start
//! of each crawl run, and the ordered steps executed once per run:
//!
//! ```toml
//! name = "example"
//! sinks = ["left", "right"]
//! run_start = { subject = "<https://preston.guoda.bio>", predicate = "rdf:type", object = "prov:SoftwareAgent" }
//!
//! [[steps]]
//! op = "until"
//! to = ["*"]
//! match = { predicate = "pav:hasVersion" }
//!
//! [[steps]]
//! op = "capture"
//! name = "seed"
//! field = "object"
//!
//! [[steps]]
//! op = "up-to"
//! to = ["left"]
//! match = { subject = "$seed", predicate = "prov:hadMember" }
//! ```
//!
//! Pattern terms are `*` (or omitted) for any term, `{url}`, `{uuid}`,
//! `{content-hash}` or `{raw}` for any term of that kind, `$name` for a
//! captured variable, and anything else for an exact term. Prefixed names
//! such as `prov:used` are expanded.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::{ConfigError, ConfigResult};
use crate::error::PartitionError;
use crate::nquads::{Field, QuadPattern, TermPattern};
use crate::term::TermKind;
use crate::vocab;

use super::{PartitionResult, Route};

/// Variables captured during one run of a plan.
pub type Bindings = BTreeMap<String, String>;

/// One field of a plan pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PlanTerm {
    #[default]
    Any,
    Exact(String),
    Kind(TermKind),
    Var(String),
}

impl TryFrom<String> for PlanTerm {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let text = text.trim();
        if text.is_empty() || text == "*" {
            return Ok(PlanTerm::Any);
        }
        if let Some(name) = text.strip_prefix('$') {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(format!("invalid variable name {text:?}"));
            }
            return Ok(PlanTerm::Var(name.to_string()));
        }
        if let Some(kind) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            let kind = match kind {
                "content-hash" => TermKind::ContentHash,
                "uuid" => TermKind::Uuid,
                "url" => TermKind::Url,
                "raw" => TermKind::Raw,
                other => return Err(format!("unknown term kind {{{other}}}")),
            };
            return Ok(PlanTerm::Kind(kind));
        }
        Ok(PlanTerm::Exact(vocab::expand(text)))
    }
}

impl PlanTerm {
    fn resolve(&self, vars: &Bindings) -> Result<TermPattern, String> {
        Ok(match self {
            PlanTerm::Any => TermPattern::Any,
            PlanTerm::Exact(text) => TermPattern::Exact(text.clone()),
            PlanTerm::Kind(kind) => TermPattern::Kind(*kind),
            PlanTerm::Var(name) => match vars.get(name) {
                Some(value) => TermPattern::Exact(value.clone()),
                None => return Err(name.clone()),
            },
        })
    }

    fn variable(&self) -> Option<&str> {
        match self {
            PlanTerm::Var(name) => Some(name),
            _ => None,
        }
    }
}

/// A statement pattern as written in a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternSpec {
    pub subject: PlanTerm,
    pub predicate: PlanTerm,
    pub object: PlanTerm,
    pub graph: PlanTerm,
}

impl PatternSpec {
    fn terms(&self) -> [&PlanTerm; 4] {
        [&self.subject, &self.predicate, &self.object, &self.graph]
    }

    /// Substitute captured variables.
    pub fn resolve(&self, vars: &Bindings, step: usize) -> PartitionResult<QuadPattern> {
        let resolve = |term: &PlanTerm| {
            term.resolve(vars)
                .map_err(|name| PartitionError::UndefinedVariable { step, name })
        };
        Ok(QuadPattern {
            subject: resolve(&self.subject)?,
            predicate: resolve(&self.predicate)?,
            object: resolve(&self.object)?,
            graph: resolve(&self.graph)?,
        })
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms().into_iter().filter_map(PlanTerm::variable)
    }
}

/// A plan step plus an optional label logged when it starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub op: Op,
}

fn required() -> bool {
    true
}

fn object() -> Field {
    Field::Object
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Op {
    /// Route lines to `to` until a match; the match stays current.
    Until {
        #[serde(default)]
        to: Vec<String>,
        #[serde(rename = "match")]
        pattern: PatternSpec,
        #[serde(default = "required")]
        required: bool,
    },
    /// Route lines to `to` up to and including a match.
    UpTo {
        #[serde(default)]
        to: Vec<String>,
        #[serde(rename = "match")]
        pattern: PatternSpec,
        #[serde(default = "required")]
        required: bool,
    },
    /// Bind a field of an already routed line to a variable.
    Capture {
        name: String,
        #[serde(default)]
        back: usize,
        #[serde(default = "object")]
        field: Field,
    },
    /// Rewind `count` lines when the line `probe` positions back matches.
    RewindIf {
        probe: usize,
        #[serde(rename = "match")]
        pattern: PatternSpec,
        count: usize,
    },
}

#[derive(Debug, Deserialize)]
struct PlanToml {
    name: String,
    #[serde(default)]
    description: String,
    sinks: Vec<String>,
    run_start: PatternSpec,
    #[serde(default)]
    steps: Vec<Step>,
}

/// A validated split plan.
#[derive(Debug, Clone)]
pub struct Plan {
    name: String,
    description: String,
    sinks: Vec<String>,
    run_start: QuadPattern,
    steps: Vec<Step>,
}

impl Plan {
    /// Parse and validate a plan.
    pub fn from_toml(text: &str, origin: &str) -> ConfigResult<Self> {
        let parsed: PlanToml = toml::from_str(text).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        let invalid = |message: String| ConfigError::Invalid {
            origin: origin.to_string(),
            message,
        };

        if parsed.sinks.is_empty() {
            return Err(invalid("a plan needs at least one sink".into()));
        }
        if parsed.sinks.len() > Route::MAX_SINKS {
            return Err(invalid(format!("at most {} sinks are supported", Route::MAX_SINKS)));
        }
        for (i, name) in parsed.sinks.iter().enumerate() {
            if name == "*" || name.is_empty() {
                return Err(invalid(format!("invalid sink name {name:?}")));
            }
            if parsed.sinks[..i].contains(name) {
                return Err(invalid(format!("sink {name:?} is declared twice")));
            }
        }

        if let Some(name) = parsed.run_start.variables().next() {
            return Err(invalid(format!("run_start cannot use variable ${name}")));
        }
        let run_start = parsed
            .run_start
            .resolve(&Bindings::new(), 0)
            .map_err(|e| invalid(e.to_string()))?;
        if run_start == QuadPattern::any() {
            return Err(invalid("run_start must constrain at least one field".into()));
        }

        let mut plan = Plan {
            name: parsed.name,
            description: parsed.description,
            sinks: parsed.sinks,
            run_start,
            steps: Vec::new(),
        };

        let mut captured: Vec<&str> = Vec::new();
        for (i, step) in parsed.steps.iter().enumerate() {
            let number = i + 1;
            let (to, pattern) = match &step.op {
                Op::Until { to, pattern, .. } | Op::UpTo { to, pattern, .. } => (Some(to), Some(pattern)),
                Op::RewindIf { pattern, .. } => (None, Some(pattern)),
                Op::Capture { name, .. } => {
                    captured.push(name);
                    (None, None)
                }
            };
            for name in to.into_iter().flatten() {
                if name != "*" {
                    plan.sink_index(name)?;
                }
            }
            for var in pattern.into_iter().flat_map(PatternSpec::variables) {
                if !captured.contains(&var) {
                    return Err(invalid(format!("step {number} uses ${var} before it is captured")));
                }
            }
        }
        plan.steps = parsed.steps;
        Ok(plan)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn run_start(&self) -> &QuadPattern {
        &self.run_start
    }

    pub fn sink_index(&self, name: &str) -> ConfigResult<usize> {
        self.sinks
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| ConfigError::UnknownSink {
                name: name.to_string(),
                known: self.sinks.join(", "),
            })
    }

    /// The route for a step's `to` list. `"*"` means every sink.
    pub fn route(&self, to: &[String]) -> Route {
        to.iter().fold(Route::DISCARD, |route, name| {
            if name == "*" {
                Route::all(self.sinks.len())
            } else {
                match self.sinks.iter().position(|s| s == name) {
                    Some(index) => route.with(index),
                    None => route,
                }
            }
        })
    }

    /// The deepest window position any step reads or rewinds.
    pub fn reach(&self) -> usize {
        self.steps
            .iter()
            .map(|step| match step.op {
                Op::Capture { back, .. } => back + 1,
                Op::RewindIf { probe, count, .. } => (probe + 1).max(count),
                Op::Until { .. } | Op::UpTo { .. } => 0,
            })
            .max()
            .unwrap_or(0)
    }
}
