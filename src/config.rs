//! Configuration for the split tool.
//!
//! A config file is plain TOML; every key is optional:
//!
//! ```toml
//! window = 3
//! output_prefix = "only-"
//! output_dir = "."
//! id_scheme = "urn-uuid"
//! plan = "plans/my-crawl.toml"
//!
//! [mislabeled_predicates]
//! "prov:wasInfluencedBy" = "prov:wasInformedBy"
//!
//! [outputs]
//! gbif = "/data/split/gbif.nq"
//! ```
//!
//! Without `plan`, the bundled GBIF / iDigBio / BioCASe plan is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::IdScheme;
use crate::partition::Plan;
use crate::vocab;

/// Errors from loading or validating configuration and plans.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(provlog::config::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {message}")]
    #[diagnostic(
        code(provlog::config::parse),
        help("Check the TOML syntax and the key names.")
    )]
    Parse { origin: String, message: String },

    #[error("unknown sink \"{name}\" (declared sinks: {known})")]
    #[diagnostic(
        code(provlog::config::unknown_sink),
        help("Use one of the names listed in the plan's `sinks`, or \"*\" for all of them.")
    )]
    UnknownSink { name: String, known: String },

    #[error("invalid {origin}: {message}")]
    #[diagnostic(code(provlog::config::invalid))]
    Invalid { origin: String, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

const BUNDLED_PLAN: &str = include_str!("../data/plans/gbif-idigbio-biocase.toml");

/// Settings for `provlog split`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Capacity K of the output queue: how far back look-backs and rewinds reach.
    pub window: usize,
    pub output_prefix: String,
    pub output_dir: PathBuf,
    pub id_scheme: IdScheme,
    /// Wrong predicate to its correct replacement. Prefixed names are allowed.
    pub mislabeled_predicates: BTreeMap<String, String>,
    /// Plan file; the bundled plan when absent.
    pub plan: Option<PathBuf>,
    /// Explicit output path per sink, overriding `output_dir`/`output_prefix`.
    pub outputs: BTreeMap<String, PathBuf>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            window: 3,
            output_prefix: "only-".into(),
            output_dir: PathBuf::from("."),
            id_scheme: IdScheme::default(),
            mislabeled_predicates: BTreeMap::from([(
                "prov:wasInfluencedBy".to_string(),
                "prov:wasInformedBy".to_string(),
            )]),
            plan: None,
            outputs: BTreeMap::new(),
        }
    }
}

impl SplitConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config = Self::from_toml(&content, &path.display().to_string())?;
        // Relative paths in the file are relative to the file.
        if let Some(dir) = path.parent() {
            let anchor = |p: &mut PathBuf| {
                if p.is_relative() {
                    *p = dir.join(&*p);
                }
            };
            if let Some(plan) = config.plan.as_mut() {
                anchor(plan);
            }
            anchor(&mut config.output_dir);
            config.outputs.values_mut().for_each(anchor);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    pub fn validate(&self, origin: &str) -> ConfigResult<()> {
        if self.window == 0 {
            return Err(ConfigError::Invalid {
                origin: origin.to_string(),
                message: "window must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Mislabeled predicates with prefixed names expanded.
    pub fn relabelings(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.mislabeled_predicates
            .iter()
            .map(|(wrong, right)| (vocab::expand(wrong), vocab::expand(right)))
    }

    /// The configured plan, or the bundled one.
    pub fn load_plan(&self) -> ConfigResult<Plan> {
        match &self.plan {
            Some(path) => Plan::load(path),
            None => Plan::bundled(),
        }
    }

    /// Where the output for `sink` is written.
    pub fn output_path(&self, sink: &str) -> PathBuf {
        match self.outputs.get(sink) {
            Some(path) => path.clone(),
            None => self
                .output_dir
                .join(format!("{}{sink}.nq", self.output_prefix)),
        }
    }

    /// Check that every explicit output names a sink of `plan`.
    pub fn check_outputs(&self, plan: &Plan) -> ConfigResult<()> {
        for name in self.outputs.keys() {
            plan.sink_index(name)?;
        }
        Ok(())
    }
}

impl Plan {
    /// The bundled plan for the GBIF / iDigBio / BioCASe crawl.
    pub fn bundled() -> ConfigResult<Self> {
        Self::from_toml(BUNDLED_PLAN, "bundled plan")
    }

    /// Load a plan from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SplitConfig::default();
        assert_eq!(config.window, 3);
        assert_eq!(config.output_path("gbif"), PathBuf::from("./only-gbif.nq"));
        let relabel: Vec<_> = config.relabelings().collect();
        assert_eq!(
            relabel,
            vec![(vocab::WAS_INFLUENCED_BY.to_string(), vocab::WAS_INFORMED_BY.to_string())]
        );
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(SplitConfig::from_toml("", "test").unwrap(), SplitConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = SplitConfig::from_toml(
            "window = 5\noutput_prefix = \"split-\"\n[outputs]\nidigbio = \"/tmp/i.nq\"\n",
            "test",
        )
        .unwrap();
        assert_eq!(config.window, 5);
        assert_eq!(config.output_path("gbif"), PathBuf::from("./split-gbif.nq"));
        assert_eq!(config.output_path("idigbio"), PathBuf::from("/tmp/i.nq"));
        assert_eq!(config.id_scheme, IdScheme::UrnUuid);
    }

    #[test]
    fn id_scheme_is_kebab_case() {
        let config = SplitConfig::from_toml("id_scheme = \"bare-uuid\"", "test").unwrap();
        assert_eq!(config.id_scheme, IdScheme::BareUuid);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = SplitConfig::from_toml("window = 0", "test").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SplitConfig::from_toml("windw = 4", "test").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn bundled_plan_loads() {
        let plan = Plan::bundled().unwrap();
        assert_eq!(plan.sinks(), ["gbif", "idigbio", "biocase"]);
        assert!(!plan.steps().is_empty());
        assert!(plan.reach() <= SplitConfig::default().window);
    }

    #[test]
    fn outputs_must_name_sinks() {
        let plan = Plan::bundled().unwrap();
        let config = SplitConfig::from_toml("[outputs]\nnope = \"x.nq\"", "test").unwrap();
        assert!(matches!(
            config.check_outputs(&plan),
            Err(ConfigError::UnknownSink { .. })
        ));
    }

    #[test]
    fn load_resolves_paths_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provlog.toml");
        std::fs::write(
            &path,
            "plan = \"crawl.toml\"\noutput_dir = \"out\"\n[outputs]\ngbif = \"/abs/g.nq\"\n",
        )
        .unwrap();
        let config = SplitConfig::load(&path).unwrap();
        assert_eq!(config.plan, Some(dir.path().join("crawl.toml")));
        assert_eq!(config.output_path("idigbio"), dir.path().join("out/only-idigbio.nq"));
        assert_eq!(config.output_path("gbif"), PathBuf::from("/abs/g.nq"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SplitConfig::load(Path::new("/nonexistent/provlog.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
