//! Qualified generation records.
//!
//! A PROV qualified generation reifies "version V was generated by activity A
//! using resource U" as its own node so it can carry further attributes:
//!
//! ```text
//! V   prov:qualifiedGeneration  G .
//! G   rdf:type                  prov:Generation .
//! G   prov:activity             A .
//! G   prov:used                 U .
//! ```
//!
//! [`qualified_generation`] builds those four statements for a fresh `G`
//! drawn from an [`IdSource`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nquads::Quad;
use crate::vocab;

/// How fresh identifiers are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdScheme {
    /// `<urn:uuid:xxxxxxxx-...>`
    #[default]
    UrnUuid,
    /// `<xxxxxxxx-...>`, as older crawler versions wrote them.
    BareUuid,
}

impl IdScheme {
    pub fn format(self, uuid: Uuid) -> String {
        match self {
            IdScheme::UrnUuid => format!("<urn:uuid:{uuid}>"),
            IdScheme::BareUuid => format!("<{uuid}>"),
        }
    }
}

/// A source of fresh identifiers, returned as bracketed IRIs.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Default)]
pub struct UuidIds {
    scheme: IdScheme,
}

impl UuidIds {
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme }
    }
}

impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        self.scheme.format(Uuid::new_v4())
    }
}

/// Deterministic UUIDs counting up from 1, for reproducible output.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    scheme: IdScheme,
    next: u128,
}

impl SequentialIds {
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme, next: 1 }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new(IdScheme::default())
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = Uuid::from_u128(self.next);
        self.next += 1;
        self.scheme.format(id)
    }
}

/// The four statements of a qualified generation, in their fixed order.
///
/// `version`, `used` and `activity` are lexical terms (bracketed IRIs).
pub fn qualified_generation(
    version: &str,
    used: &str,
    activity: &str,
    ids: &mut dyn IdSource,
) -> [Quad; 4] {
    let generation = ids.next_id();
    [
        Quad::new(version, vocab::QUALIFIED_GENERATION, generation.as_str()),
        Quad::new(generation.as_str(), vocab::TYPE, vocab::GENERATION),
        Quad::new(generation.as_str(), vocab::PROV_ACTIVITY, activity),
        Quad::new(generation, vocab::USED, used),
    ]
}
