//! Vocabulary constants used by the crawl provenance logs.
//!
//! All constants are full IRIs in lexical form (with angle brackets) so they
//! compare directly against parsed statement terms.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";
pub const PAV_NS: &str = "http://purl.org/pav/";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub const TYPE: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";

pub const ACTIVITY: &str = "<http://www.w3.org/ns/prov#Activity>";
pub const GENERATION: &str = "<http://www.w3.org/ns/prov#Generation>";
pub const SOFTWARE_AGENT: &str = "<http://www.w3.org/ns/prov#SoftwareAgent>";

pub const QUALIFIED_GENERATION: &str = "<http://www.w3.org/ns/prov#qualifiedGeneration>";
pub const HAD_MEMBER: &str = "<http://www.w3.org/ns/prov#hadMember>";
pub const STARTED_AT_TIME: &str = "<http://www.w3.org/ns/prov#startedAtTime>";
pub const USED: &str = "<http://www.w3.org/ns/prov#used>";
pub const WAS_ASSOCIATED_WITH: &str = "<http://www.w3.org/ns/prov#wasAssociatedWith>";
pub const WAS_INFORMED_BY: &str = "<http://www.w3.org/ns/prov#wasInformedBy>";
pub const WAS_INFLUENCED_BY: &str = "<http://www.w3.org/ns/prov#wasInfluencedBy>";
pub const WAS_GENERATED_BY: &str = "<http://www.w3.org/ns/prov#wasGeneratedBy>";
pub const WAS_STARTED_BY: &str = "<http://www.w3.org/ns/prov#wasStartedBy>";
/// Links a Generation to the activity that performed it.
pub const PROV_ACTIVITY: &str = "<http://www.w3.org/ns/prov#activity>";

pub const HAS_VERSION: &str = "<http://purl.org/pav/hasVersion>";
pub const PREVIOUS_VERSION: &str = "<http://purl.org/pav/previousVersion>";
pub const CREATED_BY: &str = "<http://purl.org/pav/createdBy>";

pub const DESCRIPTION: &str = "<http://purl.org/dc/terms/description>";

/// The crawler that writes the logs; its SoftwareAgent statement opens a run.
pub const PRESTON: &str = "<https://preston.guoda.bio>";

const PREFIXES: [(&str, &str); 5] = [
    ("rdf", RDF_NS),
    ("prov", PROV_NS),
    ("pav", PAV_NS),
    ("dcterms", DCTERMS_NS),
    ("xsd", XSD_NS),
];

/// Expand a prefixed name such as `prov:used` into a bracketed IRI.
///
/// Terms that are already IRIs, literals, blank nodes, or use an unknown
/// prefix are returned unchanged.
pub fn expand(term: &str) -> String {
    if term.starts_with('<') || term.starts_with('"') || term.starts_with("_:") {
        return term.to_string();
    }
    if let Some((prefix, local)) = term.split_once(':') {
        if let Some((_, ns)) = PREFIXES.iter().find(|(p, _)| *p == prefix) {
            return format!("<{ns}{local}>");
        }
    }
    term.to_string()
}
