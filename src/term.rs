//! Term classification.
//!
//! Every subject, predicate, object and graph label in a provenance log is a
//! [`Term`]: its lexical text plus a [`TermKind`] derived once from that text.
//! The kind tells the rest of the system whether a term names content
//! (a `hash://sha256/...` address), an activity or generation (a UUID), a
//! fetched resource (a URL), or anything else.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_CONTENT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hash://sha256/[0-9a-fA-F]{64}$").unwrap());

static RE_GENID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://.*\.well-known/genid/[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});

static RE_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(urn:uuid:)?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});

/// Semantic category of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TermKind {
    /// Wildcard used in query patterns. Never assigned to a real term.
    Any,
    /// A content address (`hash://sha256/...`) or a well-known genid IRI.
    ContentHash,
    /// A UUID, bare or `urn:uuid:` prefixed.
    Uuid,
    /// An `http://` or `https://` IRI.
    Url,
    /// Anything else: literals, blank nodes, other IRIs.
    Raw,
}

impl TermKind {
    /// Classify a term by its lexical text.
    ///
    /// IRIs are matched on their content between `<` and `>`. Rules are tried
    /// in order and the first match wins; unmatched text falls through to
    /// [`TermKind::Raw`].
    pub fn classify(text: &str) -> Self {
        let text = text.trim();
        let bare = text
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(text);

        if RE_CONTENT_HASH.is_match(bare) || RE_GENID.is_match(bare) {
            TermKind::ContentHash
        } else if RE_UUID.is_match(bare) {
            TermKind::Uuid
        } else if bare.starts_with("http://") || bare.starts_with("https://") {
            TermKind::Url
        } else {
            TermKind::Raw
        }
    }

    /// Whether a term of kind `other` satisfies this kind used as a filter.
    pub fn admits(self, other: TermKind) -> bool {
        self == TermKind::Any || self == other
    }

    /// All concrete (non-wildcard) kinds.
    pub const CONCRETE: [TermKind; 4] = [
        TermKind::ContentHash,
        TermKind::Uuid,
        TermKind::Url,
        TermKind::Raw,
    ];
}

impl std::fmt::Display for TermKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermKind::Any => write!(f, "any"),
            TermKind::ContentHash => write!(f, "content-hash"),
            TermKind::Uuid => write!(f, "uuid"),
            TermKind::Url => write!(f, "url"),
            TermKind::Raw => write!(f, "raw"),
        }
    }
}

/// An immutable term: lexical text plus its cached kind.
///
/// Equality and hashing use the text only.
#[derive(Debug, Clone)]
pub struct Term {
    text: Box<str>,
    kind: TermKind,
}

impl Term {
    /// Create a term from its lexical text, classifying it once.
    pub fn new(text: impl Into<Box<str>>) -> Self {
        let text = text.into();
        let kind = TermKind::classify(&text);
        Self { text, kind }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    pub fn is_content_hash(&self) -> bool {
        self.kind == TermKind::ContentHash
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialEq<str> for Term {
    fn eq(&self, other: &str) -> bool {
        &*self.text == other
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
