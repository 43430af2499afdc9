//! Core domain types for dbgsplit section catalogs and runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SectionId
// ---------------------------------------------------------------------------

/// Identifier of a section type (e.g. `system_info`, `modload`).
///
/// Used verbatim as the artifact file-name prefix, so catalogs only accept
/// lowercase ASCII letters, digits and underscores (see [`SectionId::is_valid`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is non-empty and made of `[a-z0-9_]` only.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Delimiter families
// ---------------------------------------------------------------------------

/// The four delimiter families a section rule can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// `***** Title *****`
    Asterisk,
    /// `=== Title ===`
    Equals,
    /// `--- Title ------ trailing columns`
    Dash,
    /// A single line starting with a literal prefix.
    Marker,
}

impl Family {
    /// Banner families, in the order they are tried for any-banner termination.
    pub const BANNERS: [Family; 3] = [Family::Asterisk, Family::Equals, Family::Dash];

    /// The repeated symbol framing a banner, `None` for markers.
    pub fn symbol(self) -> Option<char> {
        match self {
            Family::Asterisk => Some('*'),
            Family::Equals => Some('='),
            Family::Dash => Some('-'),
            Family::Marker => None,
        }
    }

    /// Shortest symbol run accepted as a banner delimiter. Longer runs always match.
    pub fn min_run(self) -> usize {
        match self {
            Family::Asterisk => 1,
            Family::Equals | Family::Dash => 3,
            Family::Marker => 0,
        }
    }

    pub fn is_banner(self) -> bool {
        self != Family::Marker
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Asterisk => "asterisk",
            Family::Equals => "equals",
            Family::Dash => "dash",
            Family::Marker => "marker",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A delimiter rule: the family plus its literal title or prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Delimiter {
    Asterisk { title: String },
    Equals { title: String },
    Dash { title: String },
    Marker { prefix: String },
}

impl Delimiter {
    pub fn family(&self) -> Family {
        match self {
            Delimiter::Asterisk { .. } => Family::Asterisk,
            Delimiter::Equals { .. } => Family::Equals,
            Delimiter::Dash { .. } => Family::Dash,
            Delimiter::Marker { .. } => Family::Marker,
        }
    }

    /// The literal banner title or marker prefix.
    pub fn literal(&self) -> &str {
        match self {
            Delimiter::Asterisk { title }
            | Delimiter::Equals { title }
            | Delimiter::Dash { title } => title,
            Delimiter::Marker { prefix } => prefix,
        }
    }
}

/// One catalog entry: a section type bound to exactly one delimiter rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    pub id: SectionId,
    #[serde(flatten)]
    pub delimiter: Delimiter,
}

impl SectionRule {
    pub fn asterisk(id: &str, title: &str) -> Self {
        Self::with(id, Delimiter::Asterisk { title: title.into() })
    }

    pub fn equals(id: &str, title: &str) -> Self {
        Self::with(id, Delimiter::Equals { title: title.into() })
    }

    pub fn dash(id: &str, title: &str) -> Self {
        Self::with(id, Delimiter::Dash { title: title.into() })
    }

    pub fn marker(id: &str, prefix: &str) -> Self {
        Self::with(id, Delimiter::Marker { prefix: prefix.into() })
    }

    fn with(id: &str, delimiter: Delimiter) -> Self {
        Self {
            id: SectionId::from(id),
            delimiter,
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Which lines end the body of a banner section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Only a banner of the section's own family ends its body.
    #[default]
    FamilyScoped,
    /// A line starting with any banner-family run ends the body.
    AnyBanner,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::FamilyScoped => f.write_str("family_scoped"),
            Termination::AnyBanner => f.write_str("any_banner"),
        }
    }
}

/// How capture bytes are turned into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoding {
    /// Invalid UTF-8 is a read failure for the folder.
    #[default]
    Strict,
    /// Invalid sequences are replaced with U+FFFD.
    Lossy,
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one batch run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
