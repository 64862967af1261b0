//! Campus domain entities: sectors, candidate classes and credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Name of a selection sector (e.g. "Elective Pool A").
///
/// Unique within a campus session; sectors are looked up by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorName(String);

impl SectorName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SectorName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SectorName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SectorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of an offered class (e.g. "CS101").
///
/// This is the identity used for de-duplicating selections and for keying
/// registration daemons: two classes with the same name are the same class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the name contains `keyword` (case-sensitive).
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClassName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClassName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Candidate Classes and Sectors
// ============================================================================

/// A specific offered class section, as reported by the campus system.
///
/// This is a read-only snapshot taken when the sector list was fetched.
/// Registration status and the register action live on the
/// [`CampusClient`](crate::CampusClient), keyed by [`ClassName`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateClass {
    /// Class name, the identity of the class.
    pub name: ClassName,

    /// Class-section label (e.g. "A", "(2024-2025-1)-CS101-1").
    pub section: String,

    /// Registered-student count as the campus formats it (e.g. "10/30").
    pub students_registered: String,

    /// Credit value.
    pub credit: f32,
}

impl CandidateClass {
    pub fn new(
        name: impl Into<ClassName>,
        section: impl Into<String>,
        students_registered: impl Into<String>,
        credit: f32,
    ) -> Self {
        Self {
            name: name.into(),
            section: section.into(),
            students_registered: students_registered.into(),
            credit,
        }
    }

    /// Returns true if the keyword occurs in the class name or section label.
    ///
    /// Matching is a case-sensitive substring search.
    #[must_use]
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.name.contains(keyword) || self.section.contains(keyword)
    }
}

impl fmt::Display for CandidateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] registered: {} credit: {}",
            self.name, self.section, self.students_registered, self.credit
        )
    }
}

/// A named grouping of class sections a student can browse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub name: SectorName,

    /// Classes in the sector's native order.
    pub classes: Vec<CandidateClass>,
}

impl Sector {
    pub fn new(name: impl Into<SectorName>, classes: Vec<CandidateClass>) -> Self {
        Self {
            name: name.into(),
            classes,
        }
    }

    /// Finds a class in this sector by name.
    pub fn find_class(&self, name: &ClassName) -> Option<&CandidateClass> {
        self.classes.iter().find(|c| &c.name == name)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Login credentials for the campus system.
///
/// The `Debug` implementation never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
