use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("{field} cannot be empty")]
    EmptySegment { field: &'static str },

    #[error("{field} contains an invalid path segment: {value}")]
    InvalidSegment { field: &'static str, value: String },

    #[error("profile name cannot be empty")]
    EmptyProfile,
}

fn validate_segment(field: &'static str, raw: String) -> Result<String, CatalogError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::EmptySegment { field });
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
        return Err(CatalogError::InvalidSegment {
            field,
            value: trimmed.to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}

//
// ─── REPOSITORY REF ────────────────────────────────────────────────────────────
//

/// Address of one question repository in the domain → topic → repository tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RepositoryRefParts")]
pub struct RepositoryRef {
    domain: String,
    topic: String,
    repository: String,
}

#[derive(Deserialize)]
struct RepositoryRefParts {
    domain: String,
    topic: String,
    repository: String,
}

impl TryFrom<RepositoryRefParts> for RepositoryRef {
    type Error = CatalogError;

    fn try_from(parts: RepositoryRefParts) -> Result<Self, Self::Error> {
        Self::new(parts.domain, parts.topic, parts.repository)
    }
}

impl RepositoryRef {
    /// Builds a validated reference.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a segment is blank or could escape the bank directory.
    pub fn new(
        domain: impl Into<String>,
        topic: impl Into<String>,
        repository: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            domain: validate_segment("domain", domain.into())?,
            topic: validate_segment("topic", topic.into())?,
            repository: validate_segment("repository", repository.into())?,
        })
    }

    /// A sibling repository under the same domain and topic.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if `repository` is not a valid segment.
    pub fn sibling(&self, repository: impl Into<String>) -> Result<Self, CatalogError> {
        Self::new(self.domain.clone(), self.topic.clone(), repository)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Stable key in the form `domain/topic/repository`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.domain, self.topic, self.repository)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.domain, self.topic, self.repository)
    }
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

/// Name of the user profile that owns configurations, results and statuses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileName(String);

impl ProfileName {
    pub const DEFAULT: &'static str = "default";

    /// # Errors
    ///
    /// Returns `CatalogError::EmptyProfile` for blank names.
    pub fn new(raw: impl Into<String>) -> Result<Self, CatalogError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::EmptyProfile);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProfileName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── DOMAIN STRUCTURE ──────────────────────────────────────────────────────────
//

/// Domain → topic → repository names.
///
/// Serializes as the nested JSON object `{ "<domain>": { "<topic>": ["<repo>", ...] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainStructure(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl DomainStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a repository, keeping repository names sorted and unique.
    pub fn insert(&mut self, repository: &RepositoryRef) {
        let repos = self
            .0
            .entry(repository.domain().to_owned())
            .or_default()
            .entry(repository.topic().to_owned())
            .or_default();
        let name = repository.repository().to_owned();
        if let Err(pos) = repos.binary_search(&name) {
            repos.insert(pos, name);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn domains(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn topics(&self, domain: &str) -> Vec<&str> {
        self.0
            .get(domain)
            .map(|topics| topics.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Repository names for a topic, sorted alphabetically.
    #[must_use]
    pub fn repositories(&self, domain: &str, topic: &str) -> Vec<&str> {
        let mut repos: Vec<&str> = self
            .0
            .get(domain)
            .and_then(|topics| topics.get(topic))
            .map(|repos| repos.iter().map(String::as_str).collect())
            .unwrap_or_default();
        repos.sort_unstable();
        repos
    }

    /// Total number of repositories across all domains and topics.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(d: &str, t: &str, r: &str) -> RepositoryRef {
        RepositoryRef::new(d, t, r).unwrap()
    }

    #[test]
    fn repository_ref_trims_and_keys() {
        let r = repo(" Math ", "Algebra", " Set 1 ");
        assert_eq!(r.key(), "Math/Algebra/Set 1");
    }

    #[test]
    fn repository_ref_rejects_traversal() {
        let err = RepositoryRef::new("math", "..", "x").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSegment { field: "topic", .. }));
        let err = RepositoryRef::new("math", "a/b", "x").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSegment { .. }));
        let err = RepositoryRef::new("math", "algebra", "  ").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::EmptySegment {
                field: "repository"
            }
        ));
    }

    #[test]
    fn structure_lists_sorted_and_handles_unknown() {
        let mut s = DomainStructure::new();
        s.insert(&repo("Science", "Physics", "Optics"));
        s.insert(&repo("Science", "Physics", "Mechanics"));
        s.insert(&repo("Science", "Physics", "Mechanics"));
        s.insert(&repo("Math", "Algebra", "Basics"));

        assert_eq!(s.domains(), vec!["Math", "Science"]);
        assert_eq!(s.topics("Science"), vec!["Physics"]);
        assert_eq!(
            s.repositories("Science", "Physics"),
            vec!["Mechanics", "Optics"]
        );
        assert!(s.topics("History").is_empty());
        assert!(s.repositories("Science", "Biology").is_empty());
        assert_eq!(s.repository_count(), 3);
    }

    #[test]
    fn structure_serializes_as_nested_object() {
        let mut s = DomainStructure::new();
        s.insert(&repo("Math", "Algebra", "Basics"));
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"Math":{"Algebra":["Basics"]}}"#);
    }

    #[test]
    fn blank_profile_is_rejected() {
        assert!(matches!(
            ProfileName::new("  "),
            Err(CatalogError::EmptyProfile)
        ));
        assert_eq!(ProfileName::default().as_str(), "default");
    }
}
