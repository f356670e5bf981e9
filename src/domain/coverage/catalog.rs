//! Known (domain, event) pairs that hooks are expected to cover.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::foundation::ErrorCode;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalog entry {position} has an empty {field}")]
    EmptyField { position: usize, field: &'static str },
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidConfig
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub domain: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogEntry {
    pub fn new(domain: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            event: event.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Static catalog of (domain, event) pairs.
///
/// Loaded from YAML shaped as:
///
/// ```yaml
/// entries:
///   - domain: auth
///     event: login
///     description: User sign-in
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCatalog {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

impl EventCatalog {
    /// Builds a catalog, dropping duplicate pairs and keeping the first.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut seen = BTreeSet::new();
        let entries = entries
            .into_iter()
            .filter(|e| seen.insert((e.domain.clone(), e.event.clone())))
            .collect();
        Self { entries }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let raw: EventCatalog = serde_yaml::from_str(yaml)?;
        for (position, entry) in raw.entries.iter().enumerate() {
            if entry.domain.trim().is_empty() {
                return Err(CatalogError::EmptyField { position, field: "domain" });
            }
            if entry.event.trim().is_empty() {
                return Err(CatalogError::EmptyField { position, field: "event" });
            }
        }
        Ok(Self::new(raw.entries))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The catalog used when no file is configured: the dispatcher
    /// lifecycle events plus the common operational domains.
    pub fn builtin() -> Self {
        let pairs: &[(&str, &str, &str)] = &[
            ("calculation", "pre-calculation", "Before any dispatched action"),
            ("calculation", "post-calculation", "After any dispatched action"),
            ("calculation", "action.completed", "Action finished without being blocked"),
            ("calculation", "action.blocked", "Action vetoed by a before hook"),
            ("auth", "login", "User sign-in"),
            ("auth", "logout", "User sign-out"),
            ("file", "pre-write", "Before a file is written"),
            ("file", "post-write", "After a file is written"),
            ("session", "session-start", "Session opened"),
            ("session", "session-end", "Session closed"),
            ("validation", "pre-validate", "Before input validation"),
            ("validation", "post-validate", "After input validation"),
        ];
        Self::new(
            pairs
                .iter()
                .map(|(d, e, desc)| CatalogEntry::new(*d, *e).with_description(*desc))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one domain, or all entries when `domain` is `None`.
    pub fn in_domain<'a>(&'a self, domain: Option<&'a str>) -> impl Iterator<Item = &'a CatalogEntry> {
        self.entries
            .iter()
            .filter(move |e| domain.map_or(true, |d| e.domain == d))
    }

    pub fn domains(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.domain.as_str()).collect()
    }
}
