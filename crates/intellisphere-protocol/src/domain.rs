//! Knowledge domains that partition every session and storage key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic vertical served by the backend.
///
/// Each domain owns an independent set of sessions, cache keys, and remote
/// history. Unknown names never produce a domain; callers fall back to
/// [`Domain::Home`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Health,
    Law,
    Finance,
    Technology,
    Education,
    Research,
    /// Sentinel domain used when nothing valid was supplied.
    #[default]
    Home,
}

impl Domain {
    /// Every domain accepted by the backend, in display order.
    pub const ALL: [Domain; 7] = [
        Domain::Health,
        Domain::Law,
        Domain::Finance,
        Domain::Technology,
        Domain::Education,
        Domain::Research,
        Domain::Home,
    ];

    /// Return the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Health => "health",
            Domain::Law => "law",
            Domain::Finance => "finance",
            Domain::Technology => "technology",
            Domain::Education => "education",
            Domain::Research => "research",
            Domain::Home => "home",
        }
    }

    /// Parse a wire name, returning `None` for anything outside the allow-list.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == value.trim())
    }

    /// Derive a domain from the last non-empty segment of a page path.
    pub fn from_page_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .next_back()
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    /// Resolve the active domain once at startup.
    ///
    /// An injected value takes precedence over the page path. Both sources are
    /// checked against the allow-list and fall back to [`Domain::Home`].
    pub fn resolve(injected: Option<&str>, page_path: Option<&str>) -> Self {
        match injected.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Self::parse(value).unwrap_or_default(),
            None => page_path.map(Self::from_page_path).unwrap_or_default(),
        }
    }

    /// Human-friendly title used in headers.
    pub fn title(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a domain outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownDomain(value.to_string()))
    }
}
