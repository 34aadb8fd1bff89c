//! Dot-delimited addresses into nested state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated dot-delimited address into nested state, e.g.
/// `theme.sections.selected`. A path uniquely identifies one value in the
/// state graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath {
    raw: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    #[error("property path must not be empty")]
    Empty,
    #[error("property path `{0}` contains an empty segment")]
    EmptySegment(String),
}

impl PropertyPath {
    pub fn parse(raw: impl Into<String>) -> Result<Self, PathParseError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PathParseError::Empty);
        }
        if raw.split('.').any(|segment| segment.trim().is_empty()) {
            return Err(PathParseError::EmptySegment(raw));
        }
        Ok(Self { raw })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// Final segment of the path.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.raw
            .rsplit_once('.')
            .map_or(self.raw.as_str(), |(_, leaf)| leaf)
    }

    /// Every segment except the last, in order. Empty for single-segment paths.
    pub fn parent_segments(&self) -> impl Iterator<Item = &str> {
        self.raw
            .rsplit_once('.')
            .map(|(head, _)| head.split('.'))
            .into_iter()
            .flatten()
    }

    /// True when `self` addresses `other` itself or one of its ancestors.
    /// This is the subtree-watch test: a binding on `theme.sections` is
    /// affected by a change to `theme.sections.selected`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &PropertyPath) -> bool {
        other.raw.len() >= self.raw.len()
            && other.raw.starts_with(self.raw.as_str())
            && (other.raw.len() == self.raw.len()
                || other.raw.as_bytes()[self.raw.len()] == b'.')
    }

    /// Address `relative` underneath `self`.
    #[must_use]
    pub fn join(&self, relative: &PropertyPath) -> PropertyPath {
        PropertyPath {
            raw: format!("{}.{}", self.raw, relative.raw),
        }
    }
}

impl FromStr for PropertyPath {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = PathParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.raw
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
