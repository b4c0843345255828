use core::fmt::{Display, Write};
use core::str::FromStr;

use crate::prelude_internal::*;

/// Canonical path of a document location: node names from the root down,
/// written `/`-joined without a leading `/`. The root is the empty path.
///
/// In the written form `~` is escaped as `~0` and `/` as `~1`, so keys
/// containing a slash still round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Plural)]
#[plural(len, is_empty, iter)]
pub struct DocPath(pub Vec<String>);

#[derive(Debug, PartialEq, thiserror::Error, Clone)]
pub enum PathError {
    #[error("empty segment in path '{path}'")]
    EmptySegment { path: String },
    #[error("reference path '{path}' must start with '/'")]
    NotAbsolute { path: String },
    #[error("invalid escape in path '{path}': '~' must be followed by '0' or '1'")]
    InvalidEscape { path: String },
}

impl DocPath {
    /// Create an empty path representing the document root
    pub fn root() -> Self {
        DocPath(Vec::new())
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(DocPath(init.to_vec()))
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Segment-wise prefix test; `a/b` is a prefix of `a/b/c` but not of `a/bc`.
    pub fn starts_with(&self, prefix: &DocPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The segments remaining after `prefix`, if `prefix` is a prefix of this path.
    pub fn strip_prefix(&self, prefix: &DocPath) -> Option<&[String]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

/// Parses an array index segment. Only canonical base-10 forms are accepted,
/// so `"01"` and `"+1"` are not indices.
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

fn unescape(segment: &str, path: &str) -> Result<String, PathError> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(PathError::InvalidEscape {
                    path: path.to_string(),
                });
            }
        }
    }
    Ok(out)
}

impl FromStr for DocPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(DocPath::root());
        }
        let mut segments = Vec::new();
        for raw in s.split('/') {
            if raw.is_empty() {
                return Err(PathError::EmptySegment {
                    path: s.to_string(),
                });
            }
            segments.push(unescape(raw, s)?);
        }
        Ok(DocPath(segments))
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            for c in segment.chars() {
                match c {
                    '~' => f.write_str("~0")?,
                    '/' => f.write_str("~1")?,
                    c => f.write_char(c)?,
                }
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for DocPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        DocPath(iter.into_iter().map(Into::into).collect())
    }
}
