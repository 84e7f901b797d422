//! Route pattern compilation and segment matching.
//!
//! A pattern is a `/`-delimited path where each segment is one of:
//! - a literal, which must equal the request segment exactly
//! - a parameter `:name`, which binds the request segment under `name`
//! - the wildcard `*`, allowed only as the final segment, which matches any
//!   number (including zero) of trailing request segments
//!
//! Every segment before a wildcard must be present in the request path, so
//! `/files/*` matches `/files`, `/files/x` and `/files/a/b/c`, while
//! `/a/b/*` does not match `/a`.

use std::collections::HashMap;

use crate::PathParams;
use crate::router::RouterError;
use crate::utils::ensure;

const PARAM_MARKER: char = ':';
const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

impl RoutePattern {
    /// Compiles `raw` into segments, rejecting patterns that could never be
    /// matched as written.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(RouterError::invalid_pattern(raw, "pattern must start with '/'"));
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.into_iter().enumerate() {
            let segment = if part == WILDCARD {
                ensure!(index == last, RouterError::invalid_pattern(raw, "'*' is only allowed as the final segment"));
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(PARAM_MARKER) {
                ensure!(!name.is_empty(), RouterError::invalid_pattern(raw, "parameter name is empty"));
                let duplicated = segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name));
                ensure!(!duplicated, RouterError::invalid_pattern(raw, format!("parameter '{name}' is declared twice")));
                Segment::Param(name.to_owned())
            } else {
                ensure!(!part.contains('*'), RouterError::invalid_pattern(raw, "'*' must be a whole segment"));
                Segment::Literal(part.to_owned())
            };
            segments.push(segment);
        }

        let wildcard = raw.ends_with('*');
        Ok(Self { raw: raw.to_owned(), segments, wildcard })
    }

    /// The pattern exactly as registered.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern ends in a wildcard segment.
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Number of compiled segments, wildcard included.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Matches already-split request segments against this pattern.
    ///
    /// Returns `None` when the pattern rejects the path, otherwise the bound
    /// parameters (empty when the pattern declares none).
    pub fn matches(&self, path_segments: &[&str]) -> Option<PathParams> {
        if self.wildcard {
            // everything before the wildcard has to be present
            if path_segments.len() < self.segments.len() - 1 {
                return None;
            }
        } else if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, value) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Wildcard => break,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*value).to_owned());
                }
                Segment::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
            }
        }

        Some(PathParams::from(params))
    }
}

/// Splits a request path the same way patterns are split: the leading `/`
/// is dropped and the rest is cut on every `/`.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}
