//! Path template matching.
//!
//! # Responsibilities
//! - Parse templates such as `/hash/{id}` into literal and parameter segments
//! - Match a concrete request path against a template, capturing parameters
//!
//! # Design Decisions
//! - Segments are split on `/`; the leading empty segment is kept, so
//!   `/hash` and `/hash/` are different shapes
//! - A parameter occupies a whole segment (`{name}`); braces anywhere else are
//!   rejected at parse time
//! - Segment counts must be equal; there are no prefix or wildcard matches
//! - No regex, matching is a single positional pass

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Errors raised when a route template is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated parameter marker in segment '{0}'")]
    Unterminated(String),

    #[error("parameter in segment '{0}' has no name")]
    EmptyName(String),

    #[error("segment '{0}' mixes literal text with a parameter")]
    Malformed(String),

    #[error("parameter '{0}' appears more than once")]
    DuplicateName(String),
}

/// One segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Successful match of a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The template's canonical path, used for handler lookup.
    pub path: &'a str,
    /// Parameter name → captured segment.
    pub params: HashMap<String, String>,
}

/// A parsed, immutable path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    path: String,
    segments: Vec<Segment>,
}

/// Split a path on `/`, keeping empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

/// True if any segment of `path` is a `{name}` parameter.
pub fn is_parameterized(path: &str) -> bool {
    path.split('/').any(|segment| {
        segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
    })
}

fn parse_segment(segment: &str) -> Result<Segment, TemplateError> {
    let opens = segment.contains('{');
    let closes = segment.contains('}');

    match (opens, closes) {
        (false, false) => Ok(Segment::Literal(segment.to_string())),
        (true, false) | (false, true) => Err(TemplateError::Unterminated(segment.to_string())),
        (true, true) => {
            let name = segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .ok_or_else(|| TemplateError::Malformed(segment.to_string()))?;

            if name.contains('{') || name.contains('}') {
                return Err(TemplateError::Malformed(segment.to_string()));
            }
            if name.is_empty() {
                return Err(TemplateError::EmptyName(segment.to_string()));
            }
            Ok(Segment::Param(name.to_string()))
        }
    }
}

impl PathTemplate {
    /// Parse a template path.
    pub fn parse(path: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut names = HashSet::new();

        for raw in split_path(path) {
            let segment = parse_segment(raw)?;
            if let Segment::Param(name) = &segment {
                if !names.insert(name.clone()) {
                    return Err(TemplateError::DuplicateName(name.clone()));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            path: path.to_string(),
            segments,
        })
    }

    /// The template exactly as registered.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of the parameters, in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete path, returning the captured parameters on success.
    pub fn matches(&self, concrete: &str) -> Option<RouteMatch<'_>> {
        let parts = split_path(concrete);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal != part => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(RouteMatch {
            path: &self.path,
            params,
        })
    }
}
