//! URI templates for endpoint paths
//!
//! An endpoint path is a sequence of `/`-separated segments where a whole
//! segment may be a `{name}` parameter. Matching binds each parameter
//! segment to the corresponding segment of a concrete request path.
//!
//! Templates that differ only in parameter names are the same mapping, so
//! ordering and duplicate detection use the normalized form with every
//! parameter collapsed to `{}`.

use std::collections::{HashMap, HashSet};

use crate::error::DeploymentError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

/// A parsed endpoint path
#[derive(Debug, Clone)]
pub struct UriTemplate {
    path: String,
    segments: Vec<Segment>,
    normalized: String,
    has_parameters: bool,
}

impl UriTemplate {
    /// Parse a path into a template. The path must be absolute, free of
    /// empty segments, and any parameters must span whole segments with
    /// unique names.
    pub fn new(path: &str) -> Result<Self, DeploymentError> {
        let invalid = || DeploymentError::InvalidTemplate(path.to_string());
        if path.len() < 2 || !path.starts_with('/') {
            return Err(invalid());
        }

        let mut segments = Vec::new();
        let mut normalized = String::with_capacity(path.len());
        let mut seen_names = HashSet::new();
        let mut has_parameters = false;

        for raw in path[1..].split('/') {
            if raw.is_empty() {
                return Err(invalid());
            }
            if raw.starts_with('{') && raw.ends_with('}') {
                let name = &raw[1..raw.len() - 1];
                if name.is_empty() || name.contains(['{', '}', '/']) {
                    return Err(invalid());
                }
                if !seen_names.insert(name.to_string()) {
                    return Err(invalid());
                }
                has_parameters = true;
                segments.push(Segment::Parameter(name.to_string()));
                normalized.push_str("/{}");
            } else if raw.contains(['{', '}']) {
                // parameters spanning part of a segment are not supported
                return Err(invalid());
            } else {
                segments.push(Segment::Literal(raw.to_string()));
                normalized.push('/');
                normalized.push_str(raw);
            }
        }

        Ok(Self {
            path: path.to_string(),
            segments,
            normalized,
            has_parameters,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_parameters(&self) -> bool {
        self.has_parameters
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Parameter-name-independent form used for ordering and duplicate
    /// detection
    pub fn normalized_path(&self) -> &str {
        &self.normalized
    }

    /// Match a concrete request path (parsed as a template itself) and
    /// bind this template's parameters to its segments. Returns `None`
    /// when the candidate has parameters of its own, differs in segment
    /// count, or disagrees on any literal.
    pub fn matches(&self, candidate: &UriTemplate) -> Option<HashMap<String, String>> {
        if candidate.has_parameters || candidate.segments.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (own, other) in self.segments.iter().zip(candidate.segments.iter()) {
            let Segment::Literal(value) = other else {
                return None;
            };
            match own {
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
                Segment::Parameter(name) => {
                    params.insert(name.clone(), value.clone());
                }
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let t = UriTemplate::new("/rooms/lobby").unwrap();
        assert!(!t.has_parameters());
        assert_eq!(t.segment_count(), 2);
        assert_eq!(t.normalized_path(), "/rooms/lobby");
    }

    #[test]
    fn test_parameterized_path() {
        let t = UriTemplate::new("/rooms/{id}/users/{user}").unwrap();
        assert!(t.has_parameters());
        assert_eq!(t.segment_count(), 4);
        assert_eq!(t.normalized_path(), "/rooms/{}/users/{}");
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", "/", "rooms", "/rooms//x", "/a{b}", "/{}", "/{a}/{a}", "/{a{b}}"] {
            assert!(
                UriTemplate::new(path).is_err(),
                "expected {:?} to be rejected",
                path
            );
        }
    }

    #[test]
    fn test_match_binds_parameters() {
        let template = UriTemplate::new("/rooms/{id}").unwrap();
        let request = UriTemplate::new("/rooms/42").unwrap();
        let params = template.matches(&request).unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_match_rejects_literal_mismatch() {
        let template = UriTemplate::new("/rooms/{id}").unwrap();
        let request = UriTemplate::new("/halls/42").unwrap();
        assert!(template.matches(&request).is_none());
    }

    #[test]
    fn test_match_rejects_segment_count_mismatch() {
        let template = UriTemplate::new("/rooms/{id}").unwrap();
        let request = UriTemplate::new("/rooms/42/users").unwrap();
        assert!(template.matches(&request).is_none());
    }

    #[test]
    fn test_exact_template_matches_with_no_bindings() {
        let template = UriTemplate::new("/status").unwrap();
        let request = UriTemplate::new("/status").unwrap();
        assert_eq!(template.matches(&request), Some(HashMap::new()));
    }

    #[test]
    fn test_parameterized_candidate_never_matches() {
        let template = UriTemplate::new("/rooms/{id}").unwrap();
        let candidate = UriTemplate::new("/rooms/{other}").unwrap();
        assert!(template.matches(&candidate).is_none());
    }

    #[test]
    fn test_normalized_ordering_is_param_name_independent() {
        let a = UriTemplate::new("/rooms/{id}").unwrap();
        let b = UriTemplate::new("/rooms/{name}").unwrap();
        assert_eq!(a.normalized_path(), b.normalized_path());
    }
}
