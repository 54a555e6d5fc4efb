use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use super::path_pattern::PathPattern;
use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::{ParamVec, RequestDescriptor};

/// Set of path patterns a route answers to.
///
/// With no patterns the condition behaves as the empty pattern and matches
/// only `""` and `"/"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PatternsCondition {
    /// Most specific first; ties broken by pattern text.
    patterns: Vec<PathPattern>,
}

impl PatternsCondition {
    pub fn new<I: IntoIterator<Item = PathPattern>>(patterns: I) -> Self {
        let mut patterns: Vec<PathPattern> = patterns.into_iter().collect();
        patterns.sort_by(|a, b| a.specificity_cmp(b).then_with(|| a.cmp(b)));
        patterns.dedup();
        Self { patterns }
    }

    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, RoutingError> {
        let patterns = values
            .iter()
            .map(|v| PathPattern::parse(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(patterns))
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Paths that can be looked up verbatim, without pattern matching.
    pub fn direct_paths(&self) -> Vec<String> {
        if self.patterns.is_empty() {
            return vec![String::new(), "/".to_string()];
        }
        let mut paths = Vec::new();
        for pattern in self.patterns.iter().filter(|p| p.is_literal()) {
            if pattern.as_str().is_empty() {
                paths.push(String::new());
                paths.push("/".to_string());
            } else {
                paths.push(pattern.as_str().to_string());
            }
        }
        paths
    }

    /// The best pattern after [`RequestCondition::matching`] narrowed the set.
    pub fn best(&self) -> Option<&PathPattern> {
        self.patterns.first()
    }

    /// Variables captured by the best pattern for `path`.
    pub fn extract_variables(&self, path: &str) -> ParamVec {
        self.best()
            .and_then(|p| p.matches(path))
            .unwrap_or_default()
    }

    /// Cartesian concatenation, failing on the first combination that does
    /// not form a valid pattern.
    pub fn try_combine(&self, other: &Self) -> Result<Self, RoutingError> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        let mut combined = Vec::with_capacity(self.patterns.len() * other.patterns.len());
        for prefix in &self.patterns {
            for suffix in &other.patterns {
                combined.push(prefix.combine(suffix)?);
            }
        }
        Ok(Self::new(combined))
    }
}

impl RequestCondition for PatternsCondition {
    /// Invalid combinations are skipped; use
    /// [`PatternsCondition::try_combine`] to surface them.
    fn combine(&self, other: &Self) -> Self {
        match self.try_combine(other) {
            Ok(combined) => combined,
            Err(err) => {
                warn!(error = %err, "Skipping invalid pattern combination");
                let mut combined = Vec::new();
                for prefix in &self.patterns {
                    for suffix in &other.patterns {
                        if let Ok(pattern) = prefix.combine(suffix) {
                            combined.push(pattern);
                        }
                    }
                }
                Self::new(combined)
            }
        }
    }

    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        let path = request.path();
        if self.patterns.is_empty() {
            return Ok((path.is_empty() || path == "/").then(|| self.clone()));
        }
        let matched: Vec<PathPattern> = self
            .patterns
            .iter()
            .filter(|p| p.is_match(path))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        // Already in specificity order.
        Ok(Some(Self { patterns: matched }))
    }

    /// Compares pattern by pattern; with an equal prefix, the condition
    /// holding more patterns wins.
    fn compare(&self, other: &Self, _request: &RequestDescriptor) -> Ordering {
        let mut left = self.patterns.iter();
        let mut right = other.patterns.iter();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => {
                    let result = a.specificity_cmp(b);
                    if result != Ordering::Equal {
                        return result;
                    }
                }
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.patterns.iter().all(|p| p.as_str().is_empty())
    }
}

impl fmt::Display for PatternsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.patterns.iter().map(PathPattern::as_str).collect();
        write!(f, "{}", patterns.join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn get(path: &str) -> RequestDescriptor {
        RequestDescriptor::new(Method::GET, path)
    }

    #[test]
    fn test_literal_beats_template() {
        let req = get("/items/active");
        let literal = PatternsCondition::parse(&["/items/active"]).unwrap();
        let template = PatternsCondition::parse(&["/items/{id}"]).unwrap();
        let literal = literal.matching(&req).unwrap().unwrap();
        let template = template.matching(&req).unwrap().unwrap();
        assert_eq!(literal.compare(&template, &req), Ordering::Less);
        assert_eq!(template.compare(&literal, &req), Ordering::Greater);
    }

    #[test]
    fn test_matching_keeps_only_matching_patterns() {
        let cond = PatternsCondition::parse(&["/a/{x}", "/b/{x}", "/a/*"]).unwrap();
        let narrowed = cond.matching(&get("/a/1")).unwrap().unwrap();
        let kept: Vec<&str> = narrowed.patterns().iter().map(PathPattern::as_str).collect();
        assert_eq!(kept, vec!["/a/{x}", "/a/*"]);
        assert_eq!(narrowed.best().unwrap().as_str(), "/a/{x}");
        assert!(cond.matching(&get("/c/1")).unwrap().is_none());
    }

    #[test]
    fn test_direct_paths() {
        let cond = PatternsCondition::parse(&["/health", "/items/{id}", "/status"]).unwrap();
        let mut direct = cond.direct_paths();
        direct.sort();
        assert_eq!(direct, vec!["/health", "/status"]);
        assert_eq!(PatternsCondition::default().direct_paths(), vec!["", "/"]);
    }

    #[test]
    fn test_empty_condition_matches_root_only() {
        let empty = PatternsCondition::default();
        assert!(empty.matching(&get("/")).unwrap().is_some());
        assert!(empty.matching(&get("")).unwrap().is_some());
        assert!(empty.matching(&get("/x")).unwrap().is_none());
    }

    #[test]
    fn test_combine_cartesian() {
        let type_level = PatternsCondition::parse(&["/v1", "/v2"]).unwrap();
        let method_level = PatternsCondition::parse(&["/a", "/b"]).unwrap();
        let combined = type_level.combine(&method_level);
        assert_eq!(combined.patterns().len(), 4);
        assert!(combined.matching(&get("/v2/b")).unwrap().is_some());
        assert_eq!(type_level.combine(&PatternsCondition::default()), type_level);
        assert_eq!(PatternsCondition::default().combine(&method_level), method_level);
    }

    #[test]
    fn test_try_combine_reports_invalid_result() {
        let a = PatternsCondition::parse(&["/{id}"]).unwrap();
        assert!(a.try_combine(&a).is_err());
    }

    #[test]
    fn test_extract_variables() {
        let cond = PatternsCondition::parse(&["/users/{id}"]).unwrap();
        let narrowed = cond.matching(&get("/users/9")).unwrap().unwrap();
        let vars = narrowed.extract_variables("/users/9");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].1, "9");
    }
}
