use std::cmp::Ordering;
use std::fmt;

use super::media_type::{MediaType, MediaTypeExpression};
use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Media types a route can consume, matched against the request Content-Type.
///
/// Expressions are kept most-specific first so the head of the list is the
/// representative used for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumesCondition {
    expressions: Vec<MediaTypeExpression>,
    body_required: bool,
}

impl Default for ConsumesCondition {
    fn default() -> Self {
        Self {
            expressions: Vec::new(),
            body_required: true,
        }
    }
}

impl ConsumesCondition {
    pub fn new(expressions: Vec<MediaTypeExpression>) -> Self {
        let mut unique: Vec<MediaTypeExpression> = Vec::with_capacity(expressions.len());
        for expr in expressions {
            if !unique.contains(&expr) {
                unique.push(expr);
            }
        }
        unique.sort_by(|a, b| a.media_type().specificity_cmp(b.media_type()));
        Self {
            expressions: unique,
            body_required: true,
        }
    }

    /// Parse expressions such as `["application/json", "!text/plain"]`.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, RoutingError> {
        let expressions = values
            .iter()
            .map(|v| {
                MediaTypeExpression::parse(v.as_ref()).map_err(|e| RoutingError::InvalidMapping {
                    value: v.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(expressions))
    }

    /// Whether a request without a body must still satisfy the condition.
    ///
    /// When `false`, body-less requests match trivially.
    pub fn with_body_required(mut self, required: bool) -> Self {
        self.body_required = required;
        self
    }

    pub fn expressions(&self) -> &[MediaTypeExpression] {
        &self.expressions
    }

    pub fn is_body_required(&self) -> bool {
        self.body_required
    }

    /// Non-negated media types, used to report what a route accepts.
    pub fn consumable_media_types(&self) -> Vec<MediaType> {
        self.expressions
            .iter()
            .filter(|e| !e.is_negated())
            .map(|e| e.media_type().clone())
            .collect()
    }

    fn empty_match(&self) -> Self {
        Self {
            expressions: Vec::new(),
            body_required: self.body_required,
        }
    }
}

impl RequestCondition for ConsumesCondition {
    /// Method-level expressions replace type-level ones when present.
    fn combine(&self, other: &Self) -> Self {
        if other.is_empty() {
            self.clone()
        } else {
            other.clone()
        }
    }

    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        if request.is_preflight() {
            return Ok(Some(self.empty_match()));
        }
        if self.is_empty() {
            return Ok(Some(self.clone()));
        }
        if !request.has_body() && !self.body_required {
            return Ok(Some(self.empty_match()));
        }
        let content_type = request
            .content_type()?
            .unwrap_or_else(MediaType::octet_stream);
        let matched: Vec<MediaTypeExpression> = self
            .expressions
            .iter()
            .filter(|e| e.matches_content_type(&content_type))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            expressions: matched,
            body_required: self.body_required,
        }))
    }

    fn compare(&self, other: &Self, _request: &RequestDescriptor) -> Ordering {
        match (self.expressions.first(), other.expressions.first()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.media_type().specificity_cmp(b.media_type()),
        }
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl fmt::Display for ConsumesCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exprs: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "{}", exprs.join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn post(content_type: Option<&str>) -> RequestDescriptor {
        let req = RequestDescriptor::new(Method::POST, "/orders").with_header("Content-Length", "12");
        match content_type {
            Some(ct) => req.with_header("Content-Type", ct),
            None => req,
        }
    }

    #[test]
    fn test_includes_semantics() {
        let cond = ConsumesCondition::parse(&["application/*"]).unwrap();
        assert!(cond.matching(&post(Some("application/json"))).unwrap().is_some());
        assert!(cond.matching(&post(Some("text/plain"))).unwrap().is_none());
    }

    #[test]
    fn test_negated_expression() {
        let cond = ConsumesCondition::parse(&["!text/plain"]).unwrap();
        assert!(cond.matching(&post(Some("application/json"))).unwrap().is_some());
        assert!(cond.matching(&post(Some("text/plain"))).unwrap().is_none());
    }

    #[test]
    fn test_missing_content_type_defaults_to_octet_stream() {
        let json = ConsumesCondition::parse(&["application/json"]).unwrap();
        assert!(json.matching(&post(None)).unwrap().is_none());
        let binary = ConsumesCondition::parse(&["application/octet-stream"]).unwrap();
        assert!(binary.matching(&post(None)).unwrap().is_some());
    }

    #[test]
    fn test_unparsable_content_type_is_an_error() {
        let cond = ConsumesCondition::parse(&["application/json"]).unwrap();
        let err = cond.matching(&post(Some("garbage"))).unwrap_err();
        assert!(matches!(err, RoutingError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn test_body_not_required_matches_bodyless_request() {
        let cond = ConsumesCondition::parse(&["application/json"])
            .unwrap()
            .with_body_required(false);
        let bodyless = RequestDescriptor::new(Method::POST, "/orders");
        let narrowed = cond.matching(&bodyless).unwrap().unwrap();
        assert!(narrowed.is_empty());

        let with_body = post(Some("text/plain"));
        assert!(cond.matching(&with_body).unwrap().is_none());
    }

    #[test]
    fn test_matching_narrows_expressions() {
        let cond = ConsumesCondition::parse(&["text/plain", "application/json"]).unwrap();
        let narrowed = cond.matching(&post(Some("application/json"))).unwrap().unwrap();
        assert_eq!(narrowed.expressions().len(), 1);
        assert_eq!(narrowed.to_string(), "application/json");
    }

    #[test]
    fn test_more_specific_wins() {
        let req = post(Some("application/json"));
        let json = ConsumesCondition::parse(&["application/json"]).unwrap();
        let all = ConsumesCondition::parse(&["*/*"]).unwrap();
        let json = json.matching(&req).unwrap().unwrap();
        let all = all.matching(&req).unwrap().unwrap();
        assert_eq!(json.compare(&all, &req), Ordering::Less);
        assert_eq!(all.compare(&json, &req), Ordering::Greater);
    }

    #[test]
    fn test_combine_prefers_method_level() {
        let type_level = ConsumesCondition::parse(&["application/xml"]).unwrap();
        let method_level = ConsumesCondition::parse(&["application/json"]).unwrap();
        assert_eq!(type_level.combine(&method_level), method_level);
        assert_eq!(type_level.combine(&ConsumesCondition::default()), type_level);
    }
}
