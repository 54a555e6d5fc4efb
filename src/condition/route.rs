use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::{
    ConsumesCondition, CustomCondition, CustomConditionHolder, HeadersCondition, MatchCriterion,
    MethodsCondition, ParamsCondition, PatternsCondition, ProducesCondition, RequestCondition,
};
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Full set of conditions a handler is mapped with.
///
/// Immutable once built. Equality and hashing cover every sub-condition, so
/// a `RouteCondition` is used directly as the registry key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteCondition {
    patterns: PatternsCondition,
    methods: MethodsCondition,
    params: ParamsCondition,
    headers: HeadersCondition,
    consumes: ConsumesCondition,
    produces: ProducesCondition,
    custom: CustomConditionHolder,
}

impl RouteCondition {
    pub fn builder() -> RouteConditionBuilder {
        RouteConditionBuilder::default()
    }

    pub fn patterns(&self) -> &PatternsCondition {
        &self.patterns
    }

    pub fn methods(&self) -> &MethodsCondition {
        &self.methods
    }

    pub fn params(&self) -> &ParamsCondition {
        &self.params
    }

    pub fn headers(&self) -> &HeadersCondition {
        &self.headers
    }

    pub fn consumes(&self) -> &ConsumesCondition {
        &self.consumes
    }

    pub fn produces(&self) -> &ProducesCondition {
        &self.produces
    }

    pub fn custom(&self) -> &CustomConditionHolder {
        &self.custom
    }

    pub fn direct_paths(&self) -> Vec<String> {
        self.patterns.direct_paths()
    }

    /// Like [`RequestCondition::combine`], but reports pattern combinations
    /// that do not compile instead of skipping them.
    pub fn try_combine(&self, other: &Self) -> Result<Self, RoutingError> {
        Ok(Self {
            patterns: self.patterns.try_combine(&other.patterns)?,
            ..self.combine_without_patterns(other)
        })
    }

    fn combine_without_patterns(&self, other: &Self) -> Self {
        Self {
            patterns: PatternsCondition::default(),
            methods: self.methods.combine(&other.methods),
            params: self.params.combine(&other.params),
            headers: self.headers.combine(&other.headers),
            consumes: self.consumes.combine(&other.consumes),
            produces: self.produces.combine(&other.produces),
            custom: self.custom.combine(&other.custom),
        }
    }

    /// Compare two matched conditions using an explicit criterion order.
    ///
    /// Criteria missing from `order` are never consulted.
    pub fn compare_with(
        &self,
        other: &Self,
        request: &RequestDescriptor,
        order: &[MatchCriterion],
    ) -> Ordering {
        for criterion in order {
            let result = match criterion {
                MatchCriterion::Methods => self.methods.compare(&other.methods, request),
                MatchCriterion::Consumes => self.consumes.compare(&other.consumes, request),
                MatchCriterion::Produces => self.produces.compare(&other.produces, request),
                MatchCriterion::Patterns => self.patterns.compare(&other.patterns, request),
                MatchCriterion::Params => self.params.compare(&other.params, request),
                MatchCriterion::Headers => self.headers.compare(&other.headers, request),
                MatchCriterion::Custom => self.custom.compare(&other.custom, request),
            };
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }
}

impl RequestCondition for RouteCondition {
    fn combine(&self, other: &Self) -> Self {
        Self {
            patterns: self.patterns.combine(&other.patterns),
            ..self.combine_without_patterns(other)
        }
    }

    /// Cheap conditions are evaluated first; the first miss short-circuits.
    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        let Some(methods) = self.methods.matching(request)? else {
            return Ok(None);
        };
        let Some(params) = self.params.matching(request)? else {
            return Ok(None);
        };
        let Some(headers) = self.headers.matching(request)? else {
            return Ok(None);
        };
        // Path before media types: a bad Content-Type or Accept only fails
        // routes mapped to this path.
        let Some(patterns) = self.patterns.matching(request)? else {
            return Ok(None);
        };
        let Some(consumes) = self.consumes.matching(request)? else {
            return Ok(None);
        };
        let Some(produces) = self.produces.matching(request)? else {
            return Ok(None);
        };
        let Some(custom) = self.custom.matching(request)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            patterns,
            methods,
            params,
            headers,
            consumes,
            produces,
            custom,
        }))
    }

    fn compare(&self, other: &Self, request: &RequestDescriptor) -> Ordering {
        self.compare_with(other, request, MatchCriterion::DEFAULT_ORDER)
    }

    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
            && self.methods.is_empty()
            && self.params.is_empty()
            && self.headers.is_empty()
            && self.consumes.is_empty()
            && self.produces.is_empty()
            && self.custom.is_empty()
    }
}

impl fmt::Display for RouteCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        let mut part = |f: &mut fmt::Formatter<'_>, label: &str, value: String| -> fmt::Result {
            if value.is_empty() {
                return Ok(());
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            if label.is_empty() {
                write!(f, "[{value}]")
            } else {
                write!(f, "{label} [{value}]")
            }
        };
        part(f, "", self.methods.to_string())?;
        part(f, "", self.patterns.to_string())?;
        part(f, "params", self.params.to_string())?;
        part(f, "headers", self.headers.to_string())?;
        part(f, "consumes", self.consumes.to_string())?;
        part(f, "produces", self.produces.to_string())?;
        part(f, "custom", self.custom.to_string())?;
        f.write_str("}")
    }
}

/// Builds a [`RouteCondition`] from string expressions.
///
/// Parse errors are collected and reported by [`RouteConditionBuilder::build`].
#[derive(Debug, Default)]
pub struct RouteConditionBuilder {
    paths: Vec<String>,
    methods: Vec<String>,
    params: Vec<String>,
    headers: Vec<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
    body_required: Option<bool>,
    custom: Option<Arc<dyn CustomCondition>>,
}

impl RouteConditionBuilder {
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.paths([path])
    }

    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn method(self, method: impl Into<String>) -> Self {
        self.methods([method])
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn consumes<I, S>(mut self, consumes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes.extend(consumes.into_iter().map(Into::into));
        self
    }

    pub fn produces<I, S>(mut self, produces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces.extend(produces.into_iter().map(Into::into));
        self
    }

    pub fn body_required(mut self, required: bool) -> Self {
        self.body_required = Some(required);
        self
    }

    pub fn custom(mut self, condition: Arc<dyn CustomCondition>) -> Self {
        self.custom = Some(condition);
        self
    }

    pub fn build(self) -> Result<RouteCondition, RoutingError> {
        let mut consumes = ConsumesCondition::parse(&self.consumes)?;
        if let Some(required) = self.body_required {
            consumes = consumes.with_body_required(required);
        }
        Ok(RouteCondition {
            patterns: PatternsCondition::parse(&self.paths)?,
            methods: MethodsCondition::parse(&self.methods)?,
            params: ParamsCondition::parse(&self.params)?,
            headers: HeadersCondition::parse(&self.headers)?,
            consumes,
            produces: ProducesCondition::parse(&self.produces)?,
            custom: self
                .custom
                .map(CustomConditionHolder::new)
                .unwrap_or_default(),
        })
    }
}
