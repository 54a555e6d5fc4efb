use std::cmp::Ordering;
use std::fmt;

use super::expression::NameValueExpression;
use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Request header expressions that must all hold.
///
/// `Accept` and `Content-Type` expressions are dropped at construction; those
/// headers are handled by the produces and consumes conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeadersCondition {
    expressions: Vec<NameValueExpression>,
}

impl HeadersCondition {
    pub fn new(expressions: Vec<NameValueExpression>) -> Self {
        let mut expressions: Vec<NameValueExpression> = expressions
            .into_iter()
            .map(NameValueExpression::with_lowercase_name)
            .filter(|e| e.name() != "accept" && e.name() != "content-type")
            .collect();
        expressions.sort();
        expressions.dedup();
        Self { expressions }
    }

    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, RoutingError> {
        let expressions = values
            .iter()
            .map(|v| NameValueExpression::parse(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(expressions))
    }

    pub fn expressions(&self) -> &[NameValueExpression] {
        &self.expressions
    }

    fn value_match_count(&self) -> usize {
        self.expressions
            .iter()
            .filter(|e| e.value().is_some() && !e.is_negated())
            .count()
    }
}

impl RequestCondition for HeadersCondition {
    fn combine(&self, other: &Self) -> Self {
        Self::new(
            self.expressions
                .iter()
                .chain(other.expressions.iter())
                .cloned()
                .collect(),
        )
    }

    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        if request.is_preflight() {
            return Ok(Some(Self::default()));
        }
        let headers = request.headers();
        let all_hold = self.expressions.iter().all(|expr| {
            let values = headers
                .get_all(expr.name())
                .iter()
                .filter_map(|v| v.to_str().ok());
            expr.matches(values, headers.contains_key(expr.name()))
        });
        Ok(all_hold.then(|| self.clone()))
    }

    fn compare(&self, other: &Self, _request: &RequestDescriptor) -> Ordering {
        other
            .expressions
            .len()
            .cmp(&self.expressions.len())
            .then_with(|| other.value_match_count().cmp(&self.value_match_count()))
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl fmt::Display for HeadersCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exprs: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "{}", exprs.join(" && "))
    }
}
