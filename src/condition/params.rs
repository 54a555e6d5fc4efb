use std::cmp::Ordering;
use std::fmt;

use super::expression::NameValueExpression;
use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Query parameter expressions that must all hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamsCondition {
    /// Sorted and deduplicated.
    expressions: Vec<NameValueExpression>,
}

impl ParamsCondition {
    pub fn new(mut expressions: Vec<NameValueExpression>) -> Self {
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

impl RequestCondition for ParamsCondition {
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
        let all_hold = self.expressions.iter().all(|expr| {
            let values = request.query_values(expr.name());
            let present = request.has_query_param(expr.name());
            expr.matches(values, present)
        });
        Ok(all_hold.then(|| self.clone()))
    }

    /// More expressions rank higher; then more `name=value` expressions.
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

impl fmt::Display for ParamsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exprs: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "{}", exprs.join(" && "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn req(uri: &str) -> RequestDescriptor {
        RequestDescriptor::from_uri(Method::GET, uri)
    }

    #[test]
    fn test_all_expressions_must_hold() {
        let cond = ParamsCondition::parse(&["format=csv", "!debug"]).unwrap();
        assert!(cond.matching(&req("/r?format=csv")).unwrap().is_some());
        assert!(cond.matching(&req("/r?format=csv&debug")).unwrap().is_none());
        assert!(cond.matching(&req("/r?format=json")).unwrap().is_none());
    }

    #[test]
    fn test_more_expressions_rank_higher() {
        let request = req("/r?a=1&b=2");
        let one = ParamsCondition::parse(&["a"]).unwrap();
        let two = ParamsCondition::parse(&["a", "b"]).unwrap();
        assert_eq!(two.compare(&one, &request), Ordering::Less);

        let by_value = ParamsCondition::parse(&["a=1"]).unwrap();
        assert_eq!(by_value.compare(&one, &request), Ordering::Less);
    }

    #[test]
    fn test_combine_is_union() {
        let a = ParamsCondition::parse(&["a"]).unwrap();
        let b = ParamsCondition::parse(&["b", "a"]).unwrap();
        assert_eq!(a.combine(&b).expressions().len(), 2);
    }
}
