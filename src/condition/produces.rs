use std::cmp::Ordering;
use std::fmt;

use super::media_type::{MediaType, MediaTypeExpression};
use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Media types a route can produce, negotiated against the request Accept header.
///
/// Expressions keep their declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProducesCondition {
    expressions: Vec<MediaTypeExpression>,
}

impl ProducesCondition {
    pub fn new(expressions: Vec<MediaTypeExpression>) -> Self {
        let mut unique: Vec<MediaTypeExpression> = Vec::with_capacity(expressions.len());
        for expr in expressions {
            if !unique.contains(&expr) {
                unique.push(expr);
            }
        }
        Self { expressions: unique }
    }

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

    pub fn expressions(&self) -> &[MediaTypeExpression] {
        &self.expressions
    }

    /// Non-negated media types this condition can produce.
    pub fn producible_media_types(&self) -> Vec<MediaType> {
        self.expressions
            .iter()
            .filter(|e| !e.is_negated())
            .map(|e| e.media_type().clone())
            .collect()
    }

    /// An empty condition ranks as if it produced `*/*`.
    fn media_types_to_compare(&self) -> Vec<MediaType> {
        if self.expressions.is_empty() {
            vec![MediaType::all()]
        } else {
            self.expressions
                .iter()
                .map(|e| e.media_type().clone())
                .collect()
        }
    }
}

fn index_of_equal(types: &[MediaType], accepted: &MediaType) -> Option<usize> {
    let accepted = accepted.without_params();
    types.iter().position(|t| t.without_params() == accepted)
}

fn index_of_included(types: &[MediaType], accepted: &MediaType) -> Option<usize> {
    types.iter().position(|t| accepted.includes(t))
}

fn compare_matching(
    this: &[MediaType],
    this_index: Option<usize>,
    other: &[MediaType],
    other_index: Option<usize>,
) -> Ordering {
    match (this_index, other_index) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
        (Some(a), Some(b)) => this[a].specificity_cmp(&other[b]),
    }
}

impl RequestCondition for ProducesCondition {
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
            return Ok(Some(Self::default()));
        }
        if self.is_empty() {
            return Ok(Some(self.clone()));
        }
        let accepted = request.accepted_media_types()?;
        let matched: Vec<MediaTypeExpression> = self
            .expressions
            .iter()
            .filter(|e| e.matches_accepted(accepted))
            .cloned()
            .collect();
        if !matched.is_empty() {
            return Ok(Some(Self { expressions: matched }));
        }
        if accepted.iter().any(MediaType::is_wildcard_type) {
            return Ok(Some(Self::default()));
        }
        Ok(None)
    }

    /// Walks the accepted types, highest quality first. For each one, a
    /// condition producing exactly that type beats one that is merely
    /// included by it; when both qualify, the more specific type wins.
    fn compare(&self, other: &Self, request: &RequestDescriptor) -> Ordering {
        let fallback = [MediaType::all()];
        let accepted = request.accepted_media_types().unwrap_or(&fallback);
        let this_types = self.media_types_to_compare();
        let other_types = other.media_types_to_compare();

        for accepted_type in accepted {
            let result = compare_matching(
                &this_types,
                index_of_equal(&this_types, accepted_type),
                &other_types,
                index_of_equal(&other_types, accepted_type),
            );
            if result != Ordering::Equal {
                return result;
            }
            let result = compare_matching(
                &this_types,
                index_of_included(&this_types, accepted_type),
                &other_types,
                index_of_included(&other_types, accepted_type),
            );
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl fmt::Display for ProducesCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exprs: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "{}", exprs.join(" || "))
    }
}
