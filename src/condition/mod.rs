//! # Condition Module
//!
//! Request conditions decide whether a mapped handler applies to a request
//! and, when several do, which one is the closest fit.
//!
//! Every condition type implements [`RequestCondition`]:
//!
//! - **combine**: merge a type-level condition with a method-level one
//! - **matching**: return a copy narrowed to the parts that matched, or `None`
//! - **compare**: rank two narrowed conditions for the same request
//!
//! [`RouteCondition`] composes one of each into the registry key.
//!
//! ## Example
//!
//! ```rust
//! use handlermap::condition::{RequestCondition, RouteCondition};
//! use handlermap::request::RequestDescriptor;
//! use http::Method;
//!
//! let condition = RouteCondition::builder()
//!     .path("/orders/{id}")
//!     .method("GET")
//!     .build()?;
//! let request = RequestDescriptor::new(Method::GET, "/orders/7");
//! assert!(condition.matching(&request)?.is_some());
//! # Ok::<(), handlermap::RoutingError>(())
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::request::RequestDescriptor;

mod consumes;
mod custom;
mod expression;
mod headers;
mod media_type;
mod methods;
mod params;
mod path_pattern;
mod patterns;
mod produces;
mod route;

pub use consumes::ConsumesCondition;
pub use custom::{CustomCondition, CustomConditionHolder};
pub use expression::NameValueExpression;
pub use headers::HeadersCondition;
pub use media_type::{sort_by_quality, MediaType, MediaTypeError, MediaTypeExpression};
pub use methods::MethodsCondition;
pub use params::ParamsCondition;
pub use path_pattern::PathPattern;
pub use patterns::PatternsCondition;
pub use produces::ProducesCondition;
pub use route::{RouteCondition, RouteConditionBuilder};

#[cfg(test)]
pub(crate) use custom::tests::TenantCondition;

/// Contract shared by all request conditions.
pub trait RequestCondition: Sized {
    /// Merge with a more specific (method-level) condition. Never mutates
    /// either operand.
    fn combine(&self, other: &Self) -> Self;

    /// A copy narrowed to what matched `request`, or `None` when it does not
    /// apply. Errors only for unparsable request media types.
    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError>;

    /// `Less` when `self` is the better match. Both sides must come from
    /// [`RequestCondition::matching`] on the same request.
    fn compare(&self, other: &Self, request: &RequestDescriptor) -> Ordering;

    fn is_empty(&self) -> bool;
}

/// One component of [`RouteCondition`], used to configure ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchCriterion {
    Methods,
    Consumes,
    Produces,
    Patterns,
    Params,
    Headers,
    Custom,
}

impl MatchCriterion {
    /// Methods, consumes, produces, patterns, params, headers, then custom.
    pub const DEFAULT_ORDER: &'static [MatchCriterion] = &[
        MatchCriterion::Methods,
        MatchCriterion::Consumes,
        MatchCriterion::Produces,
        MatchCriterion::Patterns,
        MatchCriterion::Params,
        MatchCriterion::Headers,
        MatchCriterion::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchCriterion::Methods => "methods",
            MatchCriterion::Consumes => "consumes",
            MatchCriterion::Produces => "produces",
            MatchCriterion::Patterns => "patterns",
            MatchCriterion::Params => "params",
            MatchCriterion::Headers => "headers",
            MatchCriterion::Custom => "custom",
        }
    }

    /// Drop duplicates and append any missing criteria in default order, so
    /// every comparison consults all of them.
    pub fn normalize_order(order: &[MatchCriterion]) -> Vec<MatchCriterion> {
        let mut normalized: Vec<MatchCriterion> = Vec::with_capacity(Self::DEFAULT_ORDER.len());
        for criterion in order.iter().chain(Self::DEFAULT_ORDER) {
            if !normalized.contains(criterion) {
                normalized.push(*criterion);
            }
        }
        normalized
    }
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "methods" => Ok(MatchCriterion::Methods),
            "consumes" => Ok(MatchCriterion::Consumes),
            "produces" => Ok(MatchCriterion::Produces),
            "patterns" => Ok(MatchCriterion::Patterns),
            "params" => Ok(MatchCriterion::Params),
            "headers" => Ok(MatchCriterion::Headers),
            "custom" => Ok(MatchCriterion::Custom),
            other => Err(format!("unknown match criterion `{other}`")),
        }
    }
}
