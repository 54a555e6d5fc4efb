//! Explains why nothing matched.
//!
//! Only conditions whose patterns match the path are considered. They are
//! filtered criterion by criterion; the first criterion that eliminates all
//! of them decides the error:
//!
//! | criterion | error                                     | status |
//! |-----------|-------------------------------------------|--------|
//! | patterns  | [`RoutingError::NoMatch`]                 | 404    |
//! | methods   | [`RoutingError::MethodNotAllowed`]        | 405    |
//! | consumes  | [`RoutingError::ContentTypeNotSupported`] | 415    |
//! | produces  | [`RoutingError::NotAcceptable`]           | 406    |
//! | params    | [`RoutingError::UnsatisfiedParams`]       | 400    |
//!
//! Anything else (headers, custom) is a plain `NoMatch`. An unparsable
//! `Content-Type` or `Accept` is still reported as
//! [`RoutingError::UnsupportedMediaType`] or
//! [`RoutingError::InvalidAcceptHeader`].

use http::Method;

use crate::condition::{MediaType, RequestCondition, RouteCondition};
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

pub(super) fn diagnose<'a, I>(request: &RequestDescriptor, conditions: I) -> RoutingError
where
    I: Iterator<Item = &'a RouteCondition>,
{
    let no_match = || RoutingError::NoMatch {
        method: request.method().clone(),
        path: request.path().to_string(),
    };

    let partial: Vec<&RouteCondition> = conditions
        .filter(|c| matches!(c.patterns().matching(request), Ok(Some(_))))
        .collect();
    if partial.is_empty() {
        return no_match();
    }

    let method_matches: Vec<&RouteCondition> = partial
        .iter()
        .copied()
        .filter(|c| matches!(c.methods().matching(request), Ok(Some(_))))
        .collect();
    if method_matches.is_empty() {
        let mut allowed: Vec<Method> = Vec::new();
        for condition in &partial {
            for method in condition.methods().methods() {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
        }
        // Only OPTIONS misses a route without declared methods; there is
        // no method list to offer.
        if allowed.is_empty() {
            return no_match();
        }
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        return RoutingError::MethodNotAllowed {
            method: request.method().clone(),
            path: request.path().to_string(),
            allowed,
        };
    }

    let mut consumes_matches = Vec::new();
    for condition in &method_matches {
        match condition.consumes().matching(request) {
            Ok(Some(_)) => consumes_matches.push(*condition),
            Ok(None) => {}
            Err(err) => return err,
        }
    }
    if consumes_matches.is_empty() {
        let supported = union(method_matches.iter().map(|c| c.consumes().consumable_media_types()));
        let content_type = request
            .content_type()
            .ok()
            .flatten()
            .unwrap_or_else(MediaType::octet_stream);
        return RoutingError::ContentTypeNotSupported {
            content_type: content_type.to_string(),
            supported,
        };
    }

    let mut produces_matches = Vec::new();
    for condition in &consumes_matches {
        match condition.produces().matching(request) {
            Ok(Some(_)) => produces_matches.push(*condition),
            Ok(None) => {}
            Err(err) => return err,
        }
    }
    if produces_matches.is_empty() {
        let producible = union(consumes_matches.iter().map(|c| c.produces().producible_media_types()));
        let accept = request
            .header(http::header::ACCEPT.as_str())
            .unwrap_or("*/*")
            .to_string();
        return RoutingError::NotAcceptable { accept, producible };
    }

    let params_ok = produces_matches
        .iter()
        .any(|c| matches!(c.params().matching(request), Ok(Some(_))));
    if !params_ok {
        let conditions = produces_matches
            .iter()
            .map(|c| c.params().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        return RoutingError::UnsatisfiedParams {
            path: request.path().to_string(),
            conditions,
        };
    }

    no_match()
}

fn union<I>(lists: I) -> Vec<MediaType>
where
    I: Iterator<Item = Vec<MediaType>>,
{
    let mut all: Vec<MediaType> = Vec::new();
    for list in lists {
        for media_type in list {
            if !all.contains(&media_type) {
                all.push(media_type);
            }
        }
    }
    all
}
