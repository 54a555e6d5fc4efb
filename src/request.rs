//! Request input and per-request output for resolution.
//!
//! [`RequestDescriptor`] is what the router reads: method, normalized path,
//! headers and query parameters. [`RequestContext`] is what it writes after
//! a successful match: path variables, the matched pattern and the media
//! types the chosen handler can produce.

use std::sync::{Arc, OnceLock};

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use smallvec::SmallVec;
use tracing::warn;

use crate::condition::{sort_by_quality, MediaType, RouteCondition};
use crate::error::RoutingError;
use crate::registry::HandlerRef;
use crate::router::HandlerMatch;

/// Maximum number of path variables before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path variables captured by a pattern. Names are shared with the compiled
/// pattern, values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The parts of an HTTP request that take part in handler resolution.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    /// `Accept` parsed on first use; reset whenever a header is added
    accepted: OnceLock<Result<Vec<MediaType>, RoutingError>>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            accepted: OnceLock::new(),
        }
    }

    /// Split `uri` into path and query string; the query is form-decoded.
    ///
    /// A bare key such as `?debug` becomes `("debug", "")`.
    pub fn from_uri(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        let query = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            query,
            accepted: OnceLock::new(),
        }
    }

    pub fn from_parts(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        query: Vec<(String, String)>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            query,
            accepted: OnceLock::new(),
        }
    }

    /// Append a header. Names or values that are not valid HTTP are logged
    /// and ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
                self.accepted = OnceLock::new();
            }
            _ => warn!(header = %name, "Ignoring invalid request header"),
        }
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn query_param<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.query_values(name).next()
    }

    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query.iter().any(|(k, _)| k == name)
    }

    /// A body is present when `Content-Length` is non-zero or a
    /// `Transfer-Encoding` header is set.
    pub fn has_body(&self) -> bool {
        if self.headers.contains_key(header::TRANSFER_ENCODING) {
            return true;
        }
        self.header(header::CONTENT_LENGTH.as_str())
            .and_then(|len| len.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0)
    }

    /// Parsed `Content-Type`; `None` when the header is absent.
    pub fn content_type(&self) -> Result<Option<MediaType>, RoutingError> {
        let Some(value) = self.headers.get(header::CONTENT_TYPE) else {
            return Ok(None);
        };
        let raw = String::from_utf8_lossy(value.as_bytes());
        MediaType::parse(&raw)
            .map(Some)
            .map_err(|e| RoutingError::UnsupportedMediaType {
                value: raw.into_owned(),
                reason: e.to_string(),
            })
    }

    /// Every `Accept` entry, highest quality first. Absent or empty means
    /// `*/*`. Parsed once per request.
    pub fn accepted_media_types(&self) -> Result<&[MediaType], RoutingError> {
        match self.accepted.get_or_init(|| parse_accept(&self.headers)) {
            Ok(accepted) => Ok(accepted.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    /// `OPTIONS` with both `Origin` and `Access-Control-Request-Method`.
    pub fn is_preflight(&self) -> bool {
        self.method == Method::OPTIONS
            && self.headers.contains_key(header::ORIGIN)
            && self
                .headers
                .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    pub fn origin(&self) -> Option<&str> {
        self.header(header::ORIGIN.as_str())
    }

    pub fn access_control_request_method(&self) -> Option<Method> {
        let value = self.header(header::ACCESS_CONTROL_REQUEST_METHOD.as_str())?;
        Method::from_bytes(value.trim().as_bytes()).ok()
    }
}

fn parse_accept(headers: &HeaderMap) -> Result<Vec<MediaType>, RoutingError> {
    let mut accepted = Vec::new();
    for value in headers.get_all(header::ACCEPT) {
        let raw = String::from_utf8_lossy(value.as_bytes());
        if raw.trim().is_empty() {
            continue;
        }
        let parsed = MediaType::parse_list(&raw).map_err(|e| RoutingError::InvalidAcceptHeader {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        accepted.extend(parsed);
    }
    if accepted.is_empty() {
        return Ok(vec![MediaType::all()]);
    }
    sort_by_quality(&mut accepted);
    Ok(accepted)
}

/// Attributes written by a successful resolution.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub handler: Option<HandlerRef>,
    pub matched_pattern: Option<String>,
    pub uri_variables: ParamVec,
    pub producible_media_types: Vec<MediaType>,
    pub matched_condition: Option<RouteCondition>,
}

impl RequestContext {
    pub fn apply(&mut self, matched: &HandlerMatch) {
        self.handler = Some(matched.handler.clone());
        self.matched_pattern = matched.best_pattern.clone();
        self.uri_variables = matched.uri_variables.clone();
        self.producible_media_types = matched.producible_media_types.clone();
        self.matched_condition = Some(matched.condition.clone());
    }

    /// Value of a path variable. With duplicate names the last one wins.
    #[must_use]
    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables
            .iter()
            .rev()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}
