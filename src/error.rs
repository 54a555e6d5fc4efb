//! Error types surfaced by registration and resolution.
//!
//! Every failure is synchronous and returned directly from the call that
//! caused it. Callers translate a [`RoutingError`] into an HTTP response with
//! [`RoutingError::status_code`].

use http::{Method, StatusCode};
use thiserror::Error;

use crate::condition::MediaType;
use crate::cors::CorsConfigError;
use crate::registry::HandlerRef;

/// Failures raised while registering routes or resolving a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// No registered route matches the request at all.
    #[error("no route matches {method} {path}")]
    NoMatch { method: Method, path: String },

    /// At least one route matches the path, but none accepts the method.
    #[error("request method '{method}' is not supported for {path} (allowed: {})", join(.allowed))]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// Routes match path and method, but none consumes the request Content-Type.
    #[error("content type '{content_type}' is not supported (supported: {})", join(.supported))]
    ContentTypeNotSupported {
        content_type: String,
        supported: Vec<MediaType>,
    },

    /// Routes match path and method, but none produces an acceptable media type.
    #[error("no acceptable representation for '{accept}' (producible: {})", join(.producible))]
    NotAcceptable {
        accept: String,
        producible: Vec<MediaType>,
    },

    /// Routes match path and method, but their parameter conditions are not met.
    #[error("unsatisfied parameter conditions for {path}: {}", .conditions.join(" OR "))]
    UnsatisfiedParams {
        path: String,
        conditions: Vec<String>,
    },

    /// Two or more routes tie for the best match.
    #[error("ambiguous handler methods mapped for '{path}': {{{first}, {second}}}")]
    AmbiguousMatch {
        path: String,
        first: HandlerRef,
        second: HandlerRef,
    },

    /// A condition is already bound to a different handler.
    #[error("ambiguous mapping: cannot map '{attempted}' to {condition}: '{existing}' is already mapped")]
    DuplicateRegistration {
        condition: String,
        existing: HandlerRef,
        attempted: HandlerRef,
    },

    /// The request Content-Type header cannot be parsed.
    #[error("invalid Content-Type '{value}': {reason}")]
    UnsupportedMediaType { value: String, reason: String },

    /// The request Accept header cannot be parsed.
    #[error("could not parse Accept header '{value}': {reason}")]
    InvalidAcceptHeader { value: String, reason: String },

    /// A path pattern failed to parse.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A declared media type, method or name/value expression failed to parse.
    #[error("invalid mapping declaration '{value}': {reason}")]
    InvalidMapping { value: String, reason: String },

    /// CORS configuration attached to a registration is invalid.
    #[error(transparent)]
    InvalidCors(#[from] CorsConfigError),
}

impl RoutingError {
    /// HTTP status a delivery layer should answer with.
    ///
    /// Registration-time errors map to 500 because they indicate a broken
    /// application wiring rather than a client mistake.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoutingError::NoMatch { .. } => StatusCode::NOT_FOUND,
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RoutingError::ContentTypeNotSupported { .. }
            | RoutingError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RoutingError::NotAcceptable { .. } | RoutingError::InvalidAcceptHeader { .. } => {
                StatusCode::NOT_ACCEPTABLE
            }
            RoutingError::UnsatisfiedParams { .. } => StatusCode::BAD_REQUEST,
            RoutingError::AmbiguousMatch { .. }
            | RoutingError::DuplicateRegistration { .. }
            | RoutingError::InvalidPattern { .. }
            | RoutingError::InvalidMapping { .. }
            | RoutingError::InvalidCors(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for errors produced by a client request rather than by wiring.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
