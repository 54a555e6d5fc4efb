//! # Router Module
//!
//! The router resolves an incoming request to the single registered handler
//! whose conditions match it best.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Gathering candidate conditions, literal paths first
//! - Narrowing each candidate against the request
//! - Ranking the survivors and rejecting ties as ambiguous
//! - Answering CORS preflight requests with the handler's CORS configuration
//! - Explaining misses with the closest HTTP status (404, 405, 415, 406, 400)
//!
//! ## Architecture
//!
//! Resolution works on a read snapshot of the [`crate::registry::MappingRegistry`]:
//!
//! 1. **Candidates**: conditions indexed under the exact request path are
//!    tried first. If none of them match, every registered condition is
//!    tried.
//!
//! 2. **Ranking**: matching conditions are stable-sorted by the configured
//!    criterion order. If the best two compare equal the request is
//!    ambiguous, except for a preflight which is answered with an allow-all
//!    CORS configuration.
//!
//! ## Example
//!
//! ```rust
//! use handlermap::condition::RouteCondition;
//! use handlermap::registry::HandlerRef;
//! use handlermap::request::RequestDescriptor;
//! use handlermap::router::{Resolution, Router};
//! use handlermap::RouterConfig;
//! use http::Method;
//!
//! let router = Router::new(RouterConfig::default());
//! let condition = RouteCondition::builder()
//!     .path("/pets/{id}")
//!     .method("GET")
//!     .build()?;
//! router.register(condition, HandlerRef::new("petController", "get"), None)?;
//!
//! let request = RequestDescriptor::new(Method::GET, "/pets/123");
//! match router.resolve(&request)? {
//!     Resolution::Handler(m) => {
//!         assert_eq!(m.handler.to_string(), "petController#get");
//!         assert_eq!(m.uri_variable("id"), Some("123"));
//!     }
//!     Resolution::Preflight(_) => unreachable!(),
//! }
//! # Ok::<(), handlermap::RoutingError>(())
//! ```

mod core;
mod no_match;

pub use self::core::{Candidate, HandlerMatch, PreflightMatch, Resolution, RouteInfo, Router};
