//! # handlermap
//!
//! **handlermap** maps HTTP requests to handler methods by evaluating a set of
//! request conditions (path patterns, HTTP methods, query parameters,
//! headers, consumable and producible media types, and an optional custom
//! condition) and choosing the most specific match.
//!
//! ## Overview
//!
//! Handlers are registered under a [`condition::RouteCondition`]. For every
//! request the [`Router`]:
//!
//! 1. narrows each registered condition to the parts that match the request
//! 2. ranks the survivors, most specific first
//! 3. returns the best one, or an error when the best two tie
//!
//! When nothing matches, the error says why: an unknown path (404), a
//! method that is not allowed (405), an unsupported `Content-Type` (415),
//! an unsatisfiable `Accept` (406) or missing parameters (400).
//!
//! CORS preflight requests (`OPTIONS` with `Origin` and
//! `Access-Control-Request-Method`) are matched against the method they
//! announce and answered with the handler's [`cors::CorsConfig`].
//!
//! ## Architecture
//!
//! - **[`condition`]** - The condition types and the combine/match/compare contract
//! - **[`registry`]** - Thread-safe storage of registrations with a literal-path index
//! - **[`router`]** - Candidate lookup, ranking, ambiguity detection and no-match diagnosis
//! - **[`request`]** - Read-only request view and the context written on a match
//! - **[`cors`]** - Per-handler CORS configuration and validation
//! - **[`config`]** - Router settings from the environment, route files in YAML/JSON
//! - **[`hot_reload`]** - Applying route file changes to a live router
//! - **[`logging`]** - `tracing-subscriber` setup for binaries
//! - **[`cli`]** - The `handlermap` command-line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use handlermap::condition::RouteCondition;
//! use handlermap::registry::HandlerRef;
//! use handlermap::request::RequestDescriptor;
//! use handlermap::{Resolution, Router, RouterConfig};
//! use http::Method;
//!
//! let router = Router::new(RouterConfig::default());
//! router.register(
//!     RouteCondition::builder()
//!         .path("/orders/{id}")
//!         .method("GET")
//!         .produces(["application/json"])
//!         .build()?,
//!     HandlerRef::new("orderController", "get"),
//!     None,
//! )?;
//! router.register(
//!     RouteCondition::builder()
//!         .path("/orders/latest")
//!         .method("GET")
//!         .build()?,
//!     HandlerRef::new("orderController", "latest"),
//!     None,
//! )?;
//!
//! // Literal paths win over templates.
//! let request = RequestDescriptor::new(Method::GET, "/orders/latest");
//! let resolution = router.resolve(&request)?;
//! assert_eq!(resolution.handler().unwrap().to_string(), "orderController#latest");
//!
//! // HEAD is served by GET.
//! let request = RequestDescriptor::new(Method::HEAD, "/orders/42");
//! if let Resolution::Handler(m) = router.resolve(&request)? {
//!     assert_eq!(m.uri_variable("id"), Some("42"));
//! }
//! # Ok::<(), handlermap::RoutingError>(())
//! ```
//!
//! ## Route Files
//!
//! Mappings can also be declared in YAML or JSON and loaded with
//! [`config::load_routes`]. Controller-level mappings are combined with
//! each route's mapping the same way type-level and method-level
//! annotations are:
//!
//! ```yaml
//! router:
//!   match_order: [methods, params, headers, consumes, produces, patterns, custom]
//! controllers:
//!   - handler: orderController
//!     mapping: { paths: ["/orders"], produces: ["application/json"] }
//!     cors: { allowed_origins: ["https://shop.example"] }
//!     routes:
//!       - method: list
//!         mapping: { methods: [GET] }
//!       - method: get
//!         mapping: { paths: ["/{id}"], methods: [GET] }
//! ```
//!
//! ## Logging
//!
//! All events are emitted through `tracing`. Successful resolutions log at
//! `info`, resolutions slower than
//! [`RouterConfig::slow_match_threshold_us`] and failures log at `warn`.
//! Binaries can install a subscriber with [`logging::init_logging`].

pub mod cli;
pub mod condition;
pub mod config;
pub mod cors;
pub mod error;
pub mod hot_reload;
pub mod logging;
pub mod registry;
pub mod request;
pub mod router;

pub use condition::{MatchCriterion, RequestCondition, RouteCondition};
pub use config::{load_routes, RouteSet, RouterConfig};
pub use cors::{CorsConfig, CorsConfigError};
pub use error::RoutingError;
pub use registry::{HandlerRef, MappingRegistry};
pub use request::{RequestContext, RequestDescriptor};
pub use router::{HandlerMatch, PreflightMatch, Resolution, Router};
