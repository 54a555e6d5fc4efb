//! # CORS Module
//!
//! Per-handler CORS configuration stored alongside registrations.
//!
//! The router does not write response headers; it hands the matched
//! handler's [`CorsConfig`] to the caller, who applies it. The checks here
//! ([`CorsConfig::check_origin`], [`CorsConfig::check_method`],
//! [`CorsConfig::check_headers`]) compute the values to send back.
//!
//! ## Preflight
//!
//! A preflight is an `OPTIONS` request carrying both `Origin` and
//! `Access-Control-Request-Method`. When a preflight matches more than one
//! handler equally well, resolution answers with [`CorsConfig::allow_all`]
//! rather than failing: the actual request will be resolved (and possibly
//! rejected) on its own.
//!
//! ## Usage
//!
//! ```rust
//! use handlermap::cors::CorsConfig;
//! use http::Method;
//!
//! let cors = CorsConfig::builder()
//!     .allowed_origins(["https://shop.example"])
//!     .allowed_methods(&[Method::GET, Method::POST])
//!     .allow_credentials(true)
//!     .max_age(600)
//!     .build()
//!     .expect("valid CORS configuration");
//!
//! assert_eq!(cors.check_origin("https://shop.example").as_deref(), Some("https://shop.example"));
//! assert!(cors.check_origin("https://evil.example").is_none());
//! ```

mod builder;
mod error;

pub use builder::CorsConfigBuilder;
pub use error::CorsConfigError;

use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::request::RequestDescriptor;

const ALL: &str = "*";

/// Preflight cache duration used by [`CorsConfig::with_defaults`].
pub const DEFAULT_MAX_AGE_SECS: u64 = 1800;

/// CORS policy for one handler.
///
/// Empty lists mean "nothing allowed" until [`CorsConfig::with_defaults`]
/// fills them in. `*` in a list allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Exact origins such as `https://example.com`, or `*`
    pub allowed_origins: Vec<String>,
    /// Origin patterns where `*` matches any run of characters, e.g.
    /// `https://*.example.com`. Unlike `allowed_origins`, a `*` pattern may be
    /// combined with credentials because the request origin is echoed back.
    pub allowed_origin_patterns: Vec<String>,
    /// Method tokens, or `*`
    pub allowed_methods: Vec<String>,
    /// Request header names, or `*`
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to scripts
    pub exposed_headers: Vec<String>,
    pub allow_credentials: Option<bool>,
    /// Preflight cache duration in seconds
    pub max_age: Option<u64>,
}

impl CorsConfig {
    pub fn builder() -> CorsConfigBuilder {
        CorsConfigBuilder::new()
    }

    /// Permissive configuration returned for ambiguous preflight requests.
    pub fn allow_all() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_origin_patterns: vec![ALL.to_string()],
            allowed_methods: vec![ALL.to_string()],
            allowed_headers: vec![ALL.to_string()],
            exposed_headers: Vec::new(),
            allow_credentials: Some(true),
            max_age: Some(DEFAULT_MAX_AGE_SECS),
        }
    }

    /// Fill unset fields with permissive defaults: any origin, `GET`, `HEAD`
    /// and `POST`, any header and a 30 minute preflight cache.
    pub fn with_defaults(mut self) -> Self {
        if self.allowed_origins.is_empty() && self.allowed_origin_patterns.is_empty() {
            self.allowed_origins = vec![ALL.to_string()];
        }
        if self.allowed_methods.is_empty() {
            self.allowed_methods = vec!["GET".into(), "HEAD".into(), "POST".into()];
        }
        if self.allowed_headers.is_empty() {
            self.allowed_headers = vec![ALL.to_string()];
        }
        if self.max_age.is_none() {
            self.max_age = Some(DEFAULT_MAX_AGE_SECS);
        }
        self
    }

    /// Overlay a more specific (route-level) configuration on this one.
    ///
    /// Lists are merged; a `*` on either side wins. Scalars from `other`
    /// take precedence when set.
    pub fn combine(&self, other: &CorsConfig) -> CorsConfig {
        CorsConfig {
            allowed_origins: combine_lists(&self.allowed_origins, &other.allowed_origins),
            allowed_origin_patterns: combine_lists(
                &self.allowed_origin_patterns,
                &other.allowed_origin_patterns,
            ),
            allowed_methods: combine_lists(&self.allowed_methods, &other.allowed_methods),
            allowed_headers: combine_lists(&self.allowed_headers, &other.allowed_headers),
            exposed_headers: combine_lists(&self.exposed_headers, &other.exposed_headers),
            allow_credentials: other.allow_credentials.or(self.allow_credentials),
            max_age: other.max_age.or(self.max_age),
        }
    }

    pub fn validate(&self) -> Result<(), CorsConfigError> {
        let credentials = self.allow_credentials == Some(true);
        if credentials && self.allowed_origins.iter().any(|o| o == ALL) {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        if credentials && self.allowed_origins.is_empty() && self.allowed_origin_patterns.is_empty() {
            return Err(CorsConfigError::EmptyOriginsWithCredentials);
        }
        for origin in self.allowed_origins.iter().filter(|o| *o != ALL) {
            if !is_valid_origin(origin) {
                return Err(CorsConfigError::InvalidOriginFormat {
                    origin: origin.clone(),
                });
            }
        }
        for pattern in &self.allowed_origin_patterns {
            compile_origin_pattern(pattern)?;
        }
        for method in self.allowed_methods.iter().filter(|m| *m != ALL) {
            if Method::from_bytes(method.as_bytes()).is_err() {
                return Err(CorsConfigError::InvalidMethod {
                    method: method.clone(),
                });
            }
        }
        Ok(())
    }

    /// Value for `Access-Control-Allow-Origin`, or `None` when the origin is
    /// not allowed.
    pub fn check_origin(&self, origin: &str) -> Option<String> {
        let origin = origin.trim_end_matches('/');
        if origin.is_empty() {
            return None;
        }
        if self.allowed_origins.iter().any(|o| o == ALL) {
            return Some(ALL.to_string());
        }
        if self
            .allowed_origins
            .iter()
            .any(|o| o.trim_end_matches('/').eq_ignore_ascii_case(origin))
        {
            return Some(origin.to_string());
        }
        let pattern_match = self
            .allowed_origin_patterns
            .iter()
            .filter_map(|p| compile_origin_pattern(p).ok())
            .any(|re| re.is_match(origin));
        pattern_match.then(|| origin.to_string())
    }

    /// Methods to list in `Access-Control-Allow-Methods`, or `None` when
    /// `method` is not allowed.
    pub fn check_method(&self, method: &Method) -> Option<Vec<Method>> {
        if self.allowed_methods.iter().any(|m| m == ALL) {
            return Some(vec![method.clone()]);
        }
        let allowed: Vec<Method> = if self.allowed_methods.is_empty() {
            vec![Method::GET, Method::HEAD]
        } else {
            self.allowed_methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
                .collect()
        };
        allowed.contains(method).then_some(allowed)
    }

    /// Headers to list in `Access-Control-Allow-Headers`, or `None` when any
    /// requested header is not allowed.
    pub fn check_headers(&self, requested: &[&str]) -> Option<Vec<String>> {
        if requested.is_empty() {
            return Some(Vec::new());
        }
        if self.allowed_headers.is_empty() {
            return None;
        }
        let allow_any = self.allowed_headers.iter().any(|h| h == ALL);
        let mut result = Vec::with_capacity(requested.len());
        for header in requested {
            let header = header.trim();
            if header.is_empty() {
                continue;
            }
            if allow_any
                || self
                    .allowed_headers
                    .iter()
                    .any(|h| h.eq_ignore_ascii_case(header))
            {
                result.push(header.to_string());
            } else {
                return None;
            }
        }
        Some(result)
    }
}

/// `OPTIONS` with both `Origin` and `Access-Control-Request-Method`.
pub fn is_preflight_request(request: &RequestDescriptor) -> bool {
    request.is_preflight()
}

fn combine_lists(base: &[String], overlay: &[String]) -> Vec<String> {
    if overlay.is_empty() {
        return base.to_vec();
    }
    if base.is_empty() {
        return overlay.to_vec();
    }
    if base.iter().chain(overlay).any(|v| v == ALL) {
        return vec![ALL.to_string()];
    }
    let mut combined = base.to_vec();
    for value in overlay {
        if !combined.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            combined.push(value.clone());
        }
    }
    combined
}

fn is_valid_origin(origin: &str) -> bool {
    let Some((scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    let scheme_ok = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let host = rest.trim_end_matches('/');
    scheme_ok && !host.is_empty() && !host.contains('/')
}

fn compile_origin_pattern(pattern: &str) -> Result<Regex, CorsConfigError> {
    let body = pattern
        .trim_end_matches('/')
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i)^{body}$")).map_err(|e| CorsConfigError::InvalidOriginPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
