use http::Method;

use super::{CorsConfig, CorsConfigError};

/// Builder for [`CorsConfig`] with a fluent API
///
/// # Example
///
/// ```rust
/// use handlermap::cors::CorsConfigBuilder;
/// use http::Method;
///
/// let cors = CorsConfigBuilder::new()
///     .allowed_origins(["https://example.com", "https://api.example.com"])
///     .allowed_methods(&[Method::GET, Method::POST, Method::PUT])
///     .allowed_headers(["Content-Type", "Authorization", "X-Custom-Header"])
///     .allow_credentials(true)
///     .exposed_headers(["X-Total-Count"])
///     .max_age(3600)
///     .build()
///     .expect("Invalid CORS configuration");
/// assert_eq!(cors.max_age, Some(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CorsConfigBuilder {
    config: CorsConfig,
}

impl CorsConfigBuilder {
    /// Create a new builder with secure defaults
    ///
    /// Default configuration:
    /// - No origins allowed (empty list)
    /// - Common headers: `["Content-Type", "Authorization"]`
    /// - Common methods: `GET, POST, PUT, DELETE, OPTIONS`
    /// - Credentials: unset
    /// - Exposed headers: empty
    /// - Max age: `None` (no preflight caching)
    pub fn new() -> Self {
        Self {
            config: CorsConfig {
                allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
                allowed_methods: [
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
                ..CorsConfig::default()
            },
        }
    }

    /// Set allowed origins
    ///
    /// Use `["*"]` to allow all origins; this cannot be combined with
    /// `allow_credentials(true)` and `build()` will return an error.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Set origin patterns such as `https://*.example.com`
    pub fn allowed_origin_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origin_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.config.allowed_methods = methods.iter().map(|m| m.as_str().to_string()).collect();
        self
    }

    /// Set allowed headers; `["*"]` allows all
    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exposed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = Some(allow);
        self
    }

    /// Set preflight cache duration in seconds
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.config.max_age = Some(seconds);
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    ///
    /// Any [`CorsConfigError`] reported by [`CorsConfig::validate`].
    pub fn build(self) -> Result<CorsConfig, CorsConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CorsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
