use thiserror::Error;

/// CORS configuration error
///
/// Returned by [`super::CorsConfigBuilder::build`] and
/// [`super::CorsConfig::validate`] when a configuration cannot be honoured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials
    ///
    /// When `allow_credentials` is `true`, list exact origins or use an
    /// origin pattern instead.
    #[error(
        "CORS configuration error: Cannot use wildcard origin (*) with credentials. \
         When allow_credentials is true, you must specify exact origins or origin patterns."
    )]
    WildcardWithCredentials,

    /// Origin is not of the form `scheme://host[:port]`
    #[error(
        "CORS configuration error: Invalid origin format '{origin}'. \
         Expected format: scheme://host:port (e.g., https://example.com)"
    )]
    InvalidOriginFormat { origin: String },

    /// Credentials enabled but no origin can ever be allowed
    #[error(
        "CORS configuration error: Cannot use credentials with empty origins list. \
         When allow_credentials is true, at least one origin must be specified."
    )]
    EmptyOriginsWithCredentials,

    /// Allowed method is neither `*` nor a valid HTTP method token
    #[error("CORS configuration error: Invalid method '{method}'")]
    InvalidMethod { method: String },

    /// Origin pattern does not compile
    #[error("CORS configuration error: Invalid origin pattern '{pattern}': {reason}")]
    InvalidOriginPattern { pattern: String, reason: String },
}
