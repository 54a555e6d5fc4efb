//! Router core module - hot path for handler resolution.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::no_match;
use crate::condition::{MatchCriterion, MediaType, RequestCondition, RouteCondition};
use crate::config::RouterConfig;
use crate::cors::CorsConfig;
use crate::error::RoutingError;
use crate::registry::{HandlerRef, MappingRegistry, Registration, RegistrySnapshot};
use crate::request::{ParamVec, RequestContext, RequestDescriptor};

/// Result of resolving a regular (non-preflight) request.
#[derive(Debug, Clone)]
pub struct HandlerMatch {
    pub handler: HandlerRef,
    /// The registered condition narrowed to what matched this request
    pub condition: RouteCondition,
    /// Most specific pattern that matched the path
    pub best_pattern: Option<String>,
    /// Variables captured by `best_pattern`
    pub uri_variables: ParamVec,
    /// What the handler may produce for this request's `Accept`
    pub producible_media_types: Vec<MediaType>,
    pub cors: Option<CorsConfig>,
}

impl HandlerMatch {
    /// Get a path variable by name. With duplicate names the last one wins.
    #[inline]
    #[must_use]
    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of resolving a CORS preflight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightMatch {
    /// `None` when several handlers matched equally well
    pub handler: Option<HandlerRef>,
    /// The handler's CORS configuration, or [`CorsConfig::allow_all`] when
    /// the match was ambiguous
    pub cors: Option<CorsConfig>,
}

impl PreflightMatch {
    fn ambiguous() -> Self {
        Self {
            handler: None,
            cors: Some(CorsConfig::allow_all()),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.handler.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Handler(HandlerMatch),
    Preflight(PreflightMatch),
}

impl Resolution {
    pub fn handler(&self) -> Option<&HandlerRef> {
        match self {
            Resolution::Handler(m) => Some(&m.handler),
            Resolution::Preflight(p) => p.handler.as_ref(),
        }
    }

    pub fn cors(&self) -> Option<&CorsConfig> {
        match self {
            Resolution::Handler(m) => m.cors.as_ref(),
            Resolution::Preflight(p) => p.cors.as_ref(),
        }
    }
}

/// A registered condition narrowed against one request.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub condition: RouteCondition,
    pub registration: Arc<Registration>,
}

/// One registered route, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub handler: String,
    pub condition: String,
    pub patterns: Vec<String>,
    pub methods: Vec<String>,
    pub has_cors: bool,
}

/// Resolves requests against a [`MappingRegistry`].
///
/// Cloning a `Router` is cheap; clones share the registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<MappingRegistry>,
    config: RouterConfig,
    /// Normalized from `config.match_order` once at construction
    match_order: Vec<MatchCriterion>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    /// Create a router with its own empty registry.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self::with_registry(Arc::new(MappingRegistry::new()), config)
    }

    /// Create a router over an existing (possibly shared) registry.
    #[must_use]
    pub fn with_registry(registry: Arc<MappingRegistry>, config: RouterConfig) -> Self {
        let match_order = config.match_order();
        info!(
            match_order = ?match_order,
            direct_path_lookup = config.direct_path_lookup,
            slow_match_threshold_us = config.slow_match_threshold_us,
            registrations = registry.len(),
            "Router created"
        );
        Self {
            registry,
            config,
            match_order,
        }
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn register(
        &self,
        condition: RouteCondition,
        handler: HandlerRef,
        cors: Option<CorsConfig>,
    ) -> Result<Arc<Registration>, RoutingError> {
        self.registry.register(condition, handler, cors)
    }

    pub fn unregister(&self, condition: &RouteCondition) -> Option<Arc<Registration>> {
        self.registry.unregister(condition)
    }

    /// Unregister `condition` only if `handler` still owns it.
    pub fn unregister_handler(
        &self,
        condition: &RouteCondition,
        handler: &HandlerRef,
    ) -> Option<Arc<Registration>> {
        self.registry.unregister_handler(condition, handler)
    }

    pub fn cors_config_for(&self, handler: &HandlerRef) -> Option<CorsConfig> {
        self.registry.read().cors_config(handler).cloned()
    }

    /// Snapshot of every registered condition and its handler, in
    /// registration order.
    #[must_use]
    pub fn handler_methods(&self) -> Vec<(RouteCondition, HandlerRef)> {
        self.registry
            .read()
            .registrations()
            .map(|r| (r.condition.clone(), r.handler.clone()))
            .collect()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.registry
            .read()
            .registrations()
            .map(|r| RouteInfo {
                handler: r.handler.to_string(),
                condition: r.condition.to_string(),
                patterns: r
                    .condition
                    .patterns()
                    .patterns()
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
                methods: r
                    .condition
                    .methods()
                    .methods()
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
                has_cors: r.cors.is_some(),
            })
            .collect()
    }

    /// Print all registered routes to stdout
    ///
    /// Useful for debugging and verifying that routes are loaded correctly.
    pub fn dump_routes(&self) {
        let routes = self.routes();
        println!("[routes] count={}", routes.len());
        for route in &routes {
            println!("[route] {} -> {}", route.condition, route.handler);
        }
    }

    /// Resolve `request` and write the outcome into `context`.
    pub fn resolve_into(
        &self,
        request: &RequestDescriptor,
        context: &mut RequestContext,
    ) -> Result<Resolution, RoutingError> {
        let resolution = self.resolve(request)?;
        if let Resolution::Handler(matched) = &resolution {
            context.apply(matched);
        }
        Ok(resolution)
    }

    /// Find the handler for `request`.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::AmbiguousMatch`] when the two best candidates rank equal
    /// - a no-match error explaining the closest miss (see [`RoutingError`])
    pub fn resolve(&self, request: &RequestDescriptor) -> Result<Resolution, RoutingError> {
        let preflight = request.is_preflight();
        debug!(
            method = %request.method(),
            path = %request.path(),
            preflight,
            "Handler lookup attempt"
        );

        let match_start = Instant::now();
        // Held until resolution finishes so writers cannot interleave.
        let snapshot = self.registry.read();
        let result = self.resolve_with(&snapshot, request, preflight);
        drop(snapshot);
        let match_duration = match_start.elapsed();

        match &result {
            Ok(resolution) => self.log_resolved(request, resolution, match_duration),
            Err(err) => warn!(
                method = %request.method(),
                path = %request.path(),
                error = %err,
                status = err.status_code().as_u16(),
                duration_us = match_duration.as_micros() as u64,
                "No handler resolved"
            ),
        }
        result
    }

    fn resolve_with(
        &self,
        snapshot: &RegistrySnapshot<'_>,
        request: &RequestDescriptor,
        preflight: bool,
    ) -> Result<Resolution, RoutingError> {
        let mut candidates = Vec::new();
        if self.config.direct_path_lookup {
            if let Some(direct) = snapshot.direct_matches(request.path()) {
                collect_candidates(snapshot, direct.iter(), request, &mut candidates)?;
            }
        }
        if candidates.is_empty() {
            collect_candidates(snapshot, snapshot.conditions(), request, &mut candidates)?;
        }

        if candidates.is_empty() {
            if preflight {
                return Err(RoutingError::NoMatch {
                    method: request.method().clone(),
                    path: request.path().to_string(),
                });
            }
            return Err(no_match::diagnose(request, snapshot.conditions()));
        }

        // Stable: equal candidates keep registration order.
        candidates.sort_by(|a, b| {
            a.condition
                .compare_with(&b.condition, request, &self.match_order)
        });

        if let [best, second, ..] = candidates.as_slice() {
            let ranking = best
                .condition
                .compare_with(&second.condition, request, &self.match_order);
            if ranking == Ordering::Equal {
                if preflight {
                    debug!(
                        path = %request.path(),
                        first = %best.registration.handler,
                        second = %second.registration.handler,
                        "Ambiguous preflight, allowing all"
                    );
                    return Ok(Resolution::Preflight(PreflightMatch::ambiguous()));
                }
                warn!(
                    method = %request.method(),
                    path = %request.path(),
                    first = %best.registration.handler,
                    second = %second.registration.handler,
                    candidates = candidates.len(),
                    "Ambiguous handler methods"
                );
                return Err(RoutingError::AmbiguousMatch {
                    path: request.path().to_string(),
                    first: best.registration.handler.clone(),
                    second: second.registration.handler.clone(),
                });
            }
        }

        let best = &candidates[0];
        let handler = best.registration.handler.clone();
        let cors = snapshot.cors_config(&handler).cloned();

        if preflight {
            return Ok(Resolution::Preflight(PreflightMatch {
                handler: Some(handler),
                cors,
            }));
        }

        let patterns = best.condition.patterns();
        Ok(Resolution::Handler(HandlerMatch {
            handler,
            best_pattern: patterns.best().map(|p| p.as_str().to_string()),
            uri_variables: patterns.extract_variables(request.path()),
            producible_media_types: best.condition.produces().producible_media_types(),
            condition: best.condition.clone(),
            cors,
        }))
    }

    fn log_resolved(&self, request: &RequestDescriptor, resolution: &Resolution, took: Duration) {
        let handler = resolution
            .handler()
            .map_or_else(|| "<preflight>".to_string(), ToString::to_string);
        let threshold = self.config.slow_match_threshold_us;
        if threshold > 0 && took > Duration::from_micros(threshold) {
            warn!(
                method = %request.method(),
                path = %request.path(),
                handler = %handler,
                duration_us = took.as_micros() as u64,
                threshold_us = threshold,
                "Slow handler resolution detected"
            );
        } else {
            info!(
                method = %request.method(),
                path = %request.path(),
                handler = %handler,
                duration_us = took.as_micros() as u64,
                "Handler resolved"
            );
        }
    }
}

/// Narrow each condition against `request`.
///
/// An unparsable `Content-Type` or `Accept` seen by a condition whose path
/// matches aborts the lookup with that error.
fn collect_candidates<'a, I>(
    snapshot: &RegistrySnapshot<'_>,
    conditions: I,
    request: &RequestDescriptor,
    candidates: &mut Vec<Candidate>,
) -> Result<(), RoutingError>
where
    I: Iterator<Item = &'a RouteCondition>,
{
    for condition in conditions {
        let narrowed = condition.matching(request).inspect_err(|err| {
            debug!(
                condition = %condition,
                error = %err,
                "Condition could not be evaluated"
            );
        })?;
        if let Some(narrowed) = narrowed {
            if let Some(registration) = snapshot.registration(condition) {
                candidates.push(Candidate {
                    condition: narrowed,
                    registration: Arc::clone(registration),
                });
            }
        }
    }
    Ok(())
}
