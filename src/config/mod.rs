//! # Configuration Module
//!
//! Router tuning ([`RouterConfig`]) and route definition files
//! ([`load_routes`]).
//!
//! ## Environment Variables
//!
//! ### `HMAP_MATCH_ORDER`
//!
//! Comma-separated criterion order used to rank matching conditions, e.g.
//! `patterns,methods`. Criteria left out are appended in default order.
//!
//! Default: `methods,consumes,produces,patterns,params,headers,custom`
//!
//! ### `HMAP_DIRECT_PATH_LOOKUP`
//!
//! `true`/`false` (also `1`/`0`). When disabled every resolution scans all
//! registered conditions instead of trying the literal-path index first.
//!
//! Default: `true`
//!
//! ### `HMAP_SLOW_MATCH_US`
//!
//! Resolutions taking longer than this many microseconds are logged at
//! `warn`. `0` disables the check.
//!
//! Default: `1000`
//!
//! ## Usage
//!
//! ```rust
//! use handlermap::config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("Ranking order: {:?}", config.match_order());
//! ```

mod load;

pub use load::{
    load_routes, parse_routes, ControllerDefinition, MappingDefinition, RouteDefinition,
    RouteEntry, RouteFile, RouteFormat, RouteSet,
};

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::condition::MatchCriterion;

const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Router behaviour loaded from a route file's `router:` section or the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Criterion order for ranking matches
    pub match_order: Vec<MatchCriterion>,
    /// Try the literal-path index before a full scan
    pub direct_path_lookup: bool,
    /// Warn when a resolution exceeds this many microseconds (0 = never)
    pub slow_match_threshold_us: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            match_order: MatchCriterion::DEFAULT_ORDER.to_vec(),
            direct_path_lookup: true,
            slow_match_threshold_us: DEFAULT_SLOW_MATCH_US,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparsable values are logged
    /// and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("HMAP_MATCH_ORDER") {
            let parsed: Result<Vec<MatchCriterion>, String> = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(order) => config.match_order = order,
                Err(error) => warn!(value = %raw, error = %error, "Ignoring HMAP_MATCH_ORDER"),
            }
        }

        if let Some(raw) = lookup("HMAP_DIRECT_PATH_LOOKUP") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.direct_path_lookup = true,
                "0" | "false" | "no" | "off" => config.direct_path_lookup = false,
                _ => warn!(value = %raw, "Ignoring HMAP_DIRECT_PATH_LOOKUP"),
            }
        }

        if let Some(raw) = lookup("HMAP_SLOW_MATCH_US") {
            match raw.trim().parse() {
                Ok(threshold) => config.slow_match_threshold_us = threshold,
                Err(_) => warn!(value = %raw, "Ignoring HMAP_SLOW_MATCH_US"),
            }
        }

        config
    }

    /// Effective ranking order: duplicates removed, missing criteria
    /// appended in default order.
    pub fn match_order(&self) -> Vec<MatchCriterion> {
        MatchCriterion::normalize_order(&self.match_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RouterConfig::from_lookup(lookup(&[]));
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.match_order(), MatchCriterion::DEFAULT_ORDER);
    }

    #[test]
    fn test_env_overrides() {
        let config = RouterConfig::from_lookup(lookup(&[
            ("HMAP_MATCH_ORDER", "patterns, methods"),
            ("HMAP_DIRECT_PATH_LOOKUP", "false"),
            ("HMAP_SLOW_MATCH_US", "250"),
        ]));
        assert_eq!(config.match_order()[..2], [MatchCriterion::Patterns, MatchCriterion::Methods]);
        assert_eq!(config.match_order().len(), MatchCriterion::DEFAULT_ORDER.len());
        assert!(!config.direct_path_lookup);
        assert_eq!(config.slow_match_threshold_us, 250);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = RouterConfig::from_lookup(lookup(&[
            ("HMAP_MATCH_ORDER", "methods,verbs"),
            ("HMAP_DIRECT_PATH_LOOKUP", "maybe"),
            ("HMAP_SLOW_MATCH_US", "-1"),
        ]));
        assert_eq!(config, RouterConfig::default());
    }

    #[test]
    fn test_yaml_section() {
        let config: RouterConfig =
            serde_yaml::from_str("match_order: [patterns]\ndirect_path_lookup: false\n").unwrap();
        assert_eq!(config.match_order, vec![MatchCriterion::Patterns]);
        assert!(!config.direct_path_lookup);
        assert_eq!(config.slow_match_threshold_us, DEFAULT_SLOW_MATCH_US);
    }
}
