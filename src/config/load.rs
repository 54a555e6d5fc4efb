use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::RouterConfig;
use crate::condition::RouteCondition;
use crate::cors::CorsConfig;
use crate::error::RoutingError;
use crate::registry::{HandlerRef, Registration};
use crate::router::Router;

/// Top-level route definition document.
///
/// ```yaml
/// router:
///   match_order: [methods, consumes, produces, patterns]
/// controllers:
///   - handler: orderController
///     mapping: { paths: ["/orders"], produces: ["application/json"] }
///     cors: { allowed_origins: ["https://shop.example"], max_age: 600 }
///     routes:
///       - method: create
///         mapping: { methods: [POST], consumes: ["application/json"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    #[serde(default)]
    pub router: Option<RouterConfig>,
    #[serde(default)]
    pub controllers: Vec<ControllerDefinition>,
}

/// A handler and the type-level mapping shared by its routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerDefinition {
    pub handler: String,
    #[serde(default)]
    pub mapping: MappingDefinition,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One handler method and its method-level mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    pub method: String,
    #[serde(default)]
    pub mapping: MappingDefinition,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

/// String form of a [`RouteCondition`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingDefinition {
    pub paths: Vec<String>,
    pub methods: Vec<String>,
    pub params: Vec<String>,
    pub headers: Vec<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub body_required: Option<bool>,
}

impl MappingDefinition {
    pub fn to_condition(&self) -> Result<RouteCondition, RoutingError> {
        let mut builder = RouteCondition::builder()
            .paths(self.paths.iter().cloned())
            .methods(self.methods.iter().cloned())
            .params(self.params.iter().cloned())
            .headers(self.headers.iter().cloned())
            .consumes(self.consumes.iter().cloned())
            .produces(self.produces.iter().cloned());
        if let Some(required) = self.body_required {
            builder = builder.body_required(required);
        }
        builder.build()
    }
}

/// A fully combined condition ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub condition: RouteCondition,
    pub handler: HandlerRef,
    pub cors: Option<CorsConfig>,
}

impl RouteDefinition {
    pub fn register(&self, router: &Router) -> Result<Arc<Registration>, RoutingError> {
        router.register(self.condition.clone(), self.handler.clone(), self.cors.clone())
    }
}

/// Everything a route file describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    pub config: RouterConfig,
    pub routes: Vec<RouteDefinition>,
}

impl RouteSet {
    /// Register every route, stopping at the first conflict.
    pub fn register_all(&self, router: &Router) -> Result<usize> {
        for route in &self.routes {
            route.register(router).with_context(|| {
                format!("Failed to register {} for {}", route.condition, route.handler)
            })?;
        }
        info!(routes = self.routes.len(), "Registered route definitions");
        Ok(self.routes.len())
    }

    /// Turn a parsed document into combined route definitions.
    pub fn from_file(file: RouteFile) -> Result<Self> {
        let mut routes = Vec::new();
        for controller in &file.controllers {
            let type_level = controller.mapping.to_condition().with_context(|| {
                format!("Invalid mapping on controller '{}'", controller.handler)
            })?;
            for entry in &controller.routes {
                let method_level = entry.mapping.to_condition().with_context(|| {
                    format!(
                        "Invalid mapping on route '{}#{}'",
                        controller.handler, entry.method
                    )
                })?;
                let condition = type_level.try_combine(&method_level).with_context(|| {
                    format!(
                        "Cannot combine mappings for '{}#{}'",
                        controller.handler, entry.method
                    )
                })?;
                let cors = match (&controller.cors, &entry.cors) {
                    (Some(base), Some(overlay)) => Some(base.combine(overlay)),
                    (base, overlay) => overlay.clone().or_else(|| base.clone()),
                };
                debug!(
                    handler = %controller.handler,
                    method = %entry.method,
                    condition = %condition,
                    "Route definition loaded"
                );
                routes.push(RouteDefinition {
                    condition,
                    handler: HandlerRef::new(&controller.handler, &entry.method),
                    cors,
                });
            }
        }
        Ok(Self {
            config: file.router.unwrap_or_default(),
            routes,
        })
    }
}

/// Serialization of a route file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    Yaml,
    Json,
}

impl RouteFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RouteFormat::Json,
            _ => RouteFormat::Yaml,
        }
    }
}

pub fn parse_routes(content: &str, format: RouteFormat) -> Result<RouteSet> {
    let file: RouteFile = match format {
        RouteFormat::Json => serde_json::from_str(content).context("Failed to parse JSON route file")?,
        RouteFormat::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML route file")?,
    };
    RouteSet::from_file(file)
}

/// Read and combine a YAML or JSON route definition file.
pub fn load_routes<P: AsRef<Path>>(path: P) -> Result<RouteSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    let routes = parse_routes(&content, RouteFormat::from_path(path))
        .with_context(|| format!("Invalid route file {}", path.display()))?;
    info!(
        path = %path.display(),
        routes = routes.routes.len(),
        "Route file loaded"
    );
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::MatchCriterion;
    use http::Method;

    const ORDERS: &str = r#"
router:
  match_order: [patterns, methods]
controllers:
  - handler: orderController
    mapping: { paths: ["/orders"], produces: ["application/json"] }
    cors: { allowed_origins: ["https://shop.example"], max_age: 600 }
    routes:
      - method: list
        mapping: { methods: [GET] }
      - method: create
        mapping: { methods: [POST], consumes: ["application/json"] }
      - method: get
        mapping: { paths: ["/{id}"], methods: [GET] }
        cors: { max_age: 60 }
"#;

    #[test]
    fn test_parse_yaml_combines_levels() {
        let set = parse_routes(ORDERS, RouteFormat::Yaml).unwrap();
        assert_eq!(set.config.match_order, vec![MatchCriterion::Patterns, MatchCriterion::Methods]);
        assert_eq!(set.routes.len(), 3);

        let get = &set.routes[2];
        assert_eq!(get.handler.to_string(), "orderController#get");
        assert_eq!(get.condition.patterns().to_string(), "/orders/{id}");
        assert_eq!(get.condition.methods().methods(), &[Method::GET]);
        assert_eq!(get.condition.produces().to_string(), "application/json");
        let cors = get.cors.as_ref().unwrap();
        assert_eq!(cors.allowed_origins, vec!["https://shop.example"]);
        assert_eq!(cors.max_age, Some(60));

        let create = &set.routes[1];
        assert_eq!(create.condition.consumes().to_string(), "application/json");
        assert_eq!(create.cors.as_ref().unwrap().max_age, Some(600));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"controllers": [{"handler": "health", "routes": [
            {"method": "check", "mapping": {"paths": ["/health"], "methods": ["GET"]}}
        ]}]}"#;
        let set = parse_routes(json, RouteFormat::Json).unwrap();
        assert_eq!(set.config, RouterConfig::default());
        assert_eq!(set.routes[0].condition.direct_paths(), vec!["/health"]);
    }

    #[test]
    fn test_invalid_mapping_names_route() {
        let yaml = r#"
controllers:
  - handler: broken
    routes:
      - method: oops
        mapping: { paths: ["/a/{"] }
"#;
        let err = parse_routes(yaml, RouteFormat::Yaml).unwrap_err();
        assert!(format!("{err:#}").contains("broken#oops"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "controllers:\n  - handler: a\n    mappings: {}\n";
        assert!(parse_routes(yaml, RouteFormat::Yaml).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RouteFormat::from_path(Path::new("routes.JSON")), RouteFormat::Json);
        assert_eq!(RouteFormat::from_path(Path::new("routes.yml")), RouteFormat::Yaml);
    }
}
