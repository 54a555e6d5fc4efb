#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;

    use tempfile::NamedTempFile;

    /// Creates a route file with the given extension; removed on drop
    pub fn create_route_file(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("handlermap_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_route_file(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_route_file(content, "json")
    }
}

pub mod routes {
    use handlermap::condition::{RouteCondition, RouteConditionBuilder};
    use handlermap::registry::HandlerRef;
    use handlermap::request::RequestDescriptor;
    use handlermap::{Resolution, Router, RouterConfig, RoutingError};
    use http::Method;

    pub fn router() -> Router {
        Router::new(RouterConfig::default())
    }

    /// `"controller#method"` to a handler reference
    pub fn handler(name: &str) -> HandlerRef {
        let (controller, method) = name.split_once('#').unwrap_or((name, "handle"));
        HandlerRef::new(controller, method)
    }

    pub fn register(router: &Router, builder: RouteConditionBuilder, name: &str) -> RouteCondition {
        let condition = builder.build().unwrap();
        router
            .register(condition.clone(), handler(name), None)
            .unwrap();
        condition
    }

    pub fn request(method: Method, path: &str) -> RequestDescriptor {
        RequestDescriptor::from_uri(method, path)
    }

    /// A request carrying a body of the given content type
    pub fn with_body(method: Method, path: &str, content_type: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, path)
            .with_header("Content-Type", content_type)
            .with_header("Content-Length", "2")
    }

    pub fn preflight(path: &str, method: &str) -> RequestDescriptor {
        RequestDescriptor::new(Method::OPTIONS, path)
            .with_header("Origin", "https://shop.example")
            .with_header("Access-Control-Request-Method", method)
    }

    pub fn resolve(router: &Router, request: &RequestDescriptor) -> Result<Resolution, RoutingError> {
        router.resolve(request)
    }

    /// Name of the resolved handler, panicking on errors
    pub fn resolved(router: &Router, request: &RequestDescriptor) -> String {
        match router.resolve(request) {
            Ok(resolution) => resolution
                .handler()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<preflight>".to_string()),
            Err(err) => panic!("{} {} failed: {err}", request.method(), request.path()),
        }
    }
}
