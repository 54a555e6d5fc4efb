use handlermap::condition::{MatchCriterion, RouteCondition};
use handlermap::{Resolution, Router, RouterConfig, RoutingError};
use http::Method;

mod common;
use common::routes::{preflight, register, request, resolve, resolved, router, with_body};

#[test]
fn test_literal_path_beats_template() {
    let router = router();
    register(&router, RouteCondition::builder().path("/items/{id}").method("GET"), "items#get");
    register(&router, RouteCondition::builder().path("/items/active").method("GET"), "items#active");

    assert_eq!(resolved(&router, &request(Method::GET, "/items/active")), "items#active");
    assert_eq!(resolved(&router, &request(Method::GET, "/items/42")), "items#get");
}

#[test]
fn test_literal_path_beats_template_in_full_scan() {
    let router = Router::new(RouterConfig {
        direct_path_lookup: false,
        ..RouterConfig::default()
    });
    register(&router, RouteCondition::builder().path("/items/{id}").method("GET"), "items#get");
    register(&router, RouteCondition::builder().path("/items/active").method("GET"), "items#active");
    assert_eq!(resolved(&router, &request(Method::GET, "/items/active")), "items#active");
}

#[test]
fn test_resolution_is_deterministic() {
    let router = router();
    register(&router, RouteCondition::builder().path("/files/**").method("GET"), "files#any");
    register(&router, RouteCondition::builder().path("/files/{name}").method("GET"), "files#one");
    register(&router, RouteCondition::builder().path("/files/{dir}/{name}"), "files#nested");
    register(
        &router,
        RouteCondition::builder().path("/files/{name}").method("GET").produces(["text/plain"]),
        "files#text",
    );

    let samples = [
        request(Method::GET, "/files/readme"),
        request(Method::GET, "/files/a/b"),
        request(Method::GET, "/files/a/b/c"),
        request(Method::POST, "/files/a/b"),
    ];
    for sample in &samples {
        let first = resolved(&router, sample);
        for _ in 0..50 {
            assert_eq!(resolved(&router, sample), first);
        }
    }
    // Without an Accept header the unconstrained route is the exact match.
    assert_eq!(resolved(&router, &samples[0]), "files#one");
    // An explicit method outranks a more specific pattern.
    assert_eq!(resolved(&router, &samples[1]), "files#any");
    assert_eq!(resolved(&router, &samples[2]), "files#any");
    assert_eq!(resolved(&router, &samples[3]), "files#nested");

    let text = request(Method::GET, "/files/readme").with_header("Accept", "text/plain");
    assert_eq!(resolved(&router, &text), "files#text");
}

#[test]
fn test_head_implied_by_get() {
    let router = router();
    register(&router, RouteCondition::builder().path("/x").method("GET"), "x#get");
    assert_eq!(resolved(&router, &request(Method::HEAD, "/x")), "x#get");

    register(&router, RouteCondition::builder().path("/x").method("HEAD"), "x#head");
    assert_eq!(resolved(&router, &request(Method::HEAD, "/x")), "x#head");
    assert_eq!(resolved(&router, &request(Method::GET, "/x")), "x#get");
}

#[test]
fn test_ambiguous_match_names_both_handlers() {
    let router = router();
    register(&router, RouteCondition::builder().path("/y").method("GET").params(["a"]), "first#y");
    register(&router, RouteCondition::builder().path("/y").method("GET").params(["b"]), "second#y");

    let err = resolve(&router, &request(Method::GET, "/y?a=1&b=2")).unwrap_err();
    match &err {
        RoutingError::AmbiguousMatch { first, second, .. } => {
            let mut names = vec![first.to_string(), second.to_string()];
            names.sort();
            assert_eq!(names, vec!["first#y", "second#y"]);
        }
        other => panic!("expected AmbiguousMatch, got {other:?}"),
    }
    assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
    let message = err.to_string();
    assert!(message.contains("first#y") && message.contains("second#y"), "{message}");

    // Only one of them applies without both params.
    assert_eq!(resolved(&router, &request(Method::GET, "/y?a=1")), "first#y");
}

#[test]
fn test_ambiguous_produces_with_wildcard_accept() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/report").produces(["application/json"]),
        "report#json",
    );
    register(
        &router,
        RouteCondition::builder().path("/report").produces(["application/xml"]),
        "report#xml",
    );

    let any = request(Method::GET, "/report").with_header("Accept", "*/*");
    assert!(matches!(
        resolve(&router, &any),
        Err(RoutingError::AmbiguousMatch { .. })
    ));
    let xml = request(Method::GET, "/report").with_header("Accept", "application/xml");
    assert_eq!(resolved(&router, &xml), "report#xml");
    let preferred = request(Method::GET, "/report")
        .with_header("Accept", "application/xml;q=0.5, application/json");
    assert_eq!(resolved(&router, &preferred), "report#json");
}

#[test]
fn test_more_specific_consumes_wins() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/orders").method("POST").consumes(["application/json"]),
        "orders#json",
    );
    register(
        &router,
        RouteCondition::builder().path("/orders").method("POST").consumes(["*/*"]),
        "orders#any",
    );

    let json = with_body(Method::POST, "/orders", "application/json");
    assert_eq!(resolved(&router, &json), "orders#json");
    let text = with_body(Method::POST, "/orders", "text/plain");
    assert_eq!(resolved(&router, &text), "orders#any");
}

#[test]
fn test_negated_consumes() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/upload").method("POST").consumes(["!text/plain"]),
        "upload#binary",
    );
    assert_eq!(
        resolved(&router, &with_body(Method::POST, "/upload", "image/png")),
        "upload#binary"
    );
    assert!(matches!(
        resolve(&router, &with_body(Method::POST, "/upload", "text/plain")),
        Err(RoutingError::ContentTypeNotSupported { .. })
    ));
}

#[test]
fn test_preflight_with_two_post_routes_allows_all() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/orders").method("POST").consumes(["application/json"]),
        "orders#json",
    );
    register(
        &router,
        RouteCondition::builder().path("/orders").method("POST").consumes(["*/*"]),
        "orders#any",
    );

    match resolve(&router, &preflight("/orders", "POST")).unwrap() {
        Resolution::Preflight(m) => {
            assert!(m.is_ambiguous());
            let cors = m.cors.unwrap();
            assert_eq!(cors.allowed_origin_patterns, vec!["*"]);
            assert_eq!(cors.allowed_methods, vec!["*"]);
            assert_eq!(cors.allow_credentials, Some(true));
        }
        other => panic!("expected preflight, got {other:?}"),
    }
}

#[test]
fn test_preflight_without_route_is_no_match() {
    let router = router();
    register(&router, RouteCondition::builder().path("/orders").method("POST"), "orders#create");
    assert!(matches!(
        resolve(&router, &preflight("/nowhere", "POST")),
        Err(RoutingError::NoMatch { .. })
    ));
}

#[test]
fn test_custom_match_order() {
    fn docs_router(config: RouterConfig) -> Router {
        let router = Router::new(config);
        register(&router, RouteCondition::builder().path("/docs").method("PUT"), "docs#put");
        register(
            &router,
            RouteCondition::builder().path("/docs").consumes(["text/markdown"]),
            "docs#markdown",
        );
        router
    }
    let put = with_body(Method::PUT, "/docs", "text/markdown");

    // Default order: the explicit method decides first.
    assert_eq!(resolved(&docs_router(RouterConfig::default()), &put), "docs#put");

    // Consumes first: the declared media type decides.
    let consumes_first = docs_router(RouterConfig {
        match_order: vec![MatchCriterion::Consumes, MatchCriterion::Methods],
        ..RouterConfig::default()
    });
    assert_eq!(resolved(&consumes_first, &put), "docs#markdown");
}

#[test]
fn test_header_conditions() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/api/items").headers(["X-Api-Version=2"]),
        "items#v2",
    );
    register(&router, RouteCondition::builder().path("/api/items"), "items#v1");

    let v2 = request(Method::GET, "/api/items").with_header("x-api-version", "2");
    assert_eq!(resolved(&router, &v2), "items#v2");
    let v3 = request(Method::GET, "/api/items").with_header("X-Api-Version", "3");
    assert_eq!(resolved(&router, &v3), "items#v1");
}

#[test]
fn test_catch_all_variable_and_context() {
    let router = router();
    register(&router, RouteCondition::builder().path("/static/{*path}").method("GET"), "assets#serve");
    register(&router, RouteCondition::builder().path("/static/index.html").method("GET"), "assets#index");

    match resolve(&router, &request(Method::GET, "/static/css/site.css")).unwrap() {
        Resolution::Handler(m) => {
            assert_eq!(m.handler.to_string(), "assets#serve");
            assert_eq!(m.best_pattern.as_deref(), Some("/static/{*path}"));
            assert_eq!(m.uri_variable("path"), Some("/css/site.css"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(resolved(&router, &request(Method::GET, "/static/index.html")), "assets#index");
}

#[test]
fn test_trailing_slash_is_strict() {
    let router = router();
    register(&router, RouteCondition::builder().path("/orders"), "orders#list");
    assert!(matches!(
        resolve(&router, &request(Method::GET, "/orders/")),
        Err(RoutingError::NoMatch { .. })
    ));
}

#[test]
fn test_error_statuses() {
    let router = router();
    register(
        &router,
        RouteCondition::builder()
            .path("/orders")
            .method("POST")
            .consumes(["application/json"])
            .produces(["application/json"]),
        "orders#create",
    );

    let cases = [
        (request(Method::GET, "/missing"), 404),
        (request(Method::GET, "/orders"), 405),
        (with_body(Method::POST, "/orders", "text/csv"), 415),
        (
            with_body(Method::POST, "/orders", "application/json").with_header("Accept", "text/html"),
            406,
        ),
        (with_body(Method::POST, "/orders", "not a media type"), 415),
    ];
    for (req, status) in cases {
        let err = resolve(&router, &req).unwrap_err();
        assert_eq!(err.status_code().as_u16(), status, "{} {}: {err}", req.method(), req.path());
        assert!(err.is_client_error());
    }
}
