use std::sync::Arc;

use handlermap::condition::RouteCondition;
use handlermap::registry::MappingRegistry;
use handlermap::{CorsConfig, Router, RouterConfig, RoutingError};
use http::Method;

mod common;
use common::routes::{handler, register, request, resolve, resolved, router};

#[test]
fn test_register_then_unregister() {
    let router = router();
    let condition = register(
        &router,
        RouteCondition::builder().path("/pets/{id}").method("GET"),
        "pets#get",
    );
    assert_eq!(resolved(&router, &request(Method::GET, "/pets/9")), "pets#get");

    let removed = router.unregister(&condition).expect("registered");
    assert_eq!(removed.handler.to_string(), "pets#get");
    assert!(matches!(
        resolve(&router, &request(Method::GET, "/pets/9")),
        Err(RoutingError::NoMatch { .. })
    ));

    // Unregistering twice is harmless.
    assert!(router.unregister(&condition).is_none());
    assert!(router.registry().is_empty());
}

#[test]
fn test_unregister_clears_direct_path_index() {
    let router = router();
    let literal = register(
        &router,
        RouteCondition::builder().paths(["/health", "/healthz"]).method("GET"),
        "health#check",
    );
    {
        let snapshot = router.registry().read();
        assert_eq!(snapshot.direct_matches("/health").map(<[_]>::len), Some(1));
        assert_eq!(snapshot.direct_matches("/healthz").map(<[_]>::len), Some(1));
    }

    router.unregister(&literal);
    let snapshot = router.registry().read();
    assert!(snapshot.direct_matches("/health").is_none());
    assert!(snapshot.direct_matches("/healthz").is_none());
    assert_eq!(snapshot.conditions().count(), 0);
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let router = router();
    let condition = RouteCondition::builder()
        .path("/orders")
        .method("POST")
        .build()
        .unwrap();
    router
        .register(condition.clone(), handler("orders#create"), None)
        .unwrap();

    let err = router
        .register(condition.clone(), handler("orders#import"), None)
        .unwrap_err();
    match &err {
        RoutingError::DuplicateRegistration { existing, attempted, .. } => {
            assert_eq!(existing.to_string(), "orders#create");
            assert_eq!(attempted.to_string(), "orders#import");
        }
        other => panic!("expected DuplicateRegistration, got {other:?}"),
    }
    assert_eq!(resolved(&router, &request(Method::POST, "/orders")), "orders#create");
}

#[test]
fn test_same_handler_registration_is_idempotent() {
    let router = router();
    let condition = RouteCondition::builder().path("/orders").build().unwrap();
    let first = router
        .register(condition.clone(), handler("orders#list"), None)
        .unwrap();
    let second = router
        .register(condition, handler("orders#list"), None)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(router.registry().len(), 1);
}

#[test]
fn test_equal_conditions_built_differently_collide() {
    let router = router();
    register(
        &router,
        RouteCondition::builder().path("/a").methods(["GET", "POST"]),
        "a#one",
    );
    let reordered = RouteCondition::builder()
        .path("/a")
        .methods(["POST", "GET"])
        .build()
        .unwrap();
    assert!(matches!(
        router.register(reordered, handler("a#two"), None),
        Err(RoutingError::DuplicateRegistration { .. })
    ));
}

#[test]
fn test_invalid_cors_rejected_at_registration() {
    let router = router();
    let cors = CorsConfig {
        allowed_origins: vec!["*".into()],
        allow_credentials: Some(true),
        ..CorsConfig::default()
    };
    let err = router
        .register(
            RouteCondition::builder().path("/x").build().unwrap(),
            handler("x#get"),
            Some(cors),
        )
        .unwrap_err();
    assert!(matches!(err, RoutingError::InvalidCors(_)));
    assert!(router.registry().is_empty());
}

#[test]
fn test_cors_kept_while_handler_still_mapped() {
    let router = router();
    let cors = CorsConfig::builder()
        .allowed_origins(["https://shop.example"])
        .build()
        .unwrap();
    let first = RouteCondition::builder().path("/cart").method("GET").build().unwrap();
    let second = RouteCondition::builder().path("/basket").method("GET").build().unwrap();
    router
        .register(first.clone(), handler("cart#view"), Some(cors.clone()))
        .unwrap();
    router
        .register(second.clone(), handler("cart#view"), Some(cors.clone()))
        .unwrap();

    router.unregister(&first);
    assert_eq!(router.cors_config_for(&handler("cart#view")), Some(cors));
    router.unregister(&second);
    assert_eq!(router.cors_config_for(&handler("cart#view")), None);
}

#[test]
fn test_routers_can_share_a_registry() {
    let registry = Arc::new(MappingRegistry::new());
    let writer = Router::with_registry(Arc::clone(&registry), RouterConfig::default());
    let reader = Router::with_registry(
        Arc::clone(&registry),
        RouterConfig {
            direct_path_lookup: false,
            ..RouterConfig::default()
        },
    );

    register(&writer, RouteCondition::builder().path("/shared"), "shared#get");
    assert_eq!(resolved(&reader, &request(Method::GET, "/shared")), "shared#get");
}
