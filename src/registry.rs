//! # Registry Module
//!
//! [`MappingRegistry`] owns every registered [`RouteCondition`] together with
//! the handler it maps to, a direct-path index for literal paths, and the CORS
//! configuration per handler.
//!
//! ## Concurrency
//!
//! All state lives behind one `parking_lot::RwLock`. Registration and
//! unregistration take the write lock; resolution takes a
//! [`RegistrySnapshot`] (the read guard) and holds it until it is done, so a
//! reader never sees a half-applied registration.
//!
//! ## Ordering
//!
//! Each registration gets a sequence number. Full scans and direct-path
//! buckets both yield conditions in registration order, which keeps
//! resolution deterministic for a given registration history.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::condition::RouteCondition;
use crate::cors::CorsConfig;
use crate::error::RoutingError;

/// Opaque reference to the code that handles a request: a handler (for
/// example a controller) and the method on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandlerRef {
    handler: Arc<str>,
    method: Arc<str>,
}

impl HandlerRef {
    pub fn new(handler: &str, method: &str) -> Self {
        Self {
            handler: Arc::from(handler),
            method: Arc::from(method),
        }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.handler, self.method)
    }
}

/// A condition bound to its handler. Never mutated after creation.
#[derive(Debug)]
pub struct Registration {
    pub condition: RouteCondition,
    pub handler: HandlerRef,
    pub direct_paths: Vec<String>,
    pub cors: Option<CorsConfig>,
    sequence: u64,
}

impl Registration {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Default)]
struct MappingTable {
    registrations: HashMap<RouteCondition, Arc<Registration>>,
    order: BTreeMap<u64, RouteCondition>,
    path_lookup: HashMap<String, Vec<RouteCondition>>,
    cors_lookup: HashMap<HandlerRef, CorsConfig>,
    next_sequence: u64,
}

/// Thread-safe store of handler registrations.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    table: RwLock<MappingTable>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `condition` to `handler`.
    ///
    /// Registering the same condition for the same handler again is a no-op
    /// returning the existing registration. A different handler is rejected
    /// with [`RoutingError::DuplicateRegistration`].
    pub fn register(
        &self,
        condition: RouteCondition,
        handler: HandlerRef,
        cors: Option<CorsConfig>,
    ) -> Result<Arc<Registration>, RoutingError> {
        if let Some(config) = &cors {
            config.validate()?;
        }

        let mut table = self.table.write();
        if let Some(existing) = table.registrations.get(&condition) {
            if existing.handler == handler {
                debug!(
                    handler = %handler,
                    condition = %condition,
                    "Registration already present"
                );
                return Ok(Arc::clone(existing));
            }
            return Err(RoutingError::DuplicateRegistration {
                condition: condition.to_string(),
                existing: existing.handler.clone(),
                attempted: handler,
            });
        }

        let direct_paths = condition.direct_paths();
        for path in &direct_paths {
            table
                .path_lookup
                .entry(path.clone())
                .or_default()
                .push(condition.clone());
        }
        if let Some(config) = &cors {
            table.cors_lookup.insert(handler.clone(), config.clone());
        }

        let sequence = table.next_sequence;
        table.next_sequence += 1;
        let registration = Arc::new(Registration {
            condition: condition.clone(),
            handler,
            direct_paths,
            cors,
            sequence,
        });
        table.order.insert(sequence, condition.clone());
        table
            .registrations
            .insert(condition, Arc::clone(&registration));

        info!(
            handler = %registration.handler,
            condition = %registration.condition,
            direct_paths = registration.direct_paths.len(),
            total_registrations = table.registrations.len(),
            "Handler registered"
        );
        Ok(registration)
    }

    /// Remove a registration and every index entry pointing at it.
    ///
    /// Returns `None` when the condition was not registered.
    pub fn unregister(&self, condition: &RouteCondition) -> Option<Arc<Registration>> {
        let mut table = self.table.write();
        remove_registration(&mut table, condition)
    }

    /// Remove `condition` only while it is still mapped to `handler`.
    ///
    /// Returns `None`, leaving the registry untouched, when the condition is
    /// unknown or owned by another handler.
    pub fn unregister_handler(
        &self,
        condition: &RouteCondition,
        handler: &HandlerRef,
    ) -> Option<Arc<Registration>> {
        let mut table = self.table.write();
        let owner = &table.registrations.get(condition)?.handler;
        if owner != handler {
            debug!(
                condition = %condition,
                owner = %owner,
                requested = %handler,
                "Registration belongs to another handler, left in place"
            );
            return None;
        }
        remove_registration(&mut table, condition)
    }

    /// Shared view used for one resolution. Writers wait until it is dropped.
    pub fn read(&self) -> RegistrySnapshot<'_> {
        RegistrySnapshot {
            table: self.table.read(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.read().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_registration(
    table: &mut MappingTable,
    condition: &RouteCondition,
) -> Option<Arc<Registration>> {
    let registration = table.registrations.remove(condition)?;
    table.order.remove(&registration.sequence);

    for path in &registration.direct_paths {
        if let Some(bucket) = table.path_lookup.get_mut(path) {
            bucket.retain(|c| c != condition);
            if bucket.is_empty() {
                table.path_lookup.remove(path);
            }
        }
    }

    let handler_still_mapped = table
        .registrations
        .values()
        .any(|r| r.handler == registration.handler);
    if !handler_still_mapped {
        table.cors_lookup.remove(&registration.handler);
    }

    info!(
        handler = %registration.handler,
        condition = %registration.condition,
        total_registrations = table.registrations.len(),
        "Handler unregistered"
    );
    Some(registration)
}

/// Read guard over the registry.
pub struct RegistrySnapshot<'a> {
    table: RwLockReadGuard<'a, MappingTable>,
}

impl RegistrySnapshot<'_> {
    /// Conditions indexed under the literal `path`, in registration order.
    pub fn direct_matches(&self, path: &str) -> Option<&[RouteCondition]> {
        self.table.path_lookup.get(path).map(Vec::as_slice)
    }

    /// Every registered condition, in registration order.
    pub fn conditions(&self) -> impl Iterator<Item = &RouteCondition> {
        self.table.order.values()
    }

    pub fn registration(&self, condition: &RouteCondition) -> Option<&Arc<Registration>> {
        self.table.registrations.get(condition)
    }

    /// Every registration, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &Arc<Registration>> {
        let registrations = &self.table.registrations;
        self.table
            .order
            .values()
            .filter_map(move |c| registrations.get(c))
    }

    pub fn cors_config(&self, handler: &HandlerRef) -> Option<&CorsConfig> {
        self.table.cors_lookup.get(handler)
    }

    pub fn len(&self) -> usize {
        self.table.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(path: &str, method: &str) -> RouteCondition {
        RouteCondition::builder()
            .path(path)
            .method(method)
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_indexes_direct_paths() {
        let registry = MappingRegistry::new();
        registry
            .register(cond("/health", "GET"), HandlerRef::new("ops", "health"), None)
            .unwrap();
        registry
            .register(cond("/items/{id}", "GET"), HandlerRef::new("items", "get"), None)
            .unwrap();

        let snapshot = registry.read();
        assert_eq!(snapshot.direct_matches("/health").map(<[_]>::len), Some(1));
        assert!(snapshot.direct_matches("/items/{id}").is_none());
        assert_eq!(snapshot.conditions().count(), 2);
    }

    #[test]
    fn test_same_handler_is_idempotent() {
        let registry = MappingRegistry::new();
        let handler = HandlerRef::new("ops", "health");
        let first = registry
            .register(cond("/health", "GET"), handler.clone(), None)
            .unwrap();
        let second = registry
            .register(cond("/health", "GET"), handler, None)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.read().direct_matches("/health").map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_different_handler_is_rejected() {
        let registry = MappingRegistry::new();
        registry
            .register(cond("/health", "GET"), HandlerRef::new("ops", "health"), None)
            .unwrap();
        let err = registry
            .register(cond("/health", "GET"), HandlerRef::new("other", "health"), None)
            .unwrap_err();
        match err {
            RoutingError::DuplicateRegistration {
                existing, attempted, ..
            } => {
                assert_eq!(existing.to_string(), "ops#health");
                assert_eq!(attempted.to_string(), "other#health");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unregister_cleans_indexes() {
        let registry = MappingRegistry::new();
        let handler = HandlerRef::new("ops", "health");
        let cors = CorsConfig::builder()
            .allowed_origins(["https://a.example"])
            .build()
            .unwrap();
        registry
            .register(cond("/health", "GET"), handler.clone(), Some(cors))
            .unwrap();
        assert!(registry.read().cors_config(&handler).is_some());

        assert!(registry.unregister(&cond("/health", "GET")).is_some());
        let snapshot = registry.read();
        assert!(snapshot.direct_matches("/health").is_none());
        assert!(snapshot.cors_config(&handler).is_none());
        assert!(snapshot.is_empty());
        drop(snapshot);

        assert!(registry.unregister(&cond("/health", "GET")).is_none());
    }

    #[test]
    fn test_unregister_handler_leaves_other_owner_in_place() {
        let registry = MappingRegistry::new();
        let owner = HandlerRef::new("ops", "health");
        registry
            .register(cond("/health", "GET"), owner.clone(), None)
            .unwrap();

        let stranger = HandlerRef::new("other", "health");
        assert!(registry
            .unregister_handler(&cond("/health", "GET"), &stranger)
            .is_none());
        assert_eq!(registry.len(), 1);

        let removed = registry
            .unregister_handler(&cond("/health", "GET"), &owner)
            .unwrap();
        assert_eq!(removed.handler, owner);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_ref_serializes_as_strings() {
        let handler = HandlerRef::new("orderController", "create");
        let json = serde_json::to_string(&handler).unwrap();
        assert_eq!(json, r#"{"handler":"orderController","method":"create"}"#);
        let back: HandlerRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handler);
    }

    #[test]
    fn test_cors_kept_while_handler_still_mapped() {
        let registry = MappingRegistry::new();
        let handler = HandlerRef::new("ops", "health");
        let cors = CorsConfig::allow_all();
        registry
            .register(cond("/health", "GET"), handler.clone(), Some(cors.clone()))
            .unwrap();
        registry
            .register(cond("/health", "HEAD"), handler.clone(), Some(cors))
            .unwrap();
        registry.unregister(&cond("/health", "GET"));
        assert!(registry.read().cors_config(&handler).is_some());
    }

    #[test]
    fn test_invalid_cors_is_rejected() {
        let registry = MappingRegistry::new();
        let invalid = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: Some(true),
            ..CorsConfig::default()
        };
        let err = registry
            .register(cond("/x", "GET"), HandlerRef::new("a", "b"), Some(invalid))
            .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidCors(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = MappingRegistry::new();
        for (i, path) in ["/c", "/a", "/b"].iter().enumerate() {
            registry
                .register(cond(path, "GET"), HandlerRef::new("h", &i.to_string()), None)
                .unwrap();
        }
        let snapshot = registry.read();
        let handlers: Vec<String> = snapshot
            .registrations()
            .map(|r| r.handler.method().to_string())
            .collect();
        assert_eq!(handlers, vec!["0", "1", "2"]);
    }
}
