//! # Hot Reload
//!
//! Watches a route definition file and applies changes to a live
//! [`Router`] without rebuilding it. Only the difference between the
//! previous and the new [`RouteSet`] is touched:
//!
//! 1. definitions that disappeared (or changed handler or CORS) are unregistered
//! 2. new definitions are registered
//!
//! A definition that fails to register is reported and left out of the
//! set the watcher remembers, so it is retried on the next change and never
//! unregistered on behalf of the handler that blocked it.
//!
//! Requests keep resolving during a reload; each one sees the registry
//! either before or after an individual registration, never half of it.
//!
//! A file that fails to parse is logged and ignored, leaving the previous
//! routes active. Router settings (`match_order` and friends) are fixed when
//! the router is built and are not reloaded.
//!
//! ```rust,no_run
//! use handlermap::config::load_routes;
//! use handlermap::hot_reload::watch_routes;
//! use handlermap::Router;
//!
//! # fn main() -> anyhow::Result<()> {
//! let routes = load_routes("routes.yaml")?;
//! let router = Router::new(routes.config.clone());
//! routes.register_all(&router)?;
//!
//! let _watcher = watch_routes("routes.yaml", router.clone(), routes, |summary| {
//!     println!("reloaded: +{} -{}", summary.added, summary.removed);
//! })?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::{load_routes, RouteDefinition, RouteSet};
use crate::router::Router;

/// What one reload changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: usize,
    pub removed: usize,
    /// One message per definition that could not be registered
    pub failed: Vec<String>,
}

impl ReloadSummary {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.failed.is_empty()
    }
}

/// Move `router` from `previous` to `next`.
///
/// `previous` must hold only definitions that are registered. Definitions
/// present in both, with the same handler and CORS configuration, are left
/// registered. Returns the summary and the subset of `next` that is now
/// registered, which is the `previous` for the following reload.
pub fn apply_reload(
    router: &Router,
    previous: &RouteSet,
    next: &RouteSet,
) -> (ReloadSummary, RouteSet) {
    let mut summary = ReloadSummary::default();

    if previous.config != next.config {
        warn!("hot-reload: router settings changed but are not reloadable; keeping current ones");
    }

    let stale = previous
        .routes
        .iter()
        .filter(|route| !next.routes.contains(route));
    for route in stale {
        if router
            .unregister_handler(&route.condition, &route.handler)
            .is_some()
        {
            summary.removed += 1;
        }
    }

    let mut applied = RouteSet {
        config: next.config.clone(),
        routes: Vec::with_capacity(next.routes.len()),
    };
    for route in &next.routes {
        if previous.routes.contains(route) {
            applied.routes.push(route.clone());
            continue;
        }
        match route.register(router) {
            Ok(_) => {
                summary.added += 1;
                applied.routes.push(route.clone());
            }
            Err(err) => {
                warn!(
                    handler = %route.handler,
                    condition = %route.condition,
                    error = %err,
                    "hot-reload: route could not be registered"
                );
                summary.failed.push(format!("{}: {err}", route.handler));
            }
        }
    }

    info!(
        added = summary.added,
        removed = summary.removed,
        failed = summary.failed.len(),
        registrations = router.registry().len(),
        "hot-reload: route updates applied"
    );
    (summary, applied)
}

/// Watch `path` and apply every successfully parsed version to `router`.
///
/// `initial` must be the set currently registered. The watcher stops when
/// the returned value is dropped.
pub fn watch_routes<P, F>(
    path: P,
    router: Router,
    initial: RouteSet,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&ReloadSummary) + Send + 'static,
{
    let path: PathBuf = path.as_ref().to_path_buf();
    let watch_path = path.clone();
    let current = Mutex::new(initial);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                match load_routes(&watch_path) {
                    Ok(next) => {
                        let mut current = current.lock();
                        let (summary, applied) = apply_reload(&router, &current, &next);
                        *current = applied;
                        drop(current);
                        if !summary.is_noop() {
                            on_reload(&summary);
                        }
                    }
                    Err(err) => {
                        let reason = format!("{err:#}");
                        error!(
                            path = %watch_path.display(),
                            error = %reason,
                            "hot-reload: keeping previous routes"
                        );
                    }
                }
            }
            Err(err) => error!(error = %err, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching route file");
    Ok(watcher)
}
