use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Serialize;

use crate::config::{load_routes, RouteSet};
use crate::cors::CorsConfig;
use crate::hot_reload::{watch_routes, ReloadSummary};
use crate::logging::init_logging;
use crate::request::RequestDescriptor;
use crate::router::{Resolution, RouteInfo, Router};

/// Command-line interface for handlermap
///
/// Loads a route definition file and inspects, checks or exercises the
/// resulting mappings.
#[derive(Parser)]
#[command(name = "handlermap")]
#[command(about = "Request-to-handler mapping inspector", long_about = None)]
pub struct Cli {
    /// Log level for diagnostics written to stderr
    #[arg(long, global = true, env = "HMAP_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load a route file and register every route, reporting conflicts
    Check {
        /// Route definition file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,
    },
    /// List registered routes in registration order
    Routes {
        /// Route definition file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,

        /// Print JSON instead of one line per route
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve one request and print the outcome as JSON
    Resolve {
        /// Route definition file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Watch a route file and report every applied change
    Watch {
        /// Route definition file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,
    },
}

/// JSON printed by `resolve`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResolveReport {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uri_variables: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    pub preflight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolveReport {
    fn from_resolution(resolution: &Resolution) -> Self {
        let mut report = Self {
            status: 200,
            handler: resolution.handler().map(ToString::to_string),
            pattern: None,
            uri_variables: Vec::new(),
            produces: Vec::new(),
            preflight: false,
            cors: resolution.cors().cloned(),
            error: None,
        };
        match resolution {
            Resolution::Handler(matched) => {
                report.pattern = matched.best_pattern.clone();
                report.uri_variables = matched
                    .uri_variables
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                report.produces = matched
                    .producible_media_types
                    .iter()
                    .map(ToString::to_string)
                    .collect();
            }
            Resolution::Preflight(_) => report.preflight = true,
        }
        report
    }
}

/// Load `path`, build a router with its settings and register every route.
pub fn build_router(path: &Path) -> Result<(Router, RouteSet)> {
    let routes = load_routes(path)?;
    let router = Router::new(routes.config.clone());
    routes.register_all(&router)?;
    Ok((router, routes))
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header '{raw}' is not in 'Name: value' form"))?;
    Ok((name.trim(), value.trim()))
}

/// Resolve a single request against `router`.
pub fn resolve_request(
    router: &Router,
    method: &str,
    path: &str,
    headers: &[String],
) -> Result<ResolveReport> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{method}'"))?;
    let mut request = RequestDescriptor::from_uri(method, path);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }

    Ok(match router.resolve(&request) {
        Ok(resolution) => ResolveReport::from_resolution(&resolution),
        Err(err) => ResolveReport {
            status: err.status_code().as_u16(),
            handler: None,
            pattern: None,
            uri_variables: Vec::new(),
            produces: Vec::new(),
            preflight: request.is_preflight(),
            cors: None,
            error: Some(err.to_string()),
        },
    })
}

fn write_routes(out: &mut impl Write, routes: &[RouteInfo], json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, routes)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(out, "[routes] count={}", routes.len())?;
    for route in routes {
        let cors = if route.has_cors { " (cors)" } else { "" };
        writeln!(out, "[route] {} -> {}{}", route.condition, route.handler, cors)?;
    }
    Ok(())
}

/// Run `command`, writing its output to `out`.
///
/// `watch` blocks until the watcher fails.
pub fn execute(command: &Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Check { routes } => {
            let (router, _) = build_router(routes)?;
            writeln!(
                out,
                "OK: {} routes registered from {}",
                router.registry().len(),
                routes.display()
            )?;
        }
        Commands::Routes { routes, json } => {
            let (router, _) = build_router(routes)?;
            write_routes(out, &router.routes(), *json)?;
        }
        Commands::Resolve {
            routes,
            method,
            path,
            headers,
        } => {
            let (router, _) = build_router(routes)?;
            let report = resolve_request(&router, method, path, headers)?;
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        Commands::Watch { routes } => {
            let (router, initial) = build_router(routes)?;
            writeln!(out, "Watching {} ({} routes)", routes.display(), initial.routes.len())?;
            let (tx, rx) = mpsc::channel::<ReloadSummary>();
            let _watcher = watch_routes(routes, router.clone(), initial, move |summary| {
                // The receiver only goes away when the command ends.
                let _ = tx.send(summary.clone());
            })?;
            for summary in rx {
                writeln!(
                    out,
                    "reloaded: +{} -{} failed={} total={}",
                    summary.added,
                    summary.removed,
                    summary.failed.len(),
                    router.registry().len()
                )?;
                for failure in &summary.failed {
                    writeln!(out, "  failed: {failure}")?;
                }
            }
        }
    }
    Ok(())
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - The route file cannot be read or parsed
/// - Two routes conflict on registration
/// - The watcher cannot be started
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli.command, &mut out)
}
