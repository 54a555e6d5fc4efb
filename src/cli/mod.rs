//! # CLI Module
//!
//! Command-line access to a route definition file.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Parse the file, combine controller and route mappings, and register
//! everything. Fails on the first invalid mapping or conflicting
//! registration:
//!
//! ```bash
//! handlermap check --routes routes.yaml
//! ```
//!
//! ### `routes`
//!
//! ```bash
//! handlermap routes --routes routes.yaml [--json]
//! ```
//!
//! ### `resolve`
//!
//! Resolve one request and print the chosen handler, the matched pattern,
//! captured variables and CORS configuration, or the error and its HTTP
//! status:
//!
//! ```bash
//! handlermap resolve --routes routes.yaml -X POST --path /orders \
//!     -H 'Content-Type: application/json' -H 'Content-Length: 2'
//! ```
//!
//! ### `watch`
//!
//! Keep the file registered and print a line for every reload.
//!
//! ## Usage from Code
//!
//! ```rust,no_run
//! use handlermap::cli::{execute, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! execute(&cli.command, &mut std::io::stdout()).unwrap();
//! ```

mod commands;


pub use commands::{build_router, execute, resolve_request, run_cli, Cli, Commands, ResolveReport};
