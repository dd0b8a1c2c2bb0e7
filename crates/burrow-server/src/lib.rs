//! # Burrow Server
//!
//! Bootstrap and composition layer of the Burrow file-serving daemon.
//!
//! This crate provides:
//! - **Setup wizard**: First-run interactive creation of the config and the first user
//! - **Bootstrap pipeline**: Config → credentials → storage → modules, failing fast
//! - **Module registry**: Independent API modules composed onto one router
//! - **Runtime**: Static assets, access logging and the network listener
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          HTTP Clients (browsers, WebDAV, curl)      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                   Burrow Server                      │
//! ├─────────────────────────────────────────────────────┤
//! │   Access Log   │   Static Assets   │   /health      │
//! ├─────────────────────────────────────────────────────┤
//! │   auth module  │  webdav module    │  files module  │
//! ├─────────────────────────────────────────────────────┤
//! │   ConfigStore  │  CredentialStore  │    Storage     │
//! │        (burrow-core)               │ (burrow-storage)│
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod module;
pub mod modules;
pub mod routes;
pub mod server;
pub mod setup;
pub mod state;

pub use bootstrap::{bootstrap, BootstrapPaths, BootstrapStage, Bootstrapped};
pub use config::ServerOptions;
pub use error::{ApiError, BootstrapError, ErrorCode, ServeError};
pub use module::{ApiModule, ModuleError, ModuleRegistry};
pub use routes::create_router;
pub use server::{run_server, run_server_with_shutdown, serve};
pub use state::{ModuleContext, UserSession};
