//! Outer router: health check, static assets and the global layers

use crate::config::ServerOptions;
use crate::middleware;
use crate::module::{ModuleError, StartedModule};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use burrow_core::Config;
use burrow_storage::path::confine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Liveness check path
pub const HEALTH_PATH: &str = "/health";

/// Wrap the module router with the runtime pieces.
///
/// `private` lists files and directories that are never served as static
/// assets, even when they lie inside `webDir`.
pub fn create_router(
    router: Router,
    config: &Config,
    modules: &[StartedModule],
    private: &[PathBuf],
    options: &ServerOptions,
) -> Result<Router, ModuleError> {
    let mut claimed: Vec<(&str, &str)> = modules
        .iter()
        .map(|m| (m.name.as_str(), m.mount_path.as_str()))
        .collect();
    claimed.push(("health", HEALTH_PATH));
    check_overlap(&claimed, "health", HEALTH_PATH, modules.len())?;

    let mut router = router.route(HEALTH_PATH, get(health_check));

    if options.serve_static {
        router = mount_static(router, config, &claimed, private)?;
    }

    router = router.layer(RequestBodyLimitLayer::new(options.max_body_size));

    if options.access_log {
        router = router
            .layer(axum_middleware::from_fn(middleware::access_log_middleware))
            .layer(TraceLayer::new_for_http());
    }

    Ok(router)
}

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}

fn mount_static(
    router: Router,
    config: &Config,
    claimed: &[(&str, &str)],
    private: &[PathBuf],
) -> Result<Router, ModuleError> {
    let dir = Path::new(&config.web_dir);
    if !dir.is_dir() {
        warn!(web_dir = %config.web_dir, "Static asset directory not found, not serving static files");
        return Ok(router);
    }

    let guard = StaticGuard::new(dir, private)?;
    let site = Router::new()
        .fallback_service(ServeDir::new(&guard.web_root))
        .layer(axum_middleware::from_fn_with_state(guard, hide_private));

    let prefix = confine(&config.web_url);

    // Module routes take precedence over a root-mounted site.
    if prefix == "/" {
        info!(web_dir = %config.web_dir, "Serving static assets at /");
        return Ok(router.fallback_service(site));
    }

    check_overlap(claimed, "static", &prefix, claimed.len())?;
    info!(web_url = %prefix, web_dir = %config.web_dir, "Serving static assets");
    Ok(router.nest_service(&prefix, site))
}

/// Canonical static root plus the locations under it that stay hidden
#[derive(Clone, Debug)]
struct StaticGuard {
    web_root: PathBuf,
    private: Arc<Vec<PathBuf>>,
}

impl StaticGuard {
    fn new(web_dir: &Path, private: &[PathBuf]) -> Result<Self, ModuleError> {
        let web_root = web_dir.canonicalize().map_err(|e| {
            ModuleError::Config(format!("cannot resolve web directory {}: {e}", web_dir.display()))
        })?;

        let private: Vec<PathBuf> = private.iter().map(|p| absolute(p)).collect();
        for path in private.iter().filter(|p| p.starts_with(&web_root)) {
            warn!(path = %path.display(), "Private file inside web directory is hidden from static serving");
        }

        Ok(Self {
            web_root,
            private: Arc::new(private),
        })
    }

    /// Whether a request path (relative to the mount) reaches a private location
    async fn is_private(&self, uri_path: &str) -> bool {
        let Ok(decoded) = urlencoding::decode(uri_path) else {
            return true;
        };
        let target = self.web_root.join(confine(&decoded).trim_start_matches('/'));
        if self.covers(&target) {
            return true;
        }
        // Symlinks inside the site may point at a private location.
        match tokio::fs::canonicalize(&target).await {
            Ok(real) => self.covers(&real),
            Err(_) => false,
        }
    }

    fn covers(&self, path: &Path) -> bool {
        self.private.iter().any(|p| path.starts_with(p))
    }
}

/// Resolve symlinks where the path exists, otherwise make it absolute
fn absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

async fn hide_private(State(guard): State<StaticGuard>, request: Request, next: Next) -> Response {
    if guard.is_private(request.uri().path()).await {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Reject `path` when it equals or nests inside (or around) one of the first
/// `upto` claimed mount paths.
fn check_overlap(
    claimed: &[(&str, &str)],
    owner: &str,
    path: &str,
    upto: usize,
) -> Result<(), ModuleError> {
    let nested = |outer: &str, inner: &str| {
        inner == outer || inner.starts_with(&format!("{}/", outer.trim_end_matches('/')))
    };

    match claimed[..upto]
        .iter()
        .find(|(_, mount)| nested(mount, path) || nested(path, mount))
    {
        Some((first, mount)) => Err(ModuleError::MountConflict {
            path: (*mount).to_string(),
            first: (*first).to_string(),
            second: owner.to_string(),
        }),
        None => Ok(()),
    }
}
