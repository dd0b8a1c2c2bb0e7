//! File API: JSON metadata, directory listings and downloads

use crate::middleware::{require_session, SessionGuard};
use crate::module::{ApiModule, ModuleError};
use crate::state::ModuleContext;
use crate::ApiError;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use burrow_storage::{Entry, Storage};
use std::sync::Arc;

/// URL prefix of the file API
pub const MOUNT_PATH: &str = "/files";

/// File API module
pub struct FilesModule {
    storage: Arc<dyn Storage>,
    guard: SessionGuard,
}

impl FilesModule {
    pub fn new(ctx: &ModuleContext) -> Result<Self, ModuleError> {
        Ok(Self {
            storage: Arc::clone(&ctx.storage),
            guard: SessionGuard::from_context(ctx)?,
        })
    }
}

impl ApiModule for FilesModule {
    fn name(&self) -> &str {
        "files"
    }

    fn mount_path(&self) -> &str {
        MOUNT_PATH
    }

    fn start(&self, router: Router) -> Result<Router, ModuleError> {
        let routes = Router::new()
            .route("/files/stat/{*path}", get(stat))
            .route("/files/list", get(list_root))
            .route("/files/list/{*path}", get(list))
            .route("/files/download/{*path}", get(download))
            .route_layer(axum_middleware::from_fn_with_state(
                self.guard.clone(),
                require_session,
            ))
            .with_state(Arc::clone(&self.storage));

        Ok(router.merge(routes))
    }
}

/// GET /files/stat/{path} - Metadata for one entry
async fn stat(
    State(storage): State<Arc<dyn Storage>>,
    Path(path): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    Ok(Json(storage.stat(&path).await?))
}

/// GET /files/list - Children of the data root
async fn list_root(State(storage): State<Arc<dyn Storage>>) -> Result<Json<Vec<Entry>>, ApiError> {
    Ok(Json(storage.list("").await?))
}

/// GET /files/list/{path} - Children of a directory
async fn list(
    State(storage): State<Arc<dyn Storage>>,
    Path(path): Path<String>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    Ok(Json(storage.list(&path).await?))
}

/// GET /files/download/{path} - File content as an attachment
async fn download(
    State(storage): State<Arc<dyn Storage>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let entry = storage.stat(&path).await?;
    let data = storage.read(&path).await?;

    let content_type = mime_guess::from_path(&entry.name)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        entry.name.replace(['"', '\\'], "_")
    );

    let mut response = data.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
