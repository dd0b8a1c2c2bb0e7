//! WebDAV endpoint
//!
//! Class 1 subset over the storage capability: whole-file GET/HEAD/PUT,
//! DELETE and MKCOL. Property and lock methods are not served.

use crate::middleware::{require_session, SessionGuard};
use crate::module::{ApiModule, ModuleError};
use crate::state::ModuleContext;
use crate::{ApiError, ErrorCode};
use axum::{
    body::{to_bytes, Body},
    extract::{Path, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use burrow_storage::{Storage, StorageError};
use std::sync::Arc;

/// URL prefix of the WebDAV endpoint
pub const MOUNT_PATH: &str = "/webdav";

const ALLOW: &str = "OPTIONS, GET, HEAD, PUT, DELETE, MKCOL";

/// WebDAV protocol module
pub struct WebDavModule {
    storage: Arc<dyn Storage>,
    guard: SessionGuard,
}

impl WebDavModule {
    pub fn new(ctx: &ModuleContext) -> Result<Self, ModuleError> {
        Ok(Self {
            storage: Arc::clone(&ctx.storage),
            guard: SessionGuard::from_context(ctx)?,
        })
    }
}

#[derive(Clone)]
struct DavState {
    storage: Arc<dyn Storage>,
}

impl ApiModule for WebDavModule {
    fn name(&self) -> &str {
        "webdav"
    }

    fn mount_path(&self) -> &str {
        MOUNT_PATH
    }

    fn start(&self, router: Router) -> Result<Router, ModuleError> {
        let state = DavState {
            storage: Arc::clone(&self.storage),
        };

        let routes = Router::new()
            .route(MOUNT_PATH, any(dav_root))
            .route(&format!("{MOUNT_PATH}/"), any(dav_root))
            .route(&format!("{MOUNT_PATH}/{{*path}}"), any(dav_path))
            .route_layer(axum_middleware::from_fn_with_state(
                self.guard.clone(),
                require_session,
            ))
            .with_state(state);

        Ok(router.merge(routes))
    }
}

async fn dav_root(State(state): State<DavState>, request: Request) -> Result<Response, ApiError> {
    dispatch(&state, "", request).await
}

async fn dav_path(
    State(state): State<DavState>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    dispatch(&state, &path, request).await
}

async fn dispatch(state: &DavState, path: &str, request: Request) -> Result<Response, ApiError> {
    let method = request.method().clone();
    match method.as_str() {
        "OPTIONS" => Ok(options()),
        "GET" | "HEAD" => get(state, path, method == Method::HEAD).await,
        "PUT" => {
            // Size is capped by the router-wide body limit layer
            let body = to_bytes(request.into_body(), usize::MAX)
                .await
                .map_err(|e| ApiError::new(ErrorCode::InvalidRequest, e.to_string()))?;
            put(state, path, body).await
        }
        "DELETE" => {
            state.storage.remove(path).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        "MKCOL" => mkcol(state, path).await,
        _ => Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static(ALLOW))],
        )
            .into_response()),
    }
}

fn options() -> Response {
    (
        StatusCode::OK,
        [
            (header::ALLOW, HeaderValue::from_static(ALLOW)),
            (header::HeaderName::from_static("dav"), HeaderValue::from_static("1")),
            (
                header::HeaderName::from_static("ms-author-via"),
                HeaderValue::from_static("DAV"),
            ),
        ],
    )
        .into_response()
}

async fn get(state: &DavState, path: &str, head_only: bool) -> Result<Response, ApiError> {
    let entry = state.storage.stat(path).await?;

    if entry.is_dir {
        let listing = state
            .storage
            .list(path)
            .await?
            .into_iter()
            .map(|child| {
                let suffix = if child.is_dir { "/" } else { "" };
                format!("{}{suffix}\n", child.name)
            })
            .collect::<String>();
        let body = if head_only { Body::empty() } else { Body::from(listing) };
        return Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response());
    }

    let content_type = mime_guess::from_path(&entry.name)
        .first_or_octet_stream()
        .to_string();

    let mut response = if head_only {
        Body::empty().into_response()
    } else {
        Body::from(state.storage.read(path).await?).into_response()
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(entry.size));
    if let Some(modified) = entry.modified {
        if let Ok(value) = HeaderValue::from_str(
            &modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
    Ok(response)
}

async fn put(state: &DavState, path: &str, body: bytes::Bytes) -> Result<Response, ApiError> {
    let existed = state.storage.stat(path).await.is_ok();
    let entry = state.storage.write(path, body).await?;
    tracing::debug!(path = %entry.path, size = entry.size, "webdav put");

    Ok(if existed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::CREATED.into_response()
    })
}

async fn mkcol(state: &DavState, path: &str) -> Result<Response, ApiError> {
    match state.storage.create_dir(path).await {
        Ok(()) => Ok(StatusCode::CREATED.into_response()),
        // RFC 4918: MKCOL on an existing resource is 405
        Err(StorageError::AlreadyExists(p)) => Err(ApiError::new(
            ErrorCode::MethodNotAllowed,
            format!("resource already exists: {p}"),
        )),
        Err(e) => Err(e.into()),
    }
}
