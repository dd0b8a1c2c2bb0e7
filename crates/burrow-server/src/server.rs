//! Server startup and lifecycle

use crate::error::ServeError;
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Bind the listener; failures are reported as [`ServeError::Bind`]
pub async fn bind(addr: &str) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr).await.map_err(|source| ServeError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Run the server until the process is stopped
pub async fn run_server(app: Router, addr: &str) -> Result<(), ServeError> {
    let listener = bind(addr).await?;
    serve(listener, app, std::future::pending()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    app: Router,
    addr: &str,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let listener = bind(addr).await?;
    serve(listener, app, shutdown_signal).await
}

/// Serve `app` on an already bound listener
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let local = listener.local_addr().map_err(ServeError::Serve)?;
    info!("Burrow listening on http://{}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(ServeError::Serve)?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_conflict_is_bind_error() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap().to_string();

        let err = run_server(Router::new(), &addr).await.unwrap_err();
        assert!(matches!(err, ServeError::Bind { addr: ref a, .. } if *a == addr));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(run_server_with_shutdown(
            Router::new(),
            "127.0.0.1:0",
            async {
                rx.await.ok();
            },
        ));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
