use std::net::SocketAddr;

use axum::Router;
use console::style;
use tower_http::services::ServeDir;

use crate::config::{HTTP_PORT, Paths};
use crate::error::ServeError;

/// Serves the output directory over HTTP until interrupted.
///
/// Blocks the calling thread. `on_close` runs after a clean shutdown,
/// once nothing is being served anymore; a failed bind never calls it.
pub fn serve(paths: &Paths, on_close: impl FnOnce()) -> Result<(), ServeError> {
    let url = style(format!("http://localhost:{HTTP_PORT}/")).yellow();
    eprintln!("Starting a HTTP server on {url}");

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServeError::Runtime)?
        .block_on(run(paths));

    if result.is_ok() {
        on_close();
    }

    result
}

async fn run(paths: &Paths) -> Result<(), ServeError> {
    let address = SocketAddr::from(([127, 0, 0, 1], HTTP_PORT));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|err| ServeError::Bind(HTTP_PORT, err))?;

    let router = Router::new().fallback_service(ServeDir::new(&paths.out));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    // Without a signal handler the server just runs until killed.
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
