//! # Like server
//!
//! HTTP surface of the like store.
//!
//! - `GET /api/likes` → every image key with its count
//! - `POST /api/likes/{imageId}` → `{ "likes": n }`, 429 while cooling down
//! - `DELETE /api/likes/{imageId}` → `{ "likes": n }`, 0 for never-liked images
//!
//! Failures come back as `{ "error": "..." }`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub mod error;
pub mod routes;

use crate::likes::LikeStore;
use routes::{like_image, list_likes, unlike_image};

pub fn router(store: Arc<LikeStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/likes", get(list_likes))
        .route("/api/likes/:image_id", post(like_image).delete(unlike_image))
        .layer(cors)
        .with_state(store)
}

pub async fn serve(store: Arc<LikeStore>, port: u16) -> anyhow::Result<()> {
    let app = router(store);

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
