use crate::domain::model::ScrapeRequest;
use crate::domain::platform::Platform;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

mod error;
mod handlers;

pub use error::{ApiErrorResponse, ResponseError};

pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/details/:place_id", get(handlers::place_details))
        .route("/cache/stats", get(handlers::cache_stats));

    for platform in Platform::PROFILE_PLATFORMS {
        router = router.route(
            &format!("/profile_{}", platform.slug()),
            post(
                move |State(state): State<AppState>,
                      payload: Result<Json<ScrapeRequest>, JsonRejection>| {
                    handlers::scrape_profile(platform, state, payload)
                },
            ),
        );
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // the healthcheck is last, so it bypasses the trace layer
        .route("/healthcheck", get(handlers::healthcheck))
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<S>(state: AppState, addr: SocketAddr, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
