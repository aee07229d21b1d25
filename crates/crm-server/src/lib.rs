pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router for the workspace at `root`, acting as the
/// configured session user.
pub fn build_router(root: PathBuf) -> Router {
    router_with_state(AppState::new(root))
}

/// Build the Router around an explicit state (user override, fixed clock).
pub fn router_with_state(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Sequence engine
        .route("/api/due", get(routes::due::get_due))
        .route(
            "/api/enrollments",
            get(routes::enrollments::list_enrollments).post(routes::enrollments::assign),
        )
        .route(
            "/api/enrollments/{id}/complete",
            post(routes::enrollments::complete),
        )
        .route(
            "/api/enrollments/{id}/revisit",
            post(routes::enrollments::revisit),
        )
        .route(
            "/api/enrollments/{id}/remove",
            post(routes::enrollments::remove),
        )
        .route("/api/sequences", get(routes::sequences::list_sequences))
        // Forecast
        .route("/api/quota", get(routes::quota::get_quota))
        .route("/api/deals", get(routes::deals::list_deals))
        // Command center
        .route("/api/activities/recent", get(routes::activities::recent))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener until the future is dropped.
///
/// Taking a bound listener lets the caller read the real port first when
/// binding to port 0.
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = router_with_state(app_state);

    tracing::info!("CRM API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind `0.0.0.0:{port}` and serve.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(app_state, listener).await
}
