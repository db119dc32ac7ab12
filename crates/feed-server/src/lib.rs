pub mod error;
pub mod principal;
pub mod routes;
pub mod state;
pub mod store;

use axum::middleware;
use axum::routing::{get, patch, put};
use axum::Router;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;
pub use store::{Seed, Store};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Feed
        .route(
            "/api/v1/feed",
            get(routes::feed::list_threads).post(routes::feed::create_thread),
        )
        .route("/api/v1/feed/count", get(routes::feed::count_tasks))
        .route(
            "/api/v1/feed/{id}",
            get(routes::feed::get_thread).patch(routes::feed::patch_thread),
        )
        .route(
            "/api/v1/feed/{id}/posts",
            axum::routing::post(routes::feed::add_post),
        )
        .route(
            "/api/v1/feed/{id}/posts/{post_id}",
            axum::routing::delete(routes::feed::delete_post),
        )
        // Tasks
        .route("/api/v1/feed/tasks/{id}", get(routes::tasks::get_task))
        .route(
            "/api/v1/feed/tasks/{id}/resolve",
            put(routes::tasks::resolve_task),
        )
        .route(
            "/api/v1/feed/tasks/{id}/close",
            put(routes::tasks::close_task),
        )
        // Entities
        .route("/api/v1/tables/name/{fqn}", get(routes::tables::get_table))
        // Incidents
        .route(
            "/api/v1/dataQuality/testCases/testCaseIncidentStatus",
            get(routes::incidents::list_incidents),
        )
        .route(
            "/api/v1/dataQuality/testCases/testCaseIncidentStatus/{id}",
            patch(routes::incidents::patch_incident),
        )
        // Search
        .route("/api/v1/search/query", get(routes::search::search))
        .layer(middleware::from_fn(principal::principal_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// State from an optional seed file; no seed means an empty catalog where
/// every principal is denied.
pub fn load_state(seed: Option<&Path>) -> anyhow::Result<AppState> {
    let seed = match seed {
        Some(path) => {
            let seed = Seed::load(path)?;
            tracing::info!(
                path = %path.display(),
                entities = seed.entities.len(),
                threads = seed.threads.len(),
                incidents = seed.incidents.len(),
                "loaded seed"
            );
            seed
        }
        None => Seed::default(),
    };
    Ok(AppState::from_seed(seed))
}

/// Start the catalog server.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the catalog server on a pre-bound listener.
///
/// The caller can read the actual port before starting, which matters when
/// binding port 0.
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("catalog server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
