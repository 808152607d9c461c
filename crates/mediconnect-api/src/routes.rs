//! Router setup with all routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, static
//! file serving and all handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use mediconnect_core::error::MediConnectError;
use mediconnect_core::MediConnectConfig;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let static_files = ServeDir::new(&state.config.general.static_dir);

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/create/",
            get(handlers::create_form).post(handlers::create_submit),
        )
        .route("/success/", get(handlers::success))
        .route(
            "/update/{id}/",
            get(handlers::update_form).post(handlers::update_submit),
        )
        .route(
            "/delete/{id}/",
            get(handlers::delete_confirm).post(handlers::delete_submit),
        )
        .route("/profile/{id}/", get(handlers::profile))
        .route("/search/", get(handlers::search))
        .route(
            "/recommend/",
            get(handlers::recommend_form).post(handlers::recommend_submit),
        )
        .route(
            "/chatbot/",
            get(handlers::chatbot_page).post(handlers::chatbot_submit),
        )
        .route("/api/generate-avatar/", post(handlers::generate_avatar))
        .route("/health", get(handlers::health))
        .nest_service("/static", static_files)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
pub async fn start_server(
    config: &MediConnectConfig,
    state: AppState,
) -> Result<(), MediConnectError> {
    let addr = format!("{}:{}", config.general.bind_address, config.general.port);
    let router = create_router(state);

    tracing::info!("Starting MediConnect on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
