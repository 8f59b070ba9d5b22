use axum::{
    Router,
    routing::{get, post},
};
use http::{Method, header};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::ServerConfig, service::database::Database};

pub mod envelope;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: ServerConfig,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let api = Router::new()
        .route("/envelopes", post(envelope::create_envelope))
        .route("/envelopes/{envelope_id}", get(envelope::get_envelope))
        .route("/sign/{token}", get(envelope::load_for_signing))
        .route("/sign/{token}/submit", post(envelope::submit))
        .route("/sign/{token}/decline", post(envelope::decline));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
