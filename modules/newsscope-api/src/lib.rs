pub mod canonical_json;
pub mod handler;
pub mod query;

use ai_client::Gemini;
use sqlx::PgPool;

pub struct AppState {
    pub pool: PgPool,
    pub gemini: Option<Gemini>,
}

pub fn router(state: std::sync::Arc<AppState>) -> axum::Router {
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route("/api/query", get(handler::api_query))
        .route("/", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
