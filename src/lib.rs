pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use crate::config::AppConfig;
use crate::services::exiftool::MetadataExtractor;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::metadata::upload_file,
        api::handlers::metadata::remove_metadata,
        api::handlers::system::health_check,
        api::handlers::system::system_check,
        api::handlers::system::supported_types,
    ),
    components(
        schemas(
            api::handlers::metadata::UploadResponse,
            api::handlers::system::HealthResponse,
            api::handlers::system::SystemCheckResponse,
            api::handlers::system::SupportedTypesResponse,
        )
    ),
    tags(
        (name = "metadata", description = "Metadata inspection and removal"),
        (name = "system", description = "Service and ExifTool status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub extractor: Arc<dyn MetadataExtractor>,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let max_file_size = state.config.max_file_size;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::system::health_check))
        .route("/system-check", get(api::handlers::system::system_check))
        .route("/supported-types", get(api::handlers::system::supported_types))
        .route("/upload", post(api::handlers::metadata::upload_file))
        .route("/remove-metadata", post(api::handlers::metadata::remove_metadata))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(cors)
        .layer(trace_layer)
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
