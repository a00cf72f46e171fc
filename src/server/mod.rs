mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health_handler,
        api::root_handler,
        api::add_image_handler,
        api::search_handler,
        api::upload_handler,
        api::list_handler,
    ),
    components(schemas(
        types::UploadForm,
        types::UploadResponse,
        types::SearchResponse,
        types::SearchResult,
        types::AddImageResponse,
        types::HealthResponse,
        types::InfoResponse,
        types::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    let images = ServeDir::new(state.gallery.dir());
    Router::new()
        .route("/", get(api::root_handler))
        .route("/health", get(api::health_handler))
        .route("/add_image/{image_path}", get(api::add_image_handler))
        .route("/search_images/{query}", get(api::search_handler))
        .route("/upload_image", post(api::upload_handler))
        .route("/list_images", get(api::list_handler))
        .nest_service("/images", images)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.upload_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
