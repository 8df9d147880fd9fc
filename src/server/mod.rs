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
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::AppError;
pub use self::state::*;
pub use self::types::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health_handler,
        api::detect_objects_handler,
        api::speech_to_text_handler,
        api::process_video_handler,
        api::video_analysis_handler,
        api::instagram_analysis_handler,
        api::tiktok_trends_handler,
        api::metrics_handler,
    ),
    components(schemas(types::UploadForm, types::VideoAnalysisForm))
)]
pub struct ApiDoc;

/// 模型接口同时挂载在根路径和 `/api/python` 下
pub const API_PREFIX: &str = "/api/python";

/// 构建API服务器
///
/// `body_limit` 为请求体大小上限，单位为字节
pub fn create_app(state: Arc<AppState>, body_limit: usize) -> Router {
    let api = Router::new()
        .route("/health", get(api::health_handler))
        .route("/detect-objects", post(api::detect_objects_handler))
        .route("/speech-to-text", post(api::speech_to_text_handler))
        .route("/process-video", post(api::process_video_handler))
        .route("/video-analysis", post(api::video_analysis_handler))
        .route("/instagram-analysis", post(api::instagram_analysis_handler))
        .route("/tiktok-trends", post(api::tiktok_trends_handler));

    Router::new()
        .merge(api.clone())
        .nest(API_PREFIX, api)
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
