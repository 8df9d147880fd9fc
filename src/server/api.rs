use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::{error, info};
use serde::de::DeserializeOwned;
use tokio::task::spawn_blocking;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::media::read_wav;
use crate::pipeline::{AnalysisResult, VideoDetections, scan_video};
use crate::trends::{PostMetrics, TrendSummary};
use crate::{Error, metrics};

fn invalid_form(err: TypedMultipartError) -> Error {
    Error::Validation(err.to_string())
}

/// 参数优先从查询字符串读取，其次从 JSON 请求体读取
fn params<P: DeserializeOwned>(
    query: std::result::Result<Query<P>, QueryRejection>,
    body: &[u8],
) -> Result<P> {
    if let Ok(Query(params)) = query {
        return Ok(params);
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::Validation(format!("invalid request parameters: {}", e)).into())
}

/// 服务健康状态
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let models = state.models.status();
    let status = if models.values().all(|&loaded| loaded) { "healthy" } else { "degraded" };
    Json(HealthResponse { status: status.to_string(), models })
}

/// 检测图片中的物体
#[utoipa::path(
    post,
    path = "/detect-objects",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = DetectResponse),
    )
)]
pub async fn detect_objects_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<DetectResponse>> {
    let TypedMultipart(data) = data.map_err(invalid_form)?;
    let detector = state.models.detector()?.clone();

    info!("正在检测上传图片 ({} 字节)", data.file.len());
    let detections = spawn_blocking(move || -> crate::Result<_> {
        let image = image::load_from_memory(&data.file)?.to_rgb8();
        detector.detect(&image)
    })
    .await??;

    Ok(Json(DetectResponse { detections }))
}

/// 将 WAV 音频转为文字
#[utoipa::path(
    post,
    path = "/speech-to-text",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SpeechResponse),
    )
)]
pub async fn speech_to_text_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<SpeechResponse>> {
    let TypedMultipart(data) = data.map_err(invalid_form)?;
    let recognizer = state.models.recognizer()?.clone();

    info!("正在识别上传音频 ({} 字节)", data.file.len());
    let transcription = spawn_blocking(move || -> crate::Result<_> {
        let clip = read_wav(&data.file)?;
        recognizer.transcribe(&clip)
    })
    .await??;

    Ok(Json(SpeechResponse { transcription }))
}

/// 逐帧检测视频中的物体
#[utoipa::path(
    post,
    path = "/process-video",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = VideoDetections),
    )
)]
pub async fn process_video_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<VideoDetections>> {
    let TypedMultipart(data) = data.map_err(invalid_form)?;
    let detector = state.models.detector()?.clone();

    info!("正在处理上传视频 ({} 字节)", data.file.len());
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("upload.mp4");
    tokio::fs::write(&path, &data.file).await?;

    let result =
        scan_video(state.analyzer.decoder().as_ref(), detector, &path, state.detect_every).await?;
    Ok(Json(result))
}

/// 分析视频，返回相似视频和话题趋势
#[utoipa::path(
    post,
    path = "/video-analysis",
    request_body(content = VideoAnalysisForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = AnalysisResult),
    )
)]
pub async fn video_analysis_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<VideoAnalysisRequest>, TypedMultipartError>,
) -> Result<Json<AnalysisResult>> {
    let TypedMultipart(data) = data.map_err(invalid_form)?;
    let url = data.video_url.or(data.youtube_url).filter(|url| !url.trim().is_empty());
    // 浏览器在未选择文件时也会发送一个空的文件字段
    let file = data.file.filter(|file| !file.is_empty());
    let hashtag = data.hashtag.as_deref();

    let result = match (file, url) {
        (Some(file), None) => {
            info!("正在分析上传视频 ({} 字节)", file.len());
            let dir = tempfile::tempdir()?;
            let path = dir.path().join("upload.mp4");
            tokio::fs::write(&path, &file).await?;
            state.analyzer.try_analyze(&path, hashtag).await?
        }
        (None, Some(url)) => state.analyzer.try_analyze_url(url.trim(), hashtag).await?,
        (Some(_), Some(_)) => {
            let msg = "file and video_url are mutually exclusive";
            return Err(Error::Validation(msg.to_string()).into());
        }
        (None, None) => {
            let msg = "either file or video_url is required";
            return Err(Error::Validation(msg.to_string()).into());
        }
    };

    Ok(Json(result))
}

/// 获取 Instagram 帖子的互动数据
#[utoipa::path(
    post,
    path = "/instagram-analysis",
    params(InstagramParams),
    request_body(content = InstagramParams, content_type = "application/json"),
    responses(
        (status = 200, body = PostMetrics),
    )
)]
pub async fn instagram_analysis_handler(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<InstagramParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<PostMetrics>> {
    let InstagramParams { url } = params(query, &body)?;
    info!("正在分析 Instagram 帖子: {}", url);

    match state.posts.post_metrics(&url).await {
        Ok(metrics) => Ok(Json(metrics)),
        Err(e) if e.is_validation() => Err(e.into()),
        Err(e) => {
            error!("分析 Instagram 帖子失败: {}", e);
            Err(anyhow::anyhow!("Failed to analyze Instagram post").into())
        }
    }
}

/// 统计 TikTok 话题趋势
#[utoipa::path(
    post,
    path = "/tiktok-trends",
    params(TrendParams),
    request_body(content = TrendParams, content_type = "application/json"),
    responses(
        (status = 200, body = TrendSummary),
    )
)]
pub async fn tiktok_trends_handler(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<TrendParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<TrendSummary>> {
    let TrendParams { hashtag } = params(query, &body)?;
    info!("正在统计 TikTok 话题: {}", hashtag);

    match state.trends.summarize(&hashtag).await? {
        Some(summary) => Ok(Json(summary)),
        None => Err(anyhow::anyhow!("Failed to analyze TikTok trends").into()),
    }
}

/// 导出 prometheus 指标
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, body = String, content_type = "text/plain"),
    )
)]
pub async fn metrics_handler() -> Result<String> {
    Ok(metrics::gather_text()?)
}
