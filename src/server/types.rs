use std::collections::BTreeMap;

use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Detection, TranscriptSegment};

/// 单文件上传请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    #[form_data(limit = "unlimited")]
    pub file: Bytes,
}

/// 单文件上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 视频分析请求
#[derive(TryFromMultipart)]
pub struct VideoAnalysisRequest {
    #[form_data(limit = "unlimited")]
    pub file: Option<Bytes>,
    pub hashtag: Option<String>,
    pub video_url: Option<String>,
    pub youtube_url: Option<String>,
}

/// 视频分析表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct VideoAnalysisForm {
    /// 上传的视频文件，与 `video_url` 二选一
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: Option<String>,
    /// 同时统计该话题的趋势
    pub hashtag: Option<String>,
    /// 外部视频链接，也可以使用 `youtube_url` 字段
    pub video_url: Option<String>,
}

/// Instagram 帖子分析参数，可以放在查询字符串或 JSON 请求体中
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InstagramParams {
    /// 帖子链接
    pub url: String,
}

/// TikTok 话题参数，可以放在查询字符串或 JSON 请求体中
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendParams {
    /// 话题标签，可以带 `#`
    pub hashtag: String,
}

/// 服务健康状态
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 全部模型都已加载时为 `healthy`，否则为 `degraded`
    pub status: String,
    /// 各模型的加载状态
    pub models: BTreeMap<String, bool>,
}

/// 目标检测结果
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetectResponse {
    pub detections: Vec<Detection>,
}

/// 语音识别结果
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SpeechResponse {
    pub transcription: Vec<TranscriptSegment>,
}
