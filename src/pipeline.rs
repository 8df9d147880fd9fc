//! 视频分析流水线
//!
//! 抽帧 -> 嵌入 -> 平均池化 -> 话题趋势 -> 最近邻查询 -> 汇总，
//! 前三步任何一步失败都会直接结束，只返回错误信息。

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::TryStreamExt;
use log::{debug, error, info};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::download::{VideoDownloader, YtDlp};
use crate::index::SharedIndex;
use crate::media::{FrameSampler, VideoDecoder, VideoMetadata};
use crate::metrics;
use crate::models::{Detection, EMBEDDING_DIM, Embedder, ObjectDetector};
use crate::source::{VideoSource, parse_video_url};
use crate::trends::{SocialTrends, TrendAggregator, normalize_hashtag};
use crate::{Error, Result};

/// 一次分析的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    pub metadata: VideoMetadata,
    /// 与最相似视频的欧氏距离，升序
    pub similarity_scores: Vec<f32>,
    /// 最相似视频在索引中的编号，与 `similarity_scores` 一一对应
    pub similar_video_indices: Vec<usize>,
    /// 话题趋势，没有数据时为 `{}`
    #[schema(value_type = Object)]
    pub social_trends: SocialTrends,
    /// 视频的平均特征向量
    pub feature_vector: Vec<f32>,
    /// 本视频加入索引后的编号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_index: Option<usize>,
    /// 从链接分析时，链接的解析结果
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VideoSource>,
}

/// 分析结果或错误信息，二者只会出现一个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Completed(Box<AnalysisResult>),
    Failed { error: String },
}

impl From<Result<AnalysisResult>> for AnalysisReport {
    fn from(result: Result<AnalysisResult>) -> Self {
        match result {
            Ok(result) => AnalysisReport::Completed(Box::new(result)),
            Err(e) => AnalysisReport::Failed { error: e.to_string() },
        }
    }
}

/// 目标检测扫描结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoDetections {
    pub objects: Vec<Detection>,
    /// 解码的总帧数
    pub frames_processed: usize,
}

/// 对一组特征逐列求平均
pub fn mean_pool(features: &Array2<f32>) -> Result<Array1<f32>> {
    features
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::Model("cannot pool an empty embedding matrix".to_string()))
}

async fn timed<T>(stage: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let start = Instant::now();
    let result = fut.await;
    let elapsed = start.elapsed();
    metrics::observe_stage(stage, elapsed.as_secs_f64());
    debug!("{}: {:.2?}", stage, elapsed);
    result
}

/// 视频分析器，在进程内共享
pub struct Analyzer {
    decoder: Arc<dyn VideoDecoder>,
    sampler: FrameSampler,
    embedder: Option<Embedder>,
    index: Arc<SharedIndex>,
    trends: Option<TrendAggregator>,
    downloader: Arc<dyn VideoDownloader>,
    neighbors: usize,
    remember: bool,
}

impl Analyzer {
    pub fn decoder(&self) -> &Arc<dyn VideoDecoder> {
        &self.decoder
    }

    pub fn index(&self) -> &Arc<SharedIndex> {
        &self.index
    }

    /// 分析本地视频，失败时返回只包含错误信息的结果
    pub async fn analyze(&self, path: &Path, hashtag: Option<&str>) -> AnalysisReport {
        self.try_analyze(path, hashtag).await.into()
    }

    /// 下载并分析外部视频，失败时返回只包含错误信息的结果
    pub async fn analyze_url(&self, url: &str, hashtag: Option<&str>) -> AnalysisReport {
        self.try_analyze_url(url, hashtag).await.into()
    }

    pub async fn try_analyze(&self, path: &Path, hashtag: Option<&str>) -> Result<AnalysisResult> {
        info!("开始分析视频: {}", path.display());
        record(self.run(path, hashtag).await)
    }

    /// 视频下载到临时目录中，返回前删除
    pub async fn try_analyze_url(&self, url: &str, hashtag: Option<&str>) -> Result<AnalysisResult> {
        let source = parse_video_url(url);
        info!("开始分析 {:?} 视频: {}", source.platform, url);

        let result = async {
            let dir = tempfile::tempdir()?;
            let path = timed("download", self.downloader.download(url, dir.path())).await?;
            let mut result = self.run(&path, hashtag).await?;
            result.source = Some(source);
            Ok::<_, Error>(result)
        }
        .await;
        record(result)
    }

    async fn run(&self, path: &Path, hashtag: Option<&str>) -> Result<AnalysisResult> {
        let embedder = self
            .embedder
            .clone()
            .ok_or_else(|| Error::Model("embedding model not loaded".to_string()))?;

        let (metadata, frames) = timed("sampling", async {
            let metadata = self.decoder.probe(path).await?;
            let frames = self.sampler.sample(path, &metadata).await?;
            Ok::<_, Error>((metadata, frames))
        })
        .await?;
        debug!("抽取了 {} 帧, 视频信息: {:?}", frames.len(), metadata);

        let features = timed("embedding", async move {
            Ok::<_, Error>(tokio::task::spawn_blocking(move || embedder.encode(&frames)).await??)
        })
        .await?;

        let pooled = mean_pool(&features)?;
        let feature_vector = pooled.to_vec();

        // 趋势在写入索引之前获取，分析失败时索引保持不变
        let social_trends = match (hashtag.and_then(normalize_hashtag), &self.trends) {
            (Some(tag), Some(trends)) => timed("trends", trends.summarize(tag)).await?.into(),
            _ => SocialTrends::Empty {},
        };

        let (neighbors, video_index) = timed("querying", async {
            if self.remember {
                let (neighbors, id) =
                    self.index.query_then_insert(&feature_vector, self.neighbors).await?;
                Ok::<_, Error>((neighbors, Some(id)))
            } else {
                Ok((self.index.query(&feature_vector, self.neighbors).await?, None))
            }
        })
        .await?;

        Ok(AnalysisResult {
            metadata,
            similarity_scores: neighbors.distances,
            similar_video_indices: neighbors.indices,
            social_trends,
            feature_vector,
            video_index,
            source: None,
        })
    }
}

fn record(result: Result<AnalysisResult>) -> Result<AnalysisResult> {
    match &result {
        Ok(_) => metrics::inc_analysis("ok"),
        Err(e) => {
            error!("视频分析失败: {}", e);
            metrics::inc_analysis("error");
        }
    }
    result
}

/// 构建 [`Analyzer`]
pub struct AnalyzerBuilder {
    decoder: Arc<dyn VideoDecoder>,
    embedder: Option<Embedder>,
    frames: usize,
    neighbors: usize,
    remember: bool,
    index: Option<Arc<SharedIndex>>,
    trends: Option<TrendAggregator>,
    downloader: Arc<dyn VideoDownloader>,
}

impl AnalyzerBuilder {
    pub const DEFAULT_FRAMES: usize = 10;
    pub const DEFAULT_NEIGHBORS: usize = 5;

    pub fn new(decoder: Arc<dyn VideoDecoder>) -> Self {
        Self {
            decoder,
            embedder: None,
            frames: Self::DEFAULT_FRAMES,
            neighbors: Self::DEFAULT_NEIGHBORS,
            remember: true,
            index: None,
            trends: None,
            downloader: Arc::new(YtDlp::default()),
        }
    }

    pub fn embedder(mut self, embedder: Option<Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// 每个视频抽取的帧数
    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    /// 返回的相似视频数量
    pub fn neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// 是否将分析过的视频加入索引
    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// 使用已有的索引，默认新建一个空索引
    pub fn index(mut self, index: Arc<SharedIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn trends(mut self, trends: Option<TrendAggregator>) -> Self {
        self.trends = trends;
        self
    }

    pub fn downloader(mut self, downloader: Arc<dyn VideoDownloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn build(self) -> Analyzer {
        let dim = self.embedder.as_ref().map_or(EMBEDDING_DIM, Embedder::dimension);
        Analyzer {
            sampler: FrameSampler::new(self.decoder.clone(), self.frames),
            decoder: self.decoder,
            embedder: self.embedder,
            index: self.index.unwrap_or_else(|| Arc::new(SharedIndex::new(dim))),
            trends: self.trends,
            downloader: self.downloader,
            neighbors: self.neighbors,
            remember: self.remember,
        }
    }
}

/// 按顺序解码整个视频，每隔 `stride` 帧做一次目标检测，从第 0 帧开始
pub async fn scan_video(
    decoder: &dyn VideoDecoder,
    detector: Arc<dyn ObjectDetector>,
    path: &Path,
    stride: usize,
) -> Result<VideoDetections> {
    if stride == 0 {
        return Err(Error::Validation("detection stride must be at least 1".to_string()));
    }

    let metadata = decoder.probe(path).await?;
    let mut frames = decoder.frames(path, &metadata)?;
    let mut result = VideoDetections::default();
    while let Some(image) = frames.try_next().await? {
        if result.frames_processed % stride == 0 {
            let detector = detector.clone();
            let objects = tokio::task::spawn_blocking(move || detector.detect(&image)).await??;
            result.objects.extend(objects);
        }
        result.frames_processed += 1;
    }

    debug!("共解码 {} 帧, 检测到 {} 个目标", result.frames_processed, result.objects.len());
    Ok(result)
}
