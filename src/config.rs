use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::download::YtDlp;
use crate::media::FfmpegDecoder;
use crate::models::Models;
use crate::pipeline::{Analyzer, AnalyzerBuilder};
use crate::trends::{
    INSTAGRAM_ENDPOINT, InstagramClient, TIKTOK_ENDPOINT, TikTokClient, TrendAggregator,
    TrendFailurePolicy,
};

static DEFAULT_MODEL_DIR: LazyLock<String> = LazyLock::new(|| {
    ProjectDirs::from("", "vidlens", "vidlens")
        .map(|dirs| dirs.data_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
        .to_string_lossy()
        .into_owned()
});

fn default_model_dir() -> &'static str {
    DEFAULT_MODEL_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct PipelineOptions {
    /// 每个视频等距抽取的帧数
    #[arg(long, value_name = "N", default_value_t = AnalyzerBuilder::DEFAULT_FRAMES, value_parser = parse_positive)]
    pub frames: usize,
    /// 返回的相似视频数量
    #[arg(long, value_name = "K", default_value_t = AnalyzerBuilder::DEFAULT_NEIGHBORS)]
    pub neighbors: usize,
    /// 不将分析过的视频加入相似度索引
    #[arg(long)]
    pub no_remember: bool,
    /// 逐帧检测时，每隔多少帧检测一次
    #[arg(long, value_name = "N", default_value_t = 30, value_parser = parse_positive)]
    pub detect_every: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct TrendOptions {
    /// 每个话题最多采样的视频数量
    #[arg(long, value_name = "N", default_value_t = TrendAggregator::DEFAULT_SAMPLE)]
    pub trend_sample: usize,
    /// 获取话题趋势失败时的处理方式
    #[arg(long, value_enum, value_name = "POLICY", default_value_t = TrendFailurePolicy::Degrade)]
    pub trend_failure: TrendFailurePolicy,
    /// TikTok 接口地址
    #[arg(long, value_name = "URL", default_value = TIKTOK_ENDPOINT)]
    pub tiktok_endpoint: String,
    /// Instagram 接口地址
    #[arg(long, value_name = "URL", default_value = INSTAGRAM_ENDPOINT)]
    pub instagram_endpoint: String,
    /// 外部请求超时时间，单位为秒
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub http_timeout: u64,
}

impl TrendOptions {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn aggregator(&self) -> anyhow::Result<TrendAggregator> {
        let client = TikTokClient::new(&self.tiktok_endpoint, self.timeout())?;
        Ok(TrendAggregator::new(Arc::new(client), self.trend_sample, self.trend_failure))
    }

    pub fn instagram(&self) -> anyhow::Result<InstagramClient> {
        Ok(InstagramClient::new(&self.instagram_endpoint, self.timeout())?)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ToolOptions {
    /// ffmpeg 可执行文件
    #[arg(long, value_name = "PROGRAM", default_value = "ffmpeg")]
    pub ffmpeg: String,
    /// ffprobe 可执行文件
    #[arg(long, value_name = "PROGRAM", default_value = "ffprobe")]
    pub ffprobe: String,
    /// yt-dlp 可执行文件
    #[arg(long, value_name = "PROGRAM", default_value = "yt-dlp")]
    pub yt_dlp: String,
}

impl ToolOptions {
    pub fn decoder(&self) -> FfmpegDecoder {
        FfmpegDecoder::new(&self.ffmpeg, &self.ffprobe)
    }

    pub fn downloader(&self) -> YtDlp {
        YtDlp::new(&self.yt_dlp)
    }
}

/// 根据命令行参数组装分析器
pub fn build_analyzer(
    models: &Models,
    pipeline: &PipelineOptions,
    trends: &TrendOptions,
    tools: &ToolOptions,
) -> anyhow::Result<Analyzer> {
    Ok(AnalyzerBuilder::new(Arc::new(tools.decoder()))
        .embedder(models.embedder.clone())
        .frames(pipeline.frames)
        .neighbors(pipeline.neighbors)
        .remember(!pipeline.no_remember)
        .trends(Some(trends.aggregator()?))
        .downloader(Arc::new(tools.downloader()))
        .build())
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vidlens", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 预训练模型所在目录
    #[arg(short, long, default_value = default_model_dir())]
    pub model_dir: ModelDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 启动 HTTP 分析服务
    Server(ServerCommand),
    /// 分析一个本地视频或视频链接
    Analyze(AnalyzeCommand),
    /// 统计一个 TikTok 话题的趋势
    Trends(TrendsCommand),
}

#[derive(Debug, Clone)]
pub struct ModelDir {
    path: PathBuf,
}

impl ModelDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// CLIP 图像编码器
    pub fn clip(&self) -> PathBuf {
        self.path.join("clip-visual.onnx")
    }

    /// YOLOv5 检测模型
    pub fn yolo(&self) -> PathBuf {
        self.path.join("yolov5s.onnx")
    }

    /// Vosk 模型目录
    pub fn vosk(&self) -> PathBuf {
        self.path.join("vosk-model-small-en-us")
    }
}

impl FromStr for ModelDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("必须大于 0".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("无效的数字 {}: {}", s, e)),
    }
}
