#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use vidlens::download::VideoDownloader;
use vidlens::media::{AudioClip, Frame, VideoDecoder, VideoMetadata};
use vidlens::models::{
    Detection, EMBEDDING_DIM, Embedder, ImageEmbedder, ObjectDetector, SpeechRecognizer,
    TranscriptSegment, WordTiming,
};
use vidlens::trends::{PostMetrics, PostSource, TrendPost, TrendSource};
use vidlens::{Error, Result};

pub fn metadata(duration: f64) -> VideoMetadata {
    VideoMetadata { duration, fps: 25., size: [4, 2], audio: true }
}

/// 返回固定元数据的解码器，画面颜色由时间戳决定
pub struct FakeDecoder {
    meta: Option<VideoMetadata>,
    total_frames: usize,
    pub requested: Mutex<Vec<f64>>,
}

impl FakeDecoder {
    pub fn new(duration: f64) -> Self {
        Self { meta: Some(metadata(duration)), total_frames: 0, requested: Mutex::new(vec![]) }
    }

    /// 无法打开任何视频
    pub fn broken() -> Self {
        Self { meta: None, total_frames: 0, requested: Mutex::new(vec![]) }
    }

    pub fn with_frames(mut self, total_frames: usize) -> Self {
        self.total_frames = total_frames;
        self
    }
}

#[async_trait]
impl VideoDecoder for FakeDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        self.meta
            .clone()
            .ok_or_else(|| Error::Decode(format!("cannot open {}", path.display())))
    }

    async fn frame_at(&self, _path: &Path, meta: &VideoMetadata, timestamp: f64) -> Result<RgbImage> {
        self.requested.lock().unwrap().push(timestamp);
        let v = (timestamp * 10.) as u8;
        Ok(RgbImage::from_pixel(meta.width(), meta.height(), Rgb([v, v, v])))
    }

    fn frames(&self, _path: &Path, meta: &VideoMetadata) -> Result<BoxStream<'static, Result<RgbImage>>> {
        let (w, h) = (meta.width(), meta.height());
        Ok(stream::iter((0..self.total_frames).map(move |_| Ok(RgbImage::new(w, h)))).boxed())
    }
}

/// 每帧的特征向量所有分量都等于该帧的时间戳
pub struct TimestampEmbedder {
    pub dim: usize,
}

impl ImageEmbedder for TimestampEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, frames: &[Frame]) -> Result<Array2<f32>> {
        Ok(Array2::from_shape_fn((frames.len(), self.dim), |(i, _)| frames[i].timestamp as f32))
    }
}

pub fn embedder() -> Embedder {
    Embedder::new(Arc::new(TimestampEmbedder { dim: EMBEDDING_DIM }))
}

/// 每张图片都检测到一个人
pub struct FakeDetector;

impl ObjectDetector for FakeDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        Ok(vec![Detection {
            xmin: 0.,
            ymin: 0.,
            xmax: image.width() as f32,
            ymax: image.height() as f32,
            confidence: 0.9,
            class: 0,
            name: "person".to_string(),
        }])
    }
}

/// 把采样数作为识别结果
pub struct FakeRecognizer;

impl SpeechRecognizer for FakeRecognizer {
    fn transcribe(&self, clip: &AudioClip) -> Result<Vec<TranscriptSegment>> {
        Ok(vec![TranscriptSegment {
            text: format!("{} samples", clip.samples.len()),
            result: vec![WordTiming { word: "samples".to_string(), start: 0., end: 1., conf: 1. }],
        }])
    }
}

pub fn post(play: u64, like: u64, comment: u64, sound: Option<&str>) -> TrendPost {
    TrendPost {
        play_count: play,
        like_count: like,
        comment_count: comment,
        sound: sound.map(str::to_string),
    }
}

/// 返回固定视频列表，或者总是失败
pub struct FakeTrendSource {
    posts: Option<Vec<TrendPost>>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeTrendSource {
    pub fn new(posts: Vec<TrendPost>) -> Self {
        Self { posts: Some(posts), calls: Mutex::new(vec![]) }
    }

    pub fn failing() -> Self {
        Self { posts: None, calls: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl TrendSource for FakeTrendSource {
    async fn hashtag_posts(&self, hashtag: &str, limit: usize) -> Result<Vec<TrendPost>> {
        self.calls.lock().unwrap().push((hashtag.to_string(), limit));
        match &self.posts {
            Some(posts) => Ok(posts.clone()),
            None => Err(Error::Fetch("platform unavailable".to_string())),
        }
    }
}

pub struct FakePostSource {
    pub metrics: Option<PostMetrics>,
}

#[async_trait]
impl PostSource for FakePostSource {
    async fn post_metrics(&self, url: &str) -> Result<PostMetrics> {
        self.metrics.clone().ok_or_else(|| Error::Fetch(format!("cannot fetch {}", url)))
    }
}

/// 在目标目录中写入一个空视频文件
pub struct FakeDownloader {
    pub urls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self { urls: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl VideoDownloader for FakeDownloader {
    async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        self.urls.lock().unwrap().push(url.to_string());
        let path = dir.join("video.mp4");
        tokio::fs::write(&path, b"fake").await?;
        Ok(path)
    }
}
