//! 预训练模型能力
//!
//! 模型本身是黑盒，这里只约定输入输出。具体实现由 cargo feature 决定是否编译：
//! `opencv` 提供 CLIP 图像嵌入和 YOLOv5 目标检测，`vosk` 提供语音识别。

#[cfg(feature = "opencv")]
mod clip;
#[cfg(feature = "opencv")]
mod cv;
mod detection;
#[cfg(feature = "vosk")]
mod speech;
#[cfg(feature = "opencv")]
mod yolo;

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbImage;
#[allow(unused_imports)]
use log::{error, info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(feature = "opencv")]
pub use self::clip::ClipEmbedder;
pub use self::detection::*;
#[cfg(feature = "vosk")]
pub use self::speech::VoskRecognizer;
#[cfg(feature = "opencv")]
pub use self::yolo::YoloDetector;
use crate::config::ModelDir;
use crate::media::{AudioClip, Frame};
use crate::{Error, Result};

/// CLIP ViT-B/32 图像特征维度
pub const EMBEDDING_DIM: usize = 512;

/// 图像与文本联合嵌入模型
pub trait ImageEmbedder: Send + Sync {
    /// 输出向量的维度
    fn dimension(&self) -> usize;

    /// 批量编码，返回 `[frames.len(), dimension]` 的矩阵，行顺序与输入一致
    fn embed(&self, frames: &[Frame]) -> Result<Array2<f32>>;
}

/// 目标检测模型
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// 语音识别模型
pub trait SpeechRecognizer: Send + Sync {
    /// 返回所有非空的识别片段
    fn transcribe(&self, clip: &AudioClip) -> Result<Vec<TranscriptSegment>>;
}

/// 一段识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TranscriptSegment {
    pub text: String,
    #[serde(default)]
    pub result: Vec<WordTiming>,
}

/// 单词级别的时间信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WordTiming {
    pub word: String,
    pub start: f32,
    pub end: f32,
    pub conf: f32,
}

/// 对嵌入模型的包装，保证输出形状符合约定
#[derive(Clone)]
pub struct Embedder {
    model: Arc<dyn ImageEmbedder>,
}

impl Embedder {
    pub fn new(model: Arc<dyn ImageEmbedder>) -> Self {
        Self { model }
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// 编码一组帧。空输入直接返回空矩阵，不会调用模型
    pub fn encode(&self, frames: &[Frame]) -> Result<Array2<f32>> {
        let dim = self.model.dimension();
        if frames.is_empty() {
            return Ok(Array2::zeros((0, dim)));
        }
        let features = self.model.embed(frames)?;
        if features.dim() != (frames.len(), dim) {
            return Err(Error::Model(format!(
                "embedding model returned shape {:?}, expected ({}, {})",
                features.dim(),
                frames.len(),
                dim
            )));
        }
        Ok(features)
    }
}

/// 进程启动时加载的全部模型，未加载的模型为 `None`
#[derive(Clone, Default)]
pub struct Models {
    pub embedder: Option<Embedder>,
    pub detector: Option<Arc<dyn ObjectDetector>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

impl Models {
    /// 从模型目录加载所有已编译的模型，加载失败只记录日志
    pub fn load(dir: &ModelDir) -> Self {
        #[allow(unused_mut)]
        let mut models = Models::default();

        #[cfg(feature = "opencv")]
        {
            info!("正在加载 CLIP 模型...");
            match ClipEmbedder::open(dir.clip()) {
                Ok(model) => models.embedder = Some(Embedder::new(Arc::new(model))),
                Err(e) => error!("加载 CLIP 模型失败: {}", e),
            }
            info!("正在加载 YOLOv5 模型...");
            match YoloDetector::open(dir.yolo()) {
                Ok(model) => models.detector = Some(Arc::new(model)),
                Err(e) => error!("加载 YOLOv5 模型失败: {}", e),
            }
        }

        #[cfg(feature = "vosk")]
        {
            info!("正在加载 Vosk 模型...");
            match VoskRecognizer::open(dir.vosk()) {
                Ok(model) => models.recognizer = Some(Arc::new(model)),
                Err(e) => error!("加载 Vosk 模型失败: {}", e),
            }
        }

        #[cfg(not(all(feature = "opencv", feature = "vosk")))]
        warn!("部分模型后端未编译，模型目录: {}", dir.path().display());

        models
    }

    /// 各模型的加载状态
    pub fn status(&self) -> BTreeMap<String, bool> {
        BTreeMap::from([
            ("clip".to_string(), self.embedder.is_some()),
            ("yolov5".to_string(), self.detector.is_some()),
            ("vosk".to_string(), self.recognizer.is_some()),
        ])
    }

    pub fn embedder(&self) -> Result<&Embedder> {
        self.embedder.as_ref().ok_or_else(|| not_loaded("embedding"))
    }

    pub fn detector(&self) -> Result<&Arc<dyn ObjectDetector>> {
        self.detector.as_ref().ok_or_else(|| not_loaded("object detection"))
    }

    pub fn recognizer(&self) -> Result<&Arc<dyn SpeechRecognizer>> {
        self.recognizer.as_ref().ok_or_else(|| not_loaded("speech recognition"))
    }
}

fn not_loaded(kind: &str) -> Error {
    Error::Model(format!("{} model not loaded", kind))
}
