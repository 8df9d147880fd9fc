mod ffmpeg;
mod sampler;
mod wav;

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use self::ffmpeg::*;
pub use self::sampler::*;
pub use self::wav::*;
use crate::Result;

/// 从视频中截取的一帧画面
#[derive(Debug, Clone)]
pub struct Frame {
    /// 该帧在视频中的时间戳，单位为秒
    pub timestamp: f64,
    pub image: RgbImage,
}

/// 视频元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoMetadata {
    /// 时长，单位为秒
    pub duration: f64,
    /// 帧率
    pub fps: f64,
    /// 画面尺寸，格式为 `[宽, 高]`
    #[schema(value_type = Vec<u32>)]
    pub size: [u32; 2],
    /// 是否包含音轨
    pub audio: bool,
}

impl VideoMetadata {
    pub fn width(&self) -> u32 {
        self.size[0]
    }

    pub fn height(&self) -> u32 {
        self.size[1]
    }

    /// 最后一帧的起始时间，超过这个时间点的读取可能拿不到任何画面
    ///
    /// 帧率未知时按 25fps 估计一帧的长度，且不超过时长的一半
    pub fn last_frame_time(&self) -> f64 {
        let frame = if self.fps > 0. {
            1. / self.fps
        } else {
            FALLBACK_FRAME_TIME.min(self.duration / 2.)
        };
        (self.duration - frame).max(0.)
    }
}

const FALLBACK_FRAME_TIME: f64 = 1. / 25.;

/// 视频解码器
///
/// 每次调用都独立打开视频，返回前释放所有资源
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// 读取视频元数据
    async fn probe(&self, path: &Path) -> Result<VideoMetadata>;

    /// 解码指定时间点的一帧画面
    async fn frame_at(&self, path: &Path, meta: &VideoMetadata, timestamp: f64)
    -> Result<RgbImage>;

    /// 按顺序解码视频的全部帧，流被丢弃时解码进程随之结束
    fn frames(&self, path: &Path, meta: &VideoMetadata)
    -> Result<BoxStream<'static, Result<RgbImage>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(duration: f64, fps: f64) -> VideoMetadata {
        VideoMetadata { duration, fps, size: [4, 2], audio: false }
    }

    #[test]
    fn test_last_frame_time() {
        assert_eq!(meta(10., 25.).last_frame_time(), 10. - 0.04);
        assert_eq!(meta(2., 10.).last_frame_time(), 1.9);
    }

    #[test]
    fn test_last_frame_time_unknown_fps() {
        let t = meta(10., 0.).last_frame_time();
        assert!(t < 10.);
        assert!((t - (10. - FALLBACK_FRAME_TIME)).abs() < 1e-9);
        // 很短的视频最多退回一半
        assert_eq!(meta(0.02, 0.).last_frame_time(), 0.01);
    }

    #[test]
    fn test_last_frame_time_shorter_than_a_frame() {
        assert_eq!(meta(0.01, 25.).last_frame_time(), 0.);
        assert_eq!(meta(0., 0.).last_frame_time(), 0.);
    }
}
