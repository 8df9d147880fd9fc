use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::{Frame, VideoDecoder, VideoMetadata};
use crate::{Error, Result};

/// 在 `[0, duration]` 区间内等距取 `n` 个时间点，包含两端
///
/// `n == 1` 时只取 `0`，所有时间点都被限制在区间内
pub fn sample_timestamps(duration: f64, n: usize) -> Vec<f64> {
    let duration = duration.max(0.);
    match n {
        0 => vec![],
        1 => vec![0.],
        _ => (0..n)
            .map(|i| (duration * i as f64 / (n - 1) as f64).max(0.).min(duration))
            .collect(),
    }
}

/// 等距抽帧器
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn VideoDecoder>,
    count: usize,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn VideoDecoder>, count: usize) -> Self {
        Self { decoder, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// 按时间顺序抽取 `count` 帧，任何一帧解码失败都会直接返回错误
    pub async fn sample(&self, path: &Path, meta: &VideoMetadata) -> Result<Vec<Frame>> {
        if self.count == 0 {
            return Err(Error::Validation("frame count must be at least 1".to_string()));
        }
        if !(meta.duration.is_finite() && meta.duration > 0.) {
            return Err(Error::Decode(format!("invalid video duration: {}", meta.duration)));
        }

        let timestamps = sample_timestamps(meta.duration, self.count);
        debug!("抽帧时间点: {:?}", timestamps);

        let mut frames = Vec::with_capacity(timestamps.len());
        for timestamp in timestamps {
            let image = self.decoder.frame_at(path, meta, timestamp).await?;
            frames.push(Frame { timestamp, image });
        }
        Ok(frames)
    }
}
