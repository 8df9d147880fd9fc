use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use image::RgbImage;
use log::debug;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use super::{VideoDecoder, VideoMetadata};
use crate::{Error, Result};

/// 调用 ffmpeg / ffprobe 可执行文件完成解码
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self { ffmpeg: ffmpeg.into(), ffprobe: ffprobe.into() }
    }

    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-noautorotate"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Decode(format!("failed to execute {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(Error::Decode(format!(
                "cannot open {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe(&output.stdout)
    }

    async fn frame_at(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        timestamp: f64,
    ) -> Result<RgbImage> {
        // 视频末尾的时间点往往读不到画面，此时退回到最后一帧
        let seek = timestamp.max(0.).min(meta.last_frame_time());
        debug!("解码 {:.3}s 处的画面", seek);

        let output = self
            .ffmpeg_command()
            .args(["-ss", &format!("{:.6}", seek)])
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .output()
            .await
            .map_err(|e| Error::Decode(format!("failed to execute {}: {}", self.ffmpeg, e)))?;

        if !output.status.success() {
            return Err(Error::Decode(format!(
                "failed to decode frame at {:.3}s: {}",
                seek,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut data = output.stdout;
        let frame_len = frame_len(meta);
        if frame_len == 0 || data.len() < frame_len {
            return Err(Error::Decode(format!("no frame decoded at {:.3}s", seek)));
        }
        data.truncate(frame_len);
        RgbImage::from_raw(meta.width(), meta.height(), data)
            .ok_or_else(|| Error::Decode("frame buffer size mismatch".to_string()))
    }

    fn frames(
        &self,
        path: &Path,
        meta: &VideoMetadata,
    ) -> Result<BoxStream<'static, Result<RgbImage>>> {
        let (width, height) = (meta.width(), meta.height());
        let frame_len = frame_len(meta);
        if frame_len == 0 {
            return Err(Error::Decode("video has no picture".to_string()));
        }

        let mut child = self
            .ffmpeg_command()
            .arg("-i")
            .arg(path)
            .args(["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Decode(format!("failed to execute {}: {}", self.ffmpeg, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Decode("ffmpeg stdout unavailable".to_string()))?;

        let stream = stream::try_unfold(Some((child, stdout)), move |state| {
            next_frame(state, width, height, frame_len)
        });

        Ok(stream.boxed())
    }
}

type FrameReader = Option<(Child, ChildStdout)>;

/// 从 rawvideo 管道中读取下一帧，管道结束时检查进程退出状态
async fn next_frame(
    state: FrameReader,
    width: u32,
    height: u32,
    frame_len: usize,
) -> Result<Option<(RgbImage, FrameReader)>> {
    let Some((mut child, mut stdout)) = state else {
        return Ok(None);
    };
    let mut buf = vec![0u8; frame_len];
    match stdout.read_exact(&mut buf).await {
        Ok(_) => {
            let frame = RgbImage::from_raw(width, height, buf)
                .ok_or_else(|| Error::Decode("frame buffer size mismatch".to_string()))?;
            Ok(Some((frame, Some((child, stdout)))))
        }
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            let status = child.wait().await?;
            if status.success() {
                Ok(None)
            } else {
                Err(Error::Decode(format!("ffmpeg exited with {}", status)))
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn frame_len(meta: &VideoMetadata) -> usize {
    meta.width() as usize * meta.height() as usize * 3
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// 解析 `ffprobe -print_format json` 的输出
pub fn parse_probe(stdout: &[u8]) -> Result<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| Error::Decode(format!("invalid ffprobe output: {}", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::Decode("no video stream found".to_string()))?;
    let audio = probe.streams.iter().any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.)
        .ok_or_else(|| Error::Decode("video has no duration".to_string()))?;

    let fps = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .filter_map(|r| r.as_deref().and_then(parse_rate))
        .next()
        .unwrap_or(0.);

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(Error::Decode("video has no picture size".to_string())),
    };

    Ok(VideoMetadata { duration, fps, size: [width, height], audio })
}

/// 解析 ffprobe 的帧率表示，如 `30000/1001`
pub fn parse_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0. {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => s.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.).then_some(rate)
}
