use std::path::{Path, PathBuf};
use std::process::Command;

use futures::{StreamExt, TryStreamExt};
use tempfile::TempDir;
use vidlens::Error;
use vidlens::media::{FfmpegDecoder, FrameSampler, VideoDecoder};

/// 系统中没有 ffmpeg / ffprobe 时跳过
fn tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool).arg("-version").output().is_ok_and(|out| out.status.success())
    })
}

/// 生成 2 秒、10fps、64x48 的测试视频
fn test_clip(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("testsrc.mp4");
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i", "testsrc=d=2:s=64x48:r=10"])
        .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    path
}

macro_rules! require_tools {
    () => {
        if !tools_available() {
            eprintln!("ffmpeg 不可用，跳过");
            return;
        }
    };
}

#[tokio::test]
async fn probe_reads_metadata() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let path = test_clip(&dir);

    let meta = FfmpegDecoder::default().probe(&path).await.unwrap();
    assert!((meta.duration - 2.).abs() < 0.2);
    assert_eq!(meta.size, [64, 48]);
    assert_eq!(meta.fps, 10.);
    assert!(!meta.audio);
}

#[tokio::test]
async fn sampler_reads_last_frame() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let path = test_clip(&dir);
    let decoder = std::sync::Arc::new(FfmpegDecoder::default());

    let meta = decoder.probe(&path).await.unwrap();
    // 最后一个时间点恰好是视频时长，需要退回到最后一帧
    let image = decoder.frame_at(&path, &meta, meta.duration).await.unwrap();
    assert_eq!(image.dimensions(), (64, 48));

    let frames = FrameSampler::new(decoder, 5).sample(&path, &meta).await.unwrap();
    assert_eq!(frames.len(), 5);
}

#[tokio::test]
async fn frames_are_streamed_in_full() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let path = test_clip(&dir);
    let decoder = FfmpegDecoder::default();

    let meta = decoder.probe(&path).await.unwrap();
    let frames: Vec<_> = decoder.frames(&path, &meta).unwrap().try_collect().await.unwrap();
    // 2 秒 10fps，容许容器时长带来的一帧误差
    assert!((19..=21).contains(&frames.len()));
    assert!(frames.iter().all(|f| f.dimensions() == (64, 48)));
}

#[tokio::test]
async fn dropped_stream_releases_decoder() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let path = test_clip(&dir);
    let decoder = FfmpegDecoder::default();
    let meta = decoder.probe(&path).await.unwrap();

    let first: Vec<_> = decoder.frames(&path, &meta).unwrap().take(3).try_collect().await.unwrap();
    assert_eq!(first.len(), 3);

    // 丢弃后视频仍可以被再次完整读取
    let count = decoder.frames(&path, &meta).unwrap().count().await;
    assert!((19..=21).contains(&count));
}

#[tokio::test]
async fn failed_decode_is_reported_at_end_of_stream() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let path = test_clip(&dir);
    let decoder = FfmpegDecoder::default();
    let meta = decoder.probe(&path).await.unwrap();

    // ffmpeg 无法打开文件，没有输出任何帧就以错误状态退出
    let missing = Path::new("/nonexistent/video.mp4");
    let err = decoder.frames(missing, &meta).unwrap().try_collect::<Vec<_>>().await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));

    assert!(matches!(decoder.probe(missing).await, Err(Error::Decode(_))));
}
