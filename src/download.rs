use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;

use crate::{Error, Result};

/// 外部视频下载器
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// 将 `url` 指向的视频下载到 `dir` 中，返回下载得到的文件路径
    async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf>;
}

/// 调用 yt-dlp 下载视频
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

#[async_trait]
impl VideoDownloader for YtDlp {
    async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        info!("正在下载视频: {}", url);
        let template = dir.join("video.%(ext)s");
        let output = Command::new(&self.program)
            .arg(url)
            .args(["--format", "mp4", "--no-playlist", "--no-warnings", "--quiet"])
            .arg("--output")
            .arg(&template)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Fetch(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Fetch(format!("download of {} failed: {}", url, stderr.trim())));
        }

        let path = find_download(dir).await?;
        debug!("视频已下载到 {}", path.display());
        Ok(path)
    }
}

/// 在目录中查找 `video.*` 文件
async fn find_download(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_stem().is_some_and(|stem| stem == "video") && path.is_file() {
            return Ok(path);
        }
    }
    Err(Error::Fetch("downloader produced no video file".to_string()))
}
