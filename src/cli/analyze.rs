use std::path::Path;

use anyhow::bail;
use clap::Parser;

use super::load_models;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, PipelineOptions, ToolOptions, TrendOptions, build_analyzer};
use crate::pipeline::AnalysisReport;

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeCommand {
    #[command(flatten)]
    pub pipeline: PipelineOptions,
    #[command(flatten)]
    pub trends: TrendOptions,
    #[command(flatten)]
    pub tools: ToolOptions,
    /// 视频文件路径，或 http(s) 视频链接
    pub video: String,
    /// 同时统计该话题的趋势
    #[arg(long)]
    pub hashtag: Option<String>,
}

impl SubCommandExtend for AnalyzeCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let models = load_models(&opts.model_dir).await?;
        let analyzer = build_analyzer(&models, &self.pipeline, &self.trends, &self.tools)?;

        let hashtag = self.hashtag.as_deref();
        let report = if is_url(&self.video) {
            analyzer.analyze_url(&self.video, hashtag).await
        } else {
            analyzer.analyze(Path::new(&self.video), hashtag).await
        };

        println!("{}", serde_json::to_string_pretty(&report)?);
        if let AnalysisReport::Failed { .. } = report {
            bail!("视频分析失败");
        }
        Ok(())
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
