use anyhow::bail;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, TrendOptions};

#[derive(Parser, Debug, Clone)]
pub struct TrendsCommand {
    #[command(flatten)]
    pub trends: TrendOptions,
    /// 话题标签，可以带 `#`
    pub hashtag: String,
}

impl SubCommandExtend for TrendsCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let aggregator = self.trends.aggregator()?;
        match aggregator.summarize(&self.hashtag).await? {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => bail!("Failed to analyze TikTok trends"),
        }
        Ok(())
    }
}
