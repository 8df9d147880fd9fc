use std::sync::Arc;

use crate::cli::server::ServerCommand;
use crate::models::Models;
use crate::pipeline::Analyzer;
use crate::trends::{PostSource, TrendAggregator};

/// 应用状态
pub struct AppState {
    /// 视频分析器，内含跨请求共享的相似度索引
    pub analyzer: Analyzer,
    /// 启动时加载的模型
    pub models: Models,
    /// TikTok 话题统计
    pub trends: TrendAggregator,
    /// Instagram 帖子数据
    pub posts: Arc<dyn PostSource>,
    /// 逐帧检测的间隔
    pub detect_every: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(analyzer: Analyzer, models: Models, opts: &ServerCommand) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(AppState {
            analyzer,
            models,
            trends: opts.trends.aggregator()?,
            posts: Arc::new(opts.trends.instagram()?),
            detect_every: opts.pipeline.detect_every,
        }))
    }
}
