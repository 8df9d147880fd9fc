//! 社交平台趋势统计
//!
//! 趋势数据只是分析结果的补充，默认情况下抓取失败会退化为空结果，
//! 这一行为由 [`TrendFailurePolicy`] 显式控制。

mod instagram;
mod tiktok;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use self::instagram::*;
pub use self::tiktok::*;
use crate::metrics;
use crate::{Error, Result};

/// 带有某个话题标签的一条视频
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendPost {
    pub play_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// 背景音乐标题
    pub sound: Option<String>,
}

/// 话题视频来源
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// 获取最多 `limit` 条带有该话题标签的视频
    async fn hashtag_posts(&self, hashtag: &str, limit: usize) -> Result<Vec<TrendPost>>;
}

/// 话题趋势统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendSummary {
    pub hashtag: String,
    /// 采样的视频数量
    pub total_videos: usize,
    /// 播放量总和
    pub total_views: u64,
    /// 平均点赞数
    pub avg_likes: f64,
    /// 平均评论数
    pub avg_comments: f64,
    /// 出现过的背景音乐，已去重
    pub trending_sounds: Vec<String>,
}

/// 分析结果中的趋势字段，没有数据时序列化为 `{}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocialTrends {
    Summary(TrendSummary),
    Empty {},
}

impl From<Option<TrendSummary>> for SocialTrends {
    fn from(summary: Option<TrendSummary>) -> Self {
        match summary {
            Some(summary) => SocialTrends::Summary(summary),
            None => SocialTrends::Empty {},
        }
    }
}

impl SocialTrends {
    pub fn summary(&self) -> Option<&TrendSummary> {
        match self {
            SocialTrends::Summary(summary) => Some(summary),
            SocialTrends::Empty {} => None,
        }
    }
}

/// 抓取失败时的处理方式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrendFailurePolicy {
    /// 记录日志并返回空结果
    #[default]
    Degrade,
    /// 将错误返回给调用者
    Propagate,
}

/// 去掉话题标签前的 `#` 和空白，空标签返回 `None`
pub fn normalize_hashtag(hashtag: &str) -> Option<&str> {
    let tag = hashtag.trim().trim_start_matches('#').trim();
    (!tag.is_empty()).then_some(tag)
}

/// 根据采样的视频计算统计信息
pub fn summarize_posts(hashtag: &str, posts: &[TrendPost]) -> TrendSummary {
    let n = posts.len();
    let mean = |total: u64| if n == 0 { 0. } else { total as f64 / n as f64 };
    let sounds: BTreeSet<&str> = posts.iter().filter_map(|p| p.sound.as_deref()).collect();
    TrendSummary {
        hashtag: hashtag.to_string(),
        total_videos: n,
        total_views: posts.iter().map(|p| p.play_count).sum(),
        avg_likes: mean(posts.iter().map(|p| p.like_count).sum()),
        avg_comments: mean(posts.iter().map(|p| p.comment_count).sum()),
        trending_sounds: sounds.into_iter().map(str::to_string).collect(),
    }
}

/// 趋势统计器
#[derive(Clone)]
pub struct TrendAggregator {
    source: Arc<dyn TrendSource>,
    sample: usize,
    policy: TrendFailurePolicy,
}

impl TrendAggregator {
    /// 默认最多采样的视频数量
    pub const DEFAULT_SAMPLE: usize = 50;

    pub fn new(source: Arc<dyn TrendSource>, sample: usize, policy: TrendFailurePolicy) -> Self {
        Self { source, sample, policy }
    }

    pub fn policy(&self) -> TrendFailurePolicy {
        self.policy
    }

    /// 统计一个话题标签
    ///
    /// 抓取失败时，`Degrade` 策略返回 `Ok(None)`，`Propagate` 策略返回错误
    pub async fn summarize(&self, hashtag: &str) -> Result<Option<TrendSummary>> {
        let Some(tag) = normalize_hashtag(hashtag) else {
            return Err(Error::Validation("hashtag must not be empty".to_string()));
        };

        match self.source.hashtag_posts(tag, self.sample).await {
            Ok(mut posts) => {
                posts.truncate(self.sample);
                debug!("话题 #{} 采样到 {} 条视频", tag, posts.len());
                Ok(Some(summarize_posts(tag, &posts)))
            }
            Err(e) => match self.policy {
                TrendFailurePolicy::Degrade => {
                    error!("获取话题 #{} 的趋势失败: {}", tag, e);
                    metrics::inc_trend_failure();
                    Ok(None)
                }
                TrendFailurePolicy::Propagate => Err(e),
            },
        }
    }
}
