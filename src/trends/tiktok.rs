use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{TrendPost, TrendSource};
use crate::{Error, Result};

/// TikTok 网页接口的默认地址
pub const TIKTOK_ENDPOINT: &str = "https://www.tiktok.com";

/// 每页请求的视频数量
const PAGE_SIZE: usize = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeDetail {
    challenge_info: Option<ChallengeInfo>,
}

#[derive(Debug, Deserialize)]
struct ChallengeInfo {
    challenge: Challenge,
}

#[derive(Debug, Deserialize)]
struct Challenge {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPage {
    #[serde(default)]
    item_list: Vec<Item>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    cursor: Value,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    stats: ItemStats,
    music: Option<Music>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemStats {
    #[serde(default)]
    play_count: u64,
    #[serde(default)]
    digg_count: u64,
    #[serde(default)]
    comment_count: u64,
}

#[derive(Debug, Deserialize)]
struct Music {
    title: Option<String>,
}

impl From<Item> for TrendPost {
    fn from(item: Item) -> Self {
        TrendPost {
            play_count: item.stats.play_count,
            like_count: item.stats.digg_count,
            comment_count: item.stats.comment_count,
            sound: item.music.and_then(|m| m.title).filter(|t| !t.is_empty()),
        }
    }
}

/// 通过 TikTok 网页接口获取话题视频
#[derive(Debug, Clone)]
pub struct TikTokClient {
    base_url: String,
    http: Client,
}

impl TikTokClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }

    async fn challenge_id(&self, hashtag: &str) -> Result<String> {
        let detail: ChallengeDetail = self
            .http
            .get(format!("{}/api/challenge/detail/", self.base_url))
            .query(&[("challengeName", hashtag)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        detail
            .challenge_info
            .map(|info| info.challenge.id)
            .ok_or_else(|| Error::Fetch(format!("hashtag #{} not found", hashtag)))
    }

    async fn item_page(&self, challenge_id: &str, cursor: &str) -> Result<ItemPage> {
        let page = self
            .http
            .get(format!("{}/api/challenge/item_list/", self.base_url))
            .query(&[
                ("challengeID", challenge_id),
                ("count", &PAGE_SIZE.to_string()),
                ("cursor", cursor),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(page)
    }
}

#[async_trait]
impl TrendSource for TikTokClient {
    async fn hashtag_posts(&self, hashtag: &str, limit: usize) -> Result<Vec<TrendPost>> {
        let id = self.challenge_id(hashtag).await?;
        debug!("话题 #{} 的 ID 为 {}", hashtag, id);

        let mut posts = vec![];
        let mut cursor = "0".to_string();
        while posts.len() < limit {
            let page = self.item_page(&id, &cursor).await?;
            if page.item_list.is_empty() {
                break;
            }
            posts.extend(page.item_list.into_iter().map(TrendPost::from));
            if !page.has_more {
                break;
            }
            cursor = match page.cursor {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => break,
            };
        }

        posts.truncate(limit);
        Ok(posts)
    }
}
