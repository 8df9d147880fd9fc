use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{Error, Result};

/// Instagram 网页的默认地址
pub const INSTAGRAM_ENDPOINT: &str = "https://www.instagram.com";

static RE_HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("failed to build regex"));
static RE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z0-9_](?:[A-Za-z0-9_.]*[A-Za-z0-9_])?)").expect("failed to build regex")
});

/// 一条帖子的互动数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostMetrics {
    pub likes: u64,
    pub comments: u64,
    pub caption: Option<String>,
    /// 标题中的话题标签，小写，不含 `#`
    pub hashtags: Vec<String>,
    /// 标题中提到的用户，小写，不含 `@`
    pub mentions: Vec<String>,
    pub location: Option<String>,
}

/// 帖子数据来源
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn post_metrics(&self, url: &str) -> Result<PostMetrics>;
}

/// 从帖子链接中提取 shortcode
///
/// 优先取 `p/`、`reel/`、`tv/` 后的一段，否则取倒数第二段
pub fn shortcode_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    let after_kind = segments
        .windows(2)
        .find(|w| matches!(w[0], "p" | "reel" | "reels" | "tv"))
        .map(|w| w[1]);
    let code = match after_kind {
        Some(code) => code,
        None if segments.len() >= 2 => segments[segments.len() - 2],
        None => return None,
    };

    let valid = !code.is_empty()
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| code.to_string())
}

fn extract(re: &Regex, caption: &str) -> Vec<String> {
    let set: BTreeSet<String> =
        re.captures_iter(caption).map(|c| c[1].to_lowercase()).collect();
    set.into_iter().collect()
}

/// 提取标题中的话题标签
pub fn caption_hashtags(caption: &str) -> Vec<String> {
    extract(&RE_HASHTAG, caption)
}

/// 提取标题中提到的用户
pub fn caption_mentions(caption: &str) -> Vec<String> {
    extract(&RE_MENTION, caption)
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    #[serde(default)]
    items: Vec<PostItem>,
}

#[derive(Debug, Deserialize)]
struct PostItem {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    comment_count: u64,
    caption: Option<Caption>,
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Caption {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
}

impl From<PostItem> for PostMetrics {
    fn from(item: PostItem) -> Self {
        let caption = item.caption.map(|c| c.text);
        let text = caption.as_deref().unwrap_or_default();
        PostMetrics {
            likes: item.like_count,
            comments: item.comment_count,
            hashtags: caption_hashtags(text),
            mentions: caption_mentions(text),
            caption,
            location: item.location.map(|l| l.name),
        }
    }
}

/// 通过 Instagram 网页接口获取帖子数据
#[derive(Debug, Clone)]
pub struct InstagramClient {
    base_url: String,
    http: Client,
}

impl InstagramClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }
}

#[async_trait]
impl PostSource for InstagramClient {
    async fn post_metrics(&self, url: &str) -> Result<PostMetrics> {
        let shortcode = shortcode_from_url(url)
            .ok_or_else(|| Error::Validation(format!("not an instagram post url: {}", url)))?;
        let resp: PostResponse = self
            .http
            .get(format!("{}/p/{}/", self.base_url, shortcode))
            .query(&[("__a", "1"), ("__d", "dis")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let item = resp
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Fetch(format!("post {} not found", shortcode)))?;
        Ok(item.into())
    }
}
