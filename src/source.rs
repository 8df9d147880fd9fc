use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 与 JavaScript `encodeURIComponent` 相同的转义集合
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 视频所在的平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
    Vimeo,
    Unknown,
}

/// 外部视频链接的解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoSource {
    pub url: String,
    pub platform: Platform,
    pub video_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub embed_url: Option<String>,
}

impl VideoSource {
    fn unknown(url: &str) -> Self {
        Self::new(url, Platform::Unknown, None)
    }

    fn new(url: &str, platform: Platform, video_id: Option<&str>) -> Self {
        let video_id = video_id.filter(|id| !id.is_empty()).map(str::to_string);
        let (thumbnail_url, embed_url) = match (&video_id, platform) {
            (Some(id), Platform::Youtube) => (
                Some(format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id)),
                Some(format!("https://www.youtube.com/embed/{}", id)),
            ),
            (Some(id), Platform::Tiktok) => (None, Some(format!("https://www.tiktok.com/embed/{}", id))),
            (Some(id), Platform::Instagram) => {
                (None, Some(format!("https://www.instagram.com/p/{}/embed", id)))
            }
            (Some(_), Platform::Facebook) => (
                None,
                Some(format!(
                    "https://www.facebook.com/plugins/video.php?href={}",
                    utf8_percent_encode(url, URI_COMPONENT)
                )),
            ),
            (Some(id), Platform::Vimeo) => (None, Some(format!("https://player.vimeo.com/video/{}", id))),
            _ => (None, None),
        };
        Self { url: url.to_string(), platform, video_id, thumbnail_url, embed_url }
    }
}

/// 识别视频链接所属的平台，并提取视频 ID 和嵌入链接
///
/// 无法解析的链接归为 [`Platform::Unknown`]
pub fn parse_video_url(url: &str) -> VideoSource {
    let Ok(parsed) = Url::parse(url) else {
        return VideoSource::unknown(url);
    };
    let host = parsed.host_str().unwrap_or_default();
    let path = parsed.path();
    let last = path.rsplit('/').next();

    if host.contains("youtube.com") || host.contains("youtu.be") {
        let id = if host.contains("youtu.be") {
            path.strip_prefix('/').map(str::to_string)
        } else {
            parsed.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())
        };
        VideoSource::new(url, Platform::Youtube, id.as_deref())
    } else if host.contains("tiktok.com") {
        VideoSource::new(url, Platform::Tiktok, last)
    } else if host.contains("instagram.com") {
        let id = path.split('/').filter(|s| !s.is_empty()).nth(1);
        VideoSource::new(url, Platform::Instagram, id)
    } else if host.contains("facebook.com") {
        let id = match path.split_once("/videos/") {
            Some((_, rest)) => rest.split('/').next(),
            None => last,
        };
        VideoSource::new(url, Platform::Facebook, id)
    } else if host.contains("vimeo.com") {
        VideoSource::new(url, Platform::Vimeo, last)
    } else {
        VideoSource::unknown(url)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1", Platform::Youtube, Some("dQw4w9WgXcQ"))]
    #[case("https://youtu.be/dQw4w9WgXcQ", Platform::Youtube, Some("dQw4w9WgXcQ"))]
    #[case("https://www.youtube.com/feed", Platform::Youtube, None)]
    #[case("https://www.tiktok.com/@user/video/7234", Platform::Tiktok, Some("7234"))]
    #[case("https://www.instagram.com/reel/Cabc12/", Platform::Instagram, Some("Cabc12"))]
    #[case("https://www.facebook.com/page/videos/998877/", Platform::Facebook, Some("998877"))]
    #[case("https://vimeo.com/76979871", Platform::Vimeo, Some("76979871"))]
    #[case("https://example.com/a.mp4", Platform::Unknown, None)]
    #[case("not a url", Platform::Unknown, None)]
    fn test_parse_video_url(
        #[case] url: &str,
        #[case] platform: Platform,
        #[case] video_id: Option<&str>,
    ) {
        let source = parse_video_url(url);
        assert_eq!(source.platform, platform);
        assert_eq!(source.video_id.as_deref(), video_id);
        assert_eq!(source.url, url);
    }

    #[test]
    fn test_embed_urls() {
        let yt = parse_video_url("https://youtu.be/abc");
        assert_eq!(yt.embed_url.as_deref(), Some("https://www.youtube.com/embed/abc"));
        assert_eq!(yt.thumbnail_url.as_deref(), Some("https://img.youtube.com/vi/abc/maxresdefault.jpg"));

        let fb = parse_video_url("https://www.facebook.com/x/videos/1/");
        assert_eq!(
            fb.embed_url.as_deref(),
            Some(
                "https://www.facebook.com/plugins/video.php?href=https%3A%2F%2Fwww.facebook.com%2Fx%2Fvideos%2F1%2F"
            )
        );

        let unknown = parse_video_url("https://example.com/v");
        assert_eq!(unknown.embed_url, None);
    }

    #[test]
    fn test_serialize_platform() {
        let json = serde_json::to_value(parse_video_url("https://vimeo.com/1")).unwrap();
        assert_eq!(json["platform"], "vimeo");
        assert_eq!(json["embed_url"], "https://player.vimeo.com/video/1");
    }
}
