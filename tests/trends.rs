mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rstest::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use vidlens::trends::{
    InstagramClient, PostSource, TikTokClient, TrendAggregator, TrendFailurePolicy, TrendSource,
    summarize_posts,
};

use common::*;

/// 在随机端口启动一个本地服务，返回它的地址
async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[test]
fn summary_statistics() {
    let posts = vec![
        post(1000, 10, 2, Some("b")),
        post(2000, 20, 4, Some("a")),
        post(3000, 60, 0, Some("b")),
        post(0, 0, 0, None),
    ];
    let summary = summarize_posts("cats", &posts);
    assert_eq!(summary.hashtag, "cats");
    assert_eq!(summary.total_videos, 4);
    assert_eq!(summary.total_views, 6000);
    assert_eq!(summary.avg_likes, 22.5);
    assert_eq!(summary.avg_comments, 1.5);
    assert_eq!(summary.trending_sounds, vec!["a", "b"]);
}

#[test]
fn empty_sample_has_zero_averages() {
    let summary = summarize_posts("quiet", &[]);
    assert_eq!(summary.total_videos, 0);
    assert_eq!(summary.total_views, 0);
    assert_eq!(summary.avg_likes, 0.);
    assert_eq!(summary.avg_comments, 0.);
    assert!(summary.trending_sounds.is_empty());
}

#[tokio::test]
async fn aggregator_bounds_the_sample() {
    let posts = (0..80).map(|i| post(i, 1, 1, None)).collect();
    let source = Arc::new(FakeTrendSource::new(posts));
    let aggregator = TrendAggregator::new(source.clone(), 50, TrendFailurePolicy::Degrade);
    let summary = aggregator.summarize("#Cats ").await.unwrap().unwrap();

    assert_eq!(summary.total_videos, 50);
    assert_eq!(summary.total_views, (0..50).sum::<u64>());
    assert_eq!(*source.calls.lock().unwrap(), vec![("Cats".to_string(), 50)]);
}

#[rstest]
#[case(TrendFailurePolicy::Degrade, true)]
#[case(TrendFailurePolicy::Propagate, false)]
#[tokio::test]
async fn failure_policy(#[case] policy: TrendFailurePolicy, #[case] ok: bool) {
    let aggregator = TrendAggregator::new(Arc::new(FakeTrendSource::failing()), 50, policy);
    let result = aggregator.summarize("cats").await;
    assert_eq!(result.is_ok(), ok);
    if let Ok(summary) = result {
        assert!(summary.is_none());
    }
}

#[tokio::test]
async fn blank_hashtag_is_invalid() {
    let aggregator =
        TrendAggregator::new(Arc::new(FakeTrendSource::new(vec![])), 50, TrendFailurePolicy::Degrade);
    assert!(aggregator.summarize(" # ").await.unwrap_err().is_validation());
}

fn tiktok_item(i: u64) -> Value {
    json!({
        "id": i.to_string(),
        "stats": {"playCount": 100 * i, "diggCount": i, "commentCount": 1},
        "music": {"title": format!("sound {}", i % 2)},
    })
}

fn tiktok_app() -> Router {
    Router::new()
        .route(
            "/api/challenge/detail/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("challengeName").map(String::as_str) {
                    Some("cats") => Json(json!({"challengeInfo": {"challenge": {"id": "42"}}})),
                    _ => Json(json!({"statusCode": 10205})),
                }
            }),
        )
        .route(
            "/api/challenge/item_list/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("challengeID").map(String::as_str) != Some("42") {
                    return Err(StatusCode::BAD_REQUEST);
                }
                let cursor: u64 = q.get("cursor").and_then(|c| c.parse().ok()).unwrap_or(0);
                let items: Vec<Value> = (cursor..cursor + 30).map(tiktok_item).collect();
                Ok(Json(json!({
                    "itemList": items,
                    "hasMore": cursor < 60,
                    "cursor": (cursor + 30).to_string(),
                })))
            }),
        )
}

#[tokio::test]
async fn tiktok_client_pages_until_limit() {
    let base = spawn_server(tiktok_app()).await;
    let client = TikTokClient::new(base, Duration::from_secs(5)).unwrap();
    let posts = client.hashtag_posts("cats", 50).await.unwrap();

    assert_eq!(posts.len(), 50);
    assert_eq!(posts[0].play_count, 0);
    assert_eq!(posts[49].like_count, 49);
    assert_eq!(posts[1].sound.as_deref(), Some("sound 1"));
}

#[tokio::test]
async fn tiktok_client_stops_when_exhausted() {
    let base = spawn_server(tiktok_app()).await;
    let client = TikTokClient::new(base, Duration::from_secs(5)).unwrap();
    let posts = client.hashtag_posts("cats", 500).await.unwrap();
    assert_eq!(posts.len(), 90);
}

#[tokio::test]
async fn tiktok_unknown_hashtag_degrades() {
    let base = spawn_server(tiktok_app()).await;
    let client = TikTokClient::new(base, Duration::from_secs(5)).unwrap();
    assert!(client.hashtag_posts("dogs", 10).await.is_err());

    let aggregator = TrendAggregator::new(Arc::new(client), 50, TrendFailurePolicy::Degrade);
    assert_eq!(aggregator.summarize("dogs").await.unwrap(), None);
}

#[tokio::test]
async fn tiktok_unreachable_platform_degrades() {
    // 端口 9 通常没有服务在监听
    let client = TikTokClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let aggregator = TrendAggregator::new(Arc::new(client), 50, TrendFailurePolicy::Degrade);
    assert_eq!(aggregator.summarize("cats").await.unwrap(), None);
}

fn instagram_app() -> Router {
    Router::new().route(
        "/p/{shortcode}/",
        get(|axum::extract::Path(code): axum::extract::Path<String>| async move {
            if code != "Cabc123" {
                return Err(StatusCode::NOT_FOUND);
            }
            Ok(Json(json!({"items": [{
                "like_count": 1200,
                "comment_count": 34,
                "caption": {"text": "Morning coffee with @Barista_Joe #Coffee #latteart"},
                "location": {"name": "Lisbon"},
            }]})))
        }),
    )
}

#[tokio::test]
async fn instagram_client_reads_post() {
    let base = spawn_server(instagram_app()).await;
    let client = InstagramClient::new(base, Duration::from_secs(5)).unwrap();
    let metrics = client.post_metrics("https://www.instagram.com/p/Cabc123/").await.unwrap();

    assert_eq!(metrics.likes, 1200);
    assert_eq!(metrics.comments, 34);
    assert_eq!(metrics.hashtags, vec!["coffee", "latteart"]);
    assert_eq!(metrics.mentions, vec!["barista_joe"]);
    assert_eq!(metrics.location.as_deref(), Some("Lisbon"));
}

#[tokio::test]
async fn instagram_missing_post_is_fetch_error() {
    let base = spawn_server(instagram_app()).await;
    let client = InstagramClient::new(base, Duration::from_secs(5)).unwrap();
    let err = client.post_metrics("https://www.instagram.com/p/Missing1/").await.unwrap_err();
    assert!(matches!(err, vidlens::Error::Fetch(_)));
}
